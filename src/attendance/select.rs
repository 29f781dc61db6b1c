use super::ScanError;
use crate::models::Seminar;
use crate::store::Store;

/// Picks the seminar a scan applies to.
///
/// An explicit seminar must exist and be active. Without one, exactly one
/// seminar may be active; several is ambiguous and the caller has to pick.
pub async fn select_seminar(
    store: &dyn Store,
    explicit: Option<&str>,
) -> Result<Seminar, ScanError> {
    if let Some(seminar_id) = explicit {
        let seminar = store
            .find_seminar(seminar_id)
            .await?
            .ok_or_else(|| ScanError::SeminarNotFound(seminar_id.to_string()))?;
        if !seminar.is_active() {
            return Err(ScanError::SeminarNotActive {
                seminar_id: seminar.seminar_id,
                title: seminar.title,
            });
        }
        return Ok(seminar);
    }

    let mut active = store.active_seminars().await?;
    match active.len() {
        0 => Err(ScanError::NoActiveSeminar),
        1 => Ok(active.remove(0)),
        n => Err(ScanError::AmbiguousActiveSeminar(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewSeminar, SeminarStatus};
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};

    async fn add(store: &MemoryStore, id: &str, status: SeminarStatus) {
        let now = Utc::now();
        store
            .create_seminar(NewSeminar {
                seminar_id: id.to_string(),
                title: format!("Seminar {}", id),
                start_time: now,
                end_time: now + Duration::hours(2),
                status,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn no_active_seminar() {
        let store = MemoryStore::new();
        add(&store, "SEM001", SeminarStatus::Inactive).await;
        add(&store, "SEM002", SeminarStatus::Ended).await;
        let err = select_seminar(&store, None).await.unwrap_err();
        assert!(matches!(err, ScanError::NoActiveSeminar));
    }

    #[tokio::test]
    async fn single_active_seminar_is_inferred() {
        let store = MemoryStore::new();
        add(&store, "SEM001", SeminarStatus::Inactive).await;
        add(&store, "SEM002", SeminarStatus::Active).await;
        let seminar = select_seminar(&store, None).await.unwrap();
        assert_eq!(seminar.seminar_id, "SEM002");
    }

    #[tokio::test]
    async fn two_active_seminars_are_ambiguous() {
        let store = MemoryStore::new();
        add(&store, "SEM001", SeminarStatus::Active).await;
        add(&store, "SEM002", SeminarStatus::Active).await;
        let err = select_seminar(&store, None).await.unwrap_err();
        assert!(matches!(err, ScanError::AmbiguousActiveSeminar(2)));

        // an explicit choice settles it
        let seminar = select_seminar(&store, Some("SEM001")).await.unwrap();
        assert_eq!(seminar.seminar_id, "SEM001");
    }

    #[tokio::test]
    async fn explicit_seminar_must_exist_and_be_active() {
        let store = MemoryStore::new();
        add(&store, "SEM001", SeminarStatus::Ended).await;

        let err = select_seminar(&store, Some("SEM404")).await.unwrap_err();
        assert!(matches!(err, ScanError::SeminarNotFound(ref id) if id == "SEM404"));

        let err = select_seminar(&store, Some("SEM001")).await.unwrap_err();
        assert!(matches!(err, ScanError::SeminarNotActive { .. }));
    }
}
