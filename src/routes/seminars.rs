use std::sync::Arc;

use axum::extract::Path;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::models::{
    is_valid_seminar_id, NewSeminar, Seminar, SeminarStatus,
    SEMINAR_ID_MAX_LEN, TITLE_MAX_LEN,
};
use crate::state::AppState;
use crate::store::StoreError;
use crate::{breaks, proceeds, Error, Payload};

#[derive(Debug, Clone, Serialize)]
pub struct SeminarList {
    pub seminars: Vec<Seminar>,
    pub active_seminars: Vec<Seminar>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeminarChanged {
    pub message: String,
    pub seminar: Seminar,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

pub async fn list_seminars(Extension(state): Extension<Arc<AppState>>) -> Payload<SeminarList> {
    let seminars = state.store.list_seminars().await?;
    let active_seminars = seminars.iter().filter(|s| s.is_active()).cloned().collect();
    proceeds(SeminarList {
        seminars,
        active_seminars,
    })
}

pub async fn create_seminar(
    Extension(state): Extension<Arc<AppState>>,
    Json(mut seminar): Json<NewSeminar>,
) -> Payload<SeminarChanged> {
    seminar.seminar_id = seminar.seminar_id.trim().to_string();
    seminar.title = seminar.title.trim().to_string();
    if seminar.seminar_id.is_empty() || seminar.title.is_empty() {
        return breaks(Error::invalid("`seminar_id` and `title` must not be empty"));
    }
    if !is_valid_seminar_id(&seminar.seminar_id) {
        return breaks(Error::invalid(format!(
            "`seminar_id` may only contain letters, digits, `-` and `_` (at most {})",
            SEMINAR_ID_MAX_LEN
        )));
    }
    if seminar.title.chars().count() > TITLE_MAX_LEN {
        return breaks(Error::invalid(format!(
            "`title` must be at most {} characters",
            TITLE_MAX_LEN
        )));
    }
    if seminar.end_time < seminar.start_time {
        return breaks(Error::invalid("`end_time` must not be before `start_time`"));
    }

    let seminar_id = seminar.seminar_id.clone();
    let created = match state.store.create_seminar(seminar).await {
        Ok(created) => created,
        Err(StoreError::Conflict(_)) => {
            return breaks(Error::SeminarAlreadyExists {
                message: format!("Seminar `{}` already exists!", seminar_id),
            })
        }
        Err(err) => return Err(err.into()),
    };

    log::info!("created seminar {} ({})", created.seminar_id, created.status);
    proceeds(SeminarChanged {
        message: format!("Seminar \"{}\" created successfully!", created.title),
        seminar: created,
    })
}

pub async fn update_seminar_status(
    Extension(state): Extension<Arc<AppState>>,
    Path(seminar_id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Payload<SeminarChanged> {
    let status: SeminarStatus = match update.status.parse() {
        Ok(status) => status,
        Err(reason) => return breaks(Error::invalid(format!("Invalid status value: {}", reason))),
    };

    let seminar = match state.store.set_seminar_status(&seminar_id, status).await? {
        Some(seminar) => seminar,
        None => {
            return breaks(Error::SeminarDoesNotExist {
                message: format!("Seminar `{}` does not exist!", seminar_id),
            })
        }
    };

    log::info!("seminar {} is now {}", seminar.seminar_id, seminar.status);
    let message = match status {
        SeminarStatus::Active => format!(
            "Seminar \"{}\" is now active and ready for attendance.",
            seminar.title
        ),
        SeminarStatus::Ended => format!("Seminar \"{}\" has been ended.", seminar.title),
        SeminarStatus::Inactive => format!("Seminar \"{}\" has been deactivated.", seminar.title),
    };
    proceeds(SeminarChanged { message, seminar })
}
