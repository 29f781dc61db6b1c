//! Roster import from CSV.
//!
//! The file needs a header row naming `student_id`, `name`, `email`,
//! `course` and optionally `phone`; columns may appear in any order. Each row
//! is upserted by identifier. Rows with a blank required field, an
//! identifier outside the `PPP123456` shape, a field wider than its column,
//! or a write the store refuses are rejected and counted.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    NewStudent, Upserted, COURSE_MAX_LEN, EMAIL_MAX_LEN, NAME_MAX_LEN, PHONE_MAX_LEN,
};
use crate::store::{Store, StoreError};

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("{0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RosterRow {
    student_id: String,
    name: String,
    email: String,
    phone: String,
    course: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub line: u64,
    pub student_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RosterReport {
    pub created: usize,
    pub updated: usize,
    pub rejected: usize,
    pub rejections: Vec<Rejection>,
}

impl RosterReport {
    fn reject(&mut self, line: u64, student_id: &str, reason: String) {
        log::warn!("roster line {}: {}", line, reason);
        self.rejected += 1;
        self.rejections.push(Rejection {
            line,
            student_id: student_id.to_string(),
            reason,
        });
    }

    pub fn summary(&self) -> String {
        format!(
            "Upload completed! {} students processed successfully ({} created, {} updated, {} rejected).",
            self.created + self.updated,
            self.created,
            self.updated,
            self.rejected
        )
    }
}

/// Three letters (the configured prefix) followed by six digits.
pub fn is_valid_student_id(id: &str, prefix: &str) -> bool {
    id.len() == 9
        && id.is_ascii()
        && id.starts_with(prefix)
        && id[3..].bytes().all(|b| b.is_ascii_digit())
}

impl RosterRow {
    fn into_student(self, prefix: &str) -> Result<NewStudent, (String, String)> {
        let student_id = self.student_id.trim().to_uppercase();
        let missing: Vec<&str> = [
            ("student_id", &student_id),
            ("name", &self.name),
            ("email", &self.email),
            ("course", &self.course),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| *field)
        .collect();

        if !missing.is_empty() {
            return Err((
                student_id,
                format!("missing required field(s): {}", missing.join(", ")),
            ));
        }
        if !is_valid_student_id(&student_id, prefix) {
            let reason = format!(
                "invalid student ID `{}`, expected {} followed by six digits",
                student_id, prefix
            );
            return Err((student_id, reason));
        }

        let phone = self.phone.trim();
        let too_long: Vec<String> = [
            ("name", self.name.trim(), NAME_MAX_LEN),
            ("email", self.email.trim(), EMAIL_MAX_LEN),
            ("phone", phone, PHONE_MAX_LEN),
            ("course", self.course.trim(), COURSE_MAX_LEN),
        ]
        .iter()
        .filter(|(_, value, max)| value.chars().count() > *max)
        .map(|(field, _, max)| format!("{} (max {} characters)", field, max))
        .collect();
        if !too_long.is_empty() {
            return Err((
                student_id,
                format!("field(s) too long: {}", too_long.join(", ")),
            ));
        }

        Ok(NewStudent {
            student_id,
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: if phone.is_empty() {
                None
            } else {
                Some(phone.to_string())
            },
            course: self.course.trim().to_string(),
        })
    }
}

pub async fn import_roster<R: io::Read>(
    store: &dyn Store,
    input: R,
    prefix: &str,
) -> Result<RosterReport, RosterError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(input);
    let headers = reader.headers()?.clone();

    let mut report = RosterReport::default();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                let line = err.position().map(|p| p.line()).unwrap_or_default();
                report.reject(line, "", format!("unreadable row: {}", err));
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let row: RosterRow = match record.deserialize(Some(&headers)) {
            Ok(row) => row,
            Err(err) => {
                report.reject(line, "", format!("unreadable row: {}", err));
                continue;
            }
        };
        let student = match row.into_student(prefix) {
            Ok(student) => student,
            Err((student_id, reason)) => {
                report.reject(line, &student_id, reason);
                continue;
            }
        };

        let student_id = student.student_id.clone();
        match store.upsert_student(student).await {
            Ok(Upserted::Created) => report.created += 1,
            Ok(Upserted::Updated) => report.updated += 1,
            Err(err) if err.is_rejection() => {
                report.reject(line, &student_id, format!("could not be saved: {}", err))
            }
            Err(err) => return Err(err.into()),
        }
    }

    log::info!(
        "roster import: {} created, {} updated, {} rejected",
        report.created,
        report.updated,
        report.rejected
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Attendance, AttendanceRow, NewSeminar, Seminar, SeminarStatus, Student, Totals,
    };
    use crate::store::{MemoryStore, StoreResult};

    #[test]
    fn student_id_shape() {
        assert!(is_valid_student_id("SBU123456", "SBU"));
        assert!(!is_valid_student_id("SBU12345", "SBU"));
        assert!(!is_valid_student_id("ABC123456", "SBU"));
        assert!(!is_valid_student_id("SBU12345X", "SBU"));
        assert!(!is_valid_student_id("SBU12345é", "SBU"));
    }

    #[tokio::test]
    async fn import_counts_created_updated_and_rejected() {
        let store = MemoryStore::new();
        let csv = "\
student_id,name,email,phone,course
sbu000001,Asha Rao,asha@example.edu,+91 9000000001,MCA
SBU000002,Ravi Kumar,ravi@example.edu,,BCA
SBU00003,Short Id,short@example.edu,,BCA
SBU000004,,blank@example.edu,,BCA
";
        let report = import_roster(&store, csv.as_bytes(), "SBU").await.unwrap();
        assert_eq!(report.created, 2);
        assert_eq!(report.updated, 0);
        assert_eq!(report.rejected, 2);
        assert_eq!(report.rejections[0].line, 4);
        assert_eq!(report.rejections[1].student_id, "SBU000004");
        assert!(report.rejections[1].reason.contains("name"));

        let asha = store.find_student("SBU000001").await.unwrap().unwrap();
        assert_eq!(asha.phone.as_deref(), Some("+91 9000000001"));
        let ravi = store.find_student("SBU000002").await.unwrap().unwrap();
        assert_eq!(ravi.phone, None);

        let again = "course,student_id,name,email\nMSc,SBU000002,Ravi Kumar,ravi@new.edu\n";
        let report = import_roster(&store, again.as_bytes(), "SBU").await.unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.created, 0);
        let ravi = store.find_student("SBU000002").await.unwrap().unwrap();
        assert_eq!(ravi.email, "ravi@new.edu");
        assert_eq!(ravi.course, "MSc");
    }

    #[tokio::test]
    async fn oversized_fields_reject_only_their_row() {
        let store = MemoryStore::new();
        let csv = "\
student_id,name,email,phone,course
SBU000001,Asha Rao,asha@example.edu,+91 98765 432101,MCA
SBU000002,Ravi Kumar,ravi@example.edu,+91 9876543210,BCA
SBU000003,Meera Iyer,meera@example.edu,,BCA
";
        let report = import_roster(&store, csv.as_bytes(), "SBU").await.unwrap();
        assert_eq!(report.rejected, 1);
        assert_eq!(report.created, 2);
        assert_eq!(report.rejections[0].line, 2);
        assert!(report.rejections[0].reason.contains("phone"));
        assert!(store.find_student("SBU000001").await.unwrap().is_none());
        assert!(store.find_student("SBU000003").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn refused_writes_are_counted_not_fatal() {
        struct Refusing(MemoryStore);

        #[async_trait::async_trait]
        impl Store for Refusing {
            async fn ping(&self) -> StoreResult<()> {
                self.0.ping().await
            }
            async fn totals(&self) -> StoreResult<Totals> {
                self.0.totals().await
            }
            async fn find_student(&self, student_id: &str) -> StoreResult<Option<Student>> {
                self.0.find_student(student_id).await
            }
            async fn list_students(&self, search: Option<&str>) -> StoreResult<Vec<Student>> {
                self.0.list_students(search).await
            }
            async fn upsert_student(&self, student: NewStudent) -> StoreResult<Upserted> {
                if student.student_id == "SBU000001" {
                    return Err(StoreError::Conflict("students_email_key".into()));
                }
                self.0.upsert_student(student).await
            }
            async fn delete_student(&self, student_id: &str) -> StoreResult<bool> {
                self.0.delete_student(student_id).await
            }
            async fn find_seminar(&self, seminar_id: &str) -> StoreResult<Option<Seminar>> {
                self.0.find_seminar(seminar_id).await
            }
            async fn list_seminars(&self) -> StoreResult<Vec<Seminar>> {
                self.0.list_seminars().await
            }
            async fn active_seminars(&self) -> StoreResult<Vec<Seminar>> {
                self.0.active_seminars().await
            }
            async fn create_seminar(&self, seminar: NewSeminar) -> StoreResult<Seminar> {
                self.0.create_seminar(seminar).await
            }
            async fn set_seminar_status(
                &self,
                seminar_id: &str,
                status: SeminarStatus,
            ) -> StoreResult<Option<Seminar>> {
                self.0.set_seminar_status(seminar_id, status).await
            }
            async fn find_attendance(
                &self,
                student: i64,
                seminar: i64,
            ) -> StoreResult<Option<Attendance>> {
                self.0.find_attendance(student, seminar).await
            }
            async fn insert_attendance(&self, student: i64, seminar: i64) -> StoreResult<Attendance> {
                self.0.insert_attendance(student, seminar).await
            }
            async fn count_attendance(&self, seminar: i64) -> StoreResult<i64> {
                self.0.count_attendance(seminar).await
            }
            async fn seminar_attendance(&self, seminar: i64) -> StoreResult<Vec<AttendanceRow>> {
                self.0.seminar_attendance(seminar).await
            }
        }

        let store = Refusing(MemoryStore::new());
        let csv = "\
student_id,name,email,course
SBU000001,Asha Rao,asha@example.edu,MCA
SBU000002,Ravi Kumar,ravi@example.edu,BCA
";
        let report = import_roster(&store, csv.as_bytes(), "SBU").await.unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.rejections[0].student_id, "SBU000001");
        assert!(report.rejections[0].reason.starts_with("could not be saved"));
    }

    #[tokio::test]
    async fn missing_columns_reject_every_row() {
        let store = MemoryStore::new();
        let csv = "id,full_name\nSBU000001,Asha\n";
        let report = import_roster(&store, csv.as_bytes(), "SBU").await.unwrap();
        assert_eq!(report.rejected, 1);
        assert_eq!(store.totals().await.unwrap().students, 0);
    }
}
