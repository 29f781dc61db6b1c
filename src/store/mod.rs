//! Persistence for students, seminars and attendance records.
//!
//! Both backends enforce the (student, seminar) uniqueness of attendance
//! inside the store itself; [`Store::insert_attendance`] reports a duplicate
//! as [`StoreError::Conflict`] instead of writing a second row.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Attendance, AttendanceRow, NewSeminar, NewStudent, Seminar, SeminarStatus, Student, Totals,
    Upserted,
};

pub mod memory;
pub mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            // 23505 = unique_violation
            if db.code().as_deref() == Some("23505") {
                return StoreError::Conflict(db.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

impl StoreError {
    /// The store refused this particular write, as opposed to being
    /// unreachable or misconfigured.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            StoreError::Conflict(_) | StoreError::Database(sqlx::Error::Database(_))
        )
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    async fn totals(&self) -> StoreResult<Totals>;

    async fn find_student(&self, student_id: &str) -> StoreResult<Option<Student>>;

    /// Students ordered by identifier, optionally filtered by a
    /// case-insensitive substring of identifier, name, email or course.
    async fn list_students(&self, search: Option<&str>) -> StoreResult<Vec<Student>>;

    async fn upsert_student(&self, student: NewStudent) -> StoreResult<Upserted>;

    /// Returns false when no such student existed.
    async fn delete_student(&self, student_id: &str) -> StoreResult<bool>;

    async fn find_seminar(&self, seminar_id: &str) -> StoreResult<Option<Seminar>>;

    /// Seminars, newest first.
    async fn list_seminars(&self) -> StoreResult<Vec<Seminar>>;

    /// Seminars whose status is `active`, ordered by start time.
    async fn active_seminars(&self) -> StoreResult<Vec<Seminar>>;

    async fn create_seminar(&self, seminar: NewSeminar) -> StoreResult<Seminar>;

    async fn set_seminar_status(
        &self,
        seminar_id: &str,
        status: SeminarStatus,
    ) -> StoreResult<Option<Seminar>>;

    async fn find_attendance(&self, student: i64, seminar: i64) -> StoreResult<Option<Attendance>>;

    /// Single constrained insert. A duplicate (student, seminar) pair fails
    /// with [`StoreError::Conflict`].
    async fn insert_attendance(&self, student: i64, seminar: i64) -> StoreResult<Attendance>;

    async fn count_attendance(&self, seminar: i64) -> StoreResult<i64>;

    /// Attendance of one seminar joined with students, oldest mark first.
    async fn seminar_attendance(&self, seminar: i64) -> StoreResult<Vec<AttendanceRow>>;
}
