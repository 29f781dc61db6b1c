//! Marking attendance from a scan.
//!
//! [`mark_attendance`] is the only code path that writes attendance. Every
//! entry point (seminar-scoped scan, unscoped scan, manual entry) goes through
//! [`scan`], which wraps the outcome into a [`Feedback`].

use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;

use crate::models::{Attendance, Seminar, Student};
use crate::store::{Store, StoreError};

pub mod feedback;
pub mod resolve;
pub mod select;

pub use feedback::{Feedback, FeedbackKind, MarkDetails, Severity};
pub use resolve::resolve_identifier;
pub use select::select_seminar;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Empty QR code data received.")]
    EmptyPayload,

    #[error("Invalid QR code format: no StudentID found in JSON data.")]
    MalformedPayload,

    #[error("Student with ID \"{0}\" not found in the roster.")]
    StudentNotFound(String),

    #[error("Seminar \"{0}\" not found.")]
    SeminarNotFound(String),

    #[error("Seminar \"{title}\" is not active. Please activate it first.")]
    SeminarNotActive { seminar_id: String, title: String },

    #[error("No active seminars found.")]
    NoActiveSeminar,

    #[error("Multiple active seminars found ({0}). Please select a specific seminar.")]
    AmbiguousActiveSeminar(usize),

    #[error("Error marking attendance: {0}")]
    Storage(#[from] StoreError),
}

impl ScanError {
    pub fn kind(&self) -> FeedbackKind {
        match self {
            ScanError::EmptyPayload => FeedbackKind::EmptyPayload,
            ScanError::MalformedPayload => FeedbackKind::MalformedPayload,
            ScanError::StudentNotFound(_) => FeedbackKind::StudentNotFound,
            ScanError::SeminarNotFound(_) => FeedbackKind::SeminarNotFound,
            ScanError::SeminarNotActive { .. } => FeedbackKind::SeminarNotActive,
            ScanError::NoActiveSeminar => FeedbackKind::NoActiveSeminar,
            ScanError::AmbiguousActiveSeminar(_) => FeedbackKind::AmbiguousActiveSeminar,
            ScanError::Storage(_) => FeedbackKind::StorageError,
        }
    }
}

/// A recorded attendance together with who and where.
#[derive(Debug, Clone)]
pub struct Mark {
    pub student: Student,
    pub seminar: Seminar,
    pub marked_at: DateTime<Utc>,
    /// Attendance rows for the seminar after this scan.
    pub total: i64,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Marked(Mark),
    /// The pair was already recorded; carries the original timestamp.
    AlreadyMarked(Mark),
}

impl Outcome {
    pub fn mark(&self) -> &Mark {
        match self {
            Outcome::Marked(mark) | Outcome::AlreadyMarked(mark) => mark,
        }
    }
}

pub async fn mark_attendance(
    store: &dyn Store,
    payload: &str,
    seminar: Option<&str>,
) -> Result<Outcome, ScanError> {
    let student_id = resolve_identifier(payload)?;
    let student = store
        .find_student(&student_id)
        .await?
        .ok_or(ScanError::StudentNotFound(student_id))?;
    let seminar = select_seminar(store, seminar).await?;

    if let Some(existing) = store.find_attendance(student.id, seminar.id).await? {
        return already_marked(store, student, seminar, existing).await;
    }

    match store.insert_attendance(student.id, seminar.id).await {
        Ok(created) => {
            let total = store.count_attendance(seminar.id).await?;
            Ok(Outcome::Marked(Mark {
                student,
                seminar,
                marked_at: created.marked_at,
                total,
            }))
        }
        Err(StoreError::Conflict(reason)) => {
            // a concurrent scan of the same pair won the insert
            let existing = store
                .find_attendance(student.id, seminar.id)
                .await?
                .ok_or(StoreError::Conflict(reason))?;
            already_marked(store, student, seminar, existing).await
        }
        Err(err) => Err(err.into()),
    }
}

async fn already_marked(
    store: &dyn Store,
    student: Student,
    seminar: Seminar,
    existing: Attendance,
) -> Result<Outcome, ScanError> {
    let total = store.count_attendance(seminar.id).await?;
    Ok(Outcome::AlreadyMarked(Mark {
        student,
        seminar,
        marked_at: existing.marked_at,
        total,
    }))
}

/// Runs one scan to completion and logs it. `seminar` is the seminar the
/// scan was started from, if any.
pub async fn scan(
    store: &dyn Store,
    payload: &str,
    seminar: Option<&str>,
    offset: FixedOffset,
) -> Feedback {
    let result = mark_attendance(store, payload, seminar).await;
    match &result {
        Ok(Outcome::Marked(mark)) => log::info!(
            "marked {} for {} ({} present)",
            mark.student.student_id,
            mark.seminar.seminar_id,
            mark.total
        ),
        Ok(Outcome::AlreadyMarked(mark)) => log::warn!(
            "{} already marked for {} at {}",
            mark.student.student_id,
            mark.seminar.seminar_id,
            mark.marked_at
        ),
        Err(ScanError::Storage(err)) => log::error!("scan failed: {}", err),
        Err(err) => log::warn!("scan rejected ({:?}): {}", err.kind(), err),
    }
    Feedback::new(result, seminar, offset)
}
