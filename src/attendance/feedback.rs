use axum::http::StatusCode;
use chrono::{DateTime, FixedOffset, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

use super::{Mark, Outcome, ScanError};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Characters escaped when a seminar id is put back into a redirect path.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'/')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

/// What a scan came to. Serialized by variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeedbackKind {
    Marked,
    AlreadyMarked,
    EmptyPayload,
    MalformedPayload,
    StudentNotFound,
    SeminarNotFound,
    SeminarNotActive,
    NoActiveSeminar,
    AmbiguousActiveSeminar,
    StorageError,
}

impl FeedbackKind {
    pub fn status(self) -> StatusCode {
        match self {
            FeedbackKind::Marked | FeedbackKind::AlreadyMarked => StatusCode::OK,
            FeedbackKind::EmptyPayload | FeedbackKind::MalformedPayload => {
                StatusCode::BAD_REQUEST
            }
            FeedbackKind::StudentNotFound | FeedbackKind::SeminarNotFound => {
                StatusCode::NOT_FOUND
            }
            FeedbackKind::SeminarNotActive
            | FeedbackKind::NoActiveSeminar
            | FeedbackKind::AmbiguousActiveSeminar => StatusCode::CONFLICT,
            FeedbackKind::StorageError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Student and seminar identity attached to a mark, flattened for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkDetails {
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub course: String,
    pub seminar_id: String,
    pub seminar_title: String,
    pub timestamp: String,
    pub total_count: i64,
}

impl MarkDetails {
    fn new(mark: &Mark, offset: FixedOffset) -> Self {
        Self {
            student_id: mark.student.student_id.clone(),
            name: mark.student.name.clone(),
            email: mark.student.email.clone(),
            phone: mark
                .student
                .phone
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
            course: mark.student.course.clone(),
            seminar_id: mark.seminar.seminar_id.clone(),
            seminar_title: mark.seminar.title.clone(),
            timestamp: format_timestamp(mark.marked_at, offset),
            total_count: mark.total,
        }
    }
}

/// The one result of a scan. Redirect and JSON responses are both rendered
/// from this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub severity: Severity,
    pub kind: FeedbackKind,
    pub message: String,
    /// Where an interactive caller continues.
    pub redirect: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<MarkDetails>,
}

#[derive(Debug, Serialize)]
struct Flash<'a> {
    severity: Severity,
    message: &'a str,
}

pub fn format_timestamp(ts: DateTime<Utc>, offset: FixedOffset) -> String {
    ts.with_timezone(&offset).format(TIMESTAMP_FORMAT).to_string()
}

fn scan_page(seminar: Option<&str>) -> String {
    match seminar {
        Some(seminar_id) => format!("/scan/{}", utf8_percent_encode(seminar_id, PATH_SEGMENT)),
        None => "/scan".to_string(),
    }
}

impl Feedback {
    pub fn new(
        result: Result<Outcome, ScanError>,
        seminar: Option<&str>,
        offset: FixedOffset,
    ) -> Self {
        let back = scan_page(seminar);
        match result {
            Ok(Outcome::Marked(mark)) => {
                let details = MarkDetails::new(&mark, offset);
                Self {
                    severity: Severity::Success,
                    kind: FeedbackKind::Marked,
                    message: format!(
                        "Attendance marked for {} ({}) at {} ({}) on {}. Total attendance: {}.",
                        details.name,
                        details.student_id,
                        details.seminar_title,
                        details.seminar_id,
                        details.timestamp,
                        details.total_count
                    ),
                    redirect: back,
                    details: Some(details),
                }
            }
            Ok(Outcome::AlreadyMarked(mark)) => {
                let details = MarkDetails::new(&mark, offset);
                Self {
                    severity: Severity::Warning,
                    kind: FeedbackKind::AlreadyMarked,
                    message: format!(
                        "Attendance already marked for {} ({}) at {}. Previously marked at {}.",
                        details.name, details.student_id, details.seminar_title, details.timestamp
                    ),
                    redirect: back,
                    details: Some(details),
                }
            }
            Err(err) => {
                let severity = match err {
                    ScanError::SeminarNotActive { .. } | ScanError::AmbiguousActiveSeminar(_) => {
                        Severity::Warning
                    }
                    _ => Severity::Error,
                };
                let redirect = match err {
                    ScanError::NoActiveSeminar
                    | ScanError::SeminarNotFound(_)
                    | ScanError::SeminarNotActive { .. } => "/seminars".to_string(),
                    ScanError::AmbiguousActiveSeminar(_) => "/scan".to_string(),
                    _ => back,
                };
                Self {
                    severity,
                    kind: err.kind(),
                    message: err.to_string(),
                    redirect,
                    details: None,
                }
            }
        }
    }

    /// HTTP status for machine-readable callers.
    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    /// Redirect target for interactive callers, flash message in the query.
    pub fn location(&self) -> String {
        let flash = Flash {
            severity: self.severity,
            message: &self.message,
        };
        match serde_urlencoded::to_string(&flash) {
            Ok(query) => format!("{}?{}", self.redirect, query),
            Err(_) => self.redirect.clone(),
        }
    }
}
