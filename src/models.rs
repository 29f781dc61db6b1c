use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Column widths, in characters, as declared in the migrations.
pub const NAME_MAX_LEN: usize = 100;
pub const EMAIL_MAX_LEN: usize = 254;
pub const PHONE_MAX_LEN: usize = 15;
pub const COURSE_MAX_LEN: usize = 50;
pub const SEMINAR_ID_MAX_LEN: usize = 50;
pub const TITLE_MAX_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Student {
    #[serde(skip)]
    pub id: i64,
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub course: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub course: String,
}

/// Whether a roster upsert inserted a new student or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Created,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "seminar_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SeminarStatus {
    Inactive,
    Active,
    Ended,
}

impl SeminarStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeminarStatus::Inactive => "inactive",
            SeminarStatus::Active => "active",
            SeminarStatus::Ended => "ended",
        }
    }
}

impl Default for SeminarStatus {
    fn default() -> Self {
        SeminarStatus::Inactive
    }
}

impl fmt::Display for SeminarStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeminarStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inactive" => Ok(SeminarStatus::Inactive),
            "active" => Ok(SeminarStatus::Active),
            "ended" => Ok(SeminarStatus::Ended),
            other => Err(format!("`{}` is not one of inactive, active, ended", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Seminar {
    #[serde(skip)]
    pub id: i64,
    pub seminar_id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SeminarStatus,
    pub created_at: DateTime<Utc>,
}

impl Seminar {
    pub fn is_active(&self) -> bool {
        self.status == SeminarStatus::Active
    }
}

/// Seminar codes end up in URLs, so they are limited to ASCII letters,
/// digits, `-` and `_`.
pub fn is_valid_seminar_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= SEMINAR_ID_MAX_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSeminar {
    pub seminar_id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub status: SeminarStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Attendance {
    pub id: i64,
    pub student: i64,
    pub seminar: i64,
    pub marked_at: DateTime<Utc>,
}

/// One attendance record joined with its student, as listed in exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct AttendanceRow {
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub course: String,
    pub marked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Totals {
    pub students: i64,
    pub seminars: i64,
    pub attendance: i64,
}
