use chrono::{DateTime, FixedOffset, Utc};

use crate::models::{AttendanceRow, Seminar};

pub const HEADER: [&str; 8] = [
    "Serial No.",
    "Student ID",
    "Student Name",
    "Email",
    "Phone",
    "Course",
    "Attendance Date",
    "Attendance Time",
];

/// Writes one line per record in the order given, date and time split into
/// their own columns in the display offset.
pub fn attendance_csv(rows: &[AttendanceRow], offset: FixedOffset) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;

    for (idx, row) in rows.iter().enumerate() {
        let local = row.marked_at.with_timezone(&offset);
        writer.write_record([
            (idx + 1).to_string(),
            row.student_id.clone(),
            row.name.clone(),
            row.email.clone(),
            row.phone.clone().unwrap_or_else(|| "N/A".to_string()),
            row.course.clone(),
            local.format("%Y-%m-%d").to_string(),
            local.format("%H:%M:%S").to_string(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}

pub fn export_filename(seminar: &Seminar, now: DateTime<Utc>, offset: FixedOffset) -> String {
    let safe_title: String = seminar
        .title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    format!(
        "attendance_{}_{}_{}.csv",
        seminar.seminar_id,
        safe_title.trim_end(),
        now.with_timezone(&offset).format("%Y%m%d_%H%M")
    )
}
