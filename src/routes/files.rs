use std::sync::Arc;

use axum::extract::Path;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use chrono::Utc;
use serde::Serialize;

use crate::export::{attendance_csv, export_filename};
use crate::io::{prepare_io, write_io_file};
use crate::qr;
use crate::state::AppState;
use crate::{breaks, proceeds, Error, Payload};

#[derive(Debug, Clone, Serialize)]
pub struct Regenerated {
    pub message: String,
    pub written: usize,
    pub failed: usize,
    pub directory: String,
}

fn attachment(content_type: &str, filename: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}

pub async fn export_without_seminar() -> Error {
    Error::invalid("Seminar ID is required for attendance export.")
}

pub async fn export_attendance(
    Extension(state): Extension<Arc<AppState>>,
    Path(seminar_id): Path<String>,
) -> Result<Response, Error> {
    let seminar = state
        .store
        .find_seminar(&seminar_id)
        .await?
        .ok_or_else(|| Error::SeminarDoesNotExist {
            message: format!("Seminar `{}` does not exist!", seminar_id),
        })?;

    let rows = state.store.seminar_attendance(seminar.id).await?;
    if rows.is_empty() {
        return Err(Error::NoAttendanceRecords {
            message: format!(
                "No attendance records found for seminar \"{}\".",
                seminar.title
            ),
        });
    }

    let offset = state.config.display_offset;
    let csv = attendance_csv(&rows, offset)?;
    log::info!(
        "exported {} attendance records for {}",
        rows.len(),
        seminar.seminar_id
    );
    Ok(attachment(
        "text/csv; charset=utf-8",
        &export_filename(&seminar, Utc::now(), offset),
        csv,
    ))
}

pub async fn download_qr_code(
    Extension(state): Extension<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<Response, Error> {
    let student_id = student_id.trim().to_uppercase();
    let student = state
        .store
        .find_student(&student_id)
        .await?
        .ok_or_else(|| Error::StudentDoesNotExist {
            message: format!("Student with ID `{}` does not exist!", student_id),
        })?;

    let png = qr::render_png(&student)?;
    Ok(attachment(
        "image/png",
        &qr::file_name(&student.student_id),
        png,
    ))
}

pub async fn download_all_qr_codes(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Response, Error> {
    let students = state.store.list_students(None).await?;
    if students.is_empty() {
        return Err(Error::NotFound {
            message: "No students found.".to_string(),
        });
    }

    let bundle = qr::bundle(&students)?;
    if bundle.written == 0 {
        return Err(Error::InternalError {
            kind: "QrError",
            message: "Failed to generate any QR codes.".to_string(),
        });
    }

    let filename = format!(
        "qr_codes_{}.zip",
        Utc::now()
            .with_timezone(&state.config.display_offset)
            .format("%Y%m%d_%H%M%S")
    );
    Ok(attachment("application/zip", &filename, bundle.zip))
}

pub async fn regenerate_qr_codes(
    Extension(state): Extension<Arc<AppState>>,
) -> Payload<Regenerated> {
    let students = state.store.list_students(None).await?;
    if students.is_empty() {
        return breaks(Error::NotFound {
            message: "No students found. Please upload students first.".to_string(),
        });
    }

    let qr_dir = prepare_io(&state.config.media_dir).await?;
    let mut written = 0;
    let mut failed = 0;
    for student in &students {
        let target = qr_dir.join(qr::file_name(&student.student_id));
        let result = match qr::render_png(student) {
            Ok(png) => write_io_file(&target, &png).await.map_err(qr::QrError::from),
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => written += 1,
            Err(err) => {
                log::warn!("could not regenerate QR for {}: {}", student.student_id, err);
                failed += 1;
            }
        }
    }

    proceeds(Regenerated {
        message: format!(
            "Generated {} QR codes, {} failed.",
            written, failed
        ),
        written,
        failed,
        directory: qr_dir.display().to_string(),
    })
}
