//! QR artifacts for students: the JSON payload a scanner reads back, the PNG
//! that carries it, and a ZIP of every student's PNG.

use std::io::{Cursor, Write};

use image::{DynamicImage, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::models::Student;

const MODULE_PIXELS: u32 = 10;

#[derive(Error, Debug)]
pub enum QrError {
    #[error("QR encoding failed: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("ZIP packaging failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Payload serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    #[serde(rename = "StudentID")]
    pub student_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Course")]
    pub course: String,
}

impl From<&Student> for QrPayload {
    fn from(student: &Student) -> Self {
        Self {
            student_id: student.student_id.clone(),
            name: student.name.clone(),
            email: student.email.clone(),
            course: student.course.clone(),
        }
    }
}

pub fn payload_json(student: &Student) -> Result<String, QrError> {
    Ok(serde_json::to_string(&QrPayload::from(student))?)
}

pub fn file_name(student_id: &str) -> String {
    format!("{}_qr.png", student_id)
}

/// Black on white, medium error correction, default four-module quiet zone.
pub fn render_png(student: &Student) -> Result<Vec<u8>, QrError> {
    let data = payload_json(student)?;
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)?;
    let image = code
        .render::<Luma<u8>>()
        .module_dimensions(MODULE_PIXELS, MODULE_PIXELS)
        .quiet_zone(true)
        .build();

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(image).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

#[derive(Debug)]
pub struct Bundle {
    pub zip: Vec<u8>,
    pub written: usize,
    pub failed: usize,
}

/// Packs every student's PNG. A student whose code cannot be rendered is
/// skipped and counted.
pub fn bundle(students: &[Student]) -> Result<Bundle, QrError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut written = 0;
    let mut failed = 0;

    for student in students {
        let png = match render_png(student) {
            Ok(png) => png,
            Err(err) => {
                log::warn!("skipping QR for {}: {}", student.student_id, err);
                failed += 1;
                continue;
            }
        };
        zip.start_file(file_name(&student.student_id), options)?;
        zip.write_all(&png)?;
        written += 1;
    }

    let zip = zip.finish()?.into_inner();
    Ok(Bundle {
        zip,
        written,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::resolve_identifier;

    fn student() -> Student {
        Student {
            id: 7,
            student_id: "SBU123456".into(),
            name: "Asha Rao".into(),
            email: "asha@example.edu".into(),
            phone: Some("+91 9000000001".into()),
            course: "MCA".into(),
        }
    }

    #[test]
    fn payload_resolves_back_to_student() {
        let json = payload_json(&student()).unwrap();
        assert!(json.contains(r#""StudentID":"SBU123456""#));
        assert_eq!(resolve_identifier(&json).unwrap(), "SBU123456");
    }

    #[test]
    fn png_has_signature() {
        let png = render_png(&student()).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn bundle_holds_one_entry_per_student() {
        let mut other = student();
        other.student_id = "SBU000002".into();
        let bundle = bundle(&[student(), other]).unwrap();
        assert_eq!(bundle.written, 2);
        assert_eq!(bundle.failed, 0);

        let archive = zip::ZipArchive::new(Cursor::new(bundle.zip)).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();
        assert_eq!(names, vec!["SBU000002_qr.png", "SBU123456_qr.png"]);
    }
}
