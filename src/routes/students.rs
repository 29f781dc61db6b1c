use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query};
use axum::Extension;
use serde::{Deserialize, Serialize};

use crate::models::Student;
use crate::roster::{import_roster, RosterReport};
use crate::state::AppState;
use crate::{breaks, proceeds, Error, Payload};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentSearch {
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentList {
    pub students: Vec<Student>,
    pub search_query: String,
    pub total_count: i64,
    pub filtered_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RosterUploaded {
    pub message: String,
    #[serde(flatten)]
    pub report: RosterReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentDeleted {
    pub student_id: String,
}

pub async fn list_students(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<StudentSearch>,
) -> Payload<StudentList> {
    let search_query = query.search.trim().to_string();
    let filter = (!search_query.is_empty()).then(|| search_query.as_str());
    let students = state.store.list_students(filter).await?;
    let total_count = state.store.totals().await?.students;

    proceeds(StudentList {
        filtered_count: students.len(),
        students,
        search_query,
        total_count,
    })
}

/// Takes the CSV file itself as the request body.
pub async fn upload_students(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> Payload<RosterUploaded> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return breaks(Error::invalid("Please upload a CSV file."));
    }

    let report = import_roster(state.store.as_ref(), body.as_ref(), &state.config.id_prefix).await?;
    proceeds(RosterUploaded {
        message: report.summary(),
        report,
    })
}

pub async fn delete_student(
    Extension(state): Extension<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Payload<StudentDeleted> {
    let student_id = student_id.trim().to_uppercase();
    if !state.store.delete_student(&student_id).await? {
        return breaks(Error::StudentDoesNotExist {
            message: format!("Student with ID `{}` does not exist!", student_id),
        });
    }
    log::info!("deleted student {} and their attendance", student_id);
    proceeds(StudentDeleted { student_id })
}
