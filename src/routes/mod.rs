use std::sync::Arc;

use axum::handler::Handler;
use axum::routing::{delete, get, post};
use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::err;
use crate::state::AppState;

pub mod dashboard;
pub mod files;
pub mod scan;
pub mod seminars;
pub mod students;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(dashboard::home))
        .route("/health", get(dashboard::health))
        .route("/students", get(students::list_students))
        .route("/upload", post(students::upload_students))
        .route("/students/:student_id", delete(students::delete_student))
        .route(
            "/seminars",
            get(seminars::list_seminars).post(seminars::create_seminar),
        )
        .route(
            "/seminars/:seminar_id/status",
            post(seminars::update_seminar_status),
        )
        .route("/scan", get(scan::scan_page).post(scan::submit_scan))
        .route(
            "/scan/:seminar_id",
            get(scan::seminar_scan_page).post(scan::submit_seminar_scan),
        )
        .route("/export", get(files::export_without_seminar))
        .route("/export/:seminar_id", get(files::export_attendance))
        .route("/generate-qr/:student_id", get(files::download_qr_code))
        .route("/download-all-qr", get(files::download_all_qr_codes))
        .route("/regenerate-qr", post(files::regenerate_qr_codes))
        .fallback(err::handler404.into_service())
        .layer(ServiceBuilder::new().layer(Extension(state)))
}
