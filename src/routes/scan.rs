//! Scan entry points. Both the interactive form flow and the XHR flow end in
//! [`attendance::scan`]; only the rendering of its [`Feedback`] differs.

use std::sync::Arc;

use axum::extract::{Form, Path, Query};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::attendance::{self, Feedback, ScanError};
use crate::models::Seminar;
use crate::state::AppState;
use crate::{breaks, proceeds, Error, Payload};

const ACTIVE_SEMINAR_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanForm {
    /// Typed in by an operator; wins over `qr_data` when both are sent.
    pub manual_student_id: Option<String>,
    /// Raw text decoded from the camera.
    pub qr_data: Option<String>,
}

impl ScanForm {
    fn payload(&self) -> &str {
        self.manual_student_id
            .as_deref()
            .or(self.qr_data.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Flash {
    pub severity: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanContext {
    pub seminar: Option<Seminar>,
    pub active_seminars: Vec<Seminar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<Flash>,
}

fn wants_json(headers: &HeaderMap) -> bool {
    let xhr = headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.eq_ignore_ascii_case("XMLHttpRequest"));
    let accepts_json = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.contains("application/json"));
    xhr || accepts_json
}

fn respond(feedback: Feedback, headers: &HeaderMap) -> Response {
    if wants_json(headers) {
        (feedback.status(), Json(feedback)).into_response()
    } else {
        Redirect::to(&feedback.location()).into_response()
    }
}

/// `form` is `None` when the body is not a urlencoded form.
async fn submit(
    state: &AppState,
    seminar_id: Option<&str>,
    headers: &HeaderMap,
    form: Option<Form<ScanForm>>,
) -> Response {
    let offset = state.config.display_offset;
    let feedback = match form {
        Some(Form(form)) => {
            attendance::scan(state.store.as_ref(), form.payload(), seminar_id, offset).await
        }
        None => {
            log::warn!("scan body is not a form submission");
            Feedback::new(Err(ScanError::MalformedPayload), seminar_id, offset)
        }
    };
    respond(feedback, headers)
}

pub async fn submit_scan(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    form: Option<Form<ScanForm>>,
) -> Response {
    submit(&state, None, &headers, form).await
}

pub async fn submit_seminar_scan(
    Extension(state): Extension<Arc<AppState>>,
    Path(seminar_id): Path<String>,
    headers: HeaderMap,
    form: Option<Form<ScanForm>>,
) -> Response {
    submit(&state, Some(seminar_id.as_str()), &headers, form).await
}

fn flash(query: Flash) -> Option<Flash> {
    (query.message.is_some()).then(|| query)
}

pub async fn scan_page(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<Flash>,
) -> Payload<ScanContext> {
    let mut active_seminars = state.store.active_seminars().await?;
    active_seminars.truncate(ACTIVE_SEMINAR_LIMIT);
    proceeds(ScanContext {
        seminar: None,
        active_seminars,
        flash: flash(query),
    })
}

pub async fn seminar_scan_page(
    Extension(state): Extension<Arc<AppState>>,
    Path(seminar_id): Path<String>,
    Query(query): Query<Flash>,
) -> Payload<ScanContext> {
    let seminar = match state.store.find_seminar(&seminar_id).await? {
        Some(seminar) => seminar,
        None => {
            return breaks(Error::SeminarDoesNotExist {
                message: format!("Seminar `{}` not found.", seminar_id),
            })
        }
    };
    if !seminar.is_active() {
        return breaks(Error::SeminarNotActive {
            message: format!(
                "Seminar \"{}\" is not active. Please activate it first.",
                seminar.title
            ),
        });
    }

    proceeds(ScanContext {
        seminar: Some(seminar),
        active_seminars: Vec::new(),
        flash: flash(query),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn manual_entry_wins_over_camera() {
        let form = ScanForm {
            manual_student_id: Some("sbu000001".into()),
            qr_data: Some(r#"{"StudentID":"SBU000002"}"#.into()),
        };
        assert_eq!(form.payload(), "sbu000001");
        assert_eq!(ScanForm::default().payload(), "");
    }

    #[test]
    fn json_mode_detection() {
        let mut headers = HeaderMap::new();
        assert!(!wants_json(&headers));

        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        assert!(wants_json(&headers));

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json, */*"));
        assert!(wants_json(&headers));
    }
}
