use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    Json,
};

use crate::mentor::{FlowError, Mentor};
use crate::models::*;
use crate::photo::{DecodeError, PhotoFormat};
use crate::store::JournalError;

const DASHBOARD_HTML: &str = include_str!("../dashboard.html");

// ============================================================
// Error Handling
// ============================================================

/// Map a flow error to a status the page can show inline.
///
/// Everything here is the user's to see: decode problems, out-of-order
/// actions and model failures all carry a readable message.
fn flow_error(e: FlowError) -> (StatusCode, String) {
    let status = match &e {
        FlowError::Decode(DecodeError::Unsupported(_)) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        FlowError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FlowError::NoPhoto | FlowError::Busy => StatusCode::CONFLICT,
        FlowError::Generation(_) => StatusCode::BAD_GATEWAY,
    };
    tracing::warn!(status = status.as_u16(), "Flow error: {}", e);
    (status, e.to_string())
}

/// Log an internal error and return a sanitized response to the client.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn halted_page(message: &str) -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>My Photography Journey</title></head>\
         <body><div role=\"alert\" style=\"font-family:sans-serif;color:#b00020;padding:2rem\">❌ {}</div></body></html>",
        escape_html(message)
    )
}

// ============================================================
// Page
// ============================================================

pub async fn index() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn dashboard(State(mentor): State<Mentor>) -> Json<DashboardView> {
    Json(mentor.dashboard().await)
}

pub async fn get_challenge(State(mentor): State<Mentor>) -> Json<Challenge> {
    Json(mentor.challenge())
}

pub async fn list_models(State(mentor): State<Mentor>) -> Json<Vec<String>> {
    Json(mentor.models().await)
}

// ============================================================
// Photo and review
// ============================================================

/// Pick the decoder from `Content-Type`, or from the bytes when the client
/// sent none (or a generic one).
fn upload_format(headers: &HeaderMap, body: &[u8]) -> Result<PhotoFormat, (StatusCode, String)> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|ct| !ct.starts_with("application/octet-stream"));

    match content_type {
        Some(ct) => PhotoFormat::from_mime(ct).map_err(|e| flow_error(e.into())),
        None => PhotoFormat::sniff(body).ok_or_else(|| {
            flow_error(DecodeError::Unsupported("unknown".to_string()).into())
        }),
    }
}

pub async fn upload_photo(
    State(mentor): State<Mentor>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<PhotoView>), (StatusCode, String)> {
    let format = upload_format(&headers, &body)?;
    mentor
        .upload(&body, format)
        .map(|view| (StatusCode::CREATED, Json(view)))
        .map_err(flow_error)
}

pub async fn reset_photo(State(mentor): State<Mentor>) -> Result<StatusCode, (StatusCode, String)> {
    mentor
        .reset()
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(flow_error)
}

pub async fn choose_mode(
    State(mentor): State<Mentor>,
    Json(input): Json<ModeInput>,
) -> Result<Json<ModeView>, (StatusCode, String)> {
    mentor
        .choose_mode(input.challenge)
        .map(Json)
        .map_err(flow_error)
}

pub async fn review(
    State(mentor): State<Mentor>,
    body: Bytes,
) -> Result<Json<Review>, (StatusCode, String)> {
    // The body is optional; an empty submit asks the default model.
    let input: ReviewInput = if body.is_empty() {
        ReviewInput::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    };
    mentor
        .review(input.model)
        .await
        .map(Json)
        .map_err(flow_error)
}

// ============================================================
// History
// ============================================================

pub async fn get_history(State(mentor): State<Mentor>) -> Json<History> {
    Json(mentor.history())
}

pub async fn get_calendar(State(mentor): State<Mentor>) -> Json<Calendar> {
    Json(mentor.calendar())
}

// ============================================================
// Journal
// ============================================================

pub async fn get_journal(State(mentor): State<Mentor>) -> Result<String, (StatusCode, String)> {
    mentor
        .journal()
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "Journal is empty".to_string()))
}

pub async fn add_journal_note(
    State(mentor): State<Mentor>,
    Json(input): Json<JournalInput>,
) -> Result<StatusCode, (StatusCode, String)> {
    match mentor.save_note(&input.text) {
        Ok(()) => Ok(StatusCode::CREATED),
        Err(JournalError::Empty) => {
            tracing::warn!("Rejected empty journal note");
            Err((StatusCode::BAD_REQUEST, JournalError::Empty.to_string()))
        }
        Err(e) => Err(internal_error(e)),
    }
}
