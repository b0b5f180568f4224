mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::Html,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::mentor::Mentor;

/// Largest accepted upload. Phone HEICs and full-size JPEGs fit easily.
pub const MAX_UPLOAD_BYTES: usize = 40 * 1024 * 1024;

pub fn create_router(mentor: Mentor) -> Router {
    let api = Router::new()
        // Page state
        .route("/dashboard", get(handlers::dashboard))
        .route("/challenge", get(handlers::get_challenge))
        .route("/models", get(handlers::list_models))
        // Photo and review flow
        .route(
            "/photo",
            post(handlers::upload_photo).delete(handlers::reset_photo),
        )
        .route("/mode", put(handlers::choose_mode))
        .route("/review", post(handlers::review))
        // History
        .route("/history", get(handlers::get_history))
        .route("/history/calendar", get(handlers::get_calendar))
        // Journal
        .route(
            "/journal",
            get(handlers::get_journal).post(handlers::add_journal_note),
        )
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .route("/", get(handlers::index))
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .with_state(mentor)
}

/// Router used when startup cannot continue (no API key). Every request gets
/// the same visible error and nothing else works.
pub fn create_halted_router(message: impl Into<String>) -> Router {
    let message = message.into();
    Router::new()
        .fallback(move || {
            let message = message.clone();
            async move {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Html(handlers::halted_page(&message)),
                )
            }
        })
        .layer(TraceLayer::new_for_http())
}
