//! noteapp-api - HTTP API for notes and categories
//!
//! The router is built over trait objects so the same routes serve the
//! PostgreSQL repositories in production and the in-memory store in tests.

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use noteapp_core::{CategoryRepository, NoteRepository};
use noteapp_db::Database;

pub use config::ServerConfig;
pub use error::ApiError;

use handlers::{categories, health, notes};

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub notes: Arc<dyn NoteRepository>,
    pub categories: Arc<dyn CategoryRepository>,
}

impl AppState {
    pub fn new(notes: Arc<dyn NoteRepository>, categories: Arc<dyn CategoryRepository>) -> Self {
        Self { notes, categories }
    }

    /// State backed by the PostgreSQL repositories.
    pub fn from_database(db: Database) -> Self {
        Self::new(Arc::new(db.notes), Arc::new(db.categories))
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the application router with request tracing, request ids and CORS.
pub fn router(state: AppState, allowed_origins: Vec<HeaderValue>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        // Notes
        .route("/notes", get(notes::list_notes).post(notes::create_note))
        .route("/notes/active", get(notes::list_active_notes))
        .route("/notes/archived", get(notes::list_archived_notes))
        .route(
            "/notes/:id",
            get(notes::get_note)
                .put(notes::update_note)
                .delete(notes::delete_note),
        )
        .route("/notes/:id/archive", patch(notes::archive_note))
        .route("/notes/:id/unarchive", patch(notes::unarchive_note))
        .route(
            "/notes/:id/categories/:category_id",
            post(notes::add_category_to_note).delete(notes::remove_category_from_note),
        )
        .route(
            "/notes/category/:category_id",
            get(notes::list_notes_by_category),
        )
        .route(
            "/notes/category/:category_id/active",
            get(notes::list_active_notes_by_category),
        )
        .route(
            "/notes/category/:category_id/archived",
            get(notes::list_archived_notes_by_category),
        )
        // Categories
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/name/:name",
            get(categories::get_category_by_name),
        )
        .route(
            "/categories/:id",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .max_age(Duration::from_secs(3600)),
        )
        .with_state(state)
}
