//! Note HTTP handlers.
//!
//! Provides REST endpoints under `/notes` for note CRUD, archiving, and
//! managing which categories a note is filed under.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::{ApiError, AppState};
use noteapp_core::{ArchiveFilter, Note, NoteRequest};

async fn list_with_filter(
    state: &AppState,
    filter: ArchiveFilter,
) -> Result<Json<Vec<Note>>, ApiError> {
    let notes = state.notes.list(filter).await?;
    Ok(Json(notes))
}

/// List every note, newest first.
pub async fn list_notes(State(state): State<AppState>) -> Result<Json<Vec<Note>>, ApiError> {
    list_with_filter(&state, ArchiveFilter::All).await
}

/// List notes that are not archived.
pub async fn list_active_notes(
    State(state): State<AppState>,
) -> Result<Json<Vec<Note>>, ApiError> {
    list_with_filter(&state, ArchiveFilter::Active).await
}

/// List archived notes.
pub async fn list_archived_notes(
    State(state): State<AppState>,
) -> Result<Json<Vec<Note>>, ApiError> {
    list_with_filter(&state, ArchiveFilter::Archived).await
}

/// Get a note with its categories.
///
/// # Returns
/// - 200 OK with the note
/// - 404 Not Found if the note doesn't exist
pub async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Note>, ApiError> {
    let note = state.notes.fetch(id).await?;
    Ok(Json(note))
}

/// Create a note, optionally filed under existing categories.
///
/// # Request Body
/// `{ "title", "content", "archived", "categoryIds" }`, every field optional
///
/// # Returns
/// - 201 Created with the stored note
/// - 404 Not Found if any category id is unknown (nothing is stored)
pub async fn create_note(
    State(state): State<AppState>,
    Json(req): Json<NoteRequest>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let note = state.notes.insert(req).await?;
    info!(
        subsystem = "api",
        component = "notes",
        op = "create",
        note_id = %note.id,
        "Note created"
    );
    Ok((StatusCode::CREATED, Json(note)))
}

/// Replace a note's title, content, archived flag and category set.
///
/// # Returns
/// - 200 OK with the updated note
/// - 404 Not Found if the note or any category doesn't exist
pub async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<NoteRequest>,
) -> Result<Json<Note>, ApiError> {
    let note = state.notes.update(id, req).await?;
    Ok(Json(note))
}

/// Delete a note. Its categories are kept.
///
/// # Returns
/// - 204 No Content on success
/// - 404 Not Found if the note doesn't exist
pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.notes.delete(id).await?;
    info!(
        subsystem = "api",
        component = "notes",
        op = "delete",
        note_id = %id,
        "Note deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Archive a note.
pub async fn archive_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.notes.archive(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move an archived note back to the active list.
pub async fn unarchive_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.notes.unarchive(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// File a note under a category.
///
/// # Returns
/// - 200 OK with the updated note (unchanged if already filed there)
/// - 404 Not Found if the note or category doesn't exist
pub async fn add_category_to_note(
    State(state): State<AppState>,
    Path((id, category_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Note>, ApiError> {
    let note = state.notes.add_category(id, category_id).await?;
    Ok(Json(note))
}

/// Remove a note from a category.
///
/// # Returns
/// - 200 OK with the updated note (unchanged if it wasn't filed there)
/// - 404 Not Found if the note or category doesn't exist
pub async fn remove_category_from_note(
    State(state): State<AppState>,
    Path((id, category_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Note>, ApiError> {
    let note = state.notes.remove_category(id, category_id).await?;
    Ok(Json(note))
}

async fn list_by_category_with_filter(
    state: &AppState,
    category_id: Uuid,
    filter: ArchiveFilter,
) -> Result<Json<Vec<Note>>, ApiError> {
    let notes = state.notes.list_by_category(category_id, filter).await?;
    Ok(Json(notes))
}

/// List the notes filed under a category.
///
/// # Returns
/// - 200 OK with the notes, newest first
/// - 404 Not Found if the category doesn't exist
pub async fn list_notes_by_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<Json<Vec<Note>>, ApiError> {
    list_by_category_with_filter(&state, category_id, ArchiveFilter::All).await
}

/// List the active notes filed under a category.
pub async fn list_active_notes_by_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<Json<Vec<Note>>, ApiError> {
    list_by_category_with_filter(&state, category_id, ArchiveFilter::Active).await
}

/// List the archived notes filed under a category.
pub async fn list_archived_notes_by_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<Json<Vec<Note>>, ApiError> {
    list_by_category_with_filter(&state, category_id, ArchiveFilter::Archived).await
}
