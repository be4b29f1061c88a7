//! services/api/src/web/notes.rs
//!
//! Handlers for course discussion notes and replies.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use educare_core::domain::{Caller, NewNote, NotePatch};
use educare_core::notes;
use std::sync::Arc;

use crate::web::dto::{AddNoteRequest, ApiResponse, NoteResponse, UpdateNoteRequest};
use crate::web::rest::{failure, port_error, ApiFailure};
use crate::web::state::AppState;

/// Post a note, or a reply when `parent_note_id` is set.
#[utoipa::path(
    post,
    path = "/api/notes",
    request_body = AddNoteRequest,
    responses(
        (status = 201, description = "Note created", body = ApiResponse<NoteResponse>),
        (status = 400, description = "Empty content"),
        (status = 404, description = "Course or parent note not found")
    )
)]
pub async fn add_note_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<AddNoteRequest>,
) -> Result<impl IntoResponse, ApiFailure> {
    if req.content.trim().is_empty() {
        return Err(failure(StatusCode::BAD_REQUEST, "Note content is required"));
    }
    let note = NewNote {
        course_id: req.course_id,
        parent_id: req.parent_note_id,
        title: req.title,
        content: req.content,
    };
    let thread = notes::add_note(state.db.as_ref(), &caller, note)
        .await
        .map_err(|e| port_error("add note", e))?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Note added", NoteResponse::from(thread))),
    ))
}

/// List the top-level notes of a course with their direct replies.
#[utoipa::path(
    get,
    path = "/api/notes/course/{course_id}",
    params(("course_id" = i64, Path, description = "Course id")),
    responses((status = 200, description = "Note threads, oldest first", body = ApiResponse<Vec<NoteResponse>>))
)]
pub async fn list_course_notes_handler(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<NoteResponse>>>, ApiFailure> {
    let threads = notes::list_top_level_notes(state.db.as_ref(), course_id)
        .await
        .map_err(|e| port_error("list notes", e))?;
    Ok(Json(ApiResponse::ok(
        "Notes fetched",
        threads.into_iter().map(NoteResponse::from).collect(),
    )))
}

/// Fetch a note with its direct replies.
#[utoipa::path(
    get,
    path = "/api/notes/{note_id}",
    params(("note_id" = i64, Path, description = "Note id")),
    responses(
        (status = 200, description = "Note", body = ApiResponse<NoteResponse>),
        (status = 404, description = "Note not found")
    )
)]
pub async fn get_note_handler(
    State(state): State<Arc<AppState>>,
    Path(note_id): Path<i64>,
) -> Result<Json<ApiResponse<NoteResponse>>, ApiFailure> {
    let thread = notes::get_note(state.db.as_ref(), note_id)
        .await
        .map_err(|e| port_error("load note", e))?;
    Ok(Json(ApiResponse::ok("Note found", thread.into())))
}

/// Edit a note. Only its author may do so; absent fields are left unchanged.
#[utoipa::path(
    put,
    path = "/api/notes/{note_id}",
    request_body = UpdateNoteRequest,
    params(("note_id" = i64, Path, description = "Note id")),
    responses(
        (status = 200, description = "Note updated", body = ApiResponse<NoteResponse>),
        (status = 403, description = "Caller is not the author"),
        (status = 404, description = "Note not found")
    )
)]
pub async fn update_note_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(note_id): Path<i64>,
    Json(req): Json<UpdateNoteRequest>,
) -> Result<Json<ApiResponse<NoteResponse>>, ApiFailure> {
    let patch = NotePatch {
        title: req.title,
        content: req.content,
    };
    let thread = notes::update_note(state.db.as_ref(), &caller, note_id, patch)
        .await
        .map_err(|e| port_error("update note", e))?;
    Ok(Json(ApiResponse::ok("Note updated", thread.into())))
}
