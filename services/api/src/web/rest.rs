//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification, and the translation of
//! core errors into HTTP responses shared by every REST handler.

use crate::web::dto::ApiResponse;
use crate::web::{auth, courses, dto, enrollments, notes};
use axum::{http::StatusCode, Json};
use educare_core::ports::PortError;
use tracing::{error, warn};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        courses::add_course_handler,
        courses::list_courses_handler,
        courses::list_my_courses_handler,
        courses::update_course_handler,
        courses::list_contents_handler,
        courses::add_content_handler,
        courses::update_content_handler,
        courses::get_content_handler,
        courses::upload_handler,
        courses::list_published_courses_handler,
        courses::get_published_course_handler,
        courses::get_student_content_handler,
        enrollments::grant_free_access_handler,
        enrollments::revoke_free_access_handler,
        enrollments::get_enrollment_handler,
        enrollments::list_course_enrollments_handler,
        notes::add_note_handler,
        notes::list_course_notes_handler,
        notes::get_note_handler,
        notes::update_note_handler,
    ),
    components(
        schemas(
            dto::ApiResponse<dto::UserResponse>,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            dto::RoleDto,
            dto::FileTypeDto,
            dto::UserResponse,
            dto::AddCourseRequest,
            dto::UpdateCourseRequest,
            dto::CourseResponse,
            dto::AddContentRequest,
            dto::UpdateContentRequest,
            dto::ContentResponse,
            dto::UploadResponse,
            dto::FreeEnrollmentRequest,
            dto::EnrollmentResponse,
            dto::AddNoteRequest,
            dto::UpdateNoteRequest,
            dto::NoteResponse,
            dto::ReplyResponse,
        )
    ),
    tags(
        (name = "Educare API", description = "Courses, content access, enrollments and course notes.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Translation
//=========================================================================================

/// Error half of every handler result.
pub type ApiFailure = (StatusCode, Json<ApiResponse<()>>);

pub fn failure(status: StatusCode, message: impl Into<String>) -> ApiFailure {
    (status, Json(ApiResponse::error(message)))
}

/// Maps a core failure to a status code and a user-facing message.
///
/// `action` names what the handler was doing, e.g. "add content". Server-side
/// failures are logged here and replaced by a generic message.
pub fn port_error(action: &str, e: PortError) -> ApiFailure {
    match e {
        PortError::NotFound(msg) => failure(StatusCode::NOT_FOUND, msg),
        PortError::Forbidden(msg) => {
            warn!("Forbidden to {}: {}", action, msg);
            failure(StatusCode::FORBIDDEN, msg)
        }
        PortError::Conflict(msg) => failure(StatusCode::CONFLICT, msg),
        PortError::Validation(msg) => failure(StatusCode::BAD_REQUEST, msg),
        PortError::Unauthorized => failure(StatusCode::UNAUTHORIZED, "Unauthorized"),
        PortError::Unexpected(msg) => {
            error!("Failed to {}: {}", action, msg);
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to {}", action),
            )
        }
    }
}
