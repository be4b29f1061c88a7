//! services/api/src/web/enrollments.rs
//!
//! Handlers for teacher-granted free access.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use educare_core::domain::Caller;
use educare_core::enrollment;
use std::sync::Arc;
use tracing::info;

use crate::web::dto::{ApiResponse, EnrollmentResponse, FreeEnrollmentRequest};
use crate::web::rest::{port_error, ApiFailure};
use crate::web::state::AppState;

/// Grant a student free access to one of the caller's courses.
#[utoipa::path(
    post,
    path = "/api/enrollments/free",
    request_body = FreeEnrollmentRequest,
    responses(
        (status = 201, description = "Access granted", body = ApiResponse<EnrollmentResponse>),
        (status = 403, description = "Caller is not the teacher of this course"),
        (status = 404, description = "Course or student not found"),
        (status = 409, description = "Student already enrolled")
    )
)]
pub async fn grant_free_access_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<FreeEnrollmentRequest>,
) -> Result<impl IntoResponse, ApiFailure> {
    let view = enrollment::grant_free_access(state.db.as_ref(), &caller, req.course_id, req.student_id)
        .await
        .map_err(|e| port_error("grant free access", e))?;
    info!(
        "Teacher {} granted student {} access to course {}",
        caller.user_id, view.student_id, view.course_id
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Free enrollment granted", EnrollmentResponse::from(view))),
    ))
}

/// Revoke a free enrollment. Only the granting teacher may revoke it.
#[utoipa::path(
    delete,
    path = "/api/enrollments/{enrollment_id}",
    params(("enrollment_id" = i64, Path, description = "Enrollment id")),
    responses(
        (status = 200, description = "Enrollment revoked"),
        (status = 403, description = "Caller did not grant this enrollment"),
        (status = 404, description = "Enrollment not found")
    )
)]
pub async fn revoke_free_access_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(enrollment_id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiFailure> {
    enrollment::revoke_free_access(state.db.as_ref(), &caller, enrollment_id)
        .await
        .map_err(|e| port_error("revoke enrollment", e))?;
    info!("Teacher {} revoked enrollment {}", caller.user_id, enrollment_id);
    Ok(Json(ApiResponse::done("Free enrollment revoked")))
}

/// Fetch an enrollment.
#[utoipa::path(
    get,
    path = "/api/enrollments/{enrollment_id}",
    params(("enrollment_id" = i64, Path, description = "Enrollment id")),
    responses(
        (status = 200, description = "Enrollment", body = ApiResponse<EnrollmentResponse>),
        (status = 404, description = "Enrollment not found")
    )
)]
pub async fn get_enrollment_handler(
    State(state): State<Arc<AppState>>,
    Path(enrollment_id): Path<i64>,
) -> Result<Json<ApiResponse<EnrollmentResponse>>, ApiFailure> {
    let view = enrollment::get_enrollment(state.db.as_ref(), enrollment_id)
        .await
        .map_err(|e| port_error("load enrollment", e))?;
    Ok(Json(ApiResponse::ok("Enrollment found", view.into())))
}

/// List the enrollments of a course.
#[utoipa::path(
    get,
    path = "/api/enrollments/course/{course_id}",
    params(("course_id" = i64, Path, description = "Course id")),
    responses(
        (status = 200, description = "Enrollments", body = ApiResponse<Vec<EnrollmentResponse>>),
        (status = 404, description = "Course not found")
    )
)]
pub async fn list_course_enrollments_handler(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<EnrollmentResponse>>>, ApiFailure> {
    let views = enrollment::list_enrollments_by_course(state.db.as_ref(), course_id)
        .await
        .map_err(|e| port_error("list enrollments", e))?;
    Ok(Json(ApiResponse::ok(
        "Enrollments fetched",
        views.into_iter().map(EnrollmentResponse::from).collect(),
    )))
}
