//! services/api/src/web/courses.rs
//!
//! Handlers for the course catalog, course content and file uploads.
//! Teacher routes live under `/api/teacher`, the student catalog under `/api/student`.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use educare_core::domain::{Caller, ContentPatch, CoursePatch, NewContent, NewCourse};
use educare_core::{access, catalog};
use std::sync::Arc;
use tracing::{error, info};

use crate::web::dto::{
    AddContentRequest, AddCourseRequest, ApiResponse, ContentResponse, CourseResponse,
    UpdateContentRequest, UpdateCourseRequest, UploadResponse,
};
use crate::web::rest::{failure, port_error, ApiFailure};
use crate::web::state::AppState;

//=========================================================================================
// Teacher: Courses
//=========================================================================================

/// Create a course owned by the calling teacher.
#[utoipa::path(
    post,
    path = "/api/teacher/courses",
    request_body = AddCourseRequest,
    responses(
        (status = 201, description = "Course created", body = ApiResponse<CourseResponse>),
        (status = 400, description = "Negative price"),
        (status = 403, description = "Caller is not a teacher")
    )
)]
pub async fn add_course_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<AddCourseRequest>,
) -> Result<impl IntoResponse, ApiFailure> {
    let new_course = NewCourse {
        title: req.title,
        description: req.description,
        price_cents: req.price_cents,
        is_published: req.is_published,
    };
    let course = catalog::add_course(state.db.as_ref(), &caller, new_course)
        .await
        .map_err(|e| port_error("add course", e))?;
    info!("Teacher {} created course {}", caller.user_id, course.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Course created", CourseResponse::from(course))),
    ))
}

/// List every course.
#[utoipa::path(
    get,
    path = "/api/teacher/courses",
    responses((status = 200, description = "All courses", body = ApiResponse<Vec<CourseResponse>>))
)]
pub async fn list_courses_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<CourseResponse>>>, ApiFailure> {
    let courses = catalog::list_courses(state.db.as_ref())
        .await
        .map_err(|e| port_error("list courses", e))?;
    Ok(Json(ApiResponse::ok(
        "Courses fetched",
        courses.into_iter().map(CourseResponse::from).collect(),
    )))
}

/// List the courses owned by the calling teacher.
#[utoipa::path(
    get,
    path = "/api/teacher/courses/mine",
    responses((status = 200, description = "Courses of the caller", body = ApiResponse<Vec<CourseResponse>>))
)]
pub async fn list_my_courses_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<Vec<CourseResponse>>>, ApiFailure> {
    let courses = catalog::list_courses_by_teacher(state.db.as_ref(), caller.user_id)
        .await
        .map_err(|e| port_error("list courses", e))?;
    Ok(Json(ApiResponse::ok(
        "Courses fetched",
        courses.into_iter().map(CourseResponse::from).collect(),
    )))
}

/// Edit a course. Setting the price to zero makes all of its content free.
#[utoipa::path(
    put,
    path = "/api/teacher/courses/{course_id}",
    request_body = UpdateCourseRequest,
    params(("course_id" = i64, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course updated", body = ApiResponse<CourseResponse>),
        (status = 403, description = "Caller does not own the course"),
        (status = 404, description = "Course not found")
    )
)]
pub async fn update_course_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(course_id): Path<i64>,
    Json(req): Json<UpdateCourseRequest>,
) -> Result<Json<ApiResponse<CourseResponse>>, ApiFailure> {
    let patch = CoursePatch {
        title: req.title,
        description: req.description,
        price_cents: req.price_cents,
        is_published: req.is_published,
    };
    let course = catalog::update_course(state.db.as_ref(), &caller, course_id, patch)
        .await
        .map_err(|e| port_error("update course", e))?;
    Ok(Json(ApiResponse::ok("Course updated", course.into())))
}

//=========================================================================================
// Teacher: Course Content
//=========================================================================================

/// List the content of a course visible to the caller.
///
/// Teachers and admins receive every item; students receive free items, all
/// items of a free course, or all items once they hold a successful payment.
#[utoipa::path(
    get,
    path = "/api/teacher/courses/{course_id}/contents",
    params(("course_id" = i64, Path, description = "Course id")),
    responses(
        (status = 200, description = "Visible content, ordered by id", body = ApiResponse<Vec<ContentResponse>>),
        (status = 404, description = "Course not found")
    )
)]
pub async fn list_contents_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(course_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<ContentResponse>>>, ApiFailure> {
    let contents = access::list_accessible_content(state.db.as_ref(), &caller, course_id)
        .await
        .map_err(|e| port_error("list course content", e))?;
    Ok(Json(ApiResponse::ok(
        "Content fetched",
        contents.into_iter().map(ContentResponse::from).collect(),
    )))
}

/// Add a content item to a course. Items of a free course are always stored as free.
#[utoipa::path(
    post,
    path = "/api/teacher/courses/{course_id}/contents",
    request_body = AddContentRequest,
    params(("course_id" = i64, Path, description = "Course id")),
    responses(
        (status = 201, description = "Content added", body = ApiResponse<ContentResponse>),
        (status = 403, description = "Caller does not own the course"),
        (status = 404, description = "Course not found")
    )
)]
pub async fn add_content_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(course_id): Path<i64>,
    Json(req): Json<AddContentRequest>,
) -> Result<impl IntoResponse, ApiFailure> {
    let content = NewContent {
        title: req.title,
        file_type: req.file_type.into(),
        file_url: req.file_url,
        duration_seconds: req.duration_seconds,
        is_free: req.is_free,
    };
    let saved = access::add_content(state.db.as_ref(), &caller, course_id, content)
        .await
        .map_err(|e| port_error("add content", e))?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Content added", ContentResponse::from(saved))),
    ))
}

/// Update a content item of a course.
#[utoipa::path(
    put,
    path = "/api/teacher/courses/{course_id}/contents/{content_id}",
    request_body = UpdateContentRequest,
    params(
        ("course_id" = i64, Path, description = "Course id"),
        ("content_id" = i64, Path, description = "Content id")
    ),
    responses(
        (status = 200, description = "Content updated", body = ApiResponse<ContentResponse>),
        (status = 403, description = "Caller does not own the course"),
        (status = 404, description = "Content not found in this course")
    )
)]
pub async fn update_content_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path((course_id, content_id)): Path<(i64, i64)>,
    Json(req): Json<UpdateContentRequest>,
) -> Result<Json<ApiResponse<ContentResponse>>, ApiFailure> {
    let patch = ContentPatch {
        title: req.title,
        file_type: req.file_type.map(Into::into),
        file_url: req.file_url,
        duration_seconds: req.duration_seconds,
        is_free: req.is_free,
    };
    let updated = access::update_content(state.db.as_ref(), &caller, course_id, content_id, patch)
        .await
        .map_err(|e| port_error("update content", e))?;
    Ok(Json(ApiResponse::ok("Content updated", updated.into())))
}

/// Fetch a single content item by id.
#[utoipa::path(
    get,
    path = "/api/teacher/contents/{content_id}",
    params(("content_id" = i64, Path, description = "Content id")),
    responses(
        (status = 200, description = "Content item", body = ApiResponse<ContentResponse>),
        (status = 403, description = "Caller is not a teacher"),
        (status = 404, description = "Content not found")
    )
)]
pub async fn get_content_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(content_id): Path<i64>,
) -> Result<Json<ApiResponse<ContentResponse>>, ApiFailure> {
    if !caller.role.is_staff() {
        return Err(failure(StatusCode::FORBIDDEN, "Teacher access required"));
    }
    let content = access::get_content(state.db.as_ref(), content_id)
        .await
        .map_err(|e| port_error("load content", e))?;
    Ok(Json(ApiResponse::ok("Content found", content.into())))
}

/// Upload a course file.
///
/// Accepts a multipart/form-data request with a single file part. The file type
/// is derived from the extension; the returned URL can be used to add content.
#[utoipa::path(
    post,
    path = "/api/teacher/uploads",
    request_body(content_type = "multipart/form-data", description = "The file to upload."),
    responses(
        (status = 201, description = "File stored", body = ApiResponse<UploadResponse>),
        (status = 400, description = "Missing file or unsupported type"),
        (status = 403, description = "Caller is not a teacher"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiFailure> {
    if !caller.role.is_staff() {
        return Err(failure(StatusCode::FORBIDDEN, "Teacher access required"));
    }

    let field = multipart
        .next_field()
        .await
        .map_err(|e| {
            failure(
                StatusCode::BAD_REQUEST,
                format!("Failed to read multipart data: {}", e),
            )
        })?
        .ok_or_else(|| failure(StatusCode::BAD_REQUEST, "Multipart form must include a file"))?;
    let file_name = field
        .file_name()
        .map(str::to_string)
        .ok_or_else(|| failure(StatusCode::BAD_REQUEST, "File part has no file name"))?;

    let file_type = state
        .storage
        .classify(&file_name)
        .map_err(|e| port_error("classify upload", e))?;
    let data = field.bytes().await.map_err(|e| {
        error!("Failed to read upload bytes: {}", e);
        failure(
            StatusCode::BAD_REQUEST,
            format!("Failed to read file bytes: {}", e),
        )
    })?;

    let file_url = state
        .storage
        .store(&file_name, &data)
        .await
        .map_err(|e| port_error("store upload", e))?;
    info!("Stored {} ({} bytes) at {}", file_name, data.len(), file_url);

    let response = UploadResponse {
        file_name,
        file_url,
        file_type: file_type.into(),
    };
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("File uploaded", response))))
}

//=========================================================================================
// Student Catalog
//=========================================================================================

/// List published courses.
#[utoipa::path(
    get,
    path = "/api/student/courses",
    responses((status = 200, description = "Published courses", body = ApiResponse<Vec<CourseResponse>>))
)]
pub async fn list_published_courses_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<CourseResponse>>>, ApiFailure> {
    let courses = catalog::list_published_courses(state.db.as_ref())
        .await
        .map_err(|e| port_error("list published courses", e))?;
    Ok(Json(ApiResponse::ok(
        "Courses fetched",
        courses.into_iter().map(CourseResponse::from).collect(),
    )))
}

/// Fetch a published course.
#[utoipa::path(
    get,
    path = "/api/student/courses/{course_id}",
    params(("course_id" = i64, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course", body = ApiResponse<CourseResponse>),
        (status = 404, description = "Course not found or not published")
    )
)]
pub async fn get_published_course_handler(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<i64>,
) -> Result<Json<ApiResponse<CourseResponse>>, ApiFailure> {
    let course = catalog::get_published_course(state.db.as_ref(), course_id)
        .await
        .map_err(|e| port_error("load course", e))?;
    Ok(Json(ApiResponse::ok("Course found", course.into())))
}

/// Fetch one content item of a published course, if the caller may see it.
#[utoipa::path(
    get,
    path = "/api/student/courses/{course_id}/contents/{content_id}",
    params(
        ("course_id" = i64, Path, description = "Course id"),
        ("content_id" = i64, Path, description = "Content id")
    ),
    responses(
        (status = 200, description = "Content item", body = ApiResponse<ContentResponse>),
        (status = 404, description = "Content not found or not accessible")
    )
)]
pub async fn get_student_content_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path((course_id, content_id)): Path<(i64, i64)>,
) -> Result<Json<ApiResponse<ContentResponse>>, ApiFailure> {
    let content =
        access::get_accessible_content_item(state.db.as_ref(), &caller, course_id, content_id)
            .await
            .map_err(|e| port_error("load course content", e))?;
    Ok(Json(ApiResponse::ok("Content found", content.into())))
}
