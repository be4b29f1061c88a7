//! crates/educare_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or file stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::domain::{
    Course, CourseContent, CoursePatch, Enrollment, FileType, NewContent, NewCourse, NewNote, Note, Role,
    User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, disk).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    /// Fails with `Conflict` when the email is already registered.
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
        role: Role,
    ) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: i64) -> PortResult<User>;

    /// Missing ids are skipped rather than reported.
    async fn get_users_by_ids(&self, user_ids: &[i64]) -> PortResult<Vec<User>>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owning user id of a live session, `Unauthorized` otherwise.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<i64>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Course Catalog ---
    async fn create_course(&self, teacher_id: i64, course: &NewCourse) -> PortResult<Course>;

    async fn get_course_by_id(&self, course_id: i64) -> PortResult<Course>;

    async fn list_courses(&self) -> PortResult<Vec<Course>>;

    async fn list_courses_by_teacher(&self, teacher_id: i64) -> PortResult<Vec<Course>>;

    async fn list_published_courses(&self) -> PortResult<Vec<Course>>;

    /// Applies `patch` to the current row under a row lock. When the resulting
    /// price is zero, every content item of the course is flagged free in the
    /// same transaction.
    async fn update_course(&self, course_id: i64, patch: &CoursePatch) -> PortResult<Course>;

    // --- Course Content ---
    /// The stored item is free when `content.is_free` is set or when the course
    /// costs nothing at the moment of the write.
    async fn create_content(&self, course_id: i64, content: &NewContent)
        -> PortResult<CourseContent>;

    async fn get_content_by_id(&self, content_id: i64) -> PortResult<CourseContent>;

    /// All content of a course, ordered by id ascending.
    async fn list_content_for_course(&self, course_id: i64) -> PortResult<Vec<CourseContent>>;

    /// Same free-course rule as `create_content`.
    async fn save_content(&self, content: &CourseContent) -> PortResult<CourseContent>;

    // --- Enrollments ---
    /// Fails with `Conflict` when the (student, course) pair is already enrolled.
    async fn create_enrollment(
        &self,
        student_id: i64,
        course_id: i64,
        granted_by: i64,
    ) -> PortResult<Enrollment>;

    async fn get_enrollment_by_id(&self, enrollment_id: i64) -> PortResult<Enrollment>;

    async fn find_enrollment(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> PortResult<Option<Enrollment>>;

    async fn list_enrollments_for_course(&self, course_id: i64) -> PortResult<Vec<Enrollment>>;

    async fn delete_enrollment(&self, enrollment_id: i64) -> PortResult<()>;

    // --- Payments ---
    /// True iff a payment for the pair exists with status exactly `SUCCESS`.
    async fn has_successful_payment(&self, student_id: i64, course_id: i64) -> PortResult<bool>;

    // --- Notes ---
    async fn create_note(&self, author_id: i64, note: &NewNote) -> PortResult<Note>;

    async fn get_note_by_id(&self, note_id: i64) -> PortResult<Note>;

    /// Notes of a course without a parent, oldest first.
    async fn list_top_level_notes(&self, course_id: i64) -> PortResult<Vec<Note>>;

    /// Direct replies of every given parent, oldest first.
    async fn list_replies(&self, parent_ids: &[i64]) -> PortResult<Vec<Note>>;

    async fn save_note(&self, note: &Note) -> PortResult<Note>;
}

#[async_trait]
pub trait FileStorageService: Send + Sync {
    /// Stores an uploaded file and returns the URL it is served from.
    /// A second upload with the same name replaces the first.
    async fn store(&self, file_name: &str, data: &[u8]) -> PortResult<String>;

    /// Determines the content type of an upload from its name.
    fn classify(&self, file_name: &str) -> PortResult<FileType> {
        FileType::from_file_name(file_name).ok_or_else(|| {
            PortError::Validation(format!("Unsupported file type for '{}'", file_name))
        })
    }
}
