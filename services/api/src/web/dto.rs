//! services/api/src/web/dto.rs
//!
//! Request and response payloads of the REST API, and their conversions
//! from the core domain types.

use chrono::{DateTime, Utc};
use educare_core::domain::{
    AuthoredNote, Course, CourseContent, EnrollmentView, FileType, NoteThread, Role, User,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

//=========================================================================================
// Response Envelope
//=========================================================================================

/// Body of every REST response. `data` is null on failures and on
/// acknowledgements that carry no payload.
#[derive(Serialize, ToSchema, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

impl ApiResponse<()> {
    /// A successful response without a payload.
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

//=========================================================================================
// Shared Enums
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleDto {
    Teacher,
    Student,
    Admin,
}

impl From<Role> for RoleDto {
    fn from(role: Role) -> Self {
        match role {
            Role::Teacher => RoleDto::Teacher,
            Role::Student => RoleDto::Student,
            Role::Admin => RoleDto::Admin,
        }
    }
}

impl From<RoleDto> for Role {
    fn from(role: RoleDto) -> Self {
        match role {
            RoleDto::Teacher => Role::Teacher,
            RoleDto::Student => Role::Student,
            RoleDto::Admin => Role::Admin,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileTypeDto {
    Video,
    Ppt,
    Pdf,
    Doc,
}

impl From<FileType> for FileTypeDto {
    fn from(file_type: FileType) -> Self {
        match file_type {
            FileType::Video => FileTypeDto::Video,
            FileType::Ppt => FileTypeDto::Ppt,
            FileType::Pdf => FileTypeDto::Pdf,
            FileType::Doc => FileTypeDto::Doc,
        }
    }
}

impl From<FileTypeDto> for FileType {
    fn from(file_type: FileTypeDto) -> Self {
        match file_type {
            FileTypeDto::Video => FileType::Video,
            FileTypeDto::Ppt => FileType::Ppt,
            FileTypeDto::Pdf => FileType::Pdf,
            FileTypeDto::Doc => FileType::Doc,
        }
    }
}

//=========================================================================================
// Users
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: RoleDto,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role.into(),
            created_at: user.created_at,
        }
    }
}

//=========================================================================================
// Courses and Content
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct AddCourseRequest {
    pub title: String,
    pub description: Option<String>,
    /// Price in minor currency units. Defaults to 0 (free course).
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub is_published: Option<bool>,
}

#[derive(Serialize, ToSchema)]
pub struct CourseResponse {
    pub id: i64,
    pub teacher_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            teacher_id: course.teacher_id,
            title: course.title,
            description: course.description,
            price_cents: course.price_cents,
            is_published: course.is_published,
            created_at: course.created_at,
            updated_at: course.updated_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct AddContentRequest {
    pub title: String,
    pub file_type: FileTypeDto,
    pub file_url: String,
    pub duration_seconds: Option<i32>,
    #[serde(default)]
    pub is_free: bool,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct UpdateContentRequest {
    pub title: Option<String>,
    pub file_type: Option<FileTypeDto>,
    pub file_url: Option<String>,
    pub duration_seconds: Option<i32>,
    pub is_free: Option<bool>,
}

#[derive(Serialize, ToSchema)]
pub struct ContentResponse {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub file_type: FileTypeDto,
    pub file_url: String,
    pub duration_seconds: Option<i32>,
    pub is_free: bool,
    pub created_at: DateTime<Utc>,
}

impl From<CourseContent> for ContentResponse {
    fn from(content: CourseContent) -> Self {
        Self {
            id: content.id,
            course_id: content.course_id,
            title: content.title,
            file_type: content.file_type.into(),
            file_url: content.file_url,
            duration_seconds: content.duration_seconds,
            is_free: content.is_free,
            created_at: content.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub file_name: String,
    pub file_url: String,
    pub file_type: FileTypeDto,
}

//=========================================================================================
// Enrollments
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct FreeEnrollmentRequest {
    pub course_id: i64,
    pub student_id: i64,
}

#[derive(Serialize, ToSchema)]
pub struct EnrollmentResponse {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub course_id: i64,
    pub course_title: String,
    pub access_granted_by_id: Option<i64>,
    pub access_granted_by_name: Option<String>,
    pub enrolled_at: DateTime<Utc>,
}

impl From<EnrollmentView> for EnrollmentResponse {
    fn from(view: EnrollmentView) -> Self {
        Self {
            id: view.id,
            student_id: view.student_id,
            student_name: view.student_name,
            course_id: view.course_id,
            course_title: view.course_title,
            access_granted_by_id: view.granted_by_id,
            access_granted_by_name: view.granted_by_name,
            enrolled_at: view.enrolled_at,
        }
    }
}

//=========================================================================================
// Notes
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct AddNoteRequest {
    pub course_id: i64,
    pub parent_note_id: Option<i64>,
    pub title: Option<String>,
    pub content: String,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ReplyResponse {
    pub id: i64,
    pub content: String,
    pub user_id: i64,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<AuthoredNote> for ReplyResponse {
    fn from(reply: AuthoredNote) -> Self {
        Self {
            id: reply.note.id,
            content: reply.note.content,
            user_id: reply.note.author_id,
            user_name: reply.author_name,
            created_at: reply.note.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct NoteResponse {
    pub id: i64,
    pub course_id: i64,
    pub parent_note_id: Option<i64>,
    pub title: Option<String>,
    pub content: String,
    pub user_id: i64,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub replies: Vec<ReplyResponse>,
}

impl From<NoteThread> for NoteResponse {
    fn from(thread: NoteThread) -> Self {
        let note = thread.root.note;
        Self {
            id: note.id,
            course_id: note.course_id,
            parent_note_id: note.parent_id,
            title: note.title,
            content: note.content,
            user_id: note.author_id,
            user_name: thread.root.author_name,
            created_at: note.created_at,
            updated_at: note.updated_at,
            replies: thread.replies.into_iter().map(ReplyResponse::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use educare_core::domain::Note;

    fn note(id: i64, parent_id: Option<i64>, content: &str) -> Note {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        Note {
            id,
            course_id: 7,
            author_id: 3,
            parent_id,
            title: parent_id.is_none().then(|| "Question".to_string()),
            content: content.to_string(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn envelope_wraps_payloads_and_failures() {
        let ok = serde_json::to_value(ApiResponse::ok("Course found", vec![1, 2])).unwrap();
        assert_eq!(
            ok,
            serde_json::json!({"success": true, "message": "Course found", "data": [1, 2]})
        );

        let failed = serde_json::to_value(ApiResponse::<()>::error("Course 9 not found")).unwrap();
        assert_eq!(
            failed,
            serde_json::json!({"success": false, "message": "Course 9 not found", "data": null})
        );

        let done = serde_json::to_value(ApiResponse::done("Logged out")).unwrap();
        assert_eq!(done["success"], true);
        assert_eq!(done["data"], serde_json::Value::Null);
    }

    #[test]
    fn enums_serialize_in_upper_case() {
        assert_eq!(serde_json::to_string(&RoleDto::Teacher).unwrap(), "\"TEACHER\"");
        assert_eq!(serde_json::to_string(&FileTypeDto::Ppt).unwrap(), "\"PPT\"");
        let parsed: FileTypeDto = serde_json::from_str("\"VIDEO\"").unwrap();
        assert_eq!(FileType::from(parsed), FileType::Video);
    }

    #[test]
    fn content_request_defaults_to_paid() {
        let req: AddContentRequest = serde_json::from_str(
            r#"{"title":"Intro","file_type":"PDF","file_url":"/uploads/intro.pdf"}"#,
        )
        .unwrap();
        assert!(!req.is_free);
        assert!(req.duration_seconds.is_none());
    }

    #[test]
    fn note_thread_flattens_into_response() {
        let thread = NoteThread {
            root: AuthoredNote {
                note: note(1, None, "How do lifetimes work?"),
                author_name: "Sam".to_string(),
            },
            replies: vec![AuthoredNote {
                note: note(2, Some(1), "See chapter 10."),
                author_name: "Tara".to_string(),
            }],
        };

        let json = serde_json::to_value(NoteResponse::from(thread)).unwrap();
        assert_eq!(json["title"], "Question");
        assert_eq!(json["user_name"], "Sam");
        assert_eq!(json["parent_note_id"], serde_json::Value::Null);
        assert_eq!(json["replies"][0]["user_name"], "Tara");
        assert_eq!(json["replies"][0]["content"], "See chapter 10.");
    }
}
