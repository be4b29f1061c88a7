//! crates/educare_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use crate::ports::PortError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

//=========================================================================================
// Identity
//=========================================================================================

/// The role a user account holds. Fixed for the lifetime of an auth session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Teacher,
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Teacher => "TEACHER",
            Role::Student => "STUDENT",
            Role::Admin => "ADMIN",
        }
    }

    /// Teachers and admins see every content item of every course.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Teacher | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TEACHER" => Ok(Role::Teacher),
            "STUDENT" => Ok(Role::Student),
            "ADMIN" => Ok(Role::Admin),
            other => Err(PortError::Validation(format!("Unknown role '{}'", other))),
        }
    }
}

/// The authenticated identity on whose behalf a core operation runs.
/// Passed explicitly into every operation instead of being read from ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }
}

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: i64,
    pub email: String,
    pub hashed_password: String,
    pub role: Role,
}

//=========================================================================================
// Course Catalog
//=========================================================================================

/// A course owned by a single teacher. Prices are integer minor units (cents).
#[derive(Debug, Clone)]
pub struct Course {
    pub id: i64,
    pub teacher_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    /// A zero-price course. All of its content is free.
    pub fn is_free(&self) -> bool {
        self.price_cents == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewCourse {
    pub title: String,
    pub description: Option<String>,
    /// Defaults to zero when absent.
    pub price_cents: Option<i64>,
    pub is_published: bool,
}

/// Partial course update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct CoursePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub is_published: Option<bool>,
}

impl CoursePatch {
    /// Overwrites the fields of `course` that the patch sets.
    pub fn apply_to(&self, course: &mut Course) {
        if let Some(title) = &self.title {
            course.title = title.clone();
        }
        if let Some(description) = &self.description {
            course.description = Some(description.clone());
        }
        if let Some(price_cents) = self.price_cents {
            course.price_cents = price_cents;
        }
        if let Some(is_published) = self.is_published {
            course.is_published = is_published;
        }
    }
}

//=========================================================================================
// Course Content
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Video,
    Ppt,
    Pdf,
    Doc,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Video => "VIDEO",
            FileType::Ppt => "PPT",
            FileType::Pdf => "PDF",
            FileType::Doc => "DOC",
        }
    }

    /// Classifies an uploaded file by its extension.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, ext) = file_name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "mp4" | "mov" | "mkv" | "webm" | "avi" => Some(FileType::Video),
            "ppt" | "pptx" => Some(FileType::Ppt),
            "pdf" => Some(FileType::Pdf),
            "doc" | "docx" => Some(FileType::Doc),
            _ => None,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VIDEO" => Ok(FileType::Video),
            "PPT" => Ok(FileType::Ppt),
            "PDF" => Ok(FileType::Pdf),
            "DOC" => Ok(FileType::Doc),
            other => Err(PortError::Validation(format!("Unknown file type '{}'", other))),
        }
    }
}

/// A single piece of course material (a video, slide deck, PDF or document).
#[derive(Debug, Clone, PartialEq)]
pub struct CourseContent {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub file_type: FileType,
    pub file_url: String,
    pub duration_seconds: Option<i32>,
    pub is_free: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewContent {
    pub title: String,
    pub file_type: FileType,
    pub file_url: String,
    pub duration_seconds: Option<i32>,
    pub is_free: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ContentPatch {
    pub title: Option<String>,
    pub file_type: Option<FileType>,
    pub file_url: Option<String>,
    pub duration_seconds: Option<i32>,
    pub is_free: Option<bool>,
}

//=========================================================================================
// Enrollments and Payments
//=========================================================================================

/// Teacher-granted free access of one student to one course.
#[derive(Debug, Clone)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    /// The granting teacher. Only they may revoke the enrollment.
    pub granted_by: Option<i64>,
    pub enrolled_at: DateTime<Utc>,
}

/// Read projection of an enrollment with display names resolved.
#[derive(Debug, Clone)]
pub struct EnrollmentView {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub course_id: i64,
    pub course_title: String,
    pub granted_by_id: Option<i64>,
    pub granted_by_name: Option<String>,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Created,
    Success,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Created => "CREATED",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

//=========================================================================================
// Notes
//=========================================================================================

/// A discussion note. `parent_id == None` marks a top-level note.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: i64,
    pub course_id: i64,
    pub author_id: i64,
    pub parent_id: Option<i64>,
    pub title: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNote {
    pub course_id: i64,
    pub parent_id: Option<i64>,
    pub title: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthoredNote {
    pub note: Note,
    pub author_name: String,
}

/// A note with its direct replies. Deeper replies are not expanded.
#[derive(Debug, Clone)]
pub struct NoteThread {
    pub root: AuthoredNote,
    pub replies: Vec<AuthoredNote>,
}
