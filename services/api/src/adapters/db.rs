//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use educare_core::domain::{
    Course, CourseContent, CoursePatch, Enrollment, NewContent, NewCourse, NewNote, Note, PaymentStatus, Role,
    User, UserCredentials,
};
use educare_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(e: sqlx::Error, what: String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => unexpected(e),
    }
}

fn conflict_or_unexpected(e: sqlx::Error, what: String) -> PortError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            PortError::Conflict(what)
        }
        _ => unexpected(e),
    }
}

/// Takes a share lock on the course row for the rest of the transaction and
/// reports whether the course is free. A concurrent `update_course` holds
/// `FOR UPDATE` on the same row, so content writes never interleave with it.
async fn lock_course_price(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    course_id: i64,
) -> PortResult<bool> {
    let price_cents: i64 =
        sqlx::query_scalar::<_, i64>("SELECT price_cents FROM courses WHERE id = $1 FOR SHARE")
            .bind(course_id)
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Course {} not found", course_id)))?;
    Ok(price_cents == 0)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str = "id, name, email, role, created_at";

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    name: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role.parse::<Role>()?,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: i64,
    email: String,
    password_hash: String,
    role: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> PortResult<UserCredentials> {
        Ok(UserCredentials {
            user_id: self.id,
            email: self.email,
            hashed_password: self.password_hash,
            role: self.role.parse::<Role>()?,
        })
    }
}

const COURSE_COLUMNS: &str =
    "id, teacher_id, title, description, price_cents, is_published, created_at, updated_at";

#[derive(FromRow)]
struct CourseRecord {
    id: i64,
    teacher_id: i64,
    title: String,
    description: Option<String>,
    price_cents: i64,
    is_published: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl CourseRecord {
    fn to_domain(self) -> Course {
        Course {
            id: self.id,
            teacher_id: self.teacher_id,
            title: self.title,
            description: self.description,
            price_cents: self.price_cents,
            is_published: self.is_published,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const CONTENT_COLUMNS: &str =
    "id, course_id, title, file_type, file_url, duration_seconds, is_free, created_at";

#[derive(FromRow)]
struct ContentRecord {
    id: i64,
    course_id: i64,
    title: String,
    file_type: String,
    file_url: String,
    duration_seconds: Option<i32>,
    is_free: bool,
    created_at: DateTime<Utc>,
}
impl ContentRecord {
    fn to_domain(self) -> PortResult<CourseContent> {
        Ok(CourseContent {
            id: self.id,
            course_id: self.course_id,
            title: self.title,
            file_type: self.file_type.parse()?,
            file_url: self.file_url,
            duration_seconds: self.duration_seconds,
            is_free: self.is_free,
            created_at: self.created_at,
        })
    }
}

const ENROLLMENT_COLUMNS: &str = "id, student_id, course_id, access_granted_by, enrolled_at";

#[derive(FromRow)]
struct EnrollmentRecord {
    id: i64,
    student_id: i64,
    course_id: i64,
    access_granted_by: Option<i64>,
    enrolled_at: DateTime<Utc>,
}
impl EnrollmentRecord {
    fn to_domain(self) -> Enrollment {
        Enrollment {
            id: self.id,
            student_id: self.student_id,
            course_id: self.course_id,
            granted_by: self.access_granted_by,
            enrolled_at: self.enrolled_at,
        }
    }
}

const NOTE_COLUMNS: &str =
    "id, course_id, user_id, parent_note_id, title, content, created_at, updated_at";

#[derive(FromRow)]
struct NoteRecord {
    id: i64,
    course_id: i64,
    user_id: i64,
    parent_note_id: Option<i64>,
    title: Option<String>,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl NoteRecord {
    fn to_domain(self) -> Note {
        Note {
            id: self.id,
            course_id: self.course_id,
            author_id: self.user_id,
            parent_id: self.parent_note_id,
            title: self.title,
            content: self.content,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
        role: Role,
    ) -> PortResult<User> {
        let sql = format!(
            "INSERT INTO users (name, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(name)
            .bind(email)
            .bind(hashed_password)
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_or_unexpected(e, format!("Email {} is already registered", email)))?;
        record.to_domain()
    }

    async fn get_user_by_id(&self, user_id: i64) -> PortResult<User> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("User {} not found", user_id)))?;
        record.to_domain()
    }

    async fn get_users_by_ids(&self, user_ids: &[i64]) -> PortResult<Vec<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ANY($1)", USER_COLUMNS);
        let records = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, password_hash, role FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("User {} not found", email)))?;
        record.to_domain()
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_course(&self, teacher_id: i64, course: &NewCourse) -> PortResult<Course> {
        let sql = format!(
            "INSERT INTO courses (teacher_id, title, description, price_cents, is_published) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            COURSE_COLUMNS
        );
        let record = sqlx::query_as::<_, CourseRecord>(&sql)
            .bind(teacher_id)
            .bind(&course.title)
            .bind(&course.description)
            .bind(course.price_cents.unwrap_or(0))
            .bind(course.is_published)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_course_by_id(&self, course_id: i64) -> PortResult<Course> {
        let sql = format!("SELECT {} FROM courses WHERE id = $1", COURSE_COLUMNS);
        let record = sqlx::query_as::<_, CourseRecord>(&sql)
            .bind(course_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Course {} not found", course_id)))?;
        Ok(record.to_domain())
    }

    async fn list_courses(&self) -> PortResult<Vec<Course>> {
        let sql = format!("SELECT {} FROM courses ORDER BY id ASC", COURSE_COLUMNS);
        let records = sqlx::query_as::<_, CourseRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_courses_by_teacher(&self, teacher_id: i64) -> PortResult<Vec<Course>> {
        let sql = format!(
            "SELECT {} FROM courses WHERE teacher_id = $1 ORDER BY id ASC",
            COURSE_COLUMNS
        );
        let records = sqlx::query_as::<_, CourseRecord>(&sql)
            .bind(teacher_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_published_courses(&self) -> PortResult<Vec<Course>> {
        let sql = format!(
            "SELECT {} FROM courses WHERE is_published ORDER BY id ASC",
            COURSE_COLUMNS
        );
        let records = sqlx::query_as::<_, CourseRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update_course(&self, course_id: i64, patch: &CoursePatch) -> PortResult<Course> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Lock the row so concurrent patches and content writes serialize on it.
        let sql = format!("SELECT {} FROM courses WHERE id = $1 FOR UPDATE", COURSE_COLUMNS);
        let mut course = sqlx::query_as::<_, CourseRecord>(&sql)
            .bind(course_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Course {} not found", course_id)))?
            .to_domain();
        patch.apply_to(&mut course);

        let sql = format!(
            "UPDATE courses SET title = $1, description = $2, price_cents = $3, \
             is_published = $4, updated_at = NOW() WHERE id = $5 RETURNING {}",
            COURSE_COLUMNS
        );
        let record = sqlx::query_as::<_, CourseRecord>(&sql)
            .bind(&course.title)
            .bind(&course.description)
            .bind(course.price_cents)
            .bind(course.is_published)
            .bind(course_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(unexpected)?;

        if course.is_free() {
            sqlx::query("UPDATE course_contents SET is_free = TRUE WHERE course_id = $1")
                .bind(course_id)
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn create_content(
        &self,
        course_id: i64,
        content: &NewContent,
    ) -> PortResult<CourseContent> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let course_is_free = lock_course_price(&mut tx, course_id).await?;

        let sql = format!(
            "INSERT INTO course_contents (course_id, title, file_type, file_url, duration_seconds, is_free) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            CONTENT_COLUMNS
        );
        let record = sqlx::query_as::<_, ContentRecord>(&sql)
            .bind(course_id)
            .bind(&content.title)
            .bind(content.file_type.as_str())
            .bind(&content.file_url)
            .bind(content.duration_seconds)
            .bind(content.is_free || course_is_free)
            .fetch_one(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_content_by_id(&self, content_id: i64) -> PortResult<CourseContent> {
        let sql = format!("SELECT {} FROM course_contents WHERE id = $1", CONTENT_COLUMNS);
        let record = sqlx::query_as::<_, ContentRecord>(&sql)
            .bind(content_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Content {} not found", content_id)))?;
        record.to_domain()
    }

    async fn list_content_for_course(&self, course_id: i64) -> PortResult<Vec<CourseContent>> {
        let sql = format!(
            "SELECT {} FROM course_contents WHERE course_id = $1 ORDER BY id ASC",
            CONTENT_COLUMNS
        );
        let records = sqlx::query_as::<_, ContentRecord>(&sql)
            .bind(course_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn save_content(&self, content: &CourseContent) -> PortResult<CourseContent> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let course_is_free = lock_course_price(&mut tx, content.course_id).await?;

        let sql = format!(
            "UPDATE course_contents SET title = $1, file_type = $2, file_url = $3, \
             duration_seconds = $4, is_free = $5 WHERE id = $6 RETURNING {}",
            CONTENT_COLUMNS
        );
        let record = sqlx::query_as::<_, ContentRecord>(&sql)
            .bind(&content.title)
            .bind(content.file_type.as_str())
            .bind(&content.file_url)
            .bind(content.duration_seconds)
            .bind(content.is_free || course_is_free)
            .bind(content.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Content {} not found", content.id)))?;

        tx.commit().await.map_err(unexpected)?;
        record.to_domain()
    }

    async fn create_enrollment(
        &self,
        student_id: i64,
        course_id: i64,
        granted_by: i64,
    ) -> PortResult<Enrollment> {
        let sql = format!(
            "INSERT INTO enrollments (student_id, course_id, access_granted_by) \
             VALUES ($1, $2, $3) RETURNING {}",
            ENROLLMENT_COLUMNS
        );
        let record = sqlx::query_as::<_, EnrollmentRecord>(&sql)
            .bind(student_id)
            .bind(course_id)
            .bind(granted_by)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_or_unexpected(e, "Student already enrolled".to_string()))?;
        Ok(record.to_domain())
    }

    async fn get_enrollment_by_id(&self, enrollment_id: i64) -> PortResult<Enrollment> {
        let sql = format!("SELECT {} FROM enrollments WHERE id = $1", ENROLLMENT_COLUMNS);
        let record = sqlx::query_as::<_, EnrollmentRecord>(&sql)
            .bind(enrollment_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                not_found_or_unexpected(e, format!("Enrollment {} not found", enrollment_id))
            })?;
        Ok(record.to_domain())
    }

    async fn find_enrollment(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> PortResult<Option<Enrollment>> {
        let sql = format!(
            "SELECT {} FROM enrollments WHERE student_id = $1 AND course_id = $2",
            ENROLLMENT_COLUMNS
        );
        let record = sqlx::query_as::<_, EnrollmentRecord>(&sql)
            .bind(student_id)
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn list_enrollments_for_course(&self, course_id: i64) -> PortResult<Vec<Enrollment>> {
        let sql = format!(
            "SELECT {} FROM enrollments WHERE course_id = $1 ORDER BY id ASC",
            ENROLLMENT_COLUMNS
        );
        let records = sqlx::query_as::<_, EnrollmentRecord>(&sql)
            .bind(course_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn delete_enrollment(&self, enrollment_id: i64) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM enrollments WHERE id = $1")
            .bind(enrollment_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Enrollment {} not found",
                enrollment_id
            )));
        }
        Ok(())
    }

    async fn has_successful_payment(&self, student_id: i64, course_id: i64) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM payments \
             WHERE student_id = $1 AND course_id = $2 AND status = $3)",
        )
        .bind(student_id)
        .bind(course_id)
        .bind(PaymentStatus::Success.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn create_note(&self, author_id: i64, note: &NewNote) -> PortResult<Note> {
        let sql = format!(
            "INSERT INTO notes (course_id, user_id, parent_note_id, title, content) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            NOTE_COLUMNS
        );
        let record = sqlx::query_as::<_, NoteRecord>(&sql)
            .bind(note.course_id)
            .bind(author_id)
            .bind(note.parent_id)
            .bind(&note.title)
            .bind(&note.content)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_note_by_id(&self, note_id: i64) -> PortResult<Note> {
        let sql = format!("SELECT {} FROM notes WHERE id = $1", NOTE_COLUMNS);
        let record = sqlx::query_as::<_, NoteRecord>(&sql)
            .bind(note_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Note {} not found", note_id)))?;
        Ok(record.to_domain())
    }

    async fn list_top_level_notes(&self, course_id: i64) -> PortResult<Vec<Note>> {
        let sql = format!(
            "SELECT {} FROM notes WHERE course_id = $1 AND parent_note_id IS NULL \
             ORDER BY created_at ASC, id ASC",
            NOTE_COLUMNS
        );
        let records = sqlx::query_as::<_, NoteRecord>(&sql)
            .bind(course_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_replies(&self, parent_ids: &[i64]) -> PortResult<Vec<Note>> {
        let sql = format!(
            "SELECT {} FROM notes WHERE parent_note_id = ANY($1) ORDER BY created_at ASC, id ASC",
            NOTE_COLUMNS
        );
        let records = sqlx::query_as::<_, NoteRecord>(&sql)
            .bind(parent_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn save_note(&self, note: &Note) -> PortResult<Note> {
        let sql = format!(
            "UPDATE notes SET title = $1, content = $2, updated_at = $3 WHERE id = $4 RETURNING {}",
            NOTE_COLUMNS
        );
        let record = sqlx::query_as::<_, NoteRecord>(&sql)
            .bind(&note.title)
            .bind(&note.content)
            .bind(note.updated_at)
            .bind(note.id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Note {} not found", note.id)))?;
        Ok(record.to_domain())
    }
}
