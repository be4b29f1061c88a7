//! In-memory `DatabaseService` used by the unit tests of the core rules.

use crate::domain::{
    Course, CourseContent, CoursePatch, Enrollment, NewContent, NewCourse, NewNote, Note, PaymentStatus, Role,
    User, UserCredentials,
};
use crate::ports::{DatabaseService, PortError, PortResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: Vec<(User, String)>,
    sessions: HashMap<String, (i64, DateTime<Utc>)>,
    courses: Vec<Course>,
    contents: Vec<CourseContent>,
    enrollments: Vec<Enrollment>,
    payments: Vec<(i64, i64, PaymentStatus)>,
    notes: Vec<Note>,
    clock: i64,
    /// Course whose price drops to zero right before the next content write.
    price_drop_before_content_write: Option<i64>,
    broken_user_lookups: Vec<i64>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Strictly increasing timestamps so ordering by creation is deterministic.
    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += 1;
        DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(1_700_000_000 + self.clock)
    }

    fn course_mut(&mut self, course_id: i64) -> PortResult<&mut Course> {
        self.courses
            .iter_mut()
            .find(|c| c.id == course_id)
            .ok_or_else(|| not_found("Course", course_id))
    }

    fn free_all_content(&mut self, course_id: i64) {
        for content in self.contents.iter_mut().filter(|c| c.course_id == course_id) {
            content.is_free = true;
        }
    }

    /// Lands a scheduled concurrent price drop, then reports whether the
    /// course is free at the moment of the write.
    fn course_is_free_at_write(&mut self, course_id: i64) -> PortResult<bool> {
        if self.price_drop_before_content_write == Some(course_id) {
            self.price_drop_before_content_write = None;
            let now = self.tick();
            let course = self.course_mut(course_id)?;
            course.price_cents = 0;
            course.updated_at = now;
            self.free_all_content(course_id);
        }
        Ok(self.course_mut(course_id)?.is_free())
    }
}

#[derive(Default)]
pub struct InMemoryDb {
    tables: Mutex<Tables>,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user(&self, name: &str, role: Role) -> User {
        let email = format!("{}@example.com", name.to_lowercase());
        self.create_user(name, &email, "hash", role).await.unwrap()
    }

    pub async fn course(&self, teacher_id: i64, price_cents: i64) -> Course {
        let course = NewCourse {
            title: format!("Course by {}", teacher_id),
            description: None,
            price_cents: Some(price_cents),
            is_published: true,
        };
        self.create_course(teacher_id, &course).await.unwrap()
    }

    pub fn record_payment(&self, student_id: i64, course_id: i64, status: PaymentStatus) {
        self.tables
            .lock()
            .unwrap()
            .payments
            .push((student_id, course_id, status));
    }

    /// Simulates another request dropping the course price to zero between a
    /// caller's course read and its next content write.
    pub fn drop_price_before_next_content_write(&self, course_id: i64) {
        self.tables.lock().unwrap().price_drop_before_content_write = Some(course_id);
    }

    /// Makes lookups of the user fail as if the store were unreachable.
    pub fn break_user_lookup(&self, user_id: i64) {
        self.tables.lock().unwrap().broken_user_lookups.push(user_id);
    }

    pub fn enrollment_count(&self) -> usize {
        self.tables.lock().unwrap().enrollments.len()
    }

    pub fn stored_contents(&self, course_id: i64) -> Vec<CourseContent> {
        let tables = self.tables.lock().unwrap();
        tables
            .contents
            .iter()
            .filter(|c| c.course_id == course_id)
            .cloned()
            .collect()
    }
}

fn not_found(what: &str, id: i64) -> PortError {
    PortError::NotFound(format!("{} {} not found", what, id))
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
        role: Role,
    ) -> PortResult<User> {
        let mut t = self.tables.lock().unwrap();
        if t.users.iter().any(|(u, _)| u.email == email) {
            return Err(PortError::Conflict(format!("Email {} already registered", email)));
        }
        let user = User {
            id: t.next_id(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            created_at: t.tick(),
        };
        t.users.push((user.clone(), hashed_password.to_string()));
        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: i64) -> PortResult<User> {
        let t = self.tables.lock().unwrap();
        if t.broken_user_lookups.contains(&user_id) {
            return Err(PortError::Unexpected("connection reset".to_string()));
        }
        t.users
            .iter()
            .find(|(u, _)| u.id == user_id)
            .map(|(u, _)| u.clone())
            .ok_or_else(|| not_found("User", user_id))
    }

    async fn get_users_by_ids(&self, user_ids: &[i64]) -> PortResult<Vec<User>> {
        let t = self.tables.lock().unwrap();
        Ok(t.users
            .iter()
            .filter(|(u, _)| user_ids.contains(&u.id))
            .map(|(u, _)| u.clone())
            .collect())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let t = self.tables.lock().unwrap();
        t.users
            .iter()
            .find(|(u, _)| u.email == email)
            .map(|(u, hash)| UserCredentials {
                user_id: u.id,
                email: u.email.clone(),
                hashed_password: hash.clone(),
                role: u.role,
            })
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut t = self.tables.lock().unwrap();
        t.sessions.insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<i64> {
        let t = self.tables.lock().unwrap();
        match t.sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables.lock().unwrap().sessions.remove(session_id);
        Ok(())
    }

    async fn create_course(&self, teacher_id: i64, course: &NewCourse) -> PortResult<Course> {
        let mut t = self.tables.lock().unwrap();
        let now = t.tick();
        let course = Course {
            id: t.next_id(),
            teacher_id,
            title: course.title.clone(),
            description: course.description.clone(),
            price_cents: course.price_cents.unwrap_or(0),
            is_published: course.is_published,
            created_at: now,
            updated_at: now,
        };
        t.courses.push(course.clone());
        Ok(course)
    }

    async fn get_course_by_id(&self, course_id: i64) -> PortResult<Course> {
        let t = self.tables.lock().unwrap();
        t.courses
            .iter()
            .find(|c| c.id == course_id)
            .cloned()
            .ok_or_else(|| not_found("Course", course_id))
    }

    async fn list_courses(&self) -> PortResult<Vec<Course>> {
        Ok(self.tables.lock().unwrap().courses.clone())
    }

    async fn list_courses_by_teacher(&self, teacher_id: i64) -> PortResult<Vec<Course>> {
        let t = self.tables.lock().unwrap();
        Ok(t.courses.iter().filter(|c| c.teacher_id == teacher_id).cloned().collect())
    }

    async fn list_published_courses(&self) -> PortResult<Vec<Course>> {
        let t = self.tables.lock().unwrap();
        Ok(t.courses.iter().filter(|c| c.is_published).cloned().collect())
    }

    async fn update_course(&self, course_id: i64, patch: &CoursePatch) -> PortResult<Course> {
        let mut t = self.tables.lock().unwrap();
        let now = t.tick();
        let stored = t.course_mut(course_id)?;
        patch.apply_to(stored);
        stored.updated_at = now;
        let updated = stored.clone();
        if updated.is_free() {
            t.free_all_content(course_id);
        }
        Ok(updated)
    }

    async fn create_content(
        &self,
        course_id: i64,
        content: &NewContent,
    ) -> PortResult<CourseContent> {
        let mut t = self.tables.lock().unwrap();
        let course_is_free = t.course_is_free_at_write(course_id)?;
        let content = CourseContent {
            id: t.next_id(),
            course_id,
            title: content.title.clone(),
            file_type: content.file_type,
            file_url: content.file_url.clone(),
            duration_seconds: content.duration_seconds,
            is_free: content.is_free || course_is_free,
            created_at: t.tick(),
        };
        t.contents.push(content.clone());
        Ok(content)
    }

    async fn get_content_by_id(&self, content_id: i64) -> PortResult<CourseContent> {
        let t = self.tables.lock().unwrap();
        t.contents
            .iter()
            .find(|c| c.id == content_id)
            .cloned()
            .ok_or_else(|| not_found("Content", content_id))
    }

    async fn list_content_for_course(&self, course_id: i64) -> PortResult<Vec<CourseContent>> {
        let t = self.tables.lock().unwrap();
        let mut contents: Vec<_> =
            t.contents.iter().filter(|c| c.course_id == course_id).cloned().collect();
        contents.sort_by_key(|c| c.id);
        Ok(contents)
    }

    async fn save_content(&self, content: &CourseContent) -> PortResult<CourseContent> {
        let mut t = self.tables.lock().unwrap();
        let course_is_free = t.course_is_free_at_write(content.course_id)?;
        let stored = t
            .contents
            .iter_mut()
            .find(|c| c.id == content.id)
            .ok_or_else(|| not_found("Content", content.id))?;
        *stored = CourseContent {
            is_free: content.is_free || course_is_free,
            ..content.clone()
        };
        Ok(stored.clone())
    }

    async fn create_enrollment(
        &self,
        student_id: i64,
        course_id: i64,
        granted_by: i64,
    ) -> PortResult<Enrollment> {
        let mut t = self.tables.lock().unwrap();
        if t
            .enrollments
            .iter()
            .any(|e| e.student_id == student_id && e.course_id == course_id)
        {
            return Err(PortError::Conflict("Student already enrolled".to_string()));
        }
        let enrollment = Enrollment {
            id: t.next_id(),
            student_id,
            course_id,
            granted_by: Some(granted_by),
            enrolled_at: t.tick(),
        };
        t.enrollments.push(enrollment.clone());
        Ok(enrollment)
    }

    async fn get_enrollment_by_id(&self, enrollment_id: i64) -> PortResult<Enrollment> {
        let t = self.tables.lock().unwrap();
        t.enrollments
            .iter()
            .find(|e| e.id == enrollment_id)
            .cloned()
            .ok_or_else(|| not_found("Enrollment", enrollment_id))
    }

    async fn find_enrollment(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> PortResult<Option<Enrollment>> {
        let t = self.tables.lock().unwrap();
        Ok(t.enrollments
            .iter()
            .find(|e| e.student_id == student_id && e.course_id == course_id)
            .cloned())
    }

    async fn list_enrollments_for_course(&self, course_id: i64) -> PortResult<Vec<Enrollment>> {
        let t = self.tables.lock().unwrap();
        Ok(t.enrollments.iter().filter(|e| e.course_id == course_id).cloned().collect())
    }

    async fn delete_enrollment(&self, enrollment_id: i64) -> PortResult<()> {
        let mut t = self.tables.lock().unwrap();
        let before = t.enrollments.len();
        t.enrollments.retain(|e| e.id != enrollment_id);
        if t.enrollments.len() == before {
            return Err(not_found("Enrollment", enrollment_id));
        }
        Ok(())
    }

    async fn has_successful_payment(&self, student_id: i64, course_id: i64) -> PortResult<bool> {
        let t = self.tables.lock().unwrap();
        Ok(t.payments.iter().any(|(s, c, status)| {
            *s == student_id && *c == course_id && *status == PaymentStatus::Success
        }))
    }

    async fn create_note(&self, author_id: i64, note: &NewNote) -> PortResult<Note> {
        let mut t = self.tables.lock().unwrap();
        let now = t.tick();
        let note = Note {
            id: t.next_id(),
            course_id: note.course_id,
            author_id,
            parent_id: note.parent_id,
            title: note.title.clone(),
            content: note.content.clone(),
            created_at: now,
            updated_at: now,
        };
        t.notes.push(note.clone());
        Ok(note)
    }

    async fn get_note_by_id(&self, note_id: i64) -> PortResult<Note> {
        let t = self.tables.lock().unwrap();
        t.notes
            .iter()
            .find(|n| n.id == note_id)
            .cloned()
            .ok_or_else(|| not_found("Note", note_id))
    }

    async fn list_top_level_notes(&self, course_id: i64) -> PortResult<Vec<Note>> {
        let t = self.tables.lock().unwrap();
        Ok(t.notes
            .iter()
            .filter(|n| n.course_id == course_id && n.parent_id.is_none())
            .cloned()
            .collect())
    }

    async fn list_replies(&self, parent_ids: &[i64]) -> PortResult<Vec<Note>> {
        let t = self.tables.lock().unwrap();
        Ok(t.notes
            .iter()
            .filter(|n| n.parent_id.map_or(false, |p| parent_ids.contains(&p)))
            .cloned()
            .collect())
    }

    async fn save_note(&self, note: &Note) -> PortResult<Note> {
        let mut t = self.tables.lock().unwrap();
        let stored = t
            .notes
            .iter_mut()
            .find(|n| n.id == note.id)
            .ok_or_else(|| not_found("Note", note.id))?;
        *stored = note.clone();
        Ok(stored.clone())
    }
}
