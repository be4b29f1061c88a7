//! crates/educare_core/src/catalog.rs
//!
//! Course creation, listing and editing.

use crate::access::ensure_can_manage;
use crate::domain::{Caller, Course, CoursePatch, NewCourse};
use crate::ports::{DatabaseService, PortError, PortResult};

pub async fn add_course(
    db: &dyn DatabaseService,
    caller: &Caller,
    mut course: NewCourse,
) -> PortResult<Course> {
    if !caller.role.is_staff() {
        return Err(PortError::Forbidden(
            "Only teachers can create courses".to_string(),
        ));
    }
    let price = course.price_cents.unwrap_or(0);
    validate_price(price)?;
    course.price_cents = Some(price);

    db.create_course(caller.user_id, &course).await
}

pub async fn list_courses(db: &dyn DatabaseService) -> PortResult<Vec<Course>> {
    db.list_courses().await
}

pub async fn list_courses_by_teacher(
    db: &dyn DatabaseService,
    teacher_id: i64,
) -> PortResult<Vec<Course>> {
    db.list_courses_by_teacher(teacher_id).await
}

pub async fn list_published_courses(db: &dyn DatabaseService) -> PortResult<Vec<Course>> {
    db.list_published_courses().await
}

/// Unpublished courses are invisible in the student catalog.
pub async fn get_published_course(db: &dyn DatabaseService, course_id: i64) -> PortResult<Course> {
    let course = db.get_course_by_id(course_id).await?;
    if !course.is_published {
        return Err(PortError::NotFound(format!(
            "Course {} not found or not published",
            course_id
        )));
    }
    Ok(course)
}

/// Applies a partial update. Dropping the price to zero frees all existing content.
pub async fn update_course(
    db: &dyn DatabaseService,
    caller: &Caller,
    course_id: i64,
    patch: CoursePatch,
) -> PortResult<Course> {
    // Ownership never changes, so this read only serves the permission check.
    let course = db.get_course_by_id(course_id).await?;
    ensure_can_manage(caller, &course)?;
    if let Some(price) = patch.price_cents {
        validate_price(price)?;
    }

    db.update_course(course_id, &patch).await
}

fn validate_price(price_cents: i64) -> PortResult<()> {
    if price_cents < 0 {
        return Err(PortError::Validation(
            "Course price must not be negative".to_string(),
        ));
    }
    Ok(())
}
