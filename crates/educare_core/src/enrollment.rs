//! crates/educare_core/src/enrollment.rs
//!
//! Teacher-granted free access to courses.

use crate::domain::{Caller, Course, Enrollment, EnrollmentView, User};
use crate::ports::{DatabaseService, PortError, PortResult};
use futures::future::try_join_all;

/// Grants a student free access to a course owned by the granting teacher.
///
/// The pre-insert lookup only produces a friendlier error; the store's unique
/// (student, course) constraint still reports a racing duplicate as `Conflict`.
pub async fn grant_free_access(
    db: &dyn DatabaseService,
    teacher: &Caller,
    course_id: i64,
    student_id: i64,
) -> PortResult<EnrollmentView> {
    let course = db.get_course_by_id(course_id).await?;
    if course.teacher_id != teacher.user_id {
        return Err(PortError::Forbidden(
            "You are not the teacher of this course".to_string(),
        ));
    }
    let student = db.get_user_by_id(student_id).await?;

    if db.find_enrollment(student_id, course_id).await?.is_some() {
        return Err(PortError::Conflict("Student already enrolled".to_string()));
    }

    let enrollment = db
        .create_enrollment(student_id, course_id, teacher.user_id)
        .await?;
    let grantor = find_user(db, teacher.user_id).await?;

    Ok(to_view(enrollment, &student, &course, grantor.as_ref()))
}

/// Deletes an enrollment. Only the teacher who granted it may do so.
pub async fn revoke_free_access(
    db: &dyn DatabaseService,
    teacher: &Caller,
    enrollment_id: i64,
) -> PortResult<()> {
    let enrollment = db.get_enrollment_by_id(enrollment_id).await?;
    if enrollment.granted_by != Some(teacher.user_id) {
        return Err(PortError::Forbidden(
            "You are not authorized to revoke this enrollment".to_string(),
        ));
    }
    db.delete_enrollment(enrollment_id).await
}

pub async fn get_enrollment(
    db: &dyn DatabaseService,
    enrollment_id: i64,
) -> PortResult<EnrollmentView> {
    let enrollment = db.get_enrollment_by_id(enrollment_id).await?;
    let course = db.get_course_by_id(enrollment.course_id).await?;
    resolve_view(db, enrollment, &course).await
}

pub async fn list_enrollments_by_course(
    db: &dyn DatabaseService,
    course_id: i64,
) -> PortResult<Vec<EnrollmentView>> {
    let course = db.get_course_by_id(course_id).await?;
    let enrollments = db.list_enrollments_for_course(course_id).await?;
    try_join_all(
        enrollments
            .into_iter()
            .map(|enrollment| resolve_view(db, enrollment, &course)),
    )
    .await
}

async fn resolve_view(
    db: &dyn DatabaseService,
    enrollment: Enrollment,
    course: &Course,
) -> PortResult<EnrollmentView> {
    let student = db.get_user_by_id(enrollment.student_id).await?;
    let grantor = match enrollment.granted_by {
        Some(id) => find_user(db, id).await?,
        None => None,
    };
    Ok(to_view(enrollment, &student, course, grantor.as_ref()))
}

/// A missing grantor leaves the name blank; any other failure is reported.
async fn find_user(db: &dyn DatabaseService, user_id: i64) -> PortResult<Option<User>> {
    match db.get_user_by_id(user_id).await {
        Ok(user) => Ok(Some(user)),
        Err(PortError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

fn to_view(
    enrollment: Enrollment,
    student: &User,
    course: &Course,
    grantor: Option<&User>,
) -> EnrollmentView {
    EnrollmentView {
        id: enrollment.id,
        student_id: student.id,
        student_name: student.name.clone(),
        course_id: course.id,
        course_title: course.title.clone(),
        granted_by_id: enrollment.granted_by,
        granted_by_name: grantor.map(|u| u.name.clone()),
        enrolled_at: enrollment.enrolled_at,
    }
}
