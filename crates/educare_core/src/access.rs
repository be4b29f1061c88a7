//! crates/educare_core/src/access.rs
//!
//! Content visibility rules and the content write paths that keep the
//! free-course invariant intact.
//!
//! A student sees a content item when the item is flagged free, when its course
//! costs nothing, or when the student holds a `SUCCESS` payment for the course.
//! Teachers and admins see everything.

use crate::domain::{Caller, ContentPatch, Course, CourseContent, NewContent, Role};
use crate::ports::{DatabaseService, PortError, PortResult};

/// Whether a single item is visible to a student, given the course and their payment state.
pub fn is_visible_to_student(content: &CourseContent, course: &Course, has_paid: bool) -> bool {
    content.is_free || course.is_free() || has_paid
}

/// Lists the content of a course the caller is allowed to retrieve, ordered by id.
///
/// Students get `NotFound` for unpublished courses, like the single-item fetch.
pub async fn list_accessible_content(
    db: &dyn DatabaseService,
    caller: &Caller,
    course_id: i64,
) -> PortResult<Vec<CourseContent>> {
    let course = db.get_course_by_id(course_id).await?;
    if !caller.role.is_staff() && !course.is_published {
        return Err(PortError::NotFound(format!(
            "Course {} not found or not published",
            course_id
        )));
    }
    let contents = db.list_content_for_course(course_id).await?;

    if caller.role.is_staff() {
        return Ok(contents);
    }

    // Skip the ledger lookup when the course is free anyway.
    let has_paid = !course.is_free()
        && db.has_successful_payment(caller.user_id, course_id).await?;

    Ok(contents
        .into_iter()
        .filter(|c| c.course_id == course_id && is_visible_to_student(c, &course, has_paid))
        .collect())
}

/// Fetches one content item of a course for the student catalog view.
///
/// Students only reach items of published courses that pass the visibility rule.
/// Hidden items are reported as `NotFound` so their existence is not revealed.
pub async fn get_accessible_content_item(
    db: &dyn DatabaseService,
    caller: &Caller,
    course_id: i64,
    content_id: i64,
) -> PortResult<CourseContent> {
    let course = db.get_course_by_id(course_id).await?;
    let content = find_in_course(db, course_id, content_id).await?;

    if caller.role.is_staff() {
        return Ok(content);
    }

    let hidden = || PortError::NotFound(format!("Content {} not found", content_id));
    if !course.is_published {
        return Err(hidden());
    }
    if content.is_free || course.is_free() {
        return Ok(content);
    }
    if db.has_successful_payment(caller.user_id, course_id).await? {
        Ok(content)
    } else {
        Err(hidden())
    }
}

pub async fn get_content(db: &dyn DatabaseService, content_id: i64) -> PortResult<CourseContent> {
    db.get_content_by_id(content_id).await
}

/// Adds a content item to a course.
///
/// Content of a zero-price course is always stored as free, whatever the
/// caller asked for. The store re-checks the price at write time, so a price
/// drop racing this call cannot leave a paid item behind.
pub async fn add_content(
    db: &dyn DatabaseService,
    caller: &Caller,
    course_id: i64,
    mut content: NewContent,
) -> PortResult<CourseContent> {
    let course = db.get_course_by_id(course_id).await?;
    ensure_can_manage(caller, &course)?;

    content.is_free = content.is_free || course.is_free();
    db.create_content(course_id, &content).await
}

/// Overwrites the provided fields of a content item.
///
/// The item must belong to `course_id`; ids from other courses are rejected
/// as `NotFound`. The free-course override is applied here as well.
pub async fn update_content(
    db: &dyn DatabaseService,
    caller: &Caller,
    course_id: i64,
    content_id: i64,
    patch: ContentPatch,
) -> PortResult<CourseContent> {
    let course = db.get_course_by_id(course_id).await?;
    let mut content = find_in_course(db, course_id, content_id).await?;
    ensure_can_manage(caller, &course)?;

    if let Some(title) = patch.title {
        content.title = title;
    }
    if let Some(file_type) = patch.file_type {
        content.file_type = file_type;
    }
    if let Some(file_url) = patch.file_url {
        content.file_url = file_url;
    }
    if let Some(duration) = patch.duration_seconds {
        content.duration_seconds = Some(duration);
    }
    if let Some(is_free) = patch.is_free {
        content.is_free = is_free;
    }
    content.is_free = content.is_free || course.is_free();

    db.save_content(&content).await
}

/// Only the owning teacher or an admin may change a course or its content.
pub(crate) fn ensure_can_manage(caller: &Caller, course: &Course) -> PortResult<()> {
    match caller.role {
        Role::Admin => Ok(()),
        Role::Teacher if course.teacher_id == caller.user_id => Ok(()),
        _ => Err(PortError::Forbidden(format!(
            "User {} does not own course {}",
            caller.user_id, course.id
        ))),
    }
}

async fn find_in_course(
    db: &dyn DatabaseService,
    course_id: i64,
    content_id: i64,
) -> PortResult<CourseContent> {
    let content = db.get_content_by_id(content_id).await?;
    if content.course_id != course_id {
        return Err(PortError::NotFound(format!(
            "Content {} not found in course {}",
            content_id, course_id
        )));
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CoursePatch, FileType, PaymentStatus};
    use crate::testing::InMemoryDb;

    fn video(title: &str, is_free: bool) -> NewContent {
        NewContent {
            title: title.to_string(),
            file_type: FileType::Video,
            file_url: format!("/uploads/{}.mp4", title),
            duration_seconds: Some(600),
            is_free,
        }
    }

    struct Fixture {
        db: InMemoryDb,
        teacher: Caller,
        student: Caller,
    }

    async fn fixture() -> Fixture {
        let db = InMemoryDb::new();
        let teacher = db.user("Tara", Role::Teacher).await;
        let student = db.user("Sam", Role::Student).await;
        Fixture {
            teacher: Caller::new(teacher.id, Role::Teacher),
            student: Caller::new(student.id, Role::Student),
            db,
        }
    }

    #[tokio::test]
    async fn free_course_forces_content_free() {
        let f = fixture().await;
        let course = f.db.course(f.teacher.user_id, 0).await;

        let saved = add_content(&f.db, &f.teacher, course.id, video("intro", false))
            .await
            .unwrap();

        assert!(saved.is_free);
        assert!(f.db.stored_contents(course.id).iter().all(|c| c.is_free));
    }

    #[tokio::test]
    async fn paid_course_keeps_requested_flag() {
        let f = fixture().await;
        let course = f.db.course(f.teacher.user_id, 4999).await;

        let paid = add_content(&f.db, &f.teacher, course.id, video("deep", false))
            .await
            .unwrap();
        let free = add_content(&f.db, &f.teacher, course.id, video("teaser", true))
            .await
            .unwrap();

        assert!(!paid.is_free);
        assert!(free.is_free);
    }

    #[tokio::test]
    async fn add_content_to_missing_course_is_not_found() {
        let f = fixture().await;
        let result = add_content(&f.db, &f.teacher, 9999, video("x", true)).await;
        assert!(matches!(result, Err(PortError::NotFound(_))));
    }

    #[tokio::test]
    async fn add_content_requires_course_owner() {
        let f = fixture().await;
        let other = f.db.user("Olga", Role::Teacher).await;
        let course = f.db.course(other.id, 4999).await;

        let result = add_content(&f.db, &f.teacher, course.id, video("x", true)).await;
        assert!(matches!(result, Err(PortError::Forbidden(_))));

        let admin = Caller::new(f.db.user("Ada", Role::Admin).await.id, Role::Admin);
        assert!(add_content(&f.db, &admin, course.id, video("y", true)).await.is_ok());
    }

    #[tokio::test]
    async fn unpaid_student_sees_only_free_items() {
        let f = fixture().await;
        let course = f.db.course(f.teacher.user_id, 4999).await;
        let teaser = add_content(&f.db, &f.teacher, course.id, video("teaser", true))
            .await
            .unwrap();
        let paid = add_content(&f.db, &f.teacher, course.id, video("lesson", false))
            .await
            .unwrap();

        let visible = list_accessible_content(&f.db, &f.student, course.id).await.unwrap();
        assert_eq!(visible, vec![teaser.clone()]);

        let staff_view = list_accessible_content(&f.db, &f.teacher, course.id).await.unwrap();
        assert_eq!(staff_view, vec![teaser, paid]);
    }

    #[tokio::test]
    async fn successful_payment_unlocks_everything() {
        let f = fixture().await;
        let course = f.db.course(f.teacher.user_id, 4999).await;
        add_content(&f.db, &f.teacher, course.id, video("a", true)).await.unwrap();
        add_content(&f.db, &f.teacher, course.id, video("b", false)).await.unwrap();
        add_content(&f.db, &f.teacher, course.id, video("c", false)).await.unwrap();
        f.db.record_payment(f.student.user_id, course.id, PaymentStatus::Success);

        let visible = list_accessible_content(&f.db, &f.student, course.id).await.unwrap();
        assert_eq!(visible.len(), 3);
        assert!(visible.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn non_success_payments_grant_nothing() {
        let f = fixture().await;
        let course = f.db.course(f.teacher.user_id, 4999).await;
        add_content(&f.db, &f.teacher, course.id, video("b", false)).await.unwrap();

        for status in [PaymentStatus::Created, PaymentStatus::Failed, PaymentStatus::Refunded] {
            f.db.record_payment(f.student.user_id, course.id, status);
        }
        // A success for another course does not count either.
        let other = f.db.course(f.teacher.user_id, 4999).await;
        f.db.record_payment(f.student.user_id, other.id, PaymentStatus::Success);

        let visible = list_accessible_content(&f.db, &f.student, course.id).await.unwrap();
        assert!(visible.is_empty());
    }

    #[tokio::test]
    async fn listing_never_mixes_courses() {
        let f = fixture().await;
        let first = f.db.course(f.teacher.user_id, 0).await;
        let second = f.db.course(f.teacher.user_id, 0).await;
        add_content(&f.db, &f.teacher, first.id, video("one", true)).await.unwrap();
        add_content(&f.db, &f.teacher, second.id, video("two", true)).await.unwrap();

        let visible = list_accessible_content(&f.db, &f.student, first.id).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert!(visible.iter().all(|c| c.course_id == first.id));
    }

    #[tokio::test]
    async fn visibility_matches_rule_for_every_combination() {
        for price in [0, 4999] {
            for paid in [false, true] {
                let f = fixture().await;
                let course = f.db.course(f.teacher.user_id, price).await;
                let free_item = add_content(&f.db, &f.teacher, course.id, video("f", true))
                    .await
                    .unwrap();
                let paid_item = add_content(&f.db, &f.teacher, course.id, video("p", false))
                    .await
                    .unwrap();
                if paid {
                    f.db.record_payment(f.student.user_id, course.id, PaymentStatus::Success);
                }

                let visible = list_accessible_content(&f.db, &f.student, course.id)
                    .await
                    .unwrap();
                for item in [&free_item, &paid_item] {
                    let expected = item.is_free || price == 0 || paid;
                    assert_eq!(visible.contains(item), expected, "price={} paid={}", price, paid);
                }
            }
        }
    }

    #[tokio::test]
    async fn update_rejects_content_of_another_course() {
        let f = fixture().await;
        let first = f.db.course(f.teacher.user_id, 4999).await;
        let second = f.db.course(f.teacher.user_id, 4999).await;
        let item = add_content(&f.db, &f.teacher, first.id, video("a", false)).await.unwrap();

        let patch = ContentPatch {
            title: Some("moved".to_string()),
            ..Default::default()
        };
        let result = update_content(&f.db, &f.teacher, second.id, item.id, patch).await;
        assert!(matches!(result, Err(PortError::NotFound(_))));
        assert_eq!(f.db.get_content_by_id(item.id).await.unwrap().title, "a");
    }

    #[tokio::test]
    async fn update_overwrites_fields_and_keeps_free_course_invariant() {
        let f = fixture().await;
        let course = f.db.course(f.teacher.user_id, 0).await;
        let item = add_content(&f.db, &f.teacher, course.id, video("a", true)).await.unwrap();

        let patch = ContentPatch {
            title: Some("Slides".to_string()),
            file_type: Some(FileType::Ppt),
            file_url: Some("/uploads/slides.pptx".to_string()),
            duration_seconds: None,
            is_free: Some(false),
        };
        let updated = update_content(&f.db, &f.teacher, course.id, item.id, patch)
            .await
            .unwrap();

        assert_eq!(updated.title, "Slides");
        assert_eq!(updated.file_type, FileType::Ppt);
        assert_eq!(updated.duration_seconds, Some(600));
        assert!(updated.is_free);
    }

    #[tokio::test]
    async fn single_item_fetch_hides_paid_content() {
        let f = fixture().await;
        let course = f.db.course(f.teacher.user_id, 4999).await;
        let paid = add_content(&f.db, &f.teacher, course.id, video("p", false)).await.unwrap();

        let hidden = get_accessible_content_item(&f.db, &f.student, course.id, paid.id).await;
        assert!(matches!(hidden, Err(PortError::NotFound(_))));

        f.db.record_payment(f.student.user_id, course.id, PaymentStatus::Success);
        let shown = get_accessible_content_item(&f.db, &f.student, course.id, paid.id)
            .await
            .unwrap();
        assert_eq!(shown.id, paid.id);
    }

    #[tokio::test]
    async fn price_drop_during_add_still_stores_item_free() {
        let f = fixture().await;
        let course = f.db.course(f.teacher.user_id, 4999).await;
        f.db.drop_price_before_next_content_write(course.id);

        let saved = add_content(&f.db, &f.teacher, course.id, video("late", false))
            .await
            .unwrap();

        assert_eq!(f.db.get_course_by_id(course.id).await.unwrap().price_cents, 0);
        assert!(saved.is_free);
        assert!(f.db.stored_contents(course.id).iter().all(|c| c.is_free));
    }

    #[tokio::test]
    async fn price_drop_during_update_still_stores_item_free() {
        let f = fixture().await;
        let course = f.db.course(f.teacher.user_id, 4999).await;
        let item = add_content(&f.db, &f.teacher, course.id, video("a", false)).await.unwrap();
        f.db.drop_price_before_next_content_write(course.id);

        let patch = ContentPatch {
            title: Some("renamed".to_string()),
            ..Default::default()
        };
        let updated = update_content(&f.db, &f.teacher, course.id, item.id, patch)
            .await
            .unwrap();

        assert_eq!(updated.title, "renamed");
        assert!(updated.is_free);
    }

    #[tokio::test]
    async fn students_cannot_list_unpublished_course() {
        let f = fixture().await;
        let course = f.db.course(f.teacher.user_id, 4999).await;
        add_content(&f.db, &f.teacher, course.id, video("teaser", true)).await.unwrap();
        let unpublish = CoursePatch {
            is_published: Some(false),
            ..Default::default()
        };
        f.db.update_course(course.id, &unpublish).await.unwrap();

        let listed = list_accessible_content(&f.db, &f.student, course.id).await;
        assert!(matches!(listed, Err(PortError::NotFound(_))));

        let staff_view = list_accessible_content(&f.db, &f.teacher, course.id).await.unwrap();
        assert_eq!(staff_view.len(), 1);
    }
}
