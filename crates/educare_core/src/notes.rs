//! crates/educare_core/src/notes.rs
//!
//! Threaded course discussion. Notes form a tree through `parent_id`; reads
//! expand one level of replies under each top-level note.

use crate::domain::{AuthoredNote, Caller, NewNote, Note, NotePatch, NoteThread};
use crate::ports::{DatabaseService, PortError, PortResult};
use chrono::Utc;
use std::collections::HashMap;

/// Posts a note, or a reply when `parent_id` is set. Any note of the same
/// course can be replied to.
pub async fn add_note(
    db: &dyn DatabaseService,
    caller: &Caller,
    note: NewNote,
) -> PortResult<NoteThread> {
    db.get_course_by_id(note.course_id).await?;
    if let Some(parent_id) = note.parent_id {
        let parent = db.get_note_by_id(parent_id).await?;
        if parent.course_id != note.course_id {
            return Err(PortError::Validation(format!(
                "Note {} belongs to another course",
                parent_id
            )));
        }
    }

    let saved = db.create_note(caller.user_id, &note).await?;
    let author = db.get_user_by_id(caller.user_id).await?;
    Ok(NoteThread {
        root: AuthoredNote {
            note: saved,
            author_name: author.name,
        },
        replies: Vec::new(),
    })
}

/// Top-level notes of a course, each with its direct replies, oldest first.
pub async fn list_top_level_notes(
    db: &dyn DatabaseService,
    course_id: i64,
) -> PortResult<Vec<NoteThread>> {
    let roots = db.list_top_level_notes(course_id).await?;
    build_threads(db, roots).await
}

pub async fn get_note(db: &dyn DatabaseService, note_id: i64) -> PortResult<NoteThread> {
    let note = db.get_note_by_id(note_id).await?;
    let mut threads = build_threads(db, vec![note]).await?;
    threads
        .pop()
        .ok_or_else(|| PortError::NotFound(format!("Note {} not found", note_id)))
}

/// Patches a note. Only its author may edit it.
pub async fn update_note(
    db: &dyn DatabaseService,
    caller: &Caller,
    note_id: i64,
    patch: NotePatch,
) -> PortResult<NoteThread> {
    let mut note = db.get_note_by_id(note_id).await?;
    if note.author_id != caller.user_id {
        return Err(PortError::Forbidden(
            "You are not authorized to edit this note".to_string(),
        ));
    }

    if let Some(title) = patch.title {
        note.title = Some(title);
    }
    if let Some(content) = patch.content {
        note.content = content;
    }
    note.updated_at = Utc::now();

    let saved = db.save_note(&note).await?;
    let mut threads = build_threads(db, vec![saved]).await?;
    threads
        .pop()
        .ok_or_else(|| PortError::NotFound(format!("Note {} not found", note_id)))
}

async fn build_threads(db: &dyn DatabaseService, roots: Vec<Note>) -> PortResult<Vec<NoteThread>> {
    if roots.is_empty() {
        return Ok(Vec::new());
    }
    let root_ids: Vec<i64> = roots.iter().map(|n| n.id).collect();
    let replies = db.list_replies(&root_ids).await?;

    let mut author_ids: Vec<i64> = roots
        .iter()
        .chain(replies.iter())
        .map(|n| n.author_id)
        .collect();
    author_ids.sort_unstable();
    author_ids.dedup();
    let names: HashMap<i64, String> = db
        .get_users_by_ids(&author_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();
    let authored = |note: Note| AuthoredNote {
        author_name: names.get(&note.author_id).cloned().unwrap_or_default(),
        note,
    };

    let mut by_parent: HashMap<i64, Vec<Note>> = HashMap::new();
    for reply in replies {
        if let Some(parent_id) = reply.parent_id {
            by_parent.entry(parent_id).or_default().push(reply);
        }
    }

    Ok(roots
        .into_iter()
        .map(|root| {
            let mut children = by_parent.remove(&root.id).unwrap_or_default();
            children.sort_by_key(|n| (n.created_at, n.id));
            NoteThread {
                replies: children.into_iter().map(&authored).collect(),
                root: authored(root),
            }
        })
        .collect())
}
