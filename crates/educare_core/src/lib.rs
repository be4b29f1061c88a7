pub mod access;
pub mod catalog;
pub mod domain;
pub mod enrollment;
pub mod notes;
pub mod ports;

#[cfg(test)]
mod testing;

pub use domain::{
    AuthoredNote, Caller, ContentPatch, Course, CourseContent, CoursePatch, Enrollment,
    EnrollmentView, FileType, NewContent, NewCourse, NewNote, Note, NotePatch, NoteThread,
    PaymentStatus, Role, User, UserCredentials,
};
pub use ports::{DatabaseService, FileStorageService, PortError, PortResult};
