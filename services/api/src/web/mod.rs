pub mod auth;
pub mod courses;
pub mod dto;
pub mod enrollments;
pub mod middleware;
pub mod notes;
pub mod rest;
pub mod state;

// Re-export the pieces the binary needs to build the web server router.
pub use middleware::require_auth;
pub use rest::ApiDoc;
pub use state::AppState;
