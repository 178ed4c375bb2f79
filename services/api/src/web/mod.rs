pub mod middleware;
pub mod rest;
pub mod state;

// Re-export the handlers and middleware so the binary that builds the web
// server router can reach them directly.
pub use middleware::require_auth;
pub use rest::{generate_lesson_assets_handler, lesson_chat_handler, submit_quiz_handler};
