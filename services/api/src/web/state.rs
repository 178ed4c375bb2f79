//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use crate::ai::{AssetService, ChatService, QuizService};
use crate::config::Config;
use lessonlab_core::ports::IdentityService;

/// The shared application state, created once at startup and passed to all
/// handlers. Requests share nothing else; each runs as its own task.
pub struct AppState {
    pub config: Arc<Config>,
    pub identity: Arc<dyn IdentityService>,
    pub assets: AssetService,
    pub chat: ChatService,
    pub quiz: QuizService,
}
