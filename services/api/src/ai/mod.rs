pub mod assets;
pub mod chat;
pub mod quiz;
pub mod schema;

#[cfg(test)]
pub(crate) mod testing;

pub use assets::AssetService;
pub use chat::{ChatService, REFUSAL_SENTENCE};
pub use quiz::QuizService;
