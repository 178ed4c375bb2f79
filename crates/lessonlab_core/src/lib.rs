pub mod domain;
pub mod ports;

pub use domain::{
    score_quiz, AuthUser, Flashcard, GeneratedAssetBundle, Lesson, NewAssetBundle,
    NewQuizAttempt, QuizAnswer, QuizAttempt, QuizItem,
};
pub use ports::{
    CompletionRequest, CompletionService, IdentityService, PortError, PortResult, StoreService,
};
