pub mod identity;
pub mod llm;
pub mod store;

pub use identity::SupabaseIdentityAdapter;
pub use llm::OpenAiCompletionAdapter;
pub use store::SupabaseStoreAdapter;
