//! services/api/src/ai/assets.rs
//!
//! The cache-or-generate path for lesson study assets. In steady state a
//! request is one cache read; on a miss (or a forced refresh) the lesson is
//! fetched, the generator invoked, its output validated, and the result
//! upserted keyed on the lesson id. The store is the single source of truth
//! for freshness; `force` is the only invalidation mechanism.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::ai::schema;
use lessonlab_core::domain::{GeneratedAssetBundle, NewAssetBundle};
use lessonlab_core::ports::{
    CompletionRequest, CompletionService, PortError, PortResult, StoreService,
};

/// Sampling temperature for structured generation. Low, so regenerations of
/// the same lesson stay close to deterministic.
const GENERATION_TEMPERATURE: f32 = 0.2;

const GENERATION_SYSTEM_PROMPT: &str =
    "You are an academic examiner. You reply ONLY with valid JSON, in the language of the lesson text.";

const GENERATION_USER_TEMPLATE: &str = r#"You are an academic examiner creating structured study material for one lesson.

RULES:
- Write in the language of the lesson text, academic register.
- Return EXCLUSIVELY valid JSON. No explanation, no markdown, no text outside the JSON.
- Use ONLY information from the provided lesson text.
- If the text is insufficient, return fewer entries but ALWAYS valid JSON.

OUTPUT STRUCTURE (exactly these keys):
{
  "summary": "A concise overview of at most 250 words",
  "flashcards": [
    { "q": "Question", "a": "Answer" }
  ],
  "quiz": [
    {
      "question": "Multiple-choice question",
      "choices": ["Option A", "Option B", "Option C", "Option D"],
      "correct": 0,
      "explanation": "Why the answer is correct"
    }
  ]
}

QUANTITIES:
- summary: exactly 1 text
- flashcards: exactly 8 pairs
- quiz: exactly 5 questions with exactly 4 choices each
- "correct": zero-based index (0, 1, 2 or 3)

LESSON TEXT:
{lesson_content}"#;

//=========================================================================================
// The Orchestrator
//=========================================================================================

/// Decides cache-hit vs. regenerate and owns the whole generation path.
pub struct AssetService {
    store: Arc<dyn StoreService>,
    completions: Arc<dyn CompletionService>,
    /// One guard per lesson id, collapsing concurrent cold-cache requests
    /// into a single generator call. The outer mutex protects only map
    /// mutation; generation for different lessons never contends.
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AssetService {
    pub fn new(store: Arc<dyn StoreService>, completions: Arc<dyn CompletionService>) -> Self {
        Self {
            store,
            completions,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached bundle for the lesson, generating (and caching) a
    /// fresh one on a miss. `force` skips the cache read and always
    /// regenerates. The returned bundle is always the stored row, so callers
    /// observe the canonical timestamps.
    pub async fn get_or_generate(
        &self,
        lesson_id: &str,
        force: bool,
    ) -> PortResult<GeneratedAssetBundle> {
        if !force {
            if let Some(cached) = self.store.get_assets_for_lesson(lesson_id).await? {
                return Ok(cached);
            }
        }

        let guard = self.acquire_guard(lesson_id).await;
        let held = guard.lock().await;
        let result = self.generate_and_store(lesson_id, force).await;
        drop(held);
        self.release_guard(lesson_id, guard).await;
        result
    }

    async fn generate_and_store(
        &self,
        lesson_id: &str,
        force: bool,
    ) -> PortResult<GeneratedAssetBundle> {
        // A concurrent generation may have populated the cache while this
        // request waited on the guard.
        if !force {
            if let Some(cached) = self.store.get_assets_for_lesson(lesson_id).await? {
                return Ok(cached);
            }
        }

        let lesson = self.store.get_lesson_by_id(lesson_id).await?;
        let context = lesson.context_text();
        if context.is_empty() {
            return Err(PortError::EmptyContent);
        }

        let raw = self
            .completions
            .complete(CompletionRequest {
                system_prompt: GENERATION_SYSTEM_PROMPT.to_string(),
                user_prompt: GENERATION_USER_TEMPLATE.replace("{lesson_content}", &context),
                temperature: GENERATION_TEMPERATURE,
                json_output: true,
            })
            .await?;

        // Abort on malformed output; nothing partial is ever persisted.
        let parsed = schema::parse_generated(&raw)?;
        info!(
            lesson_id,
            flashcards = parsed.flashcards.len(),
            quiz = parsed.quiz.len(),
            "persisting generated assets"
        );

        self.store
            .upsert_assets(NewAssetBundle {
                lesson_id: lesson_id.to_string(),
                summary: parsed.summary,
                flashcards: parsed.flashcards,
                quiz: parsed.quiz,
            })
            .await
    }

    async fn acquire_guard(&self, lesson_id: &str) -> Arc<Mutex<()>> {
        let mut map = self.in_flight.lock().await;
        map.entry(lesson_id.to_string()).or_default().clone()
    }

    /// Drops our reference and removes the map entry once no other request
    /// holds it, so the map stays bounded by concurrent lessons rather than
    /// all lessons ever seen.
    async fn release_guard(&self, lesson_id: &str, guard: Arc<Mutex<()>>) {
        drop(guard);
        let mut map = self.in_flight.lock().await;
        if let Some(entry) = map.get(lesson_id) {
            if Arc::strong_count(entry) == 1 {
                map.remove(lesson_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::ai::testing::{sample_bundle, StubGenerator, StubStore};

    const PHOTOSYNTHESIS: &str = "Photosynthesis converts light to chemical energy.";

    /// The §8-style well-formed generator reply used across tests.
    const GOOD_REPLY: &str = r#"{
        "summary": "Light becomes chemical energy.",
        "flashcards": [{"q": "A", "a": "B"}],
        "quiz": [{
            "question": "Q",
            "choices": ["a", "b", "c", "d"],
            "correct": 1,
            "explanation": "E"
        }]
    }"#;

    fn service(store: StubStore, generator: StubGenerator) -> (Arc<StubStore>, Arc<StubGenerator>, AssetService) {
        let store = Arc::new(store);
        let generator = Arc::new(generator);
        let service = AssetService::new(store.clone(), generator.clone());
        (store, generator, service)
    }

    #[tokio::test]
    async fn generates_validates_and_stores_on_cold_cache() {
        let (store, generator, service) = service(
            StubStore::new().with_lesson("L1", "Photosynthesis", Some(PHOTOSYNTHESIS)),
            StubGenerator::replying(GOOD_REPLY),
        );

        let bundle = service.get_or_generate("L1", false).await.unwrap();

        assert_eq!(bundle.lesson_id, "L1");
        assert_eq!(bundle.flashcards.len(), 1);
        assert_eq!(bundle.quiz[0].correct, 1);
        assert_eq!(generator.call_count(), 1);
        assert_eq!(store.bundles.lock().unwrap().len(), 1);

        // The generator saw the lesson text, not just the title.
        let request = generator.last_request();
        assert!(request.user_prompt.contains(PHOTOSYNTHESIS));
        assert!(request.json_output);
        assert_eq!(request.temperature, 0.2);
    }

    #[tokio::test]
    async fn second_call_is_a_cache_hit_without_a_second_generation() {
        let (_, generator, service) = service(
            StubStore::new().with_lesson("L1", "Photosynthesis", Some(PHOTOSYNTHESIS)),
            StubGenerator::replying(GOOD_REPLY),
        );

        let first = service.get_or_generate("L1", false).await.unwrap();
        let second = service.get_or_generate("L1", false).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn cached_bundle_short_circuits_the_generator() {
        let (_, generator, service) = service(
            StubStore::new().with_bundle(sample_bundle("L1")),
            StubGenerator::replying(GOOD_REPLY),
        );

        let bundle = service.get_or_generate("L1", false).await.unwrap();

        assert_eq!(bundle.summary.as_deref(), Some("cached summary"));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn force_refresh_regenerates_and_advances_updated_at() {
        let (store, generator, service) = service(
            StubStore::new().with_lesson("L1", "Photosynthesis", Some(PHOTOSYNTHESIS)),
            StubGenerator::replying(GOOD_REPLY),
        );

        let first = service.get_or_generate("L1", false).await.unwrap();
        let second = service.get_or_generate("L1", true).await.unwrap();

        assert_eq!(generator.call_count(), 2);
        assert!(second.updated_at > first.updated_at);
        // `generated_at` survives the merge; `updated_at` moves.
        assert_eq!(second.generated_at, first.generated_at);
        // Single-bundle invariant: still exactly one row for the lesson.
        assert_eq!(store.bundles.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_lesson_is_not_found() {
        let (_, generator, service) =
            service(StubStore::new(), StubGenerator::replying(GOOD_REPLY));

        let err = service.get_or_generate("L404", false).await.unwrap_err();

        assert!(matches!(err, PortError::NotFound(_)));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_lesson_rejects_before_any_generator_call() {
        let (store, generator, service) = service(
            StubStore::new().with_lesson("L1", "  ", None),
            StubGenerator::replying(GOOD_REPLY),
        );

        let err = service.get_or_generate("L1", false).await.unwrap_err();

        assert!(matches!(err, PortError::EmptyContent));
        assert_eq!(generator.call_count(), 0);
        assert_eq!(store.upsert_count.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_output_aborts_and_leaves_the_cache_untouched() {
        let cached = sample_bundle("L1");
        let (store, _, service) = service(
            StubStore::new()
                .with_lesson("L1", "Photosynthesis", Some(PHOTOSYNTHESIS))
                .with_bundle(cached.clone()),
            StubGenerator::replying("I could not produce JSON today."),
        );

        let err = service.get_or_generate("L1", true).await.unwrap_err();

        assert!(matches!(err, PortError::MalformedOutput(_)));
        let bundles = store.bundles.lock().unwrap();
        assert_eq!(bundles.get("L1"), Some(&cached));
    }

    #[tokio::test]
    async fn generator_failure_persists_nothing() {
        let (store, _, service) = service(
            StubStore::new().with_lesson("L1", "Photosynthesis", Some(PHOTOSYNTHESIS)),
            StubGenerator::failing("provider overloaded"),
        );

        let err = service.get_or_generate("L1", false).await.unwrap_err();

        assert!(matches!(err, PortError::Generator(_)));
        assert!(store.bundles.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_misses_share_a_single_generation() {
        let (store, generator, service) = service(
            StubStore::new().with_lesson("L1", "Photosynthesis", Some(PHOTOSYNTHESIS)),
            StubGenerator::replying(GOOD_REPLY).with_delay(Duration::from_millis(50)),
        );
        let service = Arc::new(service);

        let a = {
            let service = service.clone();
            tokio::spawn(async move { service.get_or_generate("L1", false).await })
        };
        let b = {
            let service = service.clone();
            tokio::spawn(async move { service.get_or_generate("L1", false).await })
        };

        let first = a.await.unwrap().unwrap();
        let second = b.await.unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(generator.call_count(), 1);
        assert_eq!(store.upsert_count.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
