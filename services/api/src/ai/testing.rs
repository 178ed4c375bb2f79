//! services/api/src/ai/testing.rs
//!
//! Stub port implementations shared by the service test modules. The store
//! stub mimics the remote store's merge-duplicates semantics closely enough
//! to exercise the cache/generate contract: one row per lesson,
//! `generated_at` preserved across merges, `updated_at` strictly increasing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use lessonlab_core::domain::{
    Flashcard, GeneratedAssetBundle, Lesson, NewAssetBundle, NewQuizAttempt, QuizAttempt, QuizItem,
};
use lessonlab_core::ports::{
    CompletionRequest, CompletionService, PortError, PortResult, StoreService,
};

/// Deterministic timestamps so "strictly increases" is assertable.
pub fn tick_time(tick: usize) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + tick as i64, 0).unwrap()
}

pub fn sample_bundle(lesson_id: &str) -> GeneratedAssetBundle {
    GeneratedAssetBundle {
        lesson_id: lesson_id.to_string(),
        summary: Some("cached summary".to_string()),
        flashcards: vec![Flashcard {
            question: "cached q".to_string(),
            answer: "cached a".to_string(),
        }],
        quiz: vec![QuizItem {
            question: "cached quiz".to_string(),
            choices: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct: 0,
            explanation: "cached e".to_string(),
        }],
        generated_at: tick_time(0),
        updated_at: tick_time(0),
    }
}

pub struct StubStore {
    pub lessons: HashMap<String, Lesson>,
    pub bundles: Mutex<HashMap<String, GeneratedAssetBundle>>,
    pub attempts: Mutex<Vec<QuizAttempt>>,
    pub upsert_count: AtomicUsize,
    ticks: AtomicUsize,
}

impl StubStore {
    pub fn new() -> Self {
        Self {
            lessons: HashMap::new(),
            bundles: Mutex::new(HashMap::new()),
            attempts: Mutex::new(Vec::new()),
            upsert_count: AtomicUsize::new(0),
            ticks: AtomicUsize::new(1),
        }
    }

    pub fn with_lesson(mut self, id: &str, title: &str, content: Option<&str>) -> Self {
        self.lessons.insert(
            id.to_string(),
            Lesson {
                id: id.to_string(),
                title: title.to_string(),
                content: content.map(str::to_string),
            },
        );
        self
    }

    pub fn with_bundle(self, bundle: GeneratedAssetBundle) -> Self {
        self.bundles
            .lock()
            .unwrap()
            .insert(bundle.lesson_id.clone(), bundle);
        self
    }

    fn next_tick(&self) -> usize {
        self.ticks.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreService for StubStore {
    async fn get_lesson_by_id(&self, lesson_id: &str) -> PortResult<Lesson> {
        self.lessons
            .get(lesson_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Lesson {lesson_id} not found")))
    }

    async fn get_assets_for_lesson(
        &self,
        lesson_id: &str,
    ) -> PortResult<Option<GeneratedAssetBundle>> {
        Ok(self.bundles.lock().unwrap().get(lesson_id).cloned())
    }

    async fn upsert_assets(&self, bundle: NewAssetBundle) -> PortResult<GeneratedAssetBundle> {
        self.upsert_count.fetch_add(1, Ordering::SeqCst);
        let tick = self.next_tick();
        let mut bundles = self.bundles.lock().unwrap();
        let generated_at = bundles
            .get(&bundle.lesson_id)
            .map(|existing| existing.generated_at)
            .unwrap_or_else(|| tick_time(tick));
        let stored = GeneratedAssetBundle {
            lesson_id: bundle.lesson_id.clone(),
            summary: bundle.summary,
            flashcards: bundle.flashcards,
            quiz: bundle.quiz,
            generated_at,
            updated_at: tick_time(tick),
        };
        bundles.insert(bundle.lesson_id.clone(), stored.clone());
        Ok(stored)
    }

    async fn save_quiz_attempt(&self, attempt: NewQuizAttempt) -> PortResult<QuizAttempt> {
        let stored = QuizAttempt {
            id: Uuid::new_v4(),
            user_id: attempt.user_id,
            lesson_id: attempt.lesson_id,
            answers: attempt.answers,
            score: attempt.score,
            completed_at: tick_time(self.next_tick()),
        };
        self.attempts.lock().unwrap().push(stored.clone());
        Ok(stored)
    }
}

pub struct StubGenerator {
    reply: String,
    fail_with: Option<String>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl StubGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail_with: None,
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::replying("")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> CompletionRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no completion request was captured")
    }
}

#[async_trait]
impl CompletionService for StubGenerator {
    async fn complete(&self, request: CompletionRequest) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.fail_with {
            Some(message) => Err(PortError::Generator(message.clone())),
            None => Ok(self.reply.clone()),
        }
    }
}
