//! Question answering backed by the response cache
//!
//! Every call is tracked as a single-step `qa` session. Cached answers never
//! reach the model; misses are classified, sent to the model under a timeout
//! and stored with the cache's default TTL.

mod classifier;

pub use classifier::{KeywordClassifier, PromptStyle, QuestionClassifier};

use crate::cache::{ResponseCache, qa_key};
use crate::config::QaConfig;
use crate::error::{BuddyError, BuddyResult};
use crate::llm::{ModelClient, Prompt};
use crate::session::{SessionId, SessionKind, SessionStore, Status, StepId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const STAGE: &str = "qa";

/// Result of answering one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaAnswer {
    pub text: String,
    pub cached: bool,
    pub is_technical: bool,
    pub latency_ms: u64,
    pub session_id: SessionId,
}

/// Running totals for answered questions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QaStatistics {
    pub total_answers: u64,
    pub cached_answers: u64,
    pub failed_answers: u64,
    pub total_latency_ms: u64,
}

impl QaStatistics {
    /// Mean latency over successful answers
    pub fn average_latency_ms(&self) -> f64 {
        if self.total_answers == 0 {
            0.0
        } else {
            self.total_latency_ms as f64 / self.total_answers as f64
        }
    }

    /// Share of successful answers served from the cache
    pub fn cache_ratio(&self) -> f64 {
        if self.total_answers == 0 {
            0.0
        } else {
            self.cached_answers as f64 / self.total_answers as f64
        }
    }
}

/// Q&A service
pub struct QaService {
    store: Arc<SessionStore>,
    cache: Arc<ResponseCache>,
    model: Arc<dyn ModelClient>,
    classifier: Arc<dyn QuestionClassifier>,
    config: QaConfig,
    stats: Mutex<QaStatistics>,
}

impl QaService {
    pub fn new(
        store: Arc<SessionStore>,
        cache: Arc<ResponseCache>,
        model: Arc<dyn ModelClient>,
        config: QaConfig,
    ) -> Self {
        Self {
            store,
            cache,
            model,
            classifier: Arc::new(KeywordClassifier::default()),
            config,
            stats: Mutex::new(QaStatistics::default()),
        }
    }

    /// Replace the technical/general heuristic
    pub fn with_classifier(mut self, classifier: Arc<dyn QuestionClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Answer a question without extra context
    pub async fn answer(&self, question: &str) -> BuddyResult<QaAnswer> {
        self.answer_with_context(question, None).await
    }

    /// Answer a question, folding optional caller context into prompt and key
    pub async fn answer_with_context(
        &self,
        question: &str,
        context: Option<&str>,
    ) -> BuddyResult<QaAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(BuddyError::invalid_field("question", "question is empty"));
        }
        let context = context.map(str::trim).filter(|c| !c.is_empty());

        let started = Instant::now();
        let session_id = self.store.create(SessionKind::Qa, question);
        let step_id = self
            .store
            .append_step(&session_id, "qa", "Answer question")?;
        self.store
            .transition(&session_id, None, Status::Running, None)?;
        self.store
            .transition(&session_id, Some(step_id), Status::Running, None)?;

        let is_technical = self.classifier.is_technical(question);
        let key = qa_key(question, context);

        let (text, cached) = match self.cache.get(&key).await {
            Some(entry) => {
                debug!("Answering from {} cache", entry.tier);
                (entry.value, true)
            }
            None => match self.ask_model(question, context).await {
                Ok(text) => {
                    let outcome = self.cache.put(&key, text.clone(), None).await;
                    debug!("Stored answer ({:?})", outcome);
                    (text, false)
                }
                Err(error) => {
                    self.fail(&session_id, step_id, &error)?;
                    return Err(error);
                }
            },
        };

        let latency_ms = started.elapsed().as_millis() as u64;
        let summary = format!(
            "{} chars{}",
            text.chars().count(),
            if cached { ", cached" } else { "" }
        );
        self.store
            .complete_step(&session_id, step_id, Some(summary))?;
        self.store
            .transition(&session_id, None, Status::Completed, None)?;

        {
            let mut stats = self.stats.lock();
            stats.total_answers += 1;
            stats.total_latency_ms += latency_ms;
            if cached {
                stats.cached_answers += 1;
            }
        }
        info!(
            "Answered question in {}ms (cached: {}, technical: {})",
            latency_ms, cached, is_technical
        );

        Ok(QaAnswer {
            text,
            cached,
            is_technical,
            latency_ms,
            session_id,
        })
    }

    async fn ask_model(&self, question: &str, context: Option<&str>) -> BuddyResult<String> {
        let style = self.classifier.prompt_style(question);
        let user = match context {
            Some(context) => format!("Context: {}\n\nQuestion: {}", context, question),
            None => question.to_string(),
        };
        let prompt = Prompt::new(user)
            .with_system(style.system_prompt())
            .with_temperature(self.config.temperature)
            .with_max_output_tokens(self.config.max_output_tokens);

        match tokio::time::timeout(self.config.model_timeout, self.model.generate(&prompt)).await
        {
            Ok(Ok(text)) => Ok(text.trim().to_string()),
            Ok(Err(e)) => Err(BuddyError::from(e).in_stage(STAGE)),
            Err(_) => Err(BuddyError::model_timeout(STAGE, self.config.model_timeout)),
        }
    }

    fn fail(&self, session_id: &SessionId, step_id: StepId, error: &BuddyError) -> BuddyResult<()> {
        warn!("Question failed: {}", error);
        self.stats.lock().failed_answers += 1;
        let message = error.to_string();
        self.store
            .transition(session_id, Some(step_id), Status::Error, Some(message.clone()))?;
        self.store
            .transition(session_id, None, Status::Error, Some(message))?;
        Ok(())
    }

    /// Answer each question once so later askers hit the cache
    ///
    /// Failures are logged and skipped. Returns how many questions now have a
    /// cached answer.
    pub async fn warm_up<S: AsRef<str>>(&self, questions: &[S]) -> usize {
        let mut warmed = 0;
        for question in questions {
            match self.answer(question.as_ref()).await {
                Ok(_) => warmed += 1,
                Err(e) => warn!("Warm-up question '{}' failed: {}", question.as_ref(), e),
            }
        }
        info!("Warmed {} of {} questions", warmed, questions.len());
        warmed
    }

    /// Snapshot of the running totals
    pub fn statistics(&self) -> QaStatistics {
        self.stats.lock().clone()
    }

    /// Cache backing this service
    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Configured warm-up question list
    pub fn warm_up_questions(&self) -> &[String] {
        &self.config.warm_up_questions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::UpdateBroadcaster;
    use crate::llm::{ModelError, ScriptedModelClient};
    use std::time::Duration;

    fn service(model: ScriptedModelClient) -> (QaService, Arc<SessionStore>, Arc<ScriptedModelClient>) {
        let store = Arc::new(SessionStore::new(UpdateBroadcaster::new(64)));
        let cache = Arc::new(ResponseCache::memory_only(32, Some(Duration::from_secs(60))));
        let model = Arc::new(model);
        let config = QaConfig {
            model_timeout: Duration::from_millis(200),
            ..Default::default()
        };
        let qa = QaService::new(store.clone(), cache, model.clone(), config);
        (qa, store, model)
    }

    #[tokio::test]
    async fn test_second_identical_question_is_cached() {
        let (qa, _, model) = service(
            ScriptedModelClient::always("Python is a programming language.")
                .with_latency(Duration::from_millis(20)),
        );

        let first = qa.answer("What is Python?").await.unwrap();
        let second = qa.answer("  what   is PYTHON? ").await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.text, second.text);
        assert!(second.latency_ms < first.latency_ms);
        assert_eq!(model.call_count(), 1);
        assert!(first.is_technical);
        assert!(second.is_technical);
    }

    #[tokio::test]
    async fn test_each_call_is_a_single_step_session() {
        let (qa, store, _) = service(ScriptedModelClient::always("Paris."));
        let answer = qa.answer("Capital of France?").await.unwrap();

        let session = store.get(&answer.session_id).unwrap();
        assert_eq!(session.kind, SessionKind::Qa);
        assert_eq!(session.status, Status::Completed);
        assert_eq!(session.steps.len(), 1);
        assert_eq!(session.steps[0].agent_name, "qa");
        assert_eq!(session.steps[0].status, Status::Completed);
        assert!(!answer.is_technical);
    }

    #[tokio::test]
    async fn test_model_failure_is_unavailable_not_fabricated() {
        let (qa, store, _) = service(ScriptedModelClient::failing(ModelError::Api(
            "quota exceeded".into(),
        )));

        let err = qa.answer("What is Rust?").await.unwrap_err();
        assert!(matches!(&err, BuddyError::ModelUnavailable { stage, .. } if stage == "qa"));

        let session = &store.list()[0];
        assert_eq!(session.status, Status::Error);
        let full = store.get(&session.id).unwrap();
        assert_eq!(full.steps[0].status, Status::Error);
        assert!(full.steps[0].error.as_deref().unwrap().contains("quota"));

        // nothing cached for a failed answer
        assert!(qa.cache().get("what is rust?").await.is_none());
        assert_eq!(qa.statistics().failed_answers, 1);
    }

    #[tokio::test]
    async fn test_hung_model_times_out() {
        let (qa, _, _) = service(
            ScriptedModelClient::always("late").with_latency(Duration::from_secs(5)),
        );
        let err = qa.answer("Anything?").await.unwrap_err();
        assert!(matches!(
            err,
            BuddyError::ModelUnavailable {
                timed_out: true,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_question_rejected_without_session() {
        let (qa, store, model) = service(ScriptedModelClient::always("x"));
        let err = qa.answer("   ").await.unwrap_err();
        assert!(matches!(err, BuddyError::InvalidInput { .. }));
        assert!(store.is_empty());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_context_changes_cache_key_and_prompt() {
        let (qa, _, model) = service(ScriptedModelClient::always("answer"));
        qa.answer("How do I sort?").await.unwrap();
        let with_context = qa
            .answer_with_context("How do I sort?", Some("in Rust"))
            .await
            .unwrap();

        assert!(!with_context.cached);
        assert_eq!(model.call_count(), 2);
        assert!(model.prompts()[1].user.contains("Context: in Rust"));
    }

    #[tokio::test]
    async fn test_prompt_style_reaches_model() {
        let (qa, _, model) = service(ScriptedModelClient::always("answer"));
        qa.answer("Define recursion").await.unwrap();
        assert_eq!(
            model.prompts()[0].system.as_deref(),
            Some(PromptStyle::Quick.system_prompt())
        );
    }

    #[tokio::test]
    async fn test_warm_up_skips_failures() {
        let model = ScriptedModelClient::always("warm");
        model.push_error(ModelError::Timeout(1));
        let (qa, _, _) = service(model);

        let warmed = qa.warm_up(&["What is HTML?", "What is CSS?", "What is React?"]).await;
        assert_eq!(warmed, 2);
        assert!(qa.answer("what is css?").await.unwrap().cached);

        let stats = qa.statistics();
        assert_eq!(stats.failed_answers, 1);
        assert_eq!(stats.total_answers, 3);
        assert_eq!(stats.cached_answers, 1);
    }

    struct AlwaysTechnical;

    impl QuestionClassifier for AlwaysTechnical {
        fn is_technical(&self, _question: &str) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_custom_classifier() {
        let (qa, _, _) = service(ScriptedModelClient::always("ok"));
        let qa = qa.with_classifier(Arc::new(AlwaysTechnical));
        assert!(qa.answer("Favourite colour?").await.unwrap().is_technical);
    }
}
