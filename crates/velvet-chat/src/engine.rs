//! Chat engine: central coordinator wiring the resolver, follow-up
//! recovery, planner, executor, composer, and card assembler.
//!
//! Both delivery modes run the identical pipeline: the synchronous mode
//! returns the outcome as one object, the streaming mode tokenizes the
//! same outcome onto a guarded channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use velvet_core::config::ChatConfig;
use velvet_core::types::Coordinates;
use velvet_geo::DistanceProvider;
use velvet_llm::LanguageModel;
use velvet_store::Store;

use crate::cards::assemble_cards;
use crate::compose::{Composer, NOT_FOUND_RESPONSE};
use crate::error::ChatError;
use crate::executor::Executor;
use crate::followup::{is_follow_up, FollowUpResolver};
use crate::intent::IntentResolver;
use crate::planner::Planner;
use crate::stream::{stream_tokens, GuardedSender, HeartbeatGuard};
use crate::types::{
    ChatOutcome, ChatRequest, EventHit, FallbackTier, FetchedData, Intent, StreamEvent,
};

/// The conversational engine. Holds no per-request state; every request
/// flows through `respond` and is dropped at the end.
pub struct ChatEngine {
    config: ChatConfig,
    default_city: String,
    resolver: IntentResolver,
    follow_up: FollowUpResolver,
    planner: Planner,
    executor: Executor,
    composer: Composer,
}

impl ChatEngine {
    pub fn new(
        store: Arc<dyn Store>,
        llm: Arc<dyn LanguageModel>,
        geo: Arc<dyn DistanceProvider>,
        config: ChatConfig,
        default_city: impl Into<String>,
    ) -> Self {
        Self {
            config,
            default_city: default_city.into(),
            resolver: IntentResolver::new(Arc::clone(&llm)),
            follow_up: FollowUpResolver::new(Arc::clone(&store)),
            planner: Planner::new(Arc::clone(&llm)),
            executor: Executor::new(store, geo),
            composer: Composer::new(llm),
        }
    }

    /// Run the pipeline once and return the outcome.
    ///
    /// A missing message is the only input error raised directly; it is
    /// raised before any collaborator call.
    pub async fn respond(&self, request: &ChatRequest) -> Result<ChatOutcome, ChatError> {
        if !self.config.enabled {
            return Err(ChatError::Disabled);
        }
        if request.message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if request.message.len() > self.config.max_message_length {
            return Err(ChatError::MessageTooLong(self.config.max_message_length));
        }

        let city = request
            .city
            .clone()
            .unwrap_or_else(|| self.default_city.clone());

        let intent = self
            .resolver
            .resolve(&request.message, &request.history)
            .await;

        // Follow-up path: the message leans on prior turns and carries no
        // explicit identifier of its own.
        if !request.history.is_empty()
            && is_follow_up(&request.message)
            && intent.slots.event_name.is_none()
            && intent.slots.club_name.is_none()
        {
            return Ok(self.respond_follow_up(request, intent).await);
        }

        let origin = if intent.slots.near_me {
            request.user_location
        } else {
            None
        };

        let (data, tier) = self
            .run_fallback_chain(&request.message, &intent, &city, request.user_id, origin)
            .await?;

        tracing::info!(
            intent = intent.kind.as_str(),
            tier = tier.as_str(),
            results = data.len(),
            "Pipeline complete"
        );

        let response = self
            .composer
            .compose(&intent, &data, &request.history, &request.message)
            .await;
        let cards = assemble_cards(intent.kind, &data);

        Ok(ChatOutcome {
            response,
            intent_type: intent.kind,
            confidence: intent.confidence,
            cards,
            tier: Some(tier),
        })
    }

    /// Run the pipeline and deliver the result as a framed event stream.
    ///
    /// Never returns an error: exactly one terminal event (`complete` or
    /// `error`) is emitted instead, and the heartbeat is cancelled at that
    /// moment through its owned guard.
    pub async fn stream(&self, request: ChatRequest, tx: mpsc::Sender<StreamEvent>) {
        let sender = GuardedSender::new(tx);

        sender
            .send(StreamEvent::Connection {
                message: "Connected to the assistant.".to_string(),
            })
            .await;
        let heartbeat = HeartbeatGuard::spawn(sender.clone());

        sender
            .send(StreamEvent::Thinking {
                message: "Looking that up for you...".to_string(),
            })
            .await;

        match self.respond(&request).await {
            Ok(outcome) => {
                stream_tokens(
                    &sender,
                    &outcome.response,
                    Duration::from_millis(self.config.token_delay_ms),
                )
                .await;
                heartbeat.cancel();
                sender.send(StreamEvent::complete(&outcome)).await;
            }
            Err(e) => {
                heartbeat.cancel();
                sender
                    .send(StreamEvent::Error {
                        message: e.user_message(),
                    })
                    .await;
            }
        }
    }

    // -- Private helpers --

    async fn respond_follow_up(&self, request: &ChatRequest, intent: Intent) -> ChatOutcome {
        match self.follow_up.resolve_reference(&request.history).await {
            Some(details) => {
                let data = FetchedData::Events(vec![EventHit {
                    event: details.event,
                    venue_name: details.venue_name,
                    venue_city: details.venue_city,
                    distance: None,
                }]);
                let response = self
                    .composer
                    .compose(&intent, &data, &request.history, &request.message)
                    .await;
                let cards = assemble_cards(intent.kind, &data);
                ChatOutcome {
                    response,
                    intent_type: intent.kind,
                    confidence: intent.confidence,
                    cards,
                    tier: None,
                }
            }
            None => {
                tracing::debug!("Follow-up reference could not be recovered");
                ChatOutcome {
                    response: NOT_FOUND_RESPONSE.to_string(),
                    intent_type: intent.kind,
                    confidence: intent.confidence,
                    cards: Vec::new(),
                    tier: None,
                }
            }
        }
    }

    /// The three-tier fallback chain. Ordering is a contract: AI plan,
    /// then rule plan, then generic listing. A tier is skipped on either
    /// plan or execution failure; only full exhaustion is an error.
    async fn run_fallback_chain(
        &self,
        message: &str,
        intent: &Intent,
        city: &str,
        user_id: Option<Uuid>,
        origin: Option<Coordinates>,
    ) -> Result<(FetchedData, FallbackTier), ChatError> {
        match self.planner.ai_plan(message, intent, city).await {
            Ok(plan) => match self.executor.execute(&plan, origin).await {
                Ok(data) => return Ok((data, FallbackTier::AiPlan)),
                Err(e) => tracing::warn!(error = %e, "AI plan execution failed"),
            },
            Err(e) => tracing::debug!(error = %e, "AI plan unavailable"),
        }

        match self.planner.rule_plan(intent, city, user_id) {
            Ok(plan) => match self.executor.execute(&plan, origin).await {
                Ok(data) => return Ok((data, FallbackTier::RulePlan)),
                Err(e) => tracing::warn!(error = %e, "Rule plan execution failed"),
            },
            Err(e) => tracing::debug!(error = %e, "Rule plan unavailable"),
        }

        let plan = self.planner.generic_listing(city);
        match self.executor.execute(&plan, origin).await {
            Ok(data) => Ok((data, FallbackTier::GenericListing)),
            Err(e) => Err(ChatError::QueryFailed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::FALLBACK_RESPONSE;
    use crate::testutil::{dubai_location, seeded_store, FailingStore, StubGeo, StubLlm};
    use crate::types::{CardKind, IntentKind};
    use velvet_core::types::ChatTurn;

    fn quiet_config() -> ChatConfig {
        ChatConfig {
            token_delay_ms: 0,
            ..ChatConfig::default()
        }
    }

    fn engine_with(
        llm: StubLlm,
        store: impl Store + 'static,
        geo: StubGeo,
        config: ChatConfig,
    ) -> (Arc<StubLlm>, ChatEngine) {
        let llm = Arc::new(llm);
        let engine = ChatEngine::new(
            Arc::new(store),
            Arc::clone(&llm) as Arc<dyn LanguageModel>,
            Arc::new(geo),
            config,
            "Dubai",
        );
        (llm, engine)
    }

    fn find_events_near_me_reply() -> &'static str {
        r#"{"type":"find_events","confidence":0.9,"extractedInfo":{"nearMe":true}}"#
    }

    async fn collect_stream(engine: &ChatEngine, request: ChatRequest) -> Vec<StreamEvent> {
        let (tx, mut rx) = mpsc::channel(256);
        engine.stream(request, tx).await;
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    // ---- input validation ----

    #[tokio::test]
    async fn test_empty_message_is_immediate_error() {
        let (llm, engine) = engine_with(
            StubLlm::classifying(find_events_near_me_reply()),
            seeded_store(),
            StubGeo::default(),
            quiet_config(),
        );
        let err = engine.respond(&ChatRequest::new("")).await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyMessage));
        // No collaborator call was made.
        assert_eq!(llm.classify_call_count(), 0);
        assert!(llm.last_generate_user_message().is_none());
    }

    #[tokio::test]
    async fn test_message_too_long_is_error() {
        let (_, engine) = engine_with(
            StubLlm::classifying(find_events_near_me_reply()),
            seeded_store(),
            StubGeo::default(),
            quiet_config(),
        );
        let long = "a".repeat(2001);
        let err = engine.respond(&ChatRequest::new(long)).await.unwrap_err();
        assert!(matches!(err, ChatError::MessageTooLong(2000)));
    }

    #[tokio::test]
    async fn test_disabled_engine_is_error() {
        let config = ChatConfig {
            enabled: false,
            ..quiet_config()
        };
        let (_, engine) = engine_with(
            StubLlm::classifying(find_events_near_me_reply()),
            seeded_store(),
            StubGeo::default(),
            config,
        );
        let err = engine.respond(&ChatRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, ChatError::Disabled));
    }

    // ---- find-events-near-me scenario ----

    #[tokio::test]
    async fn test_find_events_near_me_uses_rule_plan_with_distances() {
        // The generate stub replies with prose, so the AI plan tier is
        // rejected at parse time and the rule plan serves the data.
        let geo = StubGeo::default().with("velour", 5000).with("basement", 1200);
        let (_, engine) = engine_with(
            StubLlm::classifying(find_events_near_me_reply()),
            seeded_store(),
            geo,
            quiet_config(),
        );

        let mut request = ChatRequest::new("Find events near me");
        request.city = Some("Dubai".to_string());
        request.user_location = Some(dubai_location());

        let outcome = engine.respond(&request).await.unwrap();
        assert_eq!(outcome.tier, Some(FallbackTier::RulePlan));
        assert_eq!(outcome.intent_type, IntentKind::FindEvents);
        assert!(!outcome.response.is_empty());

        // One events card, at most 4 items, nearest venue first.
        assert_eq!(outcome.cards.len(), 1);
        assert_eq!(outcome.cards[0].kind, CardKind::Events);
        assert!(outcome.cards[0].items.len() <= 4);
        assert_eq!(outcome.cards[0].items[0].title, "Deep Sessions");
    }

    #[tokio::test]
    async fn test_near_me_without_location_skips_distances() {
        let geo = StubGeo::default().with("velour", 5000);
        let (_, engine) = engine_with(
            StubLlm::classifying(find_events_near_me_reply()),
            seeded_store(),
            geo,
            quiet_config(),
        );
        let outcome = engine
            .respond(&ChatRequest::new("Find events near me"))
            .await
            .unwrap();
        // Still answers; distance augmentation simply does not run.
        assert_eq!(outcome.tier, Some(FallbackTier::RulePlan));
    }

    // ---- fallback chain ordering ----

    #[tokio::test]
    async fn test_ai_plan_tier_wins_when_parsable() {
        let llm = StubLlm {
            classify_reply: Some(r#"{"type":"find_clubs","confidence":0.85}"#.to_string()),
            generate_reply: Some(r#"{"model":"Club","query":{"city":"Dubai"}}"#.to_string()),
            ..StubLlm::default()
        };
        let (_, engine) = engine_with(llm, seeded_store(), StubGeo::default(), quiet_config());
        let outcome = engine
            .respond(&ChatRequest::new("show me clubs"))
            .await
            .unwrap();
        assert_eq!(outcome.tier, Some(FallbackTier::AiPlan));
        assert_eq!(outcome.cards[0].kind, CardKind::Clubs);
    }

    #[tokio::test]
    async fn test_rule_failure_falls_to_generic_listing() {
        // my_bookings without a user id: the AI plan is unparsable and the
        // rule plan cannot run, so the generic listing serves clubs.
        let llm = StubLlm {
            classify_reply: Some(r#"{"type":"my_bookings","confidence":0.9}"#.to_string()),
            generate_reply: Some("cannot help with JSON".to_string()),
            ..StubLlm::default()
        };
        let (_, engine) = engine_with(llm, seeded_store(), StubGeo::default(), quiet_config());
        let outcome = engine
            .respond(&ChatRequest::new("show my bookings"))
            .await
            .unwrap();
        assert_eq!(outcome.tier, Some(FallbackTier::GenericListing));
        // Bookings intent with club data: no matching card category.
        assert!(outcome.cards.is_empty());
    }

    #[tokio::test]
    async fn test_all_tiers_exhausted_is_query_failed() {
        let (_, engine) = engine_with(
            StubLlm::classifying(find_events_near_me_reply()),
            FailingStore,
            StubGeo::default(),
            quiet_config(),
        );
        let err = engine
            .respond(&ChatRequest::new("find events"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::QueryFailed(_)));
    }

    // ---- composition degradation ----

    #[tokio::test]
    async fn test_generation_failure_never_fatal() {
        // Classification works, generation fails: the canned apologetic
        // string is returned instead of an error. The AI plan tier also
        // fails (same collaborator), so data still arrives via rules.
        let llm = StubLlm {
            classify_reply: Some(r#"{"type":"find_clubs","confidence":0.8}"#.to_string()),
            generate_reply: None,
            ..StubLlm::default()
        };
        let (_, engine) = engine_with(llm, seeded_store(), StubGeo::default(), quiet_config());
        let outcome = engine.respond(&ChatRequest::new("clubs?")).await.unwrap();
        assert_eq!(outcome.response, FALLBACK_RESPONSE);
        assert_eq!(outcome.tier, Some(FallbackTier::RulePlan));
    }

    // ---- follow-up path ----

    fn follow_up_history() -> Vec<ChatTurn> {
        vec![
            ChatTurn::user("any events this weekend?"),
            ChatTurn::assistant("Check out Neon Night at Velour. Doors open at 10pm."),
        ]
    }

    #[tokio::test]
    async fn test_follow_up_answers_from_referenced_event() {
        let llm = StubLlm {
            classify_reply: Some(r#"{"type":"event_question","confidence":0.9}"#.to_string()),
            generate_reply: Some("Neon Night starts at 22:00.".to_string()),
            ..StubLlm::default()
        };
        let (llm, engine) = engine_with(llm, seeded_store(), StubGeo::default(), quiet_config());

        let mut request = ChatRequest::new("what time does it start?");
        request.history = follow_up_history();

        let outcome = engine.respond(&request).await.unwrap();
        assert_eq!(outcome.response, "Neon Night starts at 22:00.");
        assert_eq!(outcome.tier, None);
        assert_eq!(outcome.cards.len(), 1);
        assert_eq!(outcome.cards[0].items[0].title, "Neon Night");

        // The composer saw only the referenced event's data.
        let prompt = llm.last_generate_user_message().unwrap();
        assert!(prompt.contains("Neon Night"));
        assert!(!prompt.contains("Deep Sessions"));
    }

    #[tokio::test]
    async fn test_follow_up_unresolved_uses_not_found_shape() {
        let llm = StubLlm {
            classify_reply: Some(r#"{"type":"event_question","confidence":0.9}"#.to_string()),
            generate_reply: Some("unused".to_string()),
            ..StubLlm::default()
        };
        let (_, engine) = engine_with(llm, seeded_store(), StubGeo::default(), quiet_config());

        let mut request = ChatRequest::new("what time does it start?");
        request.history = vec![ChatTurn::assistant("Check out Ghost Party at Nowhere.")];

        let outcome = engine.respond(&request).await.unwrap();
        assert_eq!(outcome.response, NOT_FOUND_RESPONSE);
        assert!(outcome.cards.is_empty());
    }

    #[tokio::test]
    async fn test_follow_up_skipped_when_identifier_present() {
        // "what time" phrasing, but the classifier extracted an explicit
        // event name, so the normal pipeline runs.
        let llm = StubLlm {
            classify_reply: Some(
                r#"{"type":"event_question","confidence":0.9,"extractedInfo":{"eventName":"Deep Sessions"}}"#
                    .to_string(),
            ),
            generate_reply: Some("Deep Sessions runs late.".to_string()),
            ..StubLlm::default()
        };
        let (_, engine) = engine_with(llm, seeded_store(), StubGeo::default(), quiet_config());

        let mut request = ChatRequest::new("what time is Deep Sessions?");
        request.history = follow_up_history();

        let outcome = engine.respond(&request).await.unwrap();
        assert!(outcome.tier.is_some());
    }

    #[tokio::test]
    async fn test_follow_up_needs_history() {
        // First message of a session never takes the follow-up path.
        let llm = StubLlm {
            classify_reply: Some(r#"{"type":"general","confidence":0.6}"#.to_string()),
            generate_reply: Some("Here to help!".to_string()),
            ..StubLlm::default()
        };
        let (_, engine) = engine_with(llm, seeded_store(), StubGeo::default(), quiet_config());
        let outcome = engine
            .respond(&ChatRequest::new("tell me more"))
            .await
            .unwrap();
        assert!(outcome.tier.is_some());
    }

    // ---- streaming ----

    #[tokio::test]
    async fn test_stream_event_sequence() {
        let (_, engine) = engine_with(
            StubLlm::classifying(find_events_near_me_reply()),
            seeded_store(),
            StubGeo::default(),
            quiet_config(),
        );
        let events = collect_stream(&engine, ChatRequest::new("find events")).await;

        assert!(matches!(events.first(), Some(StreamEvent::Connection { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, StreamEvent::Thinking { .. })));

        // Exactly one terminal event, and it is last.
        let terminals = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminals, 1);
        assert!(events.last().unwrap().is_terminal());

        // Token concatenation equals the completed response.
        let mut concatenated = String::new();
        let mut final_flags = Vec::new();
        for event in &events {
            if let StreamEvent::Token { text, is_complete } = event {
                concatenated.push_str(text);
                final_flags.push(*is_complete);
            }
        }
        match events.last().unwrap() {
            StreamEvent::Complete { response, .. } => {
                assert_eq!(&concatenated, response);
            }
            other => panic!("expected complete, got {:?}", other),
        }
        // isComplete is set only on the last token.
        assert!(final_flags.pop().unwrap());
        assert!(final_flags.iter().all(|f| !f));
    }

    #[tokio::test]
    async fn test_stream_invalid_input_terminates_with_error() {
        let (llm, engine) = engine_with(
            StubLlm::classifying(find_events_near_me_reply()),
            seeded_store(),
            StubGeo::default(),
            quiet_config(),
        );
        let events = collect_stream(&engine, ChatRequest::new("")).await;

        let terminals = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminals, 1);
        assert!(matches!(events.last(), Some(StreamEvent::Error { .. })));
        assert!(!events.iter().any(|e| matches!(e, StreamEvent::Token { .. })));
        assert_eq!(llm.classify_call_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_and_sync_modes_agree() {
        let make = || {
            let mut request = ChatRequest::new("Find events near me");
            request.user_location = Some(dubai_location());
            request
        };
        let geo = StubGeo::default().with("velour", 5000).with("basement", 1200);
        let (_, engine) = engine_with(
            StubLlm::classifying(find_events_near_me_reply()),
            seeded_store(),
            geo,
            quiet_config(),
        );

        let outcome = engine.respond(&make()).await.unwrap();
        let events = collect_stream(&engine, make()).await;

        match events.last().unwrap() {
            StreamEvent::Complete {
                response,
                intent_type,
                confidence,
                cards,
            } => {
                assert_eq!(response, &outcome.response);
                assert_eq!(*intent_type, outcome.intent_type);
                assert_eq!(*confidence, outcome.confidence);
                assert_eq!(
                    serde_json::to_string(cards).unwrap(),
                    serde_json::to_string(&outcome.cards).unwrap()
                );
            }
            other => panic!("expected complete, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_disconnected_client_is_silent() {
        let (_, engine) = engine_with(
            StubLlm::classifying(find_events_near_me_reply()),
            seeded_store(),
            StubGeo::default(),
            quiet_config(),
        );
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        // Every write is a no-op; the call neither hangs nor panics.
        engine.stream(ChatRequest::new("find events"), tx).await;
    }
}
