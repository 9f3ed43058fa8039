//! Velvet chat crate - the conversational query and streaming-response engine.
//!
//! Turns a free-text message plus caller-supplied history into a composed
//! answer and bounded preview cards: intent classification over a closed
//! taxonomy, follow-up reference resolution, query planning with a
//! three-tier fallback chain, geo-distance augmentation, response
//! composition, and delivery as an ordered, cancellable token stream.

pub mod cards;
pub mod compose;
pub mod engine;
pub mod error;
pub mod executor;
pub mod followup;
pub mod intent;
pub mod planner;
pub mod stream;
pub mod types;

pub use cards::assemble_cards;
pub use compose::Composer;
pub use engine::ChatEngine;
pub use error::ChatError;
pub use executor::Executor;
pub use followup::{is_follow_up, FollowUpResolver};
pub use intent::IntentResolver;
pub use planner::Planner;
pub use stream::{tokenize, GuardedSender, HeartbeatGuard};
pub use types::{
    CardBlock, CardItem, CardKind, ChatOutcome, ChatRequest, ClubHit, DataCategory, EventHit,
    ExtractedSlots, FallbackTier, FetchedData, Intent, IntentKind, PlanFilter, PopulateSpec,
    QueryPlan, StreamEvent, TargetEntity,
};

#[cfg(test)]
pub(crate) mod testutil;
