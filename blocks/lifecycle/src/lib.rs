//! Task / shift / gamification lifecycle engine.
//!
//! Composes the domain atoms into the app's core loop: attendance gates
//! task starts, completions award experience and run the achievement
//! check, and the realtime feed reconciles back into the same serialized
//! actor that applies user commands.

pub mod achievements;
pub mod attendance;
pub mod config;
pub mod engine;
pub mod reconcile;
pub mod state;
pub mod tasks;

pub use attendance::{CheckInOutcome, CheckOutOutcome};
pub use config::EngineConfig;
pub use engine::LifecycleEngine;
pub use state::UserProfile;
pub use tasks::{CompletionOutcome, DenyReason, StartDecision};
