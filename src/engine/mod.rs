//! Adaptive tutoring engine: indicator extraction, engagement fusion,
//! window scoring, the adaptation policy, question selection, and the
//! per-session coordinator runtime. Everything below the coordinator
//! is pure and synchronous.

pub mod config;
pub mod coordinator;
pub mod difficulty;
pub mod facial;
pub mod fusion;
pub mod indicators;
pub mod policy;
pub mod selector;
pub mod types;
pub mod window;

pub use config::EngineConfig;
pub use coordinator::{CoordinatorRegistry, ResponseEvaluation, SessionRuntime};
pub use types::{AdaptationCadence, AdaptiveDecision, FusedEngagement, ResponseSample};
