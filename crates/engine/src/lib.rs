//! Post lifecycle and subscriber-notification engine.
//!
//! Services in this crate orchestrate the store (`eventcast-db`) and the
//! chat collaborators (`eventcast-events`). None of them cache post or
//! subscription state beyond a single call.

pub mod broadcast;
pub mod browse;
pub mod cards;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod matcher;
pub mod notifier;
pub mod queue;
pub mod sweeper;
pub mod users;

pub use broadcast::AdminBroadcast;
pub use browse::{BrowseReply, BrowseService, BrowseView};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use lifecycle::{DecisionOutcome, PostLifecycle};
pub use matcher::SubscriberMatcher;
pub use notifier::AuthorNotifier;
pub use queue::ModerationQueue;
pub use sweeper::{ExpirySweeper, SweepOutcome};
pub use users::UserService;
