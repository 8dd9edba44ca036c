//! Mediaskill API Library
//!
//! HTTP surface of the skill: the event bus webhook, the skill invocation
//! endpoint, health probes and the background completion dispatcher.

pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;

pub use dispatch::{CompletionDispatcher, DispatchError, DispatcherConfig, FollowUp};
pub use error::HttpAppError;
pub use state::AppState;
