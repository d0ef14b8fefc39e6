//! Core types: message events, trigger policies, tracing setup

pub mod event;
pub mod tracing;
pub mod trigger;

pub use event::{BotCallback, MESSAGE_CREATED, MessageSubject, PushEvent};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
pub use trigger::Trigger;
