//! Push bot: subscription client, channel router, command handler
//!
//! This crate provides the `pushbot` binary: it keeps a live subscription
//! to a user's message stream over the push bus and answers the configured
//! trigger command.

pub mod cli;
pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod negotiation;
pub mod router;
pub mod session;

pub use cli::Cli;
pub use client::PushClient;
pub use error::{ClientError, ClientResult};
