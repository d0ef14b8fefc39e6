//! GroupMe REST API client.
//!
//! The bots never read anything back from the REST API; they only post
//! replies. Two endpoints cover that:
//!
//! - `POST /groups/{group_id}/messages` — post as the authenticated user
//!   (used by the push bot, authenticated with a `token` query parameter).
//! - `POST /bots/post` — post as a bot identified by its bot id (used by
//!   the webhook bot, no token required).
//!
//! [`MessagePoster`] abstracts both operations so the bots can run against
//! a test double.

mod error;
mod groupme;

pub use error::{ApiError, ApiResult};
pub use groupme::{DEFAULT_API_BASE, GroupMeClient, MessagePoster};
