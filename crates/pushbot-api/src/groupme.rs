//! The REST client and the [`MessagePoster`] seam.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};

/// Production API base.
pub const DEFAULT_API_BASE: &str = "https://api.groupme.com/v3";

/// Request timeout for reply posts.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts replies on behalf of a bot.
///
/// Delivery is best-effort from the callers' point of view: they log a
/// failure and move on, so implementations must not panic.
#[async_trait]
pub trait MessagePoster: Send + Sync {
    /// Posts a message into a group as the authenticated user.
    async fn post_group_message(&self, group_id: &str, text: &str) -> ApiResult<()>;

    /// Posts a message through the bot-post endpoint.
    async fn post_bot_message(&self, bot_id: &str, text: &str) -> ApiResult<()>;
}

/// REST client for the GroupMe v3 API.
pub struct GroupMeClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl GroupMeClient {
    /// Creates a client against the given API base (no trailing slash
    /// required). Group posting additionally needs an access token; see
    /// [`GroupMeClient::with_access_token`].
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            access_token: None,
        })
    }

    /// Sets the access token used for user-authenticated endpoints.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Returns the configured API base.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl MessagePoster for GroupMeClient {
    async fn post_group_message(&self, group_id: &str, text: &str) -> ApiResult<()> {
        let token = self.access_token.as_deref().ok_or(ApiError::MissingToken)?;
        let endpoint = format!("{}/groups/{}/messages", self.base_url, group_id);
        let payload = GroupMessagePayload {
            message: NewMessage {
                // Unique-ish per message; the platform uses it for
                // client-side dedup.
                source_guid: Utc::now().timestamp_millis().to_string(),
                text,
            },
        };

        let response = self
            .http
            .post(&endpoint)
            .query(&[("token", token)])
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Status {
                status: response.status(),
                endpoint,
            });
        }

        debug!(group_id = %group_id, "group message posted");
        Ok(())
    }

    async fn post_bot_message(&self, bot_id: &str, text: &str) -> ApiResult<()> {
        let endpoint = format!("{}/bots/post", self.base_url);
        let payload = BotPostPayload { bot_id, text };

        let response = self.http.post(&endpoint).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(ApiError::Status {
                status: response.status(),
                endpoint,
            });
        }

        debug!(bot_id = %bot_id, "bot message posted");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct GroupMessagePayload<'a> {
    message: NewMessage<'a>,
}

#[derive(Debug, Serialize)]
struct NewMessage<'a> {
    source_guid: String,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct BotPostPayload<'a> {
    bot_id: &'a str,
    text: &'a str,
}
