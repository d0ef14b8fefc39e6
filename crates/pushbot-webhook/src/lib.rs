//! Webhook bot: answers platform callbacks that contain the trigger.
//!
//! The platform POSTs every group message to `/bot`; when the text contains
//! the configured trigger substring, the bot posts its reply through the
//! bot-post endpoint. The callback is always acknowledged with `200 OK` —
//! reply delivery is fire-and-forget and never blocks the acknowledgement.

pub mod config;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use serde::Serialize;
use tracing::{debug, warn};

use pushbot_api::MessagePoster;
use pushbot_core::{BotCallback, Trigger};

use crate::config::WebhookConfig;

/// Shared state accessible from handlers.
#[derive(Clone)]
pub struct AppState {
    poster: Arc<dyn MessagePoster>,
    trigger: Trigger,
    bot_id: String,
    reply: String,
    start_time: Instant,
}

impl AppState {
    /// Builds the handler state from configuration.
    pub fn new(poster: Arc<dyn MessagePoster>, config: &WebhookConfig) -> Self {
        Self {
            poster,
            trigger: Trigger::substring(config.trigger.as_str()),
            bot_id: config.bot_id.clone(),
            reply: config.reply.clone(),
            start_time: Instant::now(),
        }
    }
}

/// Builds the router with all routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/bot", post(receive_callback))
        .route("/health", get(health))
        .with_state(state)
}

/// POST /bot — the platform's message callback.
async fn receive_callback(
    State(state): State<AppState>,
    Json(callback): Json<BotCallback>,
) -> StatusCode {
    if state.trigger.matches(&callback.text) {
        debug!(group_id = ?callback.group_id, "trigger matched");
        let poster = Arc::clone(&state.poster);
        let bot_id = state.bot_id.clone();
        let reply = state.reply.clone();
        tokio::spawn(async move {
            if let Err(err) = poster.post_bot_message(&bot_id, &reply).await {
                warn!(error = %err, "reply delivery failed");
            }
        });
    }
    StatusCode::OK
}

/// GET /health — daemon liveness.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use pushbot_api::ApiResult;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    struct QueuePoster(mpsc::UnboundedSender<(String, String)>);

    #[async_trait]
    impl MessagePoster for QueuePoster {
        async fn post_group_message(&self, _group_id: &str, _text: &str) -> ApiResult<()> {
            Ok(())
        }

        async fn post_bot_message(&self, bot_id: &str, text: &str) -> ApiResult<()> {
            let _ = self.0.send((bot_id.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn fixture() -> (Router, mpsc::UnboundedReceiver<(String, String)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = WebhookConfig {
            bot_id: "b-1".to_string(),
            ..WebhookConfig::default()
        };
        let state = AppState::new(Arc::new(QueuePoster(tx)), &config);
        (router(state), rx)
    }

    fn callback_request(text: &str) -> Request<Body> {
        let body = serde_json::to_vec(&json!({ "text": text, "group_id": "42" })).unwrap();
        Request::builder()
            .method("POST")
            .uri("/bot")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn embedded_trigger_posts_one_reply() {
        let (app, mut rx) = fixture();

        let response = app.oneshot(callback_request("please !test now")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (bot_id, text) = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for the reply")
            .expect("reply channel closed");
        assert_eq!(bot_id, "b-1");
        assert_eq!(text, "Test Successful!");
    }

    #[tokio::test]
    async fn non_matching_text_is_acknowledged_without_a_reply() {
        let (app, mut rx) = fixture();

        let response = app.oneshot(callback_request("nothing to see")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn substring_policy_is_case_sensitive() {
        let (app, mut rx) = fixture();

        let response = app.oneshot(callback_request("!TEST")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _rx) = fixture();

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["status"], "ok");
        assert!(value["uptime_secs"].is_number());
    }
}
