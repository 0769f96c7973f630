//! Webhook + health HTTP surface.
//!
//! Each accepted update is handed to its own task so Telegram gets its
//! ack immediately; a top-level guard turns any fault in the handler
//! into a logged failure and a best-effort generic reply.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::FutureExt;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::dialog::{texts, Coordinator};
use crate::telegram::{Transport, Update};

/// Header Telegram echoes the configured webhook secret in.
const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub transport: Arc<dyn Transport>,
    /// Expected secret token; `None` disables the check.
    pub webhook_secret: Option<String>,
}

/// Build the axum router.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "gradebot"
    }))
}

// ── Webhook ─────────────────────────────────────────────────────────

async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> impl IntoResponse {
    if let Some(expected) = &state.webhook_secret {
        let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            warn!("Webhook update rejected: secret token mismatch");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"status": "unauthorized"})),
            );
        }
    }

    if update.message.is_none() && update.callback_query.is_none() {
        return (StatusCode::OK, Json(json!({"status": "ignored"})));
    }

    // Chat to notify if handling blows up, captured before the move.
    let reply_chat = update
        .message
        .as_ref()
        .map(|m| m.chat.id.to_string())
        .or_else(|| {
            update
                .callback_query
                .as_ref()
                .and_then(|c| c.message.as_ref())
                .map(|m| m.chat.id.to_string())
        });

    let coordinator = Arc::clone(&state.coordinator);
    let transport = Arc::clone(&state.transport);
    tokio::spawn(async move {
        let outcome = std::panic::AssertUnwindSafe(coordinator.handle_update(update))
            .catch_unwind()
            .await;

        let failed = match outcome {
            Ok(Ok(())) => false,
            Ok(Err(e)) => {
                error!(error = %e, "Update handling failed");
                true
            }
            Err(_) => {
                error!("Update handling panicked");
                true
            }
        };

        if failed {
            if let Some(chat_id) = reply_chat {
                if let Err(e) = transport.send_text(&chat_id, texts::generic_failure()).await {
                    warn!(error = %e, "Failed to send failure notice");
                }
            }
        }
    });

    (StatusCode::OK, Json(json!({"ok": true})))
}
