use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::HeaderMap,
    response::{Html, Json},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::error::AppError;
use crate::event::Event;
use crate::normalize::{Normalized, normalize};
use crate::signing::verify_signature;
use crate::store::EventStore;

const X_GITHUB_EVENT: &str = "x-github-event";
const X_HUB_SIGNATURE: &str = "x-hub-signature-256";

const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct AppState {
    pub store: EventStore,
    pub webhook_secret: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/webhook", post(receive_webhook))
        .route("/api/events", get(list_events))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

#[derive(Serialize)]
struct WebhookAck {
    message: String,
    recorded: bool,
}

async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    if let Some(secret) = &state.webhook_secret {
        let signature = headers
            .get(X_HUB_SIGNATURE)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::MissingSignature)?;
        if !verify_signature(secret, &body, signature) {
            warn!("webhook signature verification failed");
            return Err(AppError::InvalidSignature);
        }
    }

    let kind = headers
        .get(X_GITHUB_EVENT)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::MissingHeader("X-GitHub-Event"))?;

    match normalize(kind, &body)? {
        Normalized::Event(event) => {
            let id = state.store.insert(&event).await?;
            info!("stored {} event by {} (row {id})", event.kind, event.author);
            Ok(Json(WebhookAck {
                message: format!("recorded {} event by {}", event.kind, event.author),
                recorded: true,
            }))
        }
        Normalized::Ignored(reason) => {
            info!("ignoring {kind} delivery: {reason}");
            Ok(Json(WebhookAck {
                message: format!("ignored: {reason}"),
                recorded: false,
            }))
        }
    }
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    since: Option<DateTime<Utc>>,
    limit: Option<u32>,
}

async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<Event>>, AppError> {
    let events = state
        .store
        .list(query.since, query.limit.unwrap_or(DEFAULT_PAGE_SIZE))
        .await?;
    Ok(Json(events))
}

// Liveness only; deliberately does not touch the store.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "gitpulse",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../assets/index.html"))
}
