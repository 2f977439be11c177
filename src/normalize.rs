use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;

use crate::error::AppError;
use crate::event::{EventKind, NewEvent};

/// Outcome of normalizing a webhook delivery.
#[derive(Debug)]
pub enum Normalized {
    /// The delivery maps onto a stored event.
    Event(NewEvent),
    /// The delivery is valid but carries nothing the feed tracks
    /// (ping, PR housekeeping actions).
    Ignored(&'static str),
}

/// Decodes a raw webhook body against the typed shape for its declared
/// kind and maps it to a feed event. Unsupported kinds and bodies that do
/// not match their declared shape are rejected.
pub fn normalize(kind: &str, body: &[u8]) -> Result<Normalized, AppError> {
    match kind {
        "push" => {
            let payload: PushPayload = serde_json::from_slice(body)?;
            Ok(Normalized::Event(normalize_push(payload)))
        }
        "pull_request" => {
            let payload: PullRequestPayload = serde_json::from_slice(body)?;
            Ok(normalize_pull_request(payload))
        }
        "ping" => Ok(Normalized::Ignored("ping")),
        other => Err(AppError::UnsupportedEvent(other.to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct PushPayload {
    #[serde(rename = "ref")]
    git_ref: String,
    #[serde(default)]
    after: Option<String>,
    pusher: Pusher,
    head_commit: Option<HeadCommit>,
}

#[derive(Debug, Deserialize)]
struct Pusher {
    name: String,
}

#[derive(Debug, Deserialize)]
struct HeadCommit {
    id: String,
    #[serde(default)]
    timestamp: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    name: String,
}

fn normalize_push(payload: PushPayload) -> NewEvent {
    let branch = payload
        .git_ref
        .strip_prefix("refs/heads/")
        .unwrap_or(&payload.git_ref)
        .to_string();

    let head = payload.head_commit.as_ref();

    // GitHub sometimes reports an empty pusher name; fall back to the head
    // commit author.
    let author = if payload.pusher.name.is_empty() {
        head.and_then(|c| c.author.as_ref())
            .map(|a| a.name.clone())
            .unwrap_or_default()
    } else {
        payload.pusher.name.clone()
    };

    let request_id = head
        .map(|c| c.id.clone())
        .or(payload.after)
        .unwrap_or_default();

    let timestamp = head
        .and_then(|c| c.timestamp)
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    NewEvent {
        request_id,
        kind: EventKind::Push,
        author,
        // A push lands on the branch it was made from.
        source_ref: Some(branch.clone()),
        target_ref: Some(branch),
        timestamp,
    }
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    action: String,
    pull_request: PullRequestInfo,
}

#[derive(Debug, Deserialize)]
struct PullRequestInfo {
    number: u64,
    user: Actor,
    head: GitRef,
    base: GitRef,
    #[serde(default)]
    merged: bool,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct Actor {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    #[serde(rename = "ref")]
    name: String,
}

fn normalize_pull_request(payload: PullRequestPayload) -> Normalized {
    let pr = payload.pull_request;

    let kind = match payload.action.as_str() {
        "opened" | "reopened" => EventKind::PullRequest,
        "closed" if pr.merged => EventKind::Merge,
        "closed" => return Normalized::Ignored("pull request closed without merge"),
        _ => return Normalized::Ignored("pull request action not tracked"),
    };

    let timestamp = pr
        .updated_at
        .or(pr.created_at)
        .unwrap_or_else(Utc::now);

    Normalized::Event(NewEvent {
        request_id: pr.number.to_string(),
        kind,
        author: pr.user.login,
        source_ref: Some(pr.head.name),
        target_ref: Some(pr.base.name),
        timestamp,
    })
}
