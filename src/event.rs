use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

/// The three repository actions the feed tracks. Anything else a webhook
/// reports is ignored or rejected before it reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Push,
    PullRequest,
    Merge,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Push => "PUSH",
            EventKind::PullRequest => "PULL_REQUEST",
            EventKind::Merge => "MERGE",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown event kind `{0}`")]
pub struct ParseEventKindError(String);

impl FromStr for EventKind {
    type Err = ParseEventKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PUSH" => Ok(EventKind::Push),
            "PULL_REQUEST" => Ok(EventKind::PullRequest),
            "MERGE" => Ok(EventKind::Merge),
            other => Err(ParseEventKindError(other.to_string())),
        }
    }
}

impl TryFrom<String> for EventKind {
    type Error = ParseEventKindError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A stored event, as returned by the polling API.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Event {
    pub id: i64,
    /// Commit SHA for pushes, PR number for pull requests and merges.
    pub request_id: String,
    #[serde(rename = "type")]
    #[sqlx(try_from = "String")]
    pub kind: EventKind,
    pub author: String,
    pub source_ref: Option<String>,
    pub target_ref: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A normalized event that has not been written to the store yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub request_id: String,
    pub kind: EventKind,
    pub author: String,
    pub source_ref: Option<String>,
    pub target_ref: Option<String>,
    pub timestamp: DateTime<Utc>,
}
