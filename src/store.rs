use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::debug;

use crate::event::{Event, NewEvent};

/// Hard ceiling on a single page, whatever the client asks for.
pub const MAX_PAGE_SIZE: u32 = 500;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    request_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    author TEXT NOT NULL,
    source_ref TEXT,
    target_ref TEXT,
    timestamp TEXT NOT NULL
)";

const TIMESTAMP_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events (timestamp DESC)";

/// Append-only event collection. Cloning is cheap; all clones share the
/// same pool.
#[derive(Clone)]
pub struct EventStore {
    pool: SqlitePool,
}

impl EventStore {
    /// Opens (or creates) the store behind `url` and ensures the schema
    /// exists.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    /// Single-connection in-memory store. The pool is pinned to one
    /// connection so the database outlives individual checkouts.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        sqlx::query(TIMESTAMP_INDEX).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Appends one event and returns its row id. Events are never updated
    /// or deleted afterwards.
    pub async fn insert(&self, event: &NewEvent) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO events (request_id, kind, author, source_ref, target_ref, timestamp) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(event.request_id.as_str())
        .bind(event.kind.as_str())
        .bind(event.author.as_str())
        .bind(event.source_ref.as_deref())
        .bind(event.target_ref.as_deref())
        .bind(event.timestamp)
        .execute(&self.pool)
        .await?;

        debug!("inserted event row {}", result.last_insert_rowid());
        Ok(result.last_insert_rowid())
    }

    /// Returns events newest first, optionally restricted to those strictly
    /// after `since`.
    pub async fn list(
        &self,
        since: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<Event>, sqlx::Error> {
        let limit = i64::from(limit.min(MAX_PAGE_SIZE));

        match since {
            Some(since) => {
                sqlx::query_as::<_, Event>(
                    "SELECT id, request_id, kind, author, source_ref, target_ref, timestamp \
                     FROM events WHERE timestamp > ? \
                     ORDER BY timestamp DESC, id DESC LIMIT ?",
                )
                .bind(since)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Event>(
                    "SELECT id, request_id, kind, author, source_ref, target_ref, timestamp \
                     FROM events ORDER BY timestamp DESC, id DESC LIMIT ?",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    fn push_event(author: &str, branch: &str, ts: &str) -> NewEvent {
        NewEvent {
            request_id: "deadbeef".into(),
            kind: EventKind::Push,
            author: author.into(),
            source_ref: Some(branch.into()),
            target_ref: Some(branch.into()),
            timestamp: ts.parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn insert_then_list_round_trips_fields() {
        let store = EventStore::in_memory().await.unwrap();
        let event = push_event("alice", "main", "2024-01-29T10:00:00Z");
        let id = store.insert(&event).await.unwrap();

        let events = store.list(None, 100).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, id);
        assert_eq!(events[0].kind, EventKind::Push);
        assert_eq!(events[0].author, "alice");
        assert_eq!(events[0].source_ref.as_deref(), Some("main"));
        assert_eq!(events[0].target_ref.as_deref(), Some("main"));
        assert_eq!(events[0].timestamp, event.timestamp);
    }

    #[tokio::test]
    async fn list_orders_newest_first_regardless_of_insert_order() {
        let store = EventStore::in_memory().await.unwrap();
        store
            .insert(&push_event("a", "main", "2024-01-29T10:00:02Z"))
            .await
            .unwrap();
        store
            .insert(&push_event("b", "main", "2024-01-29T10:00:00Z"))
            .await
            .unwrap();
        store
            .insert(&push_event("c", "main", "2024-01-29T10:00:01Z"))
            .await
            .unwrap();

        let events = store.list(None, 100).await.unwrap();
        let authors: Vec<&str> = events.iter().map(|e| e.author.as_str()).collect();
        assert_eq!(authors, ["a", "c", "b"]);
    }

    #[tokio::test]
    async fn since_is_strictly_after() {
        let store = EventStore::in_memory().await.unwrap();
        store
            .insert(&push_event("a", "main", "2024-01-29T10:00:00Z"))
            .await
            .unwrap();
        store
            .insert(&push_event("b", "main", "2024-01-29T10:00:01Z"))
            .await
            .unwrap();

        let since = "2024-01-29T10:00:00Z".parse().unwrap();
        let events = store.list(Some(since), 100).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].author, "b");
    }

    #[tokio::test]
    async fn limit_bounds_the_page() {
        let store = EventStore::in_memory().await.unwrap();
        for second in 0..5 {
            store
                .insert(&push_event(
                    "a",
                    "main",
                    &format!("2024-01-29T10:00:0{second}Z"),
                ))
                .await
                .unwrap();
        }

        let events = store.list(None, 2).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].timestamp,
            "2024-01-29T10:00:04Z".parse::<DateTime<Utc>>().unwrap()
        );
    }
}
