//! Append-only feedback repository.
//!
//! Records are written once and never updated or deleted. Reads are only
//! used by the `feedback` CLI command to review a session.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use deckrag_core::error::{DeckError, Result};
use deckrag_core::traits::FeedbackStore;
use deckrag_core::types::{FeedbackKind, FeedbackRecord, SourceRef};

use crate::db::Database;

/// Default number of rows returned by [`FeedbackRepository::history_for_session`].
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// A stored feedback record with its row id.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRow {
    pub id: i64,
    pub record: FeedbackRecord,
}

/// SQLite-backed feedback persistence.
#[derive(Debug, Clone)]
pub struct FeedbackRepository {
    db: Arc<Database>,
}

impl FeedbackRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a record and return its row id.
    pub fn insert(&self, record: &FeedbackRecord) -> Result<i64> {
        let documents = serde_json::to_string(&record.documents_used)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO feedbacks
                    (question, response, feedback, feedback_detail, documents_used, timestamp, session_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    record.question,
                    record.answer,
                    record.kind.as_str(),
                    record.detail,
                    documents,
                    record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
                    record.session_id,
                ],
            )
            .map_err(|e| DeckError::Persistence(format!("Failed to save feedback: {}", e)))?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Oldest-first feedback of one session, at most `limit` rows.
    pub fn history_for_session(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<FeedbackRow>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, question, response, feedback, feedback_detail,
                            documents_used, timestamp, session_id
                     FROM feedbacks
                     WHERE session_id = ?1
                     ORDER BY timestamp ASC, id ASC
                     LIMIT ?2",
                )
                .map_err(|e| DeckError::Persistence(format!("History query prepare: {}", e)))?;

            let rows = stmt
                .query_map(rusqlite::params![session_id, limit as i64], |row| {
                    Ok(RawRow {
                        id: row.get(0)?,
                        question: row.get(1)?,
                        answer: row.get(2)?,
                        kind: row.get(3)?,
                        detail: row.get(4)?,
                        documents_used: row.get(5)?,
                        timestamp: row.get(6)?,
                        session_id: row.get(7)?,
                    })
                })
                .map_err(|e| DeckError::Persistence(format!("History query: {}", e)))?;

            let mut results = Vec::new();
            for row in rows {
                let raw = row.map_err(|e| DeckError::Persistence(e.to_string()))?;
                results.push(raw.into_row()?);
            }
            Ok(results)
        })
    }

    /// Total number of stored records.
    pub fn count(&self) -> Result<u64> {
        self.db.with_conn(|conn| {
            let n: i64 = conn
                .query_row("SELECT COUNT(*) FROM feedbacks", [], |row| row.get(0))
                .map_err(|e| DeckError::Persistence(e.to_string()))?;
            Ok(n as u64)
        })
    }
}

#[async_trait]
impl FeedbackStore for FeedbackRepository {
    async fn append(&self, record: &FeedbackRecord) -> Result<i64> {
        let repo = self.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || repo.insert(&record))
            .await
            .map_err(|e| DeckError::Persistence(format!("Feedback writer task failed: {}", e)))?
    }
}

/// Column values as read from SQLite, before decoding.
struct RawRow {
    id: i64,
    question: String,
    answer: String,
    kind: String,
    detail: String,
    documents_used: String,
    timestamp: String,
    session_id: String,
}

impl RawRow {
    fn into_row(self) -> Result<FeedbackRow> {
        let kind: FeedbackKind = self.kind.parse().map_err(DeckError::Persistence)?;
        let documents_used: Vec<SourceRef> = serde_json::from_str(&self.documents_used)?;
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|e| DeckError::Persistence(format!("Bad timestamp {}: {}", self.timestamp, e)))?
            .with_timezone(&Utc);

        Ok(FeedbackRow {
            id: self.id,
            record: FeedbackRecord {
                question: self.question,
                answer: self.answer,
                kind,
                detail: self.detail,
                documents_used,
                timestamp,
                session_id: self.session_id,
            },
        })
    }
}
