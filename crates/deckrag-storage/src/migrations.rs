//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use deckrag_core::error::{DeckError, Result};

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| DeckError::Persistence(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| DeckError::Persistence(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: feedbacks");
    }

    Ok(())
}

/// Version 1: append-only feedback table.
///
/// `documents_used` holds a JSON array of `{document_id, slide_index}`;
/// `timestamp` is RFC 3339 so lexical order matches chronological order.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS feedbacks (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            question        TEXT NOT NULL,
            response        TEXT NOT NULL,
            feedback        TEXT NOT NULL
                            CHECK (feedback IN ('positive', 'correction')),
            feedback_detail TEXT NOT NULL DEFAULT '',
            documents_used  TEXT NOT NULL DEFAULT '[]',
            timestamp       TEXT NOT NULL,
            session_id      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_feedbacks_session
            ON feedbacks(session_id, timestamp);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'feedbacks');
        ",
    )
    .map_err(|e| DeckError::Persistence(format!("Migration v1 failed: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_record_version() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_feedback_kind_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO feedbacks (question, response, feedback, timestamp, session_id)
             VALUES ('q', 'a', 'neutral', '2026-01-01T00:00:00Z', 's')",
            [],
        );
        assert!(result.is_err());
    }
}
