//! deckrag storage crate - SQLite persistence for user feedback.
//!
//! Provides a WAL-mode SQLite database with migrations and the
//! append-only feedback repository used as the conversation's
//! [`deckrag_core::FeedbackStore`].

pub mod db;
pub mod feedback;
pub mod migrations;

pub use db::Database;
pub use feedback::{FeedbackRepository, FeedbackRow};
