//! History schema and row types

use crate::feed::{HistoryEntry, Role};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    role TEXT NOT NULL CHECK (role IN ('human', 'ai')),
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);
";

/// One persisted conversational message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRecord {
    pub id: i64,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<HistoryRecord> for HistoryEntry {
    fn from(record: HistoryRecord) -> Self {
        HistoryEntry {
            role: record.role,
            content: record.content,
        }
    }
}

/// Seeded assistant greeting for a product category
pub fn greeting(product_type: &str) -> String {
    format!(
        "Welcome! I'm your helpful {product_type} shopping assistant. How can I help you find the perfect {product_type} today?"
    )
}
