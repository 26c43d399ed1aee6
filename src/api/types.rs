//! API request and response types

use crate::feed::HistoryEntry;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request to start a turn
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub input: String,
}

/// Prior messages as `[role, content]` pairs
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<(String, String)>,
}

impl From<Vec<HistoryEntry>> for HistoryResponse {
    fn from(entries: Vec<HistoryEntry>) -> Self {
        Self {
            history: entries
                .into_iter()
                .map(|entry| (entry.role.as_str().to_string(), entry.content))
                .collect(),
        }
    }
}

/// Response for reset
#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub message: String,
    pub history: Vec<(String, String)>,
}

#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub products: Vec<Value>,
    pub product_type: String,
}

/// Active profile text
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile_name: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileListResponse {
    pub profiles: Vec<String>,
    pub current: String,
}

/// Request to replace the active profile's text
#[derive(Debug, Deserialize)]
pub struct ProfileUpdateRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
