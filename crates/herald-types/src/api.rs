use serde::{Deserialize, Serialize};

use crate::models::MessageRecord;

// -- Feed --

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Desc,
    Asc,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// ID of the message acting as the exclusive cursor. Absent on the
    /// first page.
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default = "default_feed_limit")]
    pub limit: i64,
    #[serde(default)]
    pub direction: Direction,
}

fn default_feed_limit() -> i64 {
    20
}

// -- Messages --

#[derive(Debug, Clone, Deserialize)]
pub struct MessageDraft {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub text: String,
    #[serde(default)]
    pub file: Option<serde_json::Value>,
    #[serde(rename = "replyTo", default)]
    pub reply_to: Option<i64>,
    #[serde(rename = "isThread", default)]
    pub is_thread: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditMessageRequest {
    pub text: String,
    #[serde(default)]
    pub file: Option<serde_json::Value>,
}

// -- Reactions --

#[derive(Debug, Clone, Deserialize)]
pub struct ReactionRequest {
    #[serde(rename = "messageId")]
    pub message_id: i64,
    pub emoji: String,
}

// -- Search --

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// "simple" or "advanced"; anything else falls back to simple.
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(rename = "daysBack", default)]
    pub days_back: i64,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<MessageRecord>,
    pub total: usize,
    pub query: String,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
    #[serde(rename = "tookMs")]
    pub took_ms: u64,
}

// -- Misc --

#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct VersionInfo {
    pub version: &'static str,
}
