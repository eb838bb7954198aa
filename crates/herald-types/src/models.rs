use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregated reaction counts, emoji -> count. A BTreeMap keeps the JSON
/// rendering stable across recomputations.
pub type Reactions = BTreeMap<String, u32>;

/// One post in the channel. The same shape is used for storage, for API
/// responses (after redaction), and for event payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: i64,

    /// Rendering hint for the body, e.g. "md".
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub text: String,

    /// Display name of the author. Replaced by a placeholder for viewers the
    /// redaction policy does not trust with it.
    #[serde(default)]
    pub author: String,

    /// Opaque identity token of the author, redacted together with `author`.
    #[serde(rename = "authorId", default)]
    pub author_id: String,

    pub timestamp: DateTime<Utc>,

    #[serde(rename = "last_edit", default, skip_serializing_if = "Option::is_none")]
    pub last_edit: Option<DateTime<Utc>>,

    /// Opaque attached-file reference produced by the (external) file layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<serde_json::Value>,

    /// Soft-delete tombstone flag. Tombstoned records are never removed.
    #[serde(default)]
    pub deleted: bool,

    #[serde(default)]
    pub views: i64,

    #[serde(default)]
    pub reactions: Reactions,

    #[serde(rename = "replyTo", default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<i64>,

    #[serde(rename = "isThread", default)]
    pub is_thread: bool,

    /// One level of reply-to embedding, filled in by the feed engine.
    #[serde(
        rename = "originalMessage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub original_message: Option<Box<MessageRecord>>,
}

impl MessageRecord {
    /// A thread reply lives inside a thread and stays out of the top-level
    /// feed and search results. A plain reply (quote) is a top-level message.
    pub fn is_thread_reply(&self) -> bool {
        self.is_thread && self.reply_to.is_some()
    }
}

/// Resolved authentication/authorization facts for the current request.
/// Produced by the session layer; the engines treat it as an opaque input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewerCapabilities {
    pub is_authenticated: bool,
    pub is_admin: bool,
    pub is_moderator: bool,
    pub is_writer: bool,
    pub identity: Option<String>,
    pub display_name: Option<String>,
}

impl ViewerCapabilities {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Admins and moderators see tombstones and unredacted authors.
    pub fn elevated(&self) -> bool {
        self.is_admin || self.is_moderator
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Privileges {
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub moderator: bool,
    #[serde(default)]
    pub writer: bool,
}

/// Entry in the persisted privileged-users list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    pub email: String,
    #[serde(rename = "publicName", default)]
    pub public_name: String,
    #[serde(default)]
    pub privileges: Privileges,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}
