use chrono::{DateTime, Utc};
use herald_types::models::{MessageRecord, Reactions};
use tracing::warn;

/// Raw `messages` row as read from SQLite.
#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub kind: String,
    pub body: String,
    pub author: String,
    pub author_id: String,
    pub created_at: i64,
    pub edited_at: Option<i64>,
    pub file: Option<String>,
    pub deleted: bool,
    pub views: i64,
    pub reactions: String,
    pub reply_to: Option<i64>,
    pub is_thread: bool,
}

impl MessageRow {
    pub fn from_sql_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            body: row.get(2)?,
            author: row.get(3)?,
            author_id: row.get(4)?,
            created_at: row.get(5)?,
            edited_at: row.get(6)?,
            file: row.get(7)?,
            deleted: row.get(8)?,
            views: row.get(9)?,
            reactions: row.get(10)?,
            reply_to: row.get(11)?,
            is_thread: row.get(12)?,
        })
    }

    /// Convert to the domain record. Malformed stored JSON (reactions, file)
    /// degrades to the empty value rather than failing the whole read.
    pub fn into_record(self) -> MessageRecord {
        let reactions: Reactions = serde_json::from_str(&self.reactions).unwrap_or_else(|e| {
            warn!("corrupt reactions on message {}: {}", self.id, e);
            Reactions::new()
        });

        let file = self
            .file
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok());

        MessageRecord {
            id: self.id,
            kind: self.kind,
            text: self.body,
            author: self.author,
            author_id: self.author_id,
            timestamp: millis_to_datetime(self.created_at),
            last_edit: self.edited_at.map(millis_to_datetime),
            file,
            deleted: self.deleted,
            views: self.views,
            reactions,
            reply_to: self.reply_to,
            is_thread: self.is_thread,
            original_message: None,
        }
    }
}

pub fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// Result of resolving a record's reply-to parent inside the feed script.
#[derive(Debug, Clone)]
pub enum ParentLookup {
    Found(MessageRecord),
    /// The parent key no longer resolves to a record at all.
    Missing(i64),
}

/// One accepted record from a feed page, with its parent (if any) resolved
/// in the same atomic pass.
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub record: MessageRecord,
    pub parent: Option<ParentLookup>,
}
