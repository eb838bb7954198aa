use serde::{Deserialize, Serialize};

use crate::models::{MessageRecord, Reactions};

/// Events fanned out to every connected reader. Create/edit/delete carry the
/// full (already redaction-safe) record; reaction updates carry only the ID
/// and the new aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message", rename_all = "kebab-case")]
pub enum FeedEvent {
    NewMessage(MessageRecord),
    EditMessage(MessageRecord),
    DeleteMessage(MessageRecord),
    Reaction(ReactionDigest),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionDigest {
    pub id: i64,
    pub reactions: Reactions,
}
