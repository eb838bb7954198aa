use chrono::{DateTime, Utc};
use herald_store::models::ParentLookup;
use herald_types::config::ConfigSnapshot;
use herald_types::models::{MessageRecord, Reactions, ViewerCapabilities};

pub const ANONYMOUS: &str = "Anonymous";
pub const DELETED_PLACEHOLDER: &str = "*message deleted*";
pub const MISSING_PLACEHOLDER: &str = "*message not found*";
pub const UNNAMED_AUTHOR: &str = "unknown user";

/// Whether this viewer may see real author fields. Admins and moderators
/// always do; authenticated viewers only when the configuration says so.
pub fn can_see_author(caps: &ViewerCapabilities, config: &ConfigSnapshot) -> bool {
    caps.elevated() || (config.show_author_to_authenticated && caps.is_authenticated)
}

fn can_see_views(caps: &ViewerCapabilities, config: &ConfigSnapshot) -> bool {
    config.count_views && (!config.hide_view_counts_from_users || caps.elevated())
}

/// Apply the redaction policy to a record bound for this viewer. Every read
/// path (feed, thread, search) goes through here.
pub fn redact(
    mut record: MessageRecord,
    caps: &ViewerCapabilities,
    config: &ConfigSnapshot,
) -> MessageRecord {
    if !can_see_author(caps, config) {
        record.author = ANONYMOUS.to_string();
        record.author_id = ANONYMOUS.to_string();
    }
    if config.hide_edit_time {
        record.last_edit = None;
    }
    if !can_see_views(caps, config) {
        record.views = 0;
    }
    record
}

/// Build the embedded "original message" view for a reply. A tombstoned
/// parent is shown to non-elevated viewers as a fixed placeholder, never its
/// real tombstone content; an absent parent becomes a "not found" stub
/// carrying the requested ID.
pub fn parent_view(
    lookup: ParentLookup,
    caps: &ViewerCapabilities,
    config: &ConfigSnapshot,
) -> MessageRecord {
    match lookup {
        ParentLookup::Missing(id) => placeholder(id, MISSING_PLACEHOLDER, UNNAMED_AUTHOR, None),
        ParentLookup::Found(parent) => {
            let redacted = redact(parent, caps, config);
            if redacted.deleted && !caps.elevated() {
                let author = if redacted.author.is_empty() {
                    UNNAMED_AUTHOR.to_string()
                } else {
                    redacted.author
                };
                placeholder(
                    redacted.id,
                    DELETED_PLACEHOLDER,
                    &author,
                    Some(redacted.timestamp),
                )
            } else {
                redacted
            }
        }
    }
}

fn placeholder(
    id: i64,
    text: &str,
    author: impl Into<String>,
    timestamp: Option<DateTime<Utc>>,
) -> MessageRecord {
    MessageRecord {
        id,
        kind: String::new(),
        text: text.to_string(),
        author: author.into(),
        author_id: String::new(),
        timestamp: timestamp.unwrap_or_default(),
        last_edit: None,
        file: None,
        deleted: true,
        views: 0,
        reactions: Reactions::new(),
        reply_to: None,
        is_thread: false,
        original_message: None,
    }
}
