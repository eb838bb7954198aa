use std::sync::Arc;

use chrono::Utc;
use herald_gateway::Dispatcher;
use herald_store::Store;
use herald_types::api::{Direction, EditMessageRequest, MessageDraft};
use herald_types::config::{ConfigHandle, ConfigSnapshot};
use herald_types::models::{MessageRecord, Reactions, ViewerCapabilities};
use tracing::warn;

use crate::error::{CoreError, Result};
use crate::notify::NotificationSink;
use crate::redact::{DELETED_PLACEHOLDER, parent_view, redact};
use crate::run_blocking;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Cursor-based feed retrieval plus the message write operations. Writes
/// mutate the store, publish to the event bus, and hand the finalized record
/// to the notification sink; reads never touch the bus.
pub struct FeedEngine {
    store: Arc<Store>,
    config: ConfigHandle,
    dispatcher: Dispatcher,
    sink: Arc<dyn NotificationSink>,
}

impl FeedEngine {
    pub fn new(
        store: Arc<Store>,
        config: ConfigHandle,
        dispatcher: Dispatcher,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            config,
            dispatcher,
            sink,
        }
    }

    /// One page of the top-level feed: redacted records in time order with
    /// one level of reply-to embedding. The underlying store pass is atomic,
    /// so the page is a consistent snapshot of index and records.
    pub async fn get_page(
        &self,
        cursor: Option<i64>,
        limit: i64,
        direction: Direction,
        caps: &ViewerCapabilities,
    ) -> Result<Vec<MessageRecord>> {
        let config = self.config.current();
        let page_size = clamp_page_size(limit);
        let include_deleted = caps.elevated();

        let store = self.store.clone();
        let items =
            run_blocking(move || store.feed_page(cursor, page_size, direction, include_deleted))
                .await?;

        let page: Vec<MessageRecord> = items
            .into_iter()
            .map(|item| {
                let mut record = redact(item.record, caps, &config);
                if let Some(parent) = item.parent {
                    record.original_message = Some(Box::new(parent_view(parent, caps, &config)));
                }
                record
            })
            .collect();

        // View counting is a side effect of feed pages only, off the
        // response path.
        if config.count_views && !page.is_empty() {
            let ids: Vec<i64> = page.iter().map(|m| m.id).collect();
            let store = self.store.clone();
            tokio::task::spawn_blocking(move || {
                if let Err(err) = store.add_views(&ids) {
                    warn!("failed to count views: {err:#}");
                }
            });
        }

        Ok(page)
    }

    /// All replies under a parent, oldest first. Scans records directly —
    /// thread replies may have no index entry.
    pub async fn get_thread(
        &self,
        parent_id: i64,
        caps: &ViewerCapabilities,
    ) -> Result<Vec<MessageRecord>> {
        if parent_id <= 0 {
            return Err(CoreError::InvalidInput("invalid message id".into()));
        }
        let config = self.config.current();
        let include_deleted = caps.elevated();

        let store = self.store.clone();
        let replies =
            run_blocking(move || store.thread_replies(parent_id, include_deleted)).await?;

        Ok(replies
            .into_iter()
            .map(|record| redact(record, caps, &config))
            .collect())
    }

    pub async fn create(
        &self,
        draft: MessageDraft,
        caps: &ViewerCapabilities,
    ) -> Result<MessageRecord> {
        let config = self.config.current();
        if !caps.is_writer && !caps.elevated() {
            return Err(CoreError::Forbidden("writer privilege required".into()));
        }

        let text = apply_body_filters(&config, draft.text);

        if let Some(parent_id) = draft.reply_to {
            let store = self.store.clone();
            if !run_blocking(move || store.message_exists(parent_id)).await? {
                return Err(CoreError::InvalidInput(
                    "referenced message not found".into(),
                ));
            }
        }

        let store = self.store.clone();
        let id = run_blocking(move || store.next_message_id()).await?;

        let record = MessageRecord {
            id,
            kind: draft.kind,
            text,
            author: caps.display_name.clone().unwrap_or_default(),
            author_id: caps.identity.clone().unwrap_or_default(),
            timestamp: Utc::now(),
            last_edit: None,
            file: draft.file,
            deleted: false,
            views: 0,
            reactions: Reactions::new(),
            reply_to: draft.reply_to,
            is_thread: draft.is_thread,
            original_message: None,
        };

        let index_entry = config.index_thread_replies || !record.is_thread_reply();
        let store = self.store.clone();
        let stored = record.clone();
        run_blocking(move || store.insert_message(&stored, index_entry)).await?;

        self.publish_and_notify("create", FeedEventKind::New, record.clone());
        Ok(record)
    }

    pub async fn edit(
        &self,
        id: i64,
        request: EditMessageRequest,
        caps: &ViewerCapabilities,
    ) -> Result<MessageRecord> {
        let config = self.config.current();

        let store = self.store.clone();
        let record = run_blocking(move || store.get_message(id))
            .await?
            .ok_or(CoreError::NotFound)?;

        authorize_mutation(&record, caps, &config)?;

        let store = self.store.clone();
        let now = Utc::now().timestamp_millis();
        let updated = run_blocking(move || {
            store.apply_edit(id, &request.text, request.file.as_ref(), now)
        })
        .await?
        .ok_or(CoreError::NotFound)?;

        self.publish_and_notify("update", FeedEventKind::Edit, updated.clone());
        Ok(updated)
    }

    pub async fn delete(&self, id: i64, caps: &ViewerCapabilities) -> Result<MessageRecord> {
        let config = self.config.current();

        let store = self.store.clone();
        let record = run_blocking(move || store.get_message(id))
            .await?
            .ok_or(CoreError::NotFound)?;

        authorize_mutation(&record, caps, &config)?;

        let store = self.store.clone();
        let now = Utc::now().timestamp_millis();
        let deleted = run_blocking(move || store.soft_delete(id, DELETED_PLACEHOLDER, now))
            .await?
            .ok_or(CoreError::NotFound)?;

        self.publish_and_notify("delete", FeedEventKind::Delete, deleted.clone());
        Ok(deleted)
    }

    fn publish_and_notify(&self, kind: &'static str, event: FeedEventKind, record: MessageRecord) {
        use herald_types::events::FeedEvent;

        self.dispatcher.publish(match event {
            FeedEventKind::New => FeedEvent::NewMessage(record.clone()),
            FeedEventKind::Edit => FeedEvent::EditMessage(record.clone()),
            FeedEventKind::Delete => FeedEvent::DeleteMessage(record.clone()),
        });

        let sink = self.sink.clone();
        tokio::spawn(async move {
            sink.notify(kind, &record);
        });
    }
}

enum FeedEventKind {
    New,
    Edit,
    Delete,
}

fn clamp_page_size(limit: i64) -> usize {
    if limit <= 0 {
        DEFAULT_PAGE_SIZE as usize
    } else {
        limit.min(MAX_PAGE_SIZE) as usize
    }
}

fn apply_body_filters(config: &ConfigSnapshot, mut text: String) -> String {
    for filter in &config.body_filters {
        text = filter
            .pattern
            .replace_all(&text, filter.replacement.as_str())
            .into_owned();
    }
    text
}

/// Admins and moderators may always mutate. Anyone else must own the record,
/// hold writer privilege, and still be inside the edit window.
fn authorize_mutation(
    record: &MessageRecord,
    caps: &ViewerCapabilities,
    config: &ConfigSnapshot,
) -> Result<()> {
    if caps.elevated() {
        return Ok(());
    }

    let is_owner = caps
        .identity
        .as_deref()
        .is_some_and(|identity| identity == record.author_id && !identity.is_empty());
    if !is_owner {
        return Err(CoreError::Forbidden(
            "you can only modify your own messages".into(),
        ));
    }
    if !caps.is_writer {
        return Err(CoreError::Forbidden("writer privilege required".into()));
    }

    let elapsed = Utc::now().signed_duration_since(record.timestamp).num_seconds();
    if elapsed > config.edit_time_limit_secs {
        return Err(CoreError::Forbidden("edit time limit exceeded".into()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned_record(author_id: &str, age_secs: i64) -> MessageRecord {
        MessageRecord {
            id: 1,
            kind: "md".into(),
            text: "body".into(),
            author: "Dana".into(),
            author_id: author_id.into(),
            timestamp: Utc::now() - chrono::Duration::seconds(age_secs),
            last_edit: None,
            file: None,
            deleted: false,
            views: 0,
            reactions: Reactions::new(),
            reply_to: None,
            is_thread: false,
            original_message: None,
        }
    }

    fn writer(identity: &str) -> ViewerCapabilities {
        ViewerCapabilities {
            is_authenticated: true,
            is_writer: true,
            identity: Some(identity.into()),
            display_name: Some("Dana".into()),
            ..Default::default()
        }
    }

    #[test]
    fn owner_inside_the_window_may_mutate() {
        let config = ConfigSnapshot::default();
        let record = owned_record("dana@example.org", 10);
        assert!(authorize_mutation(&record, &writer("dana@example.org"), &config).is_ok());
    }

    #[test]
    fn non_owner_is_rejected() {
        let config = ConfigSnapshot::default();
        let record = owned_record("dana@example.org", 10);
        let err = authorize_mutation(&record, &writer("eve@example.org"), &config).unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }

    #[test]
    fn owner_without_writer_privilege_is_rejected() {
        let config = ConfigSnapshot::default();
        let record = owned_record("dana@example.org", 10);
        let mut caps = writer("dana@example.org");
        caps.is_writer = false;
        assert!(authorize_mutation(&record, &caps, &config).is_err());
    }

    #[test]
    fn owner_past_the_window_is_rejected_but_moderator_passes() {
        let mut config = ConfigSnapshot::default();
        config.edit_time_limit_secs = 60;
        let record = owned_record("dana@example.org", 3_600);

        assert!(authorize_mutation(&record, &writer("dana@example.org"), &config).is_err());

        let moderator = ViewerCapabilities {
            is_authenticated: true,
            is_moderator: true,
            ..Default::default()
        };
        assert!(authorize_mutation(&record, &moderator, &config).is_ok());
    }

    #[test]
    fn anonymous_author_identity_never_matches() {
        let config = ConfigSnapshot::default();
        // records written through external ingestion can have no author id
        let record = owned_record("", 10);
        let mut caps = writer("dana@example.org");
        caps.identity = Some(String::new());
        assert!(authorize_mutation(&record, &caps, &config).is_err());
    }

    #[test]
    fn body_filters_rewrite_on_the_way_in() {
        let config = ConfigSnapshot::from_settings(&[herald_types::config::Setting {
            key: "body-filter".into(),
            value: herald_types::config::SettingValue::Text(r"\bsecret\b#[redacted]".into()),
        }]);
        let out = apply_body_filters(&config, "the secret plan".into());
        assert_eq!(out, "the [redacted] plan");
    }

    #[test]
    fn page_size_clamping() {
        assert_eq!(clamp_page_size(0), 20);
        assert_eq!(clamp_page_size(-3), 20);
        assert_eq!(clamp_page_size(7), 7);
        assert_eq!(clamp_page_size(10_000), 100);
    }
}
