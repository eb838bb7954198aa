use anyhow::Result;
use herald_types::api::Direction;
use herald_types::models::{MessageRecord, Reactions, UserEntry};
use rusqlite::{Connection, OptionalExtension, params};

use crate::Store;
use crate::models::{FeedItem, MessageRow, ParentLookup};

const MESSAGE_COLUMNS: &str = "id, kind, body, author, author_id, created_at, edited_at, file, \
                               deleted, views, reactions, reply_to, is_thread";

const USERS_LIST_KEY: &str = "users:list";

impl Store {
    // -- IDs --

    pub fn next_message_id(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let id = conn.query_row(
                "UPDATE counters SET value = value + 1 WHERE name = 'message_id' RETURNING value",
                [],
                |row| row.get(0),
            )?;
            Ok(id)
        })
    }

    // -- Messages --

    /// Insert a new record, and its feed-index row when `index_entry` is set,
    /// in one atomic step.
    pub fn insert_message(&self, record: &MessageRecord, index_entry: bool) -> Result<()> {
        self.with_conn(|conn| {
            let file = record
                .file
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            let reactions = serde_json::to_string(&record.reactions)?;

            conn.execute(
                "INSERT INTO messages (id, kind, body, author, author_id, created_at, edited_at, \
                 file, deleted, views, reactions, reply_to, is_thread) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    record.id,
                    record.kind,
                    record.text,
                    record.author,
                    record.author_id,
                    record.timestamp.timestamp_millis(),
                    record.last_edit.map(|t| t.timestamp_millis()),
                    file,
                    record.deleted,
                    record.views,
                    reactions,
                    record.reply_to,
                    record.is_thread,
                ],
            )?;

            if index_entry {
                conn.execute(
                    "INSERT INTO feed_index (message_id, created_at) VALUES (?1, ?2)",
                    params![record.id, record.timestamp.timestamp_millis()],
                )?;
            }

            Ok(())
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRecord>> {
        self.with_conn(|conn| fetch_record(conn, id))
    }

    pub fn message_exists(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT id FROM messages WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Apply an edit and return the updated record, or None when the target
    /// does not exist. Update and re-read happen under the same lock.
    pub fn apply_edit(
        &self,
        id: i64,
        text: &str,
        file: Option<&serde_json::Value>,
        edited_at_ms: i64,
    ) -> Result<Option<MessageRecord>> {
        self.with_conn(|conn| {
            let file = file.map(serde_json::to_string).transpose()?;
            let changed = conn.execute(
                "UPDATE messages SET body = ?2, file = ?3, edited_at = ?4 WHERE id = ?1",
                params![id, text, file, edited_at_ms],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            fetch_record(conn, id)
        })
    }

    /// Soft delete: tombstone the row in place. The feed-index entry stays.
    pub fn soft_delete(
        &self,
        id: i64,
        placeholder_body: &str,
        edited_at_ms: i64,
    ) -> Result<Option<MessageRecord>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET deleted = 1, body = ?2, file = NULL, edited_at = ?3 \
                 WHERE id = ?1",
                params![id, placeholder_body, edited_at_ms],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            fetch_record(conn, id)
        })
    }

    // -- Feed --

    /// The feed-page script: resolve the cursor's rank in the time index,
    /// then repeatedly slice the index, load records, drop tombstones the
    /// viewer may not see, and resolve one level of reply-to parent — all
    /// under the store lock, so the page is a consistent snapshot.
    pub fn feed_page(
        &self,
        cursor: Option<i64>,
        page_size: usize,
        direction: Direction,
        include_deleted: bool,
    ) -> Result<Vec<FeedItem>> {
        self.with_conn(|conn| {
            let mut offset = resolve_cursor_rank(conn, cursor, direction)?;
            let mut items: Vec<FeedItem> = Vec::with_capacity(page_size);

            loop {
                let needed = page_size - items.len();
                let ids = index_slice(conn, direction, needed, offset)?;
                if ids.is_empty() {
                    break;
                }
                offset += ids.len() as i64;

                for id in ids {
                    // An index entry whose record is gone is skipped outright;
                    // only reply-to parents get a placeholder.
                    let Some(record) = fetch_record(conn, id)? else {
                        continue;
                    };
                    if record.deleted && !include_deleted {
                        continue;
                    }

                    let parent = match record.reply_to {
                        Some(parent_id) => Some(match fetch_record(conn, parent_id)? {
                            Some(parent) => ParentLookup::Found(parent),
                            None => ParentLookup::Missing(parent_id),
                        }),
                        None => None,
                    };

                    items.push(FeedItem { record, parent });
                    if items.len() == page_size {
                        break;
                    }
                }

                if items.len() >= page_size {
                    break;
                }
            }

            Ok(items)
        })
    }

    /// Thread retrieval scans the records themselves, not the feed index —
    /// thread replies may have no index entry at all.
    pub fn thread_replies(
        &self,
        parent_id: i64,
        include_deleted: bool,
    ) -> Result<Vec<MessageRecord>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE reply_to = ?1 \
                 {} ORDER BY created_at ASC, id ASC",
                if include_deleted {
                    ""
                } else {
                    "AND deleted = 0"
                }
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([parent_id], MessageRow::from_sql_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(MessageRow::into_record).collect())
        })
    }

    /// Fire-and-forget view counting for a returned feed page.
    pub fn add_views(&self, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "UPDATE messages SET views = views + 1 WHERE id IN ({})",
                placeholders.join(", ")
            );
            let params: Vec<&dyn rusqlite::types::ToSql> =
                ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();
            conn.execute(&sql, params.as_slice())?;
            Ok(())
        })
    }

    // -- Reactions --

    /// The reaction script: toggle the caller's ledger entry, recompute the
    /// aggregate from scratch, and write it back onto the record — one atomic
    /// step. Returns None when the message does not exist (nothing mutated).
    pub fn toggle_reaction(
        &self,
        message_id: i64,
        user_id: &str,
        emoji: &str,
    ) -> Result<Option<Reactions>> {
        self.with_conn(|conn| {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT id FROM messages WHERE id = ?1",
                    [message_id],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                return Ok(None);
            }

            let previous: Option<String> = conn
                .query_row(
                    "SELECT emoji FROM reaction_ledger WHERE message_id = ?1 AND user_id = ?2",
                    params![message_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;

            // Toggle: re-submitting the active emoji clears it.
            let next = if previous.as_deref() == Some(emoji) {
                ""
            } else {
                emoji
            };

            conn.execute(
                "INSERT INTO reaction_ledger (message_id, user_id, emoji) VALUES (?1, ?2, ?3) \
                 ON CONFLICT (message_id, user_id) DO UPDATE SET emoji = excluded.emoji",
                params![message_id, user_id, next],
            )?;

            // Recomputed from the ledger every time, never adjusted in place.
            let mut aggregate = Reactions::new();
            let mut stmt = conn.prepare(
                "SELECT emoji, COUNT(*) FROM reaction_ledger \
                 WHERE message_id = ?1 AND emoji != '' GROUP BY emoji",
            )?;
            let rows = stmt.query_map([message_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (emoji, count) = row?;
                aggregate.insert(emoji, count as u32);
            }

            conn.execute(
                "UPDATE messages SET reactions = ?2 WHERE id = ?1",
                params![message_id, serde_json::to_string(&aggregate)?],
            )?;

            Ok(Some(aggregate))
        })
    }

    // -- Search --

    /// Candidate IDs for a search scan: index entries within the time
    /// window, newest first. Bounds the scan independent of corpus size.
    pub fn search_candidates(&self, min_created_at_ms: i64) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT message_id FROM feed_index WHERE created_at >= ?1 \
                 ORDER BY created_at DESC, message_id DESC",
            )?;
            let ids = stmt
                .query_map([min_created_at_ms], |row| row.get(0))?
                .collect::<std::result::Result<Vec<i64>, _>>()?;
            Ok(ids)
        })
    }

    // -- Users --

    pub fn get_users(&self) -> Result<Vec<UserEntry>> {
        self.with_conn(|conn| {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT value FROM kv WHERE key = ?1",
                    [USERS_LIST_KEY],
                    |row| row.get(0),
                )
                .optional()?;
            match raw {
                Some(json) => Ok(serde_json::from_str(&json)?),
                None => Ok(Vec::new()),
            }
        })
    }

    pub fn set_users(&self, users: &[UserEntry]) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2) \
                 ON CONFLICT (key) DO UPDATE SET value = excluded.value",
                params![USERS_LIST_KEY, serde_json::to_string(users)?],
            )?;
            Ok(())
        })
    }
}

fn fetch_record(conn: &Connection, id: i64) -> Result<Option<MessageRecord>> {
    let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1");
    let row = conn
        .query_row(&sql, [id], MessageRow::from_sql_row)
        .optional()?;
    Ok(row.map(MessageRow::into_record))
}

/// Rank of the exclusive start position: the cursor's rank plus one when the
/// cursor is found in the index, rank 0 (the relevant end) otherwise.
fn resolve_cursor_rank(
    conn: &Connection,
    cursor: Option<i64>,
    direction: Direction,
) -> Result<i64> {
    let Some(cursor_id) = cursor else {
        return Ok(0);
    };

    let cursor_ts: Option<i64> = conn
        .query_row(
            "SELECT created_at FROM feed_index WHERE message_id = ?1",
            [cursor_id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(cursor_ts) = cursor_ts else {
        return Ok(0);
    };

    let sql = match direction {
        Direction::Desc => {
            "SELECT COUNT(*) FROM feed_index \
             WHERE created_at > ?1 OR (created_at = ?1 AND message_id > ?2)"
        }
        Direction::Asc => {
            "SELECT COUNT(*) FROM feed_index \
             WHERE created_at < ?1 OR (created_at = ?1 AND message_id < ?2)"
        }
    };
    let rank: i64 = conn.query_row(sql, params![cursor_ts, cursor_id], |row| row.get(0))?;
    Ok(rank + 1)
}

fn index_slice(
    conn: &Connection,
    direction: Direction,
    limit: usize,
    offset: i64,
) -> Result<Vec<i64>> {
    let sql = match direction {
        Direction::Desc => {
            "SELECT message_id FROM feed_index \
             ORDER BY created_at DESC, message_id DESC LIMIT ?1 OFFSET ?2"
        }
        Direction::Asc => {
            "SELECT message_id FROM feed_index \
             ORDER BY created_at ASC, message_id ASC LIMIT ?1 OFFSET ?2"
        }
    };
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map(params![limit as i64, offset], |row| row.get(0))?
        .collect::<std::result::Result<Vec<i64>, _>>()?;
    Ok(ids)
}
