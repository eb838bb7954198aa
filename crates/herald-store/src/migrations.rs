use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS messages (
            id          INTEGER PRIMARY KEY,
            kind        TEXT NOT NULL DEFAULT '',
            body        TEXT NOT NULL DEFAULT '',
            author      TEXT NOT NULL DEFAULT '',
            author_id   TEXT NOT NULL DEFAULT '',
            created_at  INTEGER NOT NULL,
            edited_at   INTEGER,
            file        TEXT,
            deleted     INTEGER NOT NULL DEFAULT 0,
            views       INTEGER NOT NULL DEFAULT 0,
            reactions   TEXT NOT NULL DEFAULT '{}',
            reply_to    INTEGER,
            is_thread   INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_messages_reply_to
            ON messages(reply_to);

        -- Time-ordered feed index: one row per message, written once at
        -- creation, never mutated. Top-level pagination and search candidate
        -- ranging read only this table.
        CREATE TABLE IF NOT EXISTS feed_index (
            message_id  INTEGER PRIMARY KEY REFERENCES messages(id),
            created_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_feed_index_created
            ON feed_index(created_at);

        -- Per-message reaction ledger: each user's single active emoji.
        -- The empty string is the cleared sentinel.
        CREATE TABLE IF NOT EXISTS reaction_ledger (
            message_id  INTEGER NOT NULL REFERENCES messages(id),
            user_id     TEXT NOT NULL,
            emoji       TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (message_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS counters (
            name   TEXT PRIMARY KEY,
            value  INTEGER NOT NULL
        );

        INSERT OR IGNORE INTO counters (name, value) VALUES ('message_id', 0);

        CREATE TABLE IF NOT EXISTS kv (
            key    TEXT PRIMARY KEY,
            value  TEXT NOT NULL
        );
        ",
    )?;

    info!("Store migrations complete");
    Ok(())
}
