//! SQL schema for the chatsync SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per (owner, message). The composite key is what makes the
-- upsert in save_message idempotent.
CREATE TABLE IF NOT EXISTS messages (
    owner_identity    TEXT    NOT NULL,
    message_id        TEXT    NOT NULL,
    chat_id           TEXT    NOT NULL,
    sender_id         TEXT    NOT NULL,
    recipient_id      TEXT,
    text              TEXT    NOT NULL,
    timestamp         INTEGER NOT NULL,   -- seconds, provider clock
    message_type      TEXT    NOT NULL DEFAULT 'text',
    quoted_message_id TEXT,               -- not a foreign key
    is_from_me        INTEGER NOT NULL,
    is_read           INTEGER NOT NULL,
    created_at        TEXT    NOT NULL,   -- RFC 3339 UTC, fixed width
    updated_at        TEXT    NOT NULL,
    PRIMARY KEY (owner_identity, message_id),
    CHECK (is_from_me = 0 OR is_read = 1)
);

CREATE INDEX IF NOT EXISTS messages_chat_ts_idx
    ON messages(owner_identity, chat_id, timestamp);
CREATE INDEX IF NOT EXISTS messages_unread_idx
    ON messages(owner_identity, is_read, timestamp);
CREATE INDEX IF NOT EXISTS messages_created_idx
    ON messages(owner_identity, created_at);

PRAGMA user_version = 1;
";
