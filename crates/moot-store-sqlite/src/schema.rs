//! SQL schema for the Moot SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated
//! on `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS topics (
    topic_id     TEXT PRIMARY KEY,
    forum_id     TEXT NOT NULL,
    user_id      TEXT NOT NULL,
    subject      TEXT NOT NULL,
    state        TEXT NOT NULL DEFAULT 'pending_review',
                 -- 'pending_review' | 'spam' | 'approved'
    locked       INTEGER NOT NULL DEFAULT 0,
    pinned       INTEGER NOT NULL DEFAULT 0,
    hidden       INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL,
    last_post_at TEXT NOT NULL
);

-- Children of a topic cascade away with it.
CREATE TABLE IF NOT EXISTS posts (
    post_id    TEXT PRIMARY KEY,
    topic_id   TEXT NOT NULL REFERENCES topics(topic_id) ON DELETE CASCADE,
    user_id    TEXT NOT NULL,
    body       TEXT NOT NULL,
    approved   INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

-- One row per (topic, user); count only ever increments.
CREATE TABLE IF NOT EXISTS views (
    view_id        TEXT PRIMARY KEY,
    topic_id       TEXT NOT NULL REFERENCES topics(topic_id) ON DELETE CASCADE,
    user_id        TEXT NOT NULL,
    count          INTEGER NOT NULL DEFAULT 0,
    last_viewed_at TEXT NOT NULL,
    UNIQUE (topic_id, user_id)
);

CREATE TABLE IF NOT EXISTS subscriptions (
    subscription_id TEXT PRIMARY KEY,
    topic_id        TEXT NOT NULL REFERENCES topics(topic_id) ON DELETE CASCADE,
    subscriber_id   TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    UNIQUE (topic_id, subscriber_id)
);

-- The user directory: only the field this core owns.
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY,
    state   TEXT NOT NULL DEFAULT 'pending'   -- 'pending' | 'approved'
);

CREATE INDEX IF NOT EXISTS posts_topic_created_idx ON posts(topic_id, created_at);
CREATE INDEX IF NOT EXISTS topics_listing_idx     ON topics(hidden, pinned, last_post_at);

PRAGMA user_version = 1;
";
