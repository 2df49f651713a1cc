//! SQL schema for the Agora SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id     TEXT PRIMARY KEY,
    username    TEXT NOT NULL UNIQUE,
    role        TEXT NOT NULL DEFAULT 'member',   -- 'member' | 'admin'
    created_at  TEXT NOT NULL
);

-- topics_count and last_topic_id are a cache of an aggregate over topics.
CREATE TABLE IF NOT EXISTS categories (
    category_id    TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    alias          TEXT NOT NULL UNIQUE,
    description    TEXT NOT NULL DEFAULT '',
    topics_count   INTEGER NOT NULL DEFAULT 0,
    last_topic_id  TEXT,
    position       INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

-- short_id is NULL only for legacy rows awaiting the backfill sweep.
-- category_id is checked at insert time rather than by a foreign key.
CREATE TABLE IF NOT EXISTS topics (
    topic_id        TEXT PRIMARY KEY,
    short_id        TEXT UNIQUE,
    title           TEXT NOT NULL,
    body            TEXT NOT NULL,
    comments_count  INTEGER NOT NULL DEFAULT 0,
    category_id     TEXT NOT NULL,
    user_id         TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    score           INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,   -- fixed-width RFC 3339, nanoseconds, UTC
    updated_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS topics_created_idx  ON topics(created_at DESC);
CREATE INDEX IF NOT EXISTS topics_user_idx     ON topics(user_id, created_at DESC);
CREATE INDEX IF NOT EXISTS topics_category_idx ON topics(category_id, created_at DESC);
CREATE INDEX IF NOT EXISTS topics_score_idx    ON topics(score DESC, created_at DESC);

CREATE TABLE IF NOT EXISTS statistics (
    statistic_id  TEXT PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE,
    count         INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

PRAGMA user_version = 1;
";
