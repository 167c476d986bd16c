//! v001 -- Initial schema creation: `inboxes` and `messages`.

use rusqlite::Connection;

const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Inboxes
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS inboxes (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    name       TEXT NOT NULL,
    created_at TEXT NOT NULL                  -- RFC-3339
);

-- ----------------------------------------------------------------
-- Messages
--
-- `position` is the arrival order and the only ordering used when
-- paging history; `scheduled_time` is stored verbatim and may be
-- empty or malformed.
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    position       INTEGER PRIMARY KEY AUTOINCREMENT,
    hash           TEXT NOT NULL UNIQUE,
    inbox_id       TEXT NOT NULL,             -- FK -> inboxes(id)
    is_local       INTEGER NOT NULL,          -- boolean 0/1
    scheduled_time TEXT NOT NULL,
    content        TEXT NOT NULL,

    FOREIGN KEY (inbox_id) REFERENCES inboxes(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_inbox_position
    ON messages(inbox_id, position DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
