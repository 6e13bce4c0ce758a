//! Database schema definitions.

/// SQL schema for the channel database.
pub const SCHEMA_SQL: &str = r#"
-- Discovered channels, one row per (source, onid, tid, sid)
CREATE TABLE IF NOT EXISTS channels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,                -- Delivery source, e.g. 'T' or 'S19.2E'
    onid INTEGER NOT NULL,               -- Original network ID (from SDT)
    tid INTEGER NOT NULL,                -- Transport stream ID (from PAT)
    sid INTEGER NOT NULL,                -- Service ID
    -- Searchable copies of the record
    name TEXT,
    provider TEXT,
    frequency INTEGER,                   -- Unit depends on the source
    service_type INTEGER,
    lcn INTEGER,                         -- Logical channel number (from NIT)
    vdr_line TEXT NOT NULL,              -- channels.conf line
    data TEXT NOT NULL,                  -- Full record as JSON
    -- Metadata
    created_at INTEGER DEFAULT (strftime('%s', 'now')),
    updated_at INTEGER DEFAULT (strftime('%s', 'now')),
    UNIQUE(source, onid, tid, sid)
);

-- Scan history table
CREATE TABLE IF NOT EXISTS scan_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT,
    scan_time INTEGER DEFAULT (strftime('%s', 'now')),
    channel_count INTEGER,
    inserted INTEGER,
    updated INTEGER,
    removed INTEGER
);

CREATE INDEX IF NOT EXISTS idx_channels_source ON channels(source);
CREATE INDEX IF NOT EXISTS idx_channels_onid_tid_sid ON channels(onid, tid, sid);

-- Trigger to update updated_at on channels
CREATE TRIGGER IF NOT EXISTS channels_updated_at
AFTER UPDATE ON channels
BEGIN
    UPDATE channels SET updated_at = strftime('%s', 'now') WHERE id = NEW.id;
END;
"#;
