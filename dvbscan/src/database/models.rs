//! Database model definitions.

use dvbscan_protocol::Channel;

/// Channel row.
#[derive(Debug, Clone)]
pub struct ChannelRecord {
    pub id: i64,
    pub source: String,
    pub onid: u16,
    pub tid: u16,
    pub sid: u16,
    pub vdr_line: String,
    pub channel: Channel,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Scan history record.
#[derive(Debug, Clone)]
pub struct ScanHistoryRecord {
    pub id: i64,
    pub source: Option<String>,
    pub scan_time: i64,
    pub channel_count: Option<i32>,
    pub inserted: Option<i32>,
    pub updated: Option<i32>,
    pub removed: Option<i32>,
}
