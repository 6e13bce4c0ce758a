//! Channel CRUD operations and the [`ChannelStore`] implementation.

use super::{ChannelRecord, Database, DatabaseError, Result, ScanHistoryRecord};
use crate::store::{plan_merge, ChannelStore, MergePolicy, MergeResult};
use dvbscan_protocol::{Channel, Source};
use rusqlite::types::Type;
use rusqlite::{params, Connection};

fn insert(conn: &Connection, channel: &Channel) -> Result<i64> {
    conn.execute(
        "INSERT INTO channels (
            source, onid, tid, sid, name, provider, frequency,
            service_type, lcn, vdr_line, data
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            channel.source.to_string(),
            channel.onid as i32,
            channel.tid as i32,
            channel.sid as i32,
            channel.name,
            channel.provider,
            channel.frequency as i64,
            channel.service_type as i32,
            channel.lcn.map(|v| v as i32),
            channel.to_vdr_line(),
            serde_json::to_string(channel)?,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn update(conn: &Connection, id: i64, channel: &Channel) -> Result<()> {
    conn.execute(
        "UPDATE channels SET
            source = ?2, onid = ?3, tid = ?4, sid = ?5, name = ?6, provider = ?7,
            frequency = ?8, service_type = ?9, lcn = ?10, vdr_line = ?11, data = ?12
         WHERE id = ?1",
        params![
            id,
            channel.source.to_string(),
            channel.onid as i32,
            channel.tid as i32,
            channel.sid as i32,
            channel.name,
            channel.provider,
            channel.frequency as i64,
            channel.service_type as i32,
            channel.lcn.map(|v| v as i32),
            channel.to_vdr_line(),
            serde_json::to_string(channel)?,
        ],
    )?;
    Ok(())
}

fn all_channels(conn: &Connection) -> Result<Vec<ChannelRecord>> {
    let mut stmt = conn.prepare("SELECT * FROM channels ORDER BY id")?;
    let records = stmt
        .query_map([], Database::row_to_channel_record)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(records)
}

impl Database {
    /// Insert a new channel.
    pub fn insert_channel(&self, channel: &Channel) -> Result<i64> {
        insert(&self.conn, channel)
    }

    /// Replace the stored record `id` by `channel`.
    pub fn update_channel(&self, id: i64, channel: &Channel) -> Result<()> {
        update(&self.conn, id, channel)
    }

    pub fn delete_channel(&self, id: i64) -> Result<()> {
        self.conn.execute("DELETE FROM channels WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Get channel by unique key (source, onid, tid, sid).
    pub fn get_channel_by_key(&self, source: &Source, onid: u16, tid: u16, sid: u16) -> Result<Option<ChannelRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM channels WHERE source = ?1 AND onid = ?2 AND tid = ?3 AND sid = ?4")?;
        let result = stmt.query_row(
            params![source.to_string(), onid as i32, tid as i32, sid as i32],
            Self::row_to_channel_record,
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Like [`get_channel_by_key`](Self::get_channel_by_key), but a missing
    /// channel is an error.
    pub fn require_channel(&self, source: &Source, onid: u16, tid: u16, sid: u16) -> Result<ChannelRecord> {
        self.get_channel_by_key(source, onid, tid, sid)?
            .ok_or(DatabaseError::ChannelNotFound { onid, tid, sid })
    }

    /// Get all channels from the database, in insertion order.
    pub fn get_all_channels(&self) -> Result<Vec<ChannelRecord>> {
        all_channels(&self.conn)
    }

    /// Get channels of one delivery source.
    pub fn get_channels_by_source(&self, source: &Source) -> Result<Vec<ChannelRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM channels WHERE source = ?1 ORDER BY lcn IS NULL, lcn, onid, tid, sid")?;
        let records = stmt
            .query_map([source.to_string()], Self::row_to_channel_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Most recent merges first.
    pub fn get_scan_history(&self, limit: usize) -> Result<Vec<ScanHistoryRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM scan_history ORDER BY scan_time DESC, id DESC LIMIT ?1")?;
        let records = stmt
            .query_map([limit as i64], |row| {
                Ok(ScanHistoryRecord {
                    id: row.get("id")?,
                    source: row.get("source")?,
                    scan_time: row.get("scan_time")?,
                    channel_count: row.get("channel_count")?,
                    inserted: row.get("inserted")?,
                    updated: row.get("updated")?,
                    removed: row.get("removed")?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn row_to_channel_record(row: &rusqlite::Row) -> rusqlite::Result<ChannelRecord> {
        let data: String = row.get("data")?;
        let channel: Channel = serde_json::from_str(&data).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
        })?;
        Ok(ChannelRecord {
            id: row.get("id")?,
            source: row.get("source")?,
            onid: row.get::<_, i32>("onid")? as u16,
            tid: row.get::<_, i32>("tid")? as u16,
            sid: row.get::<_, i32>("sid")? as u16,
            vdr_line: row.get("vdr_line")?,
            channel,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

impl ChannelStore for Database {
    type Error = DatabaseError;

    fn channels(&self) -> Result<Vec<Channel>> {
        Ok(self.get_all_channels()?.into_iter().map(|r| r.channel).collect())
    }

    fn merge(&mut self, discovered: &[Channel], policy: &MergePolicy) -> Result<MergeResult> {
        let tx = self.conn.transaction()?;

        let existing = all_channels(&tx)?;
        let stored: Vec<Channel> = existing.iter().map(|r| r.channel.clone()).collect();
        let plan = plan_merge(&stored, discovered, policy);
        let result = plan.result();

        for (i, channel) in &plan.update {
            update(&tx, existing[*i].id, channel)?;
        }
        for i in &plan.remove {
            tx.execute("DELETE FROM channels WHERE id = ?1", [existing[*i].id])?;
        }
        for channel in &plan.append {
            insert(&tx, channel)?;
        }

        tx.execute(
            "INSERT INTO scan_history (source, scan_time, channel_count, inserted, updated, removed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                discovered.first().map(|c| c.source.to_string()),
                chrono::Utc::now().timestamp(),
                discovered.len() as i32,
                result.appended as i32,
                result.updated as i32,
                result.removed as i32,
            ],
        )?;
        tx.commit()?;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvbscan_protocol::Pid;

    fn create_test_channel(onid: u16, tid: u16, sid: u16, name: &str) -> Channel {
        let mut c = Channel::new(Source::Terrestrial);
        c.frequency = 474_000_000;
        c.onid = onid;
        c.tid = tid;
        c.sid = sid;
        c.name = name.to_string();
        c.provider = "ARD".to_string();
        c.vpid = Pid::new(0x200, 0x02);
        c.apids = vec![Pid::new(0x201, 0x03)];
        c.lcn = Some(1);
        c
    }

    #[test]
    fn test_channel_crud() {
        let db = Database::open_in_memory().unwrap();

        let channel = create_test_channel(0x2114, 0x0401, 0x6D66, "Das Erste HD");
        let id = db.insert_channel(&channel).unwrap();
        assert!(id > 0);

        let record = db
            .get_channel_by_key(&Source::Terrestrial, 0x2114, 0x0401, 0x6D66)
            .unwrap()
            .unwrap();
        assert_eq!(record.source, "T");
        assert_eq!(record.channel, channel);
        assert_eq!(record.vdr_line, channel.to_vdr_line());

        let mut renamed = channel.clone();
        renamed.name = "Das Erste".to_string();
        db.update_channel(id, &renamed).unwrap();
        let record = db.require_channel(&Source::Terrestrial, 0x2114, 0x0401, 0x6D66).unwrap();
        assert_eq!(record.channel.name, "Das Erste");

        db.delete_channel(id).unwrap();
        assert!(matches!(
            db.require_channel(&Source::Terrestrial, 0x2114, 0x0401, 0x6D66),
            Err(DatabaseError::ChannelNotFound { sid: 0x6D66, .. })
        ));
    }

    #[test]
    fn test_merge_scan_results() {
        let mut db = Database::open_in_memory().unwrap();
        let policy = MergePolicy {
            remove_invalid: true,
            update_existing: true,
            append_new: true,
        };

        let first = vec![
            create_test_channel(1, 1, 1, "One"),
            create_test_channel(1, 1, 2, "Two"),
            create_test_channel(1, 1, 3, "Three"),
        ];
        let result = db.merge(&first, &policy).unwrap();
        assert_eq!(result.appended, 3);

        // sid 2 renamed, sid 3 gone, sid 4 new
        let second = vec![
            create_test_channel(1, 1, 1, "One"),
            create_test_channel(1, 1, 2, "Two HD"),
            create_test_channel(1, 1, 4, "Four"),
        ];
        let result = db.merge(&second, &policy).unwrap();
        assert_eq!(
            result,
            MergeResult {
                removed: 1,
                updated: 1,
                appended: 1
            }
        );

        let names: Vec<String> = db.channels().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["One", "Two HD", "Four"]);

        let history = db.get_scan_history(10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].removed, Some(1));
        assert_eq!(history[0].source.as_deref(), Some("T"));
    }

    #[test]
    fn test_channels_by_source_ordered_by_lcn() {
        let db = Database::open_in_memory().unwrap();
        let mut a = create_test_channel(1, 1, 1, "A");
        a.lcn = Some(5);
        let mut b = create_test_channel(1, 1, 2, "B");
        b.lcn = None;
        let mut c = create_test_channel(1, 1, 3, "C");
        c.lcn = Some(2);
        let mut other = create_test_channel(1, 1, 4, "Cable");
        other.source = Source::Cable;
        for ch in [&a, &b, &c, &other] {
            db.insert_channel(ch).unwrap();
        }

        let names: Vec<String> = db
            .get_channels_by_source(&Source::Terrestrial)
            .unwrap()
            .into_iter()
            .map(|r| r.channel.name)
            .collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }
}
