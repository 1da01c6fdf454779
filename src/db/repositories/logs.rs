use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

use crate::db::{
    helpers::to_u32,
    models::{LabeledLogEntry, LogEntry, NewLogEntry},
    Database,
};

const SELECT_LABELED: &str = "SELECT irlog.id AS id, format, freq, data, irlog.data_hash AS data_hash,
        hostname, deviceid, created_at, data_name.name AS name
 FROM irlog
 LEFT JOIN data_name ON irlog.data_hash = data_name.data_hash";

fn row_to_log(row: &Row) -> Result<LogEntry> {
    Ok(LogEntry {
        id: row.get("id")?,
        format: row.get("format")?,
        freq: to_u32(row.get("freq")?, "freq")?,
        data: row.get("data")?,
        data_hash: row.get("data_hash")?,
        hostname: row.get("hostname")?,
        deviceid: row.get("deviceid")?,
        created_at: row.get("created_at")?,
    })
}

fn row_to_labeled(row: &Row) -> Result<LabeledLogEntry> {
    let name: Option<String> = row.get("name")?;
    Ok(LabeledLogEntry::new(row_to_log(row)?, name))
}

pub(super) fn find_log(conn: &Connection, log_id: i64) -> Result<Option<LogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, format, freq, data, data_hash, hostname, deviceid, created_at
         FROM irlog
         WHERE id = ?1",
    )?;
    let mut rows = stmt.query(params![log_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_log(row)?)),
        None => Ok(None),
    }
}

pub(super) fn find_labeled_log(conn: &Connection, log_id: i64) -> Result<Option<LabeledLogEntry>> {
    let mut stmt = conn.prepare(&format!("{SELECT_LABELED} WHERE irlog.id = ?1 LIMIT 1"))?;
    let mut rows = stmt.query(params![log_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_labeled(row)?)),
        None => Ok(None),
    }
}

impl Database {
    /// Appends a captured signal and returns its row id. Repeated signals get
    /// a new row every time.
    pub async fn insert_log(&self, entry: &NewLogEntry) -> Result<i64> {
        let record = entry.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO irlog (format, freq, data, data_hash, hostname, deviceid, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.format,
                    record.freq,
                    record.data,
                    record.data_hash,
                    record.hostname,
                    record.deviceid,
                    record.created_at,
                ],
            )
            .with_context(|| "failed to insert log entry")?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Newest entries first, with display names resolved.
    pub async fn list_recent_logs(&self, limit: u32) -> Result<Vec<LabeledLogEntry>> {
        self.execute(move |conn| {
            let mut stmt =
                conn.prepare(&format!("{SELECT_LABELED} ORDER BY irlog.id DESC LIMIT ?1"))?;

            let mut rows = stmt.query(params![limit])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(row_to_labeled(row)?);
            }

            Ok(entries)
        })
        .await
    }

    pub async fn get_labeled_log(&self, log_id: i64) -> Result<Option<LabeledLogEntry>> {
        self.execute(move |conn| find_labeled_log(conn, log_id)).await
    }

    pub async fn get_log(&self, log_id: i64) -> Result<Option<LogEntry>> {
        self.execute(move |conn| find_log(conn, log_id)).await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_support::{new_entry, open_temp};
    use crate::signal;

    #[tokio::test]
    async fn insert_is_append_only() {
        let (_dir, db) = open_temp();

        let first = db.insert_log(&new_entry("1,2,3", 10)).await.unwrap();
        let second = db.insert_log(&new_entry("1,2,3", 20)).await.unwrap();

        assert!(second > first);
        assert_eq!(db.count_logs().await.unwrap(), 2);

        let stored = db.get_log(first).await.unwrap().unwrap();
        assert_eq!(stored.data, "1,2,3");
        assert_eq!(stored.data_hash, signal::content_hash("1,2,3"));
        assert_eq!(stored.created_at, 10);
    }

    #[tokio::test]
    async fn recent_logs_are_newest_first_and_limited() {
        let (_dir, db) = open_temp();
        for i in 0..25 {
            db.insert_log(&new_entry(&format!("{i},1,2,3"), i)).await.unwrap();
        }

        let logs = db.list_recent_logs(20).await.unwrap();
        assert_eq!(logs.len(), 20);
        assert_eq!(logs[0].entry.data, "24,1,2,3");
        assert_eq!(logs[0].name, "24,1,2...");
        assert!(logs.windows(2).all(|pair| pair[0].entry.id > pair[1].entry.id));
    }

    #[tokio::test]
    async fn missing_log_reads_as_none() {
        let (_dir, db) = open_temp();
        assert!(db.get_log(99).await.unwrap().is_none());
        assert!(db.get_labeled_log(99).await.unwrap().is_none());
    }
}
