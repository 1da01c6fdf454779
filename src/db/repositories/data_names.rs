use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::db::{
    models::LabeledLogEntry,
    repositories::logs::{find_labeled_log, find_log},
    Database,
};

/// Sets the label for every signal sharing `data_hash`. One statement, so two
/// callers labeling the same new hash can never both take the insert path.
fn upsert_name(conn: &Connection, data_hash: &str, name: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO data_name (data_hash, name) VALUES (?1, ?2)
         ON CONFLICT(data_hash) DO UPDATE SET name = excluded.name",
        params![data_hash, name],
    )
    .with_context(|| format!("failed to upsert name for {data_hash}"))?;
    Ok(())
}

impl Database {
    /// Labels the signal stored as log `log_id` and returns the entry with its
    /// new name, or `None` when no such log exists. Runs in one transaction;
    /// any failure rolls back.
    pub async fn label_log(&self, log_id: i64, name: &str) -> Result<Option<LabeledLogEntry>> {
        let name = name.to_string();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open label transaction")?;

            let Some(entry) = find_log(&tx, log_id)? else {
                return Ok(None);
            };

            upsert_name(&tx, &entry.data_hash, &name)?;
            let labeled = find_labeled_log(&tx, log_id)?;

            tx.commit().context("failed to commit label")?;
            Ok(labeled)
        })
        .await
    }
}
