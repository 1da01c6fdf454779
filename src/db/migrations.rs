use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// Schema scripts in order; `user_version` counts how many have been applied.
const SCHEMAS: &[(&str, &str)] = &[("schema_v1.sql", include_str!("schemas/schema_v1.sql"))];

const CURRENT_SCHEMA_VERSION: i32 = SCHEMAS.len() as i32;

fn schema_version(conn: &Connection) -> Result<i32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")
}

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let version = schema_version(conn)?;
    if version > CURRENT_SCHEMA_VERSION {
        bail!("database schema v{version} is newer than this build (v{CURRENT_SCHEMA_VERSION})");
    }

    let pending = &SCHEMAS[version.max(0) as usize..];
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to open migration transaction")?;
    for (file, sql) in pending {
        tx.execute_batch(sql)
            .with_context(|| format!("failed to execute {file}"))?;
    }
    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit migrations")
}

/// Drops the log and name tables and rebuilds them empty, all in one transaction.
pub fn reset_schema(conn: &mut Connection) -> Result<()> {
    let tx = conn
        .transaction()
        .context("failed to open setup transaction")?;
    tx.execute_batch(
        "DROP TABLE IF EXISTS irlog;
         DROP TABLE IF EXISTS data_name;",
    )
    .context("failed to drop tables")?;
    for (file, sql) in SCHEMAS {
        tx.execute_batch(sql)
            .with_context(|| format!("failed to execute {file}"))?;
    }
    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit schema reset")
}
