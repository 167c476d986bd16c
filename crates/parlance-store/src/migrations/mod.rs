//! Schema migrations, applied in order when a database is opened.
//!
//! The applied version lives in `PRAGMA user_version`; a migration whose
//! version is not above it is skipped.

pub mod v001_initial;

use rusqlite::Connection;

use crate::error::{Result, StoreError};

type Migration = (u32, &'static str, fn(&Connection) -> rusqlite::Result<()>);

const MIGRATIONS: &[Migration] = &[(1, "v001_initial", v001_initial::up)];

/// Version of the newest known migration.
pub const CURRENT_VERSION: u32 = 1;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    let applied: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if applied >= CURRENT_VERSION {
        tracing::debug!(version = applied, "schema up to date");
        return Ok(());
    }

    for &(version, name, up) in MIGRATIONS.iter().filter(|(v, _, _)| *v > applied) {
        tracing::info!(version, name, "applying migration");
        up(conn).map_err(|e| StoreError::Migration(format!("{name}: {e}")))?;
        conn.pragma_update(None, "user_version", version)?;
    }

    Ok(())
}
