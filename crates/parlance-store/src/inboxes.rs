//! CRUD operations for [`Inbox`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Inbox;

impl Database {
    /// Insert a new inbox.
    pub fn create_inbox(&self, inbox: &Inbox) -> Result<()> {
        self.conn().execute(
            "INSERT INTO inboxes (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![
                inbox.id.to_string(),
                inbox.name,
                inbox.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch a single inbox by UUID.
    pub fn get_inbox(&self, id: Uuid) -> Result<Inbox> {
        self.conn()
            .query_row(
                "SELECT id, name, created_at FROM inboxes WHERE id = ?1",
                params![id.to_string()],
                row_to_inbox,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List all inboxes, newest first.
    pub fn list_inboxes(&self) -> Result<Vec<Inbox>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, name, created_at FROM inboxes ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map([], row_to_inbox)?;

        let mut inboxes = Vec::new();
        for row in rows {
            inboxes.push(row?);
        }
        Ok(inboxes)
    }
}

fn row_to_inbox(row: &rusqlite::Row<'_>) -> rusqlite::Result<Inbox> {
    let id_str: String = row.get(0)?;
    let name: String = row.get(1)?;
    let created_str: String = row.get(2)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Inbox {
        id,
        name,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_list() {
        let db = Database::open_in_memory().unwrap();
        let inbox = Inbox::new("agent/gpt");
        db.create_inbox(&inbox).unwrap();

        assert_eq!(db.get_inbox(inbox.id).unwrap().name, "agent/gpt");
        assert_eq!(db.list_inboxes().unwrap().len(), 1);
        assert!(matches!(
            db.get_inbox(Uuid::new_v4()),
            Err(StoreError::NotFound)
        ));
    }
}
