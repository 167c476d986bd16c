//! Message history, read backwards in pages.

use parlance_shared::{Message, MessageHash, Origin};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    /// Append a message to an inbox's history.
    ///
    /// Returns `false` when a message with the same hash is already stored;
    /// the node may deliver the same message more than once.
    pub fn insert_message(&self, inbox_id: Uuid, message: &Message) -> Result<bool> {
        let affected = self.conn().execute(
            "INSERT OR IGNORE INTO messages (hash, inbox_id, is_local, scheduled_time, content)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.hash.as_str(),
                inbox_id.to_string(),
                message.is_local(),
                message.scheduled_time,
                message.content,
            ],
        )?;
        Ok(affected > 0)
    }

    /// Up to `limit` messages of `inbox_id` that arrived strictly before the
    /// message `before` (or the newest ones when `before` is `None`),
    /// returned oldest first.
    pub fn get_messages_before(
        &self,
        inbox_id: Uuid,
        before: Option<&MessageHash>,
        limit: u32,
    ) -> Result<Vec<Message>> {
        let upper = match before {
            Some(hash) => self
                .conn()
                .query_row(
                    "SELECT position FROM messages WHERE hash = ?1 AND inbox_id = ?2",
                    params![hash.as_str(), inbox_id.to_string()],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?
                .ok_or_else(|| StoreError::UnknownCursor(hash.to_string()))?,
            None => i64::MAX,
        };

        let mut stmt = self.conn().prepare(
            "SELECT hash, is_local, scheduled_time, content
             FROM messages
             WHERE inbox_id = ?1 AND position < ?2
             ORDER BY position DESC
             LIMIT ?3",
        )?;

        let rows = stmt.query_map(
            params![inbox_id.to_string(), upper, limit],
            row_to_message,
        )?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        messages.reverse();

        tracing::debug!(
            inbox = %inbox_id,
            before = ?before.map(MessageHash::short),
            returned = messages.len(),
            "loaded history page"
        );
        Ok(messages)
    }

    pub fn count_messages(&self, inbox_id: Uuid) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM messages WHERE inbox_id = ?1",
            params![inbox_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let hash_str: String = row.get(0)?;
    let is_local: bool = row.get(1)?;
    let scheduled_time: String = row.get(2)?;
    let content: String = row.get(3)?;

    let hash = MessageHash::new(hash_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Message {
        hash,
        origin: Origin::from_is_local(is_local),
        scheduled_time,
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Inbox;

    fn seeded(n: usize) -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let inbox = Inbox::new("test");
        db.create_inbox(&inbox).unwrap();
        for i in 0..n {
            let msg = Message::new(
                MessageHash::new(format!("h{i:02}")).unwrap(),
                Origin::from_is_local(i % 2 == 0),
                format!("2024-03-04T10:{i:02}:00Z"),
                format!("message {i}"),
            );
            assert!(db.insert_message(inbox.id, &msg).unwrap());
        }
        (db, inbox.id)
    }

    fn hashes(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.hash.as_str()).collect()
    }

    #[test]
    fn newest_page_is_oldest_first() {
        let (db, inbox) = seeded(5);
        let page = db.get_messages_before(inbox, None, 3).unwrap();
        assert_eq!(hashes(&page), ["h02", "h03", "h04"]);
        assert!(page[0].is_local());
        assert!(!page[1].is_local());
    }

    #[test]
    fn pages_walk_backwards_until_empty() {
        let (db, inbox) = seeded(5);
        let first = db.get_messages_before(inbox, None, 2).unwrap();
        let second = db
            .get_messages_before(inbox, Some(&first[0].hash), 2)
            .unwrap();
        assert_eq!(hashes(&second), ["h01", "h02"]);
        let third = db
            .get_messages_before(inbox, Some(&second[0].hash), 2)
            .unwrap();
        assert_eq!(hashes(&third), ["h00"]);
        let done = db
            .get_messages_before(inbox, Some(&third[0].hash), 2)
            .unwrap();
        assert!(done.is_empty());
    }

    #[test]
    fn duplicate_hash_is_ignored() {
        let (db, inbox) = seeded(1);
        let dup = Message::new(MessageHash::new("h00").unwrap(), Origin::Local, "", "again");
        assert!(!db.insert_message(inbox, &dup).unwrap());
        assert_eq!(db.count_messages(inbox).unwrap(), 1);
    }

    #[test]
    fn unknown_cursor_is_an_error() {
        let (db, inbox) = seeded(2);
        let missing = MessageHash::new("nope").unwrap();
        assert!(matches!(
            db.get_messages_before(inbox, Some(&missing), 2),
            Err(StoreError::UnknownCursor(_))
        ));
    }

    #[test]
    fn malformed_scheduled_time_is_kept_verbatim() {
        let (db, inbox) = seeded(0);
        let msg = Message::new(MessageHash::new("x").unwrap(), Origin::Remote, "", "no time");
        db.insert_message(inbox, &msg).unwrap();
        let page = db.get_messages_before(inbox, None, 10).unwrap();
        assert_eq!(page, vec![msg]);
    }
}
