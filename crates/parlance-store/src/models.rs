//! Records persisted in the local database that are not already covered by
//! `parlance-shared`.  Messages themselves are stored and returned as
//! [`parlance_shared::Message`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A conversation inbox (one chat with an agent or a peer).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Inbox {
    /// Unique inbox identifier.
    pub id: Uuid,
    /// Human-readable inbox name.
    pub name: String,
    /// When the inbox was created locally.
    pub created_at: DateTime<Utc>,
}

impl Inbox {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbox_serializes_with_its_uuid() {
        let inbox = Inbox::new("agent/gpt");
        let json = serde_json::to_value(&inbox).unwrap();
        assert_eq!(json["id"], inbox.id.to_string());

        let back: Inbox = serde_json::from_value(json).unwrap();
        assert_eq!(back, inbox);
    }
}
