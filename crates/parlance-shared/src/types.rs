use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SharedError;

// Stable message identifier as handed out by the node (hex string)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct MessageHash(String);

impl MessageHash {
    pub fn new(s: impl Into<String>) -> Result<Self, SharedError> {
        let s = s.into();
        if s.trim().is_empty() {
            return Err(SharedError::InvalidHash(s));
        }
        Ok(Self(s))
    }

    /// Derive the identifier of a locally composed message.
    ///
    /// BLAKE3 over the inbox, the scheduled time and the content, separated
    /// by NUL bytes so that field boundaries cannot be shifted.
    pub fn derive(inbox: &str, scheduled_time: &str, content: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(inbox.as_bytes());
        hasher.update(&[0]);
        hasher.update(scheduled_time.as_bytes());
        hasher.update(&[0]);
        hasher.update(content.as_bytes());
        Self(hex::encode(hasher.finalize().as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl std::fmt::Display for MessageHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a message was written on this device or received from the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Local,
    Remote,
}

impl Origin {
    pub fn from_is_local(is_local: bool) -> Self {
        if is_local {
            Self::Local
        } else {
            Self::Remote
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl FromStr for Origin {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => Err(SharedError::InvalidOrigin(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat entry.  Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub hash: MessageHash,
    pub origin: Origin,
    /// Raw scheduled/display time as received.  Usually RFC 3339, but may be
    /// empty or malformed; see [`Message::scheduled_at`].
    pub scheduled_time: String,
    /// Opaque payload, never interpreted by the message list.
    pub content: String,
}

impl Message {
    pub fn new(
        hash: MessageHash,
        origin: Origin,
        scheduled_time: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            hash,
            origin,
            scheduled_time: scheduled_time.into(),
            content: content.into(),
        }
    }

    /// Build a message written on this device, deriving its hash.
    pub fn compose_local(inbox: &str, scheduled_at: DateTime<Utc>, content: impl Into<String>) -> Self {
        let content = content.into();
        let scheduled_time = scheduled_at.to_rfc3339();
        Self {
            hash: MessageHash::derive(inbox, &scheduled_time, &content),
            origin: Origin::Local,
            scheduled_time,
            content,
        }
    }

    /// Parsed scheduled time, `None` when the raw value is empty or not
    /// RFC 3339.
    pub fn scheduled_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.scheduled_time.trim();
        if raw.is_empty() {
            return None;
        }
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn is_local(&self) -> bool {
        self.origin.is_local()
    }
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// One fetch result's ordered batch of messages, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Position in the fetch sequence: 0 is the initial (newest) page, each
    /// older page gets the next number.
    pub seq: u32,
    pub messages: Vec<Message>,
}

impl Page {
    pub fn new(seq: u32, messages: Vec<Message>) -> Self {
        Self { seq, messages }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The oldest message of the page.
    pub fn oldest(&self) -> Option<&Message> {
        self.messages.first()
    }
}

// ---------------------------------------------------------------------------
// PaginatedResult
// ---------------------------------------------------------------------------

/// Accumulated pages plus the "older history exists" cursor flag.
///
/// `pages` is in display order: the oldest loaded page first and the initial
/// page last.  Older pages are prepended as they arrive.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult {
    pub pages: Vec<Page>,
    pub has_previous_page: bool,
}

impl PaginatedResult {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn message_count(&self) -> usize {
        self.pages.iter().map(Page::len).sum()
    }

    /// Oldest loaded message; its hash is the cursor for the next older page.
    pub fn oldest_message(&self) -> Option<&Message> {
        self.pages.first().and_then(Page::oldest)
    }

    /// All loaded messages in display order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.pages.iter().flat_map(|p| p.messages.iter())
    }
}
