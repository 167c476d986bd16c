//! Client configuration loaded from environment variables.
//!
//! All settings have defaults so the history view works with zero
//! configuration.  Invalid values are logged and ignored.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::FixedOffset;
use parlance_shared::constants::{
    DEFAULT_LOADING_SKELETONS, DEFAULT_NO_MORE_MESSAGES_LABEL, DEFAULT_PAGE_SIZE,
    DEFAULT_SENTINEL_SKELETONS,
};

use crate::grouping::RelativeDateLabeler;

/// Settings of a single [`crate::MessageList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageListConfig {
    /// Messages requested per page.
    /// Env: `PARLANCE_PAGE_SIZE`
    /// Default: `12`
    pub page_size: usize,

    /// Banner shown once every older page has been loaded.
    /// Env: `PARLANCE_NO_MORE_MESSAGES_LABEL`
    pub no_more_messages_label: String,

    /// Placeholder rows while the first page loads.
    /// Env: `PARLANCE_LOADING_SKELETONS`
    /// Default: `10`
    pub loading_skeletons: usize,

    /// Placeholder rows inside the prefetch sentinel.
    /// Env: `PARLANCE_SENTINEL_SKELETONS`
    /// Default: `3`
    pub sentinel_skeletons: usize,
}

impl Default for MessageListConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            no_more_messages_label: DEFAULT_NO_MORE_MESSAGES_LABEL.to_string(),
            loading_skeletons: DEFAULT_LOADING_SKELETONS,
            sentinel_skeletons: DEFAULT_SENTINEL_SKELETONS,
        }
    }
}

/// Everything the `parlance-history` binary needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    pub list: MessageListConfig,

    /// Offset used for "Today"/"Yesterday" labels, in minutes east of UTC.
    /// Env: `PARLANCE_UTC_OFFSET_MINUTES`
    /// Default: the system's local offset.
    pub utc_offset_minutes: Option<i32>,

    /// SQLite history database.
    /// Env: `PARLANCE_DB_PATH`
    /// Default: the platform data directory.
    pub db_path: Option<PathBuf>,

    /// Inbox (UUID) to open.
    /// Env: `PARLANCE_INBOX`
    /// Default: none, inboxes are listed instead.
    pub inbox: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(n) = parse_var::<usize, _>(&lookup, "PARLANCE_PAGE_SIZE") {
            if n == 0 {
                tracing::warn!("PARLANCE_PAGE_SIZE must be at least 1, using default");
            } else {
                config.list.page_size = n;
            }
        }

        if let Some(label) = lookup("PARLANCE_NO_MORE_MESSAGES_LABEL") {
            if !label.trim().is_empty() {
                config.list.no_more_messages_label = label;
            }
        }

        if let Some(n) = parse_var(&lookup, "PARLANCE_LOADING_SKELETONS") {
            config.list.loading_skeletons = n;
        }

        if let Some(n) = parse_var(&lookup, "PARLANCE_SENTINEL_SKELETONS") {
            config.list.sentinel_skeletons = n;
        }

        if let Some(minutes) = parse_var::<i32, _>(&lookup, "PARLANCE_UTC_OFFSET_MINUTES") {
            if offset_from_minutes(minutes).is_some() {
                config.utc_offset_minutes = Some(minutes);
            } else {
                tracing::warn!(minutes, "PARLANCE_UTC_OFFSET_MINUTES out of range, using local offset");
            }
        }

        if let Some(path) = lookup("PARLANCE_DB_PATH") {
            config.db_path = Some(PathBuf::from(path));
        }

        if let Some(inbox) = lookup("PARLANCE_INBOX") {
            if !inbox.is_empty() {
                config.inbox = Some(inbox);
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }

    /// Date labeler for "now" in the configured offset.
    pub fn labeler(&self) -> RelativeDateLabeler {
        match self.utc_offset_minutes.and_then(offset_from_minutes) {
            Some(offset) => RelativeDateLabeler::at(chrono::Utc::now(), offset),
            None => RelativeDateLabeler::local_now(),
        }
    }
}

fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "invalid value, using default");
            None
        }
    }
}
