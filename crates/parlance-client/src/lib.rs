//! # parlance-client
//!
//! Headless core of the Parlance chat history view: a paginated message list
//! that loads older history when the top of the list becomes visible, groups
//! each page by calendar-relative date, and keeps the reader's visual position
//! stable while older content is prepended above the viewport.
//!
//! Rendering is left to the host (webview, TUI, ...).  The host reports
//! visibility and scroll events, calls [`MessageList::after_layout`] once new
//! rows have been laid out, and draws the [`Row`] plan.

pub mod anchor;
pub mod config;
pub mod error;
pub mod grouping;
pub mod message_list;
pub mod pages;
pub mod prefetch;
pub mod source;

use tracing_subscriber::{fmt, EnvFilter};

pub use anchor::{CommitCause, ScrollAdjustment, ScrollAnchor, ScrollContainer};
pub use config::{ClientConfig, MessageListConfig};
pub use error::{ClientError, SourceError};
pub use grouping::{group_messages_by_date, DateGroup, DateLabeler, RelativeDateLabeler};
pub use message_list::{MessageList, PrefetchTask, Row, Side};
pub use pages::{LoadStatus, PageSnapshot, PageStore};
pub use prefetch::PrefetchTrigger;
pub use source::{PagedSource, StoreSource};

/// Install the global `tracing` subscriber.  `RUST_LOG` overrides the default
/// filter.  Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("parlance_client=debug,parlance_store=info,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
