//! # parlance-history
//!
//! Walks an inbox's stored history backwards through the message list, the
//! same way a scrolling view would: the top sensor becomes visible, an older
//! page is fetched and prepended, the viewport is re-anchored.  The final row
//! plan is printed to stdout.
//!
//! Without `PARLANCE_INBOX` the known inboxes are listed instead.
//!
//! The viewer only reads.  The database at `PARLANCE_DB_PATH` (or the
//! platform default) is expected to be filled by the client that syncs with
//! the node, through `parlance_store::Database::create_inbox` and
//! `insert_message`.

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use parlance_client::{
    init_tracing, ClientConfig, MessageList, Row, ScrollAdjustment, ScrollContainer, StoreSource,
};
use parlance_shared::constants::APP_NAME;
use parlance_store::Database;

/// Visible lines of the virtual terminal viewport.
const VIEWPORT_LINES: f64 = 20.0;

/// A viewport where every row is one line tall.
struct LineViewport {
    lines: f64,
    top: f64,
}

impl LineViewport {
    fn new() -> Self {
        Self {
            lines: 0.0,
            top: 0.0,
        }
    }

    fn relayout(&mut self, rows: &[Row]) {
        self.lines = rows.len() as f64;
    }
}

impl ScrollContainer for LineViewport {
    fn scroll_height(&self) -> f64 {
        self.lines
    }

    fn client_height(&self) -> f64 {
        VIEWPORT_LINES
    }

    fn scroll_top(&self) -> f64 {
        self.top
    }

    fn set_scroll_top(&mut self, offset: f64) {
        self.top = offset.clamp(0.0, self.max_scroll_top());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Tracing and configuration
    // -----------------------------------------------------------------------
    init_tracing();
    info!("{APP_NAME} history viewer v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    let db_path = match &config.db_path {
        Some(path) => path.clone(),
        None => Database::default_path().context("no data directory for the history database")?,
    };
    if let Some(dir) = db_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;
    }

    // -----------------------------------------------------------------------
    // 2. Without an inbox, list what is stored
    // -----------------------------------------------------------------------
    let Some(inbox) = config.inbox.as_deref() else {
        return list_inboxes(db_path);
    };

    // -----------------------------------------------------------------------
    // 3. Walk the inbox's history to the beginning
    // -----------------------------------------------------------------------
    let source = StoreSource::open(&db_path, inbox)
        .with_context(|| format!("opening inbox {inbox}"))?;
    let mut list = MessageList::new(source, config.labeler(), config.list.clone());
    let mut viewport = LineViewport::new();

    list.load().await.context("loading the newest messages")?;
    viewport.relayout(&list.rows());
    list.after_layout(Some(&mut viewport));

    let mut pages = 1;
    while let Some(task) = list.on_visibility_changed(true, Some(&viewport)) {
        let result = list
            .complete_prefetch(task.await)
            .context("loading older messages")?;
        pages += 1;

        viewport.relayout(&list.rows());
        if let ScrollAdjustment::Anchored { offset } = list.after_layout(Some(&mut viewport)) {
            info!(
                pages,
                messages = result.message_count(),
                offset,
                "older page anchored"
            );
        }
        list.on_visibility_changed(false, Some(&viewport));
    }

    // -----------------------------------------------------------------------
    // 4. Print the row plan
    // -----------------------------------------------------------------------
    let rows = list.rows();
    info!(pages, rows = rows.len(), "history fully loaded");
    for row in &rows {
        print_row(row);
    }

    Ok(())
}

fn list_inboxes(db_path: PathBuf) -> anyhow::Result<()> {
    let db = Database::open_at(&db_path)?;
    let inboxes = db.list_inboxes()?;
    if inboxes.is_empty() {
        println!("No inboxes in {}", db_path.display());
        return Ok(());
    }

    for inbox in inboxes {
        let count = db.count_messages(inbox.id)?;
        println!("{}  {:<24} {count} messages", inbox.id, inbox.name);
    }
    println!("\nSet PARLANCE_INBOX to one of the ids above to view its history.");
    Ok(())
}

fn print_row(row: &Row) {
    match row {
        Row::NoMoreMessages { label } => println!("--- {label} ---"),
        Row::Skeleton { .. } | Row::PrefetchSentinel { .. } => println!("..."),
        Row::DateHeader { label, .. } => println!("\n== {label} =="),
        Row::Message { message, .. } => {
            let who = if message.is_local() { "me" } else { "them" };
            println!("[{who:>4}] {}", message.content);
        }
    }
}
