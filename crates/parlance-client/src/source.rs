//! The cursor-paginated history source the message list reads from.

use std::path::Path;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt};
use parlance_shared::{Message, MessageHash};
use parlance_store::{Database, StoreError};
use uuid::Uuid;

use crate::error::{ClientError, SourceError};

/// A backwards-paginated message history.
///
/// `fetch_page(None, n)` returns the newest `n` messages; `fetch_page(Some(h), n)`
/// returns up to `n` messages strictly older than `h`.  Both are oldest first.
/// A result shorter than `n` means the beginning of history was reached.
///
/// Sources do not need to guard against concurrent calls: the message list
/// never has more than one older-page request in flight.
pub trait PagedSource: Send + Sync {
    fn fetch_page(
        &self,
        before: Option<MessageHash>,
        count: usize,
    ) -> BoxFuture<'_, Result<Vec<Message>, SourceError>>;
}

impl<T: PagedSource + ?Sized> PagedSource for Arc<T> {
    fn fetch_page(
        &self,
        before: Option<MessageHash>,
        count: usize,
    ) -> BoxFuture<'_, Result<Vec<Message>, SourceError>> {
        (**self).fetch_page(before, count)
    }
}

// ---------------------------------------------------------------------------
// StoreSource
// ---------------------------------------------------------------------------

/// [`PagedSource`] over one inbox of the local SQLite history.
///
/// Queries run on tokio's blocking pool, so a runtime must be active.
#[derive(Clone)]
pub struct StoreSource {
    db: Arc<Mutex<Database>>,
    inbox: Uuid,
}

impl StoreSource {
    pub fn new(db: Arc<Mutex<Database>>, inbox: Uuid) -> Self {
        Self { db, inbox }
    }

    /// Open the database at `path` and bind to the inbox named by `inbox`
    /// (its UUID).
    pub fn open(path: &Path, inbox: &str) -> Result<Self, ClientError> {
        let inbox_id =
            Uuid::parse_str(inbox).map_err(|_| ClientError::UnknownInbox(inbox.to_string()))?;

        let db = Database::open_at(path)?;
        match db.get_inbox(inbox_id) {
            Ok(_) => {}
            Err(StoreError::NotFound) => return Err(ClientError::UnknownInbox(inbox.to_string())),
            Err(e) => return Err(e.into()),
        }

        Ok(Self::new(Arc::new(Mutex::new(db)), inbox_id))
    }

    pub fn inbox(&self) -> Uuid {
        self.inbox
    }

    pub fn database(&self) -> &Arc<Mutex<Database>> {
        &self.db
    }
}

impl PagedSource for StoreSource {
    fn fetch_page(
        &self,
        before: Option<MessageHash>,
        count: usize,
    ) -> BoxFuture<'_, Result<Vec<Message>, SourceError>> {
        let db = Arc::clone(&self.db);
        let inbox = self.inbox;
        let limit = u32::try_from(count).unwrap_or(u32::MAX);

        async move {
            tokio::task::spawn_blocking(move || {
                let guard = db
                    .lock()
                    .map_err(|e| SourceError::Unavailable(format!("Lock poisoned: {e}")))?;
                guard
                    .get_messages_before(inbox, before.as_ref(), limit)
                    .map_err(SourceError::from)
            })
            .await
            .map_err(|e| SourceError::Unavailable(format!("History task failed: {e}")))?
        }
        .boxed()
    }
}
