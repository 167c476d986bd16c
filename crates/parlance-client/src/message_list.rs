//! The paginated, date-grouped, scroll-anchored message list.
//!
//! Event flow driven by the host:
//!
//! 1. [`MessageList::load`] fetches the newest page.
//! 2. The host lays out [`MessageList::rows`] and calls
//!    [`MessageList::after_layout`], which scrolls to the bottom.
//! 3. Scroll and sensor visibility events go to [`MessageList::on_scroll`] and
//!    [`MessageList::on_visibility_changed`].  The latter may hand back a
//!    [`PrefetchTask`]; the host drives it and passes its output to
//!    [`MessageList::complete_prefetch`].
//! 4. After relayout, [`MessageList::after_layout`] keeps the visual position
//!    stable across the prepended page.

use futures::future::BoxFuture;
use parlance_shared::{Message, PaginatedResult};
use serde::Serialize;
use tracing::{debug, warn};

use crate::anchor::{CommitCause, ScrollAdjustment, ScrollAnchor, ScrollContainer};
use crate::config::MessageListConfig;
use crate::error::SourceError;
use crate::grouping::{group_messages_by_date, DateLabeler, RelativeDateLabeler};
use crate::pages::{PageSnapshot, PageStore};
use crate::prefetch::PrefetchTrigger;
use crate::source::PagedSource;

/// An in-flight older-page request.  The store already reports
/// `is_fetching_previous_page` by the time the task is handed out.
pub type PrefetchTask = BoxFuture<'static, Result<PaginatedResult, SourceError>>;

/// Horizontal placement of a placeholder row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Start,
    End,
}

impl Side {
    fn alternating(index: usize) -> Self {
        if index % 2 == 0 {
            Side::Start
        } else {
            Side::End
        }
    }
}

/// One entry of the render plan, top to bottom.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Row {
    NoMoreMessages {
        label: String,
    },
    Skeleton {
        index: usize,
        side: Side,
    },
    /// The element the prefetch visibility sensor is attached to.
    PrefetchSentinel {
        skeletons: Vec<Side>,
    },
    DateHeader {
        page: usize,
        label: String,
    },
    Message {
        page: usize,
        key: String,
        #[serde(rename = "testId")]
        test_id: String,
        message: Message,
    },
}

pub struct MessageList<S, L = RelativeDateLabeler> {
    store: PageStore<S>,
    trigger: PrefetchTrigger,
    anchor: ScrollAnchor,
    labeler: L,
    config: MessageListConfig,
    pending: Option<CommitCause>,
}

impl<S, L> MessageList<S, L>
where
    S: PagedSource + 'static,
    L: DateLabeler,
{
    pub fn new(source: S, labeler: L, config: MessageListConfig) -> Self {
        Self {
            store: PageStore::new(source, config.page_size),
            trigger: PrefetchTrigger::new(),
            anchor: ScrollAnchor::new(),
            labeler,
            config,
            pending: None,
        }
    }

    pub fn store(&self) -> &PageStore<S> {
        &self.store
    }

    pub fn snapshot(&self) -> PageSnapshot {
        self.store.snapshot()
    }

    pub fn anchor(&self) -> &ScrollAnchor {
        &self.anchor
    }

    pub fn trigger(&self) -> &PrefetchTrigger {
        &self.trigger
    }

    pub fn config(&self) -> &MessageListConfig {
        &self.config
    }

    /// Replace the date labeler, e.g. after midnight.
    pub fn set_labeler(&mut self, labeler: L) {
        self.labeler = labeler;
    }

    /// Commit waiting for the next [`MessageList::after_layout`].
    pub fn pending_commit(&self) -> Option<CommitCause> {
        self.pending
    }

    /// Initial fetch of the newest page.
    pub async fn load(&mut self) -> Result<(), SourceError> {
        self.store.load_initial().await?;
        self.commit(CommitCause::InitialLoad);
        Ok(())
    }

    /// Pick up newly arrived or sent messages.  The view scrolls to the bottom.
    pub async fn refresh_latest(&mut self) -> Result<(), SourceError> {
        self.store.refresh_latest().await?;
        self.commit(CommitCause::Refresh);
        Ok(())
    }

    /// The sensor at the top of the list became visible or hidden.
    pub fn on_visibility_changed(
        &mut self,
        in_view: bool,
        container: Option<&dyn ScrollContainer>,
    ) -> Option<PrefetchTask> {
        self.trigger.set_in_view(in_view);
        self.record(container);
        self.poll_prefetch()
    }

    /// The container scrolled.
    pub fn on_scroll(&mut self, container: Option<&dyn ScrollContainer>) {
        self.record(container);
    }

    /// Re-evaluate the trigger without a visibility change, e.g. after a
    /// commit left the sensor on screen.
    pub fn poll_prefetch(&mut self) -> Option<PrefetchTask> {
        let snap = self.store.snapshot();
        if !self
            .trigger
            .should_fetch(snap.has_previous_page(), snap.is_fetching_previous_page)
        {
            return None;
        }
        let task = self.store.begin_fetch_previous_page();
        if task.is_none() {
            self.trigger.take_from_prefetch();
        }
        task
    }

    /// Feed back the output of a [`PrefetchTask`].
    pub fn complete_prefetch(
        &mut self,
        result: Result<PaginatedResult, SourceError>,
    ) -> Result<PaginatedResult, SourceError> {
        match result {
            Ok(result) => {
                let cause = if self.trigger.from_prefetch() {
                    CommitCause::PreviousPage
                } else {
                    CommitCause::Refresh
                };
                self.commit(cause);
                Ok(result)
            }
            Err(e) => {
                warn!(error = %e, "older history unavailable");
                self.trigger.take_from_prefetch();
                Err(e)
            }
        }
    }

    /// Issue and await one older-page fetch if the trigger allows it.
    /// Returns `None` when nothing was issued.
    pub async fn fetch_previous_page(
        &mut self,
    ) -> Option<Result<PaginatedResult, SourceError>> {
        let task = self.poll_prefetch()?;
        let result = task.await;
        Some(self.complete_prefetch(result))
    }

    /// Post-layout hook: call once the rows for the latest commit are laid
    /// out and before the next paint.
    ///
    /// The commit stays pending, and nothing moves, while no container is
    /// mounted or while a prepended page is waiting behind another older-page
    /// fetch; the first call after that fetch settles anchors both pages.
    pub fn after_layout(&mut self, container: Option<&mut dyn ScrollContainer>) -> ScrollAdjustment {
        let Some(cause) = self.pending else {
            return ScrollAdjustment::None;
        };
        let Some(container) = container else {
            return ScrollAdjustment::None;
        };

        let fetching = self.store.is_fetching_previous_page();
        if cause == CommitCause::PreviousPage && fetching {
            debug!("anchor deferred until the older-page fetch settles");
            return ScrollAdjustment::None;
        }

        let adjustment = self.anchor.after_layout(Some(&mut *container), fetching, cause);
        self.pending = None;
        if !fetching {
            self.trigger.take_from_prefetch();
        }
        debug!(?cause, ?adjustment, "post-layout scroll pass");

        // Moving the offset fires a scroll event in a real container.
        self.record(Some(&*container));
        adjustment
    }

    /// Queue a commit for the next post-layout pass.  A pending scroll to
    /// the bottom is never downgraded to an anchored adjustment.
    fn commit(&mut self, cause: CommitCause) {
        if cause != CommitCause::PreviousPage && !self.store.is_fetching_previous_page() {
            self.trigger.take_from_prefetch();
        }
        self.pending = match (self.pending, cause) {
            (Some(queued), CommitCause::PreviousPage) if queued != CommitCause::PreviousPage => {
                Some(queued)
            }
            (Some(CommitCause::InitialLoad), CommitCause::Refresh) => Some(CommitCause::InitialLoad),
            _ => Some(cause),
        };
    }

    fn record(&mut self, container: Option<&dyn ScrollContainer>) {
        let snap = self.store.snapshot();
        self.anchor.record(
            container,
            self.trigger.in_view(),
            snap.has_previous_page(),
            snap.is_fetching_previous_page,
        );
    }

    /// The render plan for the current state, top to bottom.
    pub fn rows(&self) -> Vec<Row> {
        let snap = self.store.snapshot();
        let result = &snap.result;
        let mut rows = Vec::new();

        if snap.is_success()
            && !snap.is_fetching_previous_page
            && !result.has_previous_page
            && result.page_count() > 1
        {
            rows.push(Row::NoMoreMessages {
                label: self.config.no_more_messages_label.clone(),
            });
        }

        if snap.is_loading() {
            rows.extend((0..self.config.loading_skeletons).map(|index| Row::Skeleton {
                index,
                side: Side::alternating(index),
            }));
        }

        if result.has_previous_page || snap.is_fetching_previous_page {
            rows.push(Row::PrefetchSentinel {
                skeletons: (0..self.config.sentinel_skeletons)
                    .map(Side::alternating)
                    .collect(),
            });
        }

        if snap.is_success() {
            for (page_index, page) in result.pages.iter().enumerate() {
                for group in group_messages_by_date(&page.messages, &self.labeler) {
                    rows.push(Row::DateHeader {
                        page: page_index,
                        label: group.label,
                    });
                    rows.extend(group.messages.into_iter().map(|message| Row::Message {
                        page: page_index,
                        key: format!("{page_index}-{}", message.scheduled_time),
                        test_id: format!("message-{}-{}", message.origin.as_str(), message.hash),
                        message: message.clone(),
                    }));
                }
            }
        }

        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::tests::FakeContainer;
    use crate::pages::tests::FakeSource;
    use chrono::{FixedOffset, NaiveDate};
    use parlance_shared::constants::FALLBACK_DATE_LABEL;
    use parlance_shared::{MessageHash, Origin};
    use std::sync::Arc;

    fn labeler() -> RelativeDateLabeler {
        RelativeDateLabeler::new(
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            FixedOffset::east_opt(0).unwrap(),
        )
    }

    fn list(total: usize, page_size: usize) -> MessageList<Arc<FakeSource>> {
        let config = MessageListConfig {
            page_size,
            ..MessageListConfig::default()
        };
        MessageList::new(Arc::new(FakeSource::new(total)), labeler(), config)
    }

    fn message_hashes(rows: &[Row]) -> Vec<String> {
        rows.iter()
            .filter_map(|row| match row {
                Row::Message { message, .. } => Some(message.hash.to_string()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_initial_load_scrolls_to_bottom() {
        let mut list = list(5, 12);
        list.load().await.unwrap();
        assert!(!list.snapshot().has_previous_page());
        assert_eq!(list.pending_commit(), Some(CommitCause::InitialLoad));

        // Pretend the previous height would anchor somewhere else entirely.
        let mut container = FakeContainer::new(900.0, 300.0, 0.0);
        list.on_scroll(Some(&container));

        let adj = list.after_layout(Some(&mut container));
        assert_eq!(adj, ScrollAdjustment::ToBottom { offset: 600.0 });
        assert_eq!(container.top, 600.0);
        assert_eq!(list.pending_commit(), None);
    }

    #[tokio::test]
    async fn test_prefetch_prepends_and_anchors() {
        let mut list = list(20, 5);
        list.load().await.unwrap();
        let mut container = FakeContainer::new(1000.0, 150.0, 0.0);
        list.after_layout(Some(&mut container));

        container.top = 800.0;
        let task = list
            .on_visibility_changed(true, Some(&container))
            .expect("sensor visible with older history");
        assert!(list.snapshot().is_fetching_previous_page);
        assert_eq!(list.anchor().previous_height(), 200.0);

        let result = list.complete_prefetch(task.await).unwrap();
        assert_eq!(result.page_count(), 2);
        assert_eq!(list.pending_commit(), Some(CommitCause::PreviousPage));

        container.height = 1400.0;
        let adj = list.after_layout(Some(&mut container));
        assert_eq!(adj, ScrollAdjustment::Anchored { offset: 1200.0 });
        assert_eq!(container.top, 1200.0);
        assert!(!list.trigger().from_prefetch());
    }

    #[tokio::test]
    async fn test_anchor_waits_for_back_to_back_prefetch() {
        let mut list = list(30, 5);
        list.load().await.unwrap();
        let mut container = FakeContainer::new(1000.0, 150.0, 0.0);
        list.after_layout(Some(&mut container));

        container.top = 800.0;
        let first = list.on_visibility_changed(true, Some(&container)).unwrap();
        list.complete_prefetch(first.await).unwrap();

        // The sensor is still on screen, so the next page goes out before
        // the first one was laid out.
        let second = list.poll_prefetch().expect("sensor still visible");
        container.height = 1400.0;
        assert_eq!(list.after_layout(Some(&mut container)), ScrollAdjustment::None);
        assert_eq!(list.pending_commit(), Some(CommitCause::PreviousPage));
        assert!(list.trigger().from_prefetch());
        assert_eq!(container.top, 800.0);

        list.complete_prefetch(second.await).unwrap();
        assert_eq!(list.pending_commit(), Some(CommitCause::PreviousPage));

        container.height = 1800.0;
        let adj = list.after_layout(Some(&mut container));
        assert_eq!(adj, ScrollAdjustment::Anchored { offset: 1600.0 });
        assert_eq!(container.top, 1600.0);
        assert!(!list.trigger().from_prefetch());
    }

    fn sent_message() -> Message {
        Message::new(
            MessageHash::new("sent").unwrap(),
            Origin::Local,
            "2024-03-04T12:00:00Z",
            "hello",
        )
    }

    #[tokio::test]
    async fn test_pending_refresh_survives_prefetch_commit() {
        let mut list = list(20, 5);
        list.load().await.unwrap();
        let mut container = FakeContainer::new(1000.0, 150.0, 0.0);
        list.after_layout(Some(&mut container));

        let task = list.on_visibility_changed(true, Some(&container)).unwrap();
        list.store().source().push(sent_message());
        list.refresh_latest().await.unwrap();
        assert_eq!(list.pending_commit(), Some(CommitCause::Refresh));
        assert!(list.trigger().from_prefetch());

        list.complete_prefetch(task.await).unwrap();
        assert_eq!(list.pending_commit(), Some(CommitCause::Refresh));

        container.height = 1500.0;
        let adj = list.after_layout(Some(&mut container));
        assert_eq!(adj, ScrollAdjustment::ToBottom { offset: 1350.0 });
        assert!(!list.trigger().from_prefetch());

        let expected: Vec<String> = (10..20)
            .map(|i| format!("m{i:03}"))
            .chain(["sent".to_string()])
            .collect();
        assert_eq!(message_hashes(&list.rows()), expected);
    }

    #[tokio::test]
    async fn test_refresh_overrides_pending_prefetch_commit() {
        let mut list = list(20, 5);
        list.load().await.unwrap();
        let mut container = FakeContainer::new(1000.0, 150.0, 0.0);
        list.after_layout(Some(&mut container));

        let task = list.on_visibility_changed(true, Some(&container)).unwrap();
        list.complete_prefetch(task.await).unwrap();
        assert_eq!(list.pending_commit(), Some(CommitCause::PreviousPage));

        list.store().source().push(sent_message());
        list.refresh_latest().await.unwrap();
        assert_eq!(list.pending_commit(), Some(CommitCause::Refresh));

        container.height = 1400.0;
        let adj = list.after_layout(Some(&mut container));
        assert_eq!(adj, ScrollAdjustment::ToBottom { offset: 1250.0 });
    }

    #[tokio::test]
    async fn test_visibility_toggles_during_flight_fetch_once() {
        let mut list = list(30, 5);
        list.load().await.unwrap();
        let container = FakeContainer::new(1000.0, 150.0, 0.0);
        let source = Arc::clone(list.store().source());

        let release = source.hold().await;
        let task = list.on_visibility_changed(true, Some(&container)).unwrap();
        let handle = tokio::spawn(task);
        tokio::task::yield_now().await;

        for visible in [false, true, false, true, true] {
            assert!(list.on_visibility_changed(visible, Some(&container)).is_none());
        }
        assert!(list.poll_prefetch().is_none());

        release.send(()).unwrap();
        let result = handle.await.unwrap();
        list.complete_prefetch(result).unwrap();

        // initial load + exactly one older page
        assert_eq!(source.calls(), 2);
        assert_eq!(list.trigger().issued(), 1);
    }

    #[tokio::test]
    async fn test_refresh_scrolls_to_bottom_not_anchor() {
        let mut list = list(10, 5);
        list.load().await.unwrap();
        let mut container = FakeContainer::new(1000.0, 200.0, 0.0);
        list.after_layout(Some(&mut container));

        list.store().source().push(sent_message());
        list.refresh_latest().await.unwrap();
        assert_eq!(list.pending_commit(), Some(CommitCause::Refresh));

        container.height = 1100.0;
        let adj = list.after_layout(Some(&mut container));
        assert_eq!(adj, ScrollAdjustment::ToBottom { offset: 900.0 });
    }

    #[tokio::test]
    async fn test_failed_prefetch_keeps_state_and_commits_nothing() {
        let mut list = list(20, 5);
        list.load().await.unwrap();
        let mut container = FakeContainer::new(1000.0, 150.0, 0.0);
        list.after_layout(Some(&mut container));

        list.store().source().fail_next();
        let task = list.on_visibility_changed(true, Some(&container)).unwrap();
        let outcome = list.complete_prefetch(task.await);
        assert!(matches!(outcome, Err(SourceError::Request(_))));

        let snap = list.snapshot();
        assert!(snap.has_previous_page());
        assert!(!snap.is_fetching_previous_page);
        assert_eq!(snap.result.page_count(), 1);
        assert_eq!(list.pending_commit(), None);
        assert!(!list.trigger().from_prefetch());
    }

    #[tokio::test]
    async fn test_missing_container_keeps_commit_pending() {
        let mut list = list(3, 12);
        list.load().await.unwrap();

        assert!(list.on_visibility_changed(true, None).is_none());
        assert_eq!(list.after_layout(None), ScrollAdjustment::None);
        assert_eq!(list.pending_commit(), Some(CommitCause::InitialLoad));

        let mut container = FakeContainer::new(500.0, 100.0, 0.0);
        assert_eq!(
            list.after_layout(Some(&mut container)),
            ScrollAdjustment::ToBottom { offset: 400.0 }
        );
    }

    #[tokio::test]
    async fn test_rows_while_loading_and_after_exhaustion() {
        let mut list = list(7, 5);
        let release = list.store().source().hold().await;

        let store = list.store().clone();
        let load = tokio::spawn(async move { store.load_initial().await });
        tokio::task::yield_now().await;

        let rows = list.rows();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0], Row::Skeleton { index: 0, side: Side::Start });
        assert_eq!(rows[1], Row::Skeleton { index: 1, side: Side::End });

        release.send(()).unwrap();
        load.await.unwrap().unwrap();

        let rows = list.rows();
        assert_eq!(
            rows[0],
            Row::PrefetchSentinel {
                skeletons: vec![Side::Start, Side::End, Side::Start]
            }
        );
        assert!(!rows.iter().any(|r| matches!(r, Row::NoMoreMessages { .. })));

        list.trigger.set_in_view(true);
        list.fetch_previous_page().await.unwrap().unwrap();
        assert!(!list.snapshot().has_previous_page());

        let rows = list.rows();
        assert_eq!(
            rows[0],
            Row::NoMoreMessages {
                label: "All previous messages have been loaded".into()
            }
        );
        assert!(!rows.iter().any(|r| matches!(r, Row::PrefetchSentinel { .. })));
        assert_eq!(
            message_hashes(&rows),
            ["m000", "m001", "m002", "m003", "m004", "m005", "m006"]
        );
    }

    #[tokio::test]
    async fn test_rows_preserve_page_and_group_order() {
        // Three pages of two messages; FakeSource dates every message on the
        // 4th, so each page renders one "Today" header.
        let mut list = list(6, 2);
        list.load().await.unwrap();
        list.trigger.set_in_view(true);
        list.fetch_previous_page().await.unwrap().unwrap();
        list.fetch_previous_page().await.unwrap().unwrap();

        let rows = list.rows();
        let headers: Vec<(usize, &str)> = rows
            .iter()
            .filter_map(|r| match r {
                Row::DateHeader { page, label } => Some((*page, label.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(headers, [(0, "Today"), (1, "Today"), (2, "Today")]);
        assert_eq!(
            message_hashes(&rows),
            ["m000", "m001", "m002", "m003", "m004", "m005"]
        );
    }

    #[tokio::test]
    async fn test_message_row_keys_and_fallback_group() {
        let source = Arc::new(FakeSource::new(0));
        source.push(Message::new(
            MessageHash::new("aa").unwrap(),
            Origin::Local,
            "",
            "no time",
        ));
        source.push(Message::new(
            MessageHash::new("bb").unwrap(),
            Origin::Remote,
            "2024-03-04T09:00:00Z",
            "today",
        ));
        let mut list = MessageList::new(source, labeler(), MessageListConfig::default());
        list.load().await.unwrap();

        let rows = list.rows();
        assert_eq!(
            rows[0],
            Row::DateHeader {
                page: 0,
                label: FALLBACK_DATE_LABEL.into()
            }
        );
        match &rows[1] {
            Row::Message { key, test_id, .. } => {
                assert_eq!(key, "0-");
                assert_eq!(test_id, "message-local-aa");
            }
            other => panic!("expected message row, got {other:?}"),
        }
        match &rows[3] {
            Row::Message { key, test_id, .. } => {
                assert_eq!(key, "0-2024-03-04T09:00:00Z");
                assert_eq!(test_id, "message-remote-bb");
            }
            other => panic!("expected message row, got {other:?}"),
        }
    }

    #[test]
    fn test_rows_serialize_tagged() {
        let row = Row::Skeleton {
            index: 2,
            side: Side::End,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["kind"], "skeleton");
        assert_eq!(json["side"], "end");
    }
}
