//! Scroll anchoring for a bottom-anchored chat list.
//!
//! When older history is prepended above the viewport the container grows at
//! the top and, left alone, the content the user was reading would slide
//! down.  The anchor remembers the distance from the viewport top to the
//! content's bottom edge before the fetch, and after layout restores it:
//!
//! ```text
//! recorded  = H1 - O1
//! O2        = H2 - recorded
//! ```
//!
//! Initial loads and data changes that did not come from a history prefetch
//! scroll to the bottom instead.

use serde::Serialize;
use tracing::trace;

/// Layout metrics and scroll offset of the scrolling element.
///
/// Implementations may clamp in `set_scroll_top` the way browsers do.
pub trait ScrollContainer {
    /// Total scrollable content height.
    fn scroll_height(&self) -> f64;

    /// Height of the visible viewport.
    fn client_height(&self) -> f64;

    /// Current offset of the viewport top from the content top.
    fn scroll_top(&self) -> f64;

    fn set_scroll_top(&mut self, offset: f64);

    fn max_scroll_top(&self) -> f64 {
        (self.scroll_height() - self.client_height()).max(0.0)
    }
}

/// Why the list's data changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CommitCause {
    InitialLoad,
    /// An older page, requested by the prefetch trigger, was prepended.
    PreviousPage,
    /// Any other change, e.g. a message was sent or arrived.
    Refresh,
}

/// What [`ScrollAnchor::after_layout`] did to the container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScrollAdjustment {
    None,
    Anchored { offset: f64 },
    ToBottom { offset: f64 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollAnchor {
    previous_height: f64,
}

impl ScrollAnchor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The quantity the next anchored adjustment subtracts from the new height.
    pub fn previous_height(&self) -> f64 {
        self.previous_height
    }

    /// Capture the container's metrics on a scroll or visibility event.
    ///
    /// While the prefetch sensor is visible, older history exists and nothing
    /// is in flight, the distance from the viewport top to the content bottom
    /// is kept; otherwise the raw content height.
    pub fn record(
        &mut self,
        container: Option<&dyn ScrollContainer>,
        sensor_in_view: bool,
        has_previous_page: bool,
        is_fetching_previous_page: bool,
    ) {
        let Some(container) = container else {
            return;
        };

        let height = container.scroll_height();
        self.previous_height = if sensor_in_view && has_previous_page && !is_fetching_previous_page
        {
            height - container.scroll_top()
        } else {
            height
        };
        trace!(previous_height = self.previous_height, "scroll metrics recorded");
    }

    /// Post-layout pass.  Must run after the new rows are laid out and before
    /// the next paint.
    pub fn after_layout(
        &mut self,
        container: Option<&mut dyn ScrollContainer>,
        is_fetching_previous_page: bool,
        cause: CommitCause,
    ) -> ScrollAdjustment {
        let Some(container) = container else {
            return ScrollAdjustment::None;
        };

        match cause {
            CommitCause::PreviousPage if is_fetching_previous_page => ScrollAdjustment::None,
            CommitCause::PreviousPage => {
                let offset = container.scroll_height() - self.previous_height;
                container.set_scroll_top(offset);
                trace!(offset, "scroll anchored after prepend");
                ScrollAdjustment::Anchored { offset }
            }
            CommitCause::InitialLoad | CommitCause::Refresh => {
                let offset = container.max_scroll_top();
                container.set_scroll_top(offset);
                trace!(offset, "scrolled to bottom");
                ScrollAdjustment::ToBottom { offset }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A scroll container with fixed metrics that clamps like a browser.
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct FakeContainer {
        pub(crate) height: f64,
        pub(crate) viewport: f64,
        pub(crate) top: f64,
    }

    impl FakeContainer {
        pub(crate) fn new(height: f64, viewport: f64, top: f64) -> Self {
            Self {
                height,
                viewport,
                top,
            }
        }
    }

    impl ScrollContainer for FakeContainer {
        fn scroll_height(&self) -> f64 {
            self.height
        }

        fn client_height(&self) -> f64 {
            self.viewport
        }

        fn scroll_top(&self) -> f64 {
            self.top
        }

        fn set_scroll_top(&mut self, offset: f64) {
            self.top = offset.clamp(0.0, self.max_scroll_top());
        }
    }

    #[test]
    fn test_anchor_law() {
        let mut anchor = ScrollAnchor::new();
        let mut container = FakeContainer::new(1000.0, 150.0, 800.0);

        anchor.record(Some(&container), true, true, false);
        assert_eq!(anchor.previous_height(), 200.0);

        container.height = 1400.0;
        let adj = anchor.after_layout(Some(&mut container), false, CommitCause::PreviousPage);
        assert_eq!(adj, ScrollAdjustment::Anchored { offset: 1200.0 });
        assert_eq!(container.top, 1200.0);
    }

    #[test]
    fn test_records_raw_height_outside_prefetch_window() {
        let mut anchor = ScrollAnchor::new();
        let container = FakeContainer::new(1000.0, 150.0, 800.0);

        anchor.record(Some(&container), false, true, false);
        assert_eq!(anchor.previous_height(), 1000.0);
        anchor.record(Some(&container), true, false, false);
        assert_eq!(anchor.previous_height(), 1000.0);
        anchor.record(Some(&container), true, true, true);
        assert_eq!(anchor.previous_height(), 1000.0);
    }

    #[test]
    fn test_no_adjustment_while_fetching() {
        let mut anchor = ScrollAnchor::new();
        let mut container = FakeContainer::new(1000.0, 150.0, 10.0);
        anchor.record(Some(&container), true, true, false);

        let adj = anchor.after_layout(Some(&mut container), true, CommitCause::PreviousPage);
        assert_eq!(adj, ScrollAdjustment::None);
        assert_eq!(container.top, 10.0);
    }

    #[test]
    fn test_initial_load_and_refresh_go_to_bottom() {
        let mut anchor = ScrollAnchor::new();
        let mut container = FakeContainer::new(1000.0, 400.0, 0.0);

        let adj = anchor.after_layout(Some(&mut container), false, CommitCause::InitialLoad);
        assert_eq!(adj, ScrollAdjustment::ToBottom { offset: 600.0 });
        assert_eq!(container.top, 600.0);

        container.height = 1100.0;
        let adj = anchor.after_layout(Some(&mut container), true, CommitCause::Refresh);
        assert_eq!(adj, ScrollAdjustment::ToBottom { offset: 700.0 });
    }

    #[test]
    fn test_missing_container_is_a_no_op() {
        let mut anchor = ScrollAnchor::new();
        anchor.record(None, true, true, false);
        assert_eq!(anchor.previous_height(), 0.0);
        assert_eq!(
            anchor.after_layout(None, false, CommitCause::PreviousPage),
            ScrollAdjustment::None
        );
    }
}
