//! Visibility-driven prefetch of older history.
//!
//! A sentinel element sits at the top of the list.  When the host reports it
//! visible, older history exists and no request is in flight, exactly one
//! older-page fetch is issued.  Rapid visibility toggling while a request is
//! pending issues nothing further.

use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefetchTrigger {
    in_view: bool,
    from_prefetch: bool,
    issued: u64,
}

impl PrefetchTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the sensor's visibility.  Returns whether it changed.
    pub fn set_in_view(&mut self, in_view: bool) -> bool {
        let changed = self.in_view != in_view;
        self.in_view = in_view;
        changed
    }

    pub fn in_view(&self) -> bool {
        self.in_view
    }

    /// Decide whether to request the previous page now.
    ///
    /// On `true` the caller must issue the request before handling any other
    /// event; the "fetch originated from history prefetch" flag is set.
    pub fn should_fetch(&mut self, has_previous_page: bool, is_fetching_previous_page: bool) -> bool {
        if !(self.in_view && has_previous_page && !is_fetching_previous_page) {
            return false;
        }
        self.from_prefetch = true;
        self.issued += 1;
        debug!(issued = self.issued, "prefetch triggered");
        true
    }

    /// Whether the pending data change was caused by a prefetch.
    pub fn from_prefetch(&self) -> bool {
        self.from_prefetch
    }

    /// Read and clear the prefetch-origin flag.
    pub fn take_from_prefetch(&mut self) -> bool {
        std::mem::take(&mut self.from_prefetch)
    }

    /// Number of fetches this trigger has requested.
    pub fn issued(&self) -> u64 {
        self.issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_only_when_all_conditions_hold() {
        let mut trigger = PrefetchTrigger::new();
        assert!(!trigger.should_fetch(true, false));

        trigger.set_in_view(true);
        assert!(!trigger.should_fetch(false, false));
        assert!(!trigger.should_fetch(true, true));
        assert!(!trigger.from_prefetch());

        assert!(trigger.should_fetch(true, false));
        assert!(trigger.from_prefetch());
        assert_eq!(trigger.issued(), 1);
    }

    #[test]
    fn test_toggling_during_flight_issues_once() {
        let mut trigger = PrefetchTrigger::new();
        let mut fetching = false;
        let mut fired = 0;

        for visible in [true, false, true, true, false, true] {
            trigger.set_in_view(visible);
            if trigger.should_fetch(true, fetching) {
                fired += 1;
                fetching = true;
            }
        }

        assert_eq!(fired, 1);
        assert_eq!(trigger.issued(), 1);
    }

    #[test]
    fn test_origin_flag_is_consumed() {
        let mut trigger = PrefetchTrigger::new();
        trigger.set_in_view(true);
        assert!(trigger.set_in_view(false));
        assert!(!trigger.set_in_view(false));
        trigger.set_in_view(true);

        trigger.should_fetch(true, false);
        assert!(trigger.take_from_prefetch());
        assert!(!trigger.take_from_prefetch());
    }
}
