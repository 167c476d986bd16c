/// Application name
pub const APP_NAME: &str = "Parlance";

/// Number of messages requested per history page
pub const DEFAULT_PAGE_SIZE: usize = 12;

/// Placeholder rows shown while the first page is loading
pub const DEFAULT_LOADING_SKELETONS: usize = 10;

/// Placeholder rows inside the prefetch sentinel at the top of the list
pub const DEFAULT_SENTINEL_SKELETONS: usize = 3;

/// Banner shown once the oldest history page has been loaded
pub const DEFAULT_NO_MORE_MESSAGES_LABEL: &str = "All previous messages have been loaded";

/// Date labels
pub const TODAY_LABEL: &str = "Today";
pub const YESTERDAY_LABEL: &str = "Yesterday";

/// Group label for messages whose scheduled time is empty or unparseable
pub const FALLBACK_DATE_LABEL: &str = "Unknown date";

/// chrono format for dates older than yesterday, e.g. `March 4, 2024`
pub const ABSOLUTE_DATE_FORMAT: &str = "%B %-d, %Y";
