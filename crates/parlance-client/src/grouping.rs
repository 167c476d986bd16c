//! Partitioning of a page's messages into calendar-relative date groups.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};
use parlance_shared::constants::{
    ABSOLUTE_DATE_FORMAT, FALLBACK_DATE_LABEL, TODAY_LABEL, YESTERDAY_LABEL,
};
use parlance_shared::Message;

/// Turns a message time into the label shown above its group.
///
/// `None` stands for an empty or unparseable scheduled time.  Any
/// `Fn(Option<DateTime<Utc>>) -> String` closure is a labeler too.
pub trait DateLabeler {
    fn label(&self, at: Option<DateTime<Utc>>) -> String;
}

impl<F> DateLabeler for F
where
    F: Fn(Option<DateTime<Utc>>) -> String,
{
    fn label(&self, at: Option<DateTime<Utc>>) -> String {
        self(at)
    }
}

/// "Today", "Yesterday", otherwise e.g. "March 4, 2024", evaluated in a fixed
/// UTC offset relative to a fixed current date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeDateLabeler {
    today: NaiveDate,
    offset: FixedOffset,
}

impl RelativeDateLabeler {
    pub fn new(today: NaiveDate, offset: FixedOffset) -> Self {
        Self { today, offset }
    }

    /// Labeler for the calendar day `now` falls on in `offset`.
    pub fn at(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self::new(now.with_timezone(&offset).date_naive(), offset)
    }

    /// Labeler for the system clock and local time zone.
    pub fn local_now() -> Self {
        let now = Local::now();
        Self::new(now.date_naive(), *now.offset())
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }
}

impl DateLabeler for RelativeDateLabeler {
    fn label(&self, at: Option<DateTime<Utc>>) -> String {
        let Some(at) = at else {
            return FALLBACK_DATE_LABEL.to_string();
        };

        let date = at.with_timezone(&self.offset).date_naive();
        if date == self.today {
            TODAY_LABEL.to_string()
        } else if Some(date) == self.today.pred_opt() {
            YESTERDAY_LABEL.to_string()
        } else {
            date.format(ABSOLUTE_DATE_FORMAT).to_string()
        }
    }
}

/// Messages of one page sharing a date label, in page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateGroup<'a> {
    pub label: String,
    pub messages: Vec<&'a Message>,
}

/// Group `messages` by date label.
///
/// Groups appear in order of their label's first occurrence and keep the
/// input order of their members; nothing is sorted.  A message whose label
/// reappears after a different one joins the earlier group.
pub fn group_messages_by_date<'a, L>(messages: &'a [Message], labeler: &L) -> Vec<DateGroup<'a>>
where
    L: DateLabeler + ?Sized,
{
    let mut groups: Vec<DateGroup<'a>> = Vec::new();

    for message in messages {
        let label = labeler.label(message.scheduled_at());
        match groups.iter_mut().find(|g| g.label == label) {
            Some(group) => group.messages.push(message),
            None => groups.push(DateGroup {
                label,
                messages: vec![message],
            }),
        }
    }

    groups
}
