//! Provider-neutral remote event types.
//!
//! Remote stores convert their API payloads into these types; reconciliation works
//! exclusively with them.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{OVERDUE_MARKER, TEXT_PROPERTY};

/// A calendar event as seen by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEvent {
    /// Assigned by the remote store. `None` for projections not yet inserted.
    pub id: Option<String>,
    pub summary: String,
    pub description: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    /// Whether the event blocks time (opaque) or shows as free (transparent).
    pub transparency: Transparency,
    pub created: Option<DateTime<Utc>>,
    /// Private extended properties, the side channel for our own metadata.
    pub properties: BTreeMap<String, String>,
}

impl RemoteEvent {
    /// Summary starts with the overdue marker we put on past occurrences.
    pub fn has_overdue_marker(&self) -> bool {
        self.summary.starts_with(OVERDUE_MARKER)
    }

    /// Carries the metadata property every projection gets.
    pub fn is_self_generated(&self) -> bool {
        self.properties.contains_key(TEXT_PROPERTY)
    }

    /// Start lies strictly before `now`. All-day starts count from local midnight.
    pub fn starts_before(&self, now: DateTime<Utc>) -> bool {
        self.start.to_utc() < now
    }
}

impl fmt::Display for RemoteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.start, self.summary)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTime {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
}

impl EventTime {
    /// Local wall-clock time; all-day dates map to local midnight.
    pub fn to_local(&self) -> NaiveDateTime {
        match self {
            EventTime::DateTime(dt) => dt.with_timezone(&Local).naive_local(),
            EventTime::Date(d) => d.and_time(NaiveTime::MIN),
        }
    }

    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            EventTime::DateTime(dt) => *dt,
            EventTime::Date(d) => local_to_utc(d.and_time(NaiveTime::MIN)),
        }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::DateTime(dt) => write!(f, "{}", dt.with_timezone(&Local).format("%Y-%m-%d %H:%M")),
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Event transparency (busy/free status)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transparency {
    /// Event blocks time on calendar (default)
    #[default]
    Opaque,
    /// Event does not block time (shows as free)
    Transparent,
}

/// One page of a remote event listing.
#[derive(Debug, Clone, Default)]
pub struct EventPage {
    pub events: Vec<RemoteEvent>,
    /// Continuation token; `None` on the last page.
    pub next_page_token: Option<String>,
}

/// Interpret a local wall-clock time in the local timezone.
///
/// Times that fall into a DST gap are read as UTC rather than failing.
pub fn local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}
