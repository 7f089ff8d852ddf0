//! The boundary to the remote calendar service.

use std::future::Future;

use crate::error::DeadlineResult;
use crate::event::{EventPage, RemoteEvent};

/// A calendar the deadlines are mirrored into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarRef {
    pub id: String,
    pub name: String,
}

/// Operations the sync driver needs from a remote calendar service.
///
/// Implementations map their transport failures onto [`DeadlineError`]:
/// rate limiting to `RateLimited`, network trouble to `Transient`, rejected
/// credentials to `Auth`, anything else the service refuses to `Rejected`.
///
/// [`DeadlineError`]: crate::error::DeadlineError
pub trait RemoteStore: Send + Sync {
    /// The first calendar whose display name starts with `prefix`, in the order the
    /// store lists them.
    fn find_calendar(
        &self,
        prefix: &str,
    ) -> impl Future<Output = DeadlineResult<Option<CalendarRef>>> + Send;

    /// One page of events; pass the previous page's token to continue.
    fn list_events(
        &self,
        calendar: &CalendarRef,
        page_token: Option<&str>,
    ) -> impl Future<Output = DeadlineResult<EventPage>> + Send;

    /// Insert an event and return it with its assigned identifier.
    fn insert_event(
        &self,
        calendar: &CalendarRef,
        event: &RemoteEvent,
    ) -> impl Future<Output = DeadlineResult<RemoteEvent>> + Send;

    /// Delete by identifier. Deleting an already missing event succeeds.
    fn delete_event(
        &self,
        calendar: &CalendarRef,
        event_id: &str,
    ) -> impl Future<Output = DeadlineResult<()>> + Send;

    /// Drop cached credentials so the next pass re-authenticates.
    fn invalidate_credentials(&self) -> impl Future<Output = DeadlineResult<()>> + Send;
}
