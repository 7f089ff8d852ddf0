//! Matching policy between remote events and projected deadlines.

use chrono::{DateTime, Utc};

use crate::event::RemoteEvent;

/// Both sides carry an identifier and the identifiers are equal.
pub fn same_id(a: &RemoteEvent, b: &RemoteEvent) -> bool {
    matches!((&a.id, &b.id), (Some(a), Some(b)) if a == b)
}

/// Whether `remote` represents the same logical deadline as `local`.
///
/// Identifiers are authoritative. Otherwise the trimmed summaries must be equal and
/// the starts must agree: both timed with the same instant, or both all-day on the
/// same date.
pub fn is_same(remote: &RemoteEvent, local: &RemoteEvent) -> bool {
    if same_id(remote, local) {
        return true;
    }
    remote.summary.trim() == local.summary.trim()
        && remote.start.is_all_day() == local.start.is_all_day()
        && remote.start == local.start
}

/// For an identifier match: whether the remote copy differs from the projection.
pub fn is_updated(local: &RemoteEvent, remote: &RemoteEvent) -> bool {
    local.summary.trim() != remote.summary.trim() || local.start != remote.start
}

/// Heuristic for a remote event someone entered by hand.
///
/// Our own projections always carry the metadata property. For anything else, with
/// no known previous sync everything counts as manual; otherwise the event must
/// have been created after that sync. An event without a creation time is not
/// considered manual once a sync is known.
pub fn is_manual_entry(event: &RemoteEvent, last_sync: Option<DateTime<Utc>>) -> bool {
    if event.is_self_generated() {
        return false;
    }
    match (last_sync, event.created) {
        (None, _) => true,
        (Some(last_sync), Some(created)) => created > last_sync,
        (Some(_), None) => false,
    }
}
