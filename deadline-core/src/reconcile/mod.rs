//! Reconciliation of open deadlines against the remote calendar.
//!
//! [`reconcile`] is a pure function of its inputs: it classifies every remote event
//! in two passes and returns the mutations that bring the calendar in line with the
//! local deadlines. Remote-originated changes that the local side should learn
//! about are reported through a [`SideEffectSink`].

pub mod matching;
pub mod plan;

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Local, Utc};
use log::{debug, info};

use crate::constants::MAX_PROJECTION_DAYS;
use crate::deadline::Deadline;
use crate::error::{DeadlineError, DeadlineResult};
use crate::event::{RemoteEvent, Transparency};
use crate::projection::{from_remote, to_remote};

pub use matching::{is_manual_entry, is_same, is_updated, same_id};
pub use plan::{Mutation, MutationKind, SyncPlan};

/// Receives remote-originated changes discovered during reconciliation.
///
/// Delivery is at-least-once. An error aborts the pass before anything is sent
/// to the remote side and before the last sync time moves, so the next pass
/// reports the same entries again. Implementations must tolerate repeats.
pub trait SideEffectSink {
    /// A remote entry the local side doesn't have yet, or a remote edit of one it has.
    fn on_remote_only_entry_found(&mut self, deadline: Deadline) -> DeadlineResult<()>;

    /// A deadline the user marked as free in the calendar, with `done` set.
    fn on_deadline_completed_remotely(&mut self, deadline: Deadline) -> DeadlineResult<()>;
}

/// Sink that only collects what it is told.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub remote_only: Vec<Deadline>,
    pub completed: Vec<Deadline>,
}

impl RecordingSink {
    pub fn is_empty(&self) -> bool {
        self.remote_only.is_empty() && self.completed.is_empty()
    }
}

impl SideEffectSink for RecordingSink {
    fn on_remote_only_entry_found(&mut self, deadline: Deadline) -> DeadlineResult<()> {
        self.remote_only.push(deadline);
        Ok(())
    }

    fn on_deadline_completed_remotely(&mut self, deadline: Deadline) -> DeadlineResult<()> {
        self.completed.push(deadline);
        Ok(())
    }
}

impl<S: SideEffectSink + ?Sized> SideEffectSink for &mut S {
    fn on_remote_only_entry_found(&mut self, deadline: Deadline) -> DeadlineResult<()> {
        (**self).on_remote_only_entry_found(deadline)
    }

    fn on_deadline_completed_remotely(&mut self, deadline: Deadline) -> DeadlineResult<()> {
        (**self).on_deadline_completed_remotely(deadline)
    }
}

/// Point in time a pass runs at, plus the start of the last successful pass.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileContext {
    pub now: DateTime<Local>,
    pub last_sync: Option<DateTime<Utc>>,
}

impl ReconcileContext {
    pub fn new(now: DateTime<Local>, last_sync: Option<DateTime<Utc>>) -> Self {
        ReconcileContext { now, last_sync }
    }
}

/// Compute the remote mutations for one pass.
///
/// `local_open` are the open deadlines, `remote` every event listed from the
/// calendar. Deadlines more than [`MAX_PROJECTION_DAYS`] ahead are not projected.
pub fn reconcile<S: SideEffectSink + ?Sized>(
    local_open: &[Deadline],
    remote: &[RemoteEvent],
    ctx: &ReconcileContext,
    sink: &mut S,
) -> DeadlineResult<SyncPlan> {
    let today = ctx.now.date_naive();
    let now_utc = ctx.now.with_timezone(&Utc);
    let projection_limit = ctx.now.naive_local() + Duration::days(MAX_PROJECTION_DAYS);

    let projections: Vec<(&Deadline, RemoteEvent)> = local_open
        .iter()
        .filter(|deadline| deadline.when <= projection_limit)
        .map(|deadline| (deadline, to_remote(deadline, today)))
        .collect();

    info!("Open deadlines to project: {}", projections.len());
    info!("Remote entries (including history): {}", remote.len());

    let mut pending: BTreeSet<usize> = (0..projections.len()).collect();
    let find_pending = |pending: &BTreeSet<usize>, event: &RemoteEvent| {
        pending
            .iter()
            .copied()
            .find(|&j| is_same(event, &projections[j].1))
    };

    let mut kept: Vec<usize> = Vec::new();
    let mut candidates: Vec<usize> = Vec::new();
    let mut deletions: BTreeSet<usize> = BTreeSet::new();
    let mut plan_kept = 0;
    let mut history = 0;

    // First pass: settle floating overdue entries, spot duplicates, retain history.
    for (i, event) in remote.iter().enumerate() {
        if event.has_overdue_marker() {
            if let Some(j) = find_pending(&pending, event) {
                debug!("Overdue entry already up to date: {}", event.summary);
                consume(&mut pending, j)?;
                plan_kept += 1;
            } else {
                candidates.push(i);
            }
        } else if find_pending(&pending, event).is_some() {
            if kept.iter().any(|&k| is_same(event, &remote[k])) {
                info!("Duplicate remote entry: {event}");
                deletions.insert(i);
            } else {
                kept.push(i);
                candidates.push(i);
            }
        } else if event.starts_before(now_utc) {
            history += 1;
        } else {
            candidates.push(i);
        }
    }

    // Second pass: pair the remaining entries with projections.
    let mut manual = 0;
    for i in candidates {
        let event = &remote[i];

        if let Some(j) = find_pending(&pending, event) {
            let (deadline, projection) = &projections[j];

            if same_id(event, projection) && is_updated(projection, event) {
                let edited = from_remote(event);
                info!("Remote entry was edited: {edited}");
                sink.on_remote_only_entry_found(edited)?;
            }
            if event.transparency == Transparency::Transparent {
                let mut completed = (*deadline).clone();
                completed.done = true;
                info!("Remote entry marked as free, completing: {completed}");
                sink.on_deadline_completed_remotely(completed)?;
            }

            consume(&mut pending, j)?;
            plan_kept += 1;
            continue;
        }

        if !event.has_overdue_marker() && is_manual_entry(event, ctx.last_sync) {
            let found = from_remote(event);
            info!("Remote-only entry found: {found}");
            sink.on_remote_only_entry_found(found)?;
            manual += 1;
            continue;
        }

        debug!("No open deadline for remote entry: {event}");
        deletions.insert(i);
    }

    let inserts = pending
        .into_iter()
        .map(|j| projections[j].1.clone())
        .collect();
    let deletes = deletions.into_iter().map(|i| remote[i].clone()).collect();

    let mut plan = SyncPlan::new(inserts, deletes);
    plan.kept = plan_kept;
    plan.history = history;
    plan.manual = manual;

    let (inserted, deleted) = plan.counts();
    info!(
        "Plan: {inserted} to insert, {deleted} to delete, {} kept, {history} history, {manual} manual",
        plan.kept
    );

    Ok(plan)
}

fn consume(pending: &mut BTreeSet<usize>, j: usize) -> DeadlineResult<()> {
    if pending.remove(&j) {
        Ok(())
    } else {
        Err(DeadlineError::Invariant(format!(
            "projection {j} matched more than once"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TEXT_PROPERTY;
    use crate::event::EventTime;
    use chrono::{NaiveDate, NaiveDateTime, TimeZone};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn ctx(now: NaiveDateTime, last_sync: Option<DateTime<Utc>>) -> ReconcileContext {
        ReconcileContext::new(Local.from_local_datetime(&now).earliest().unwrap(), last_sync)
    }

    fn stored(deadline: &Deadline, today: NaiveDate, id: &str) -> RemoteEvent {
        RemoteEvent {
            id: Some(id.to_string()),
            ..to_remote(deadline, today)
        }
    }

    #[test]
    fn test_empty_remote_inserts_everything() {
        let now = at(2025, 3, 1, 8, 0);
        let local = vec![
            Deadline::new(at(2025, 3, 20, 15, 0), " Dentist"),
            Deadline::whole_day(at(2025, 4, 1, 0, 0).date(), " Rent"),
        ];
        let mut sink = RecordingSink::default();

        let plan = reconcile(&local, &[], &ctx(now, None), &mut sink).unwrap();

        assert_eq!(plan.counts(), (2, 0));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_matching_state_is_noop() {
        let now = at(2025, 3, 1, 8, 0);
        let today = now.date();
        let local = vec![
            Deadline::new(at(2025, 3, 20, 15, 0), " Dentist"),
            Deadline::whole_day(at(2025, 2, 1, 0, 0).date(), " Overdue"),
        ];
        let remote: Vec<_> = local
            .iter()
            .enumerate()
            .map(|(i, d)| stored(d, today, &format!("id{i}")))
            .collect();
        let mut sink = RecordingSink::default();

        let plan = reconcile(&local, &remote, &ctx(now, None), &mut sink).unwrap();

        assert!(plan.is_empty());
        assert_eq!(plan.kept, 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_far_future_is_not_projected() {
        let now = at(2025, 3, 1, 8, 0);
        let local = vec![Deadline::whole_day(at(2028, 1, 1, 0, 0).date(), " Far")];
        let mut sink = RecordingSink::default();

        let plan = reconcile(&local, &[], &ctx(now, None), &mut sink).unwrap();

        assert!(plan.is_empty());
    }

    #[test]
    fn test_duplicates_are_deleted_once() {
        let now = at(2025, 3, 1, 8, 0);
        let deadline = Deadline::new(at(2025, 3, 20, 15, 0), " Dentist");
        let remote = vec![
            stored(&deadline, now.date(), "a"),
            stored(&deadline, now.date(), "b"),
            stored(&deadline, now.date(), "c"),
        ];
        let mut sink = RecordingSink::default();

        let plan =
            reconcile(&[deadline], &remote, &ctx(now, None), &mut sink).unwrap();

        let deleted: Vec<_> = plan.deletes().filter_map(|e| e.id.as_deref()).collect();
        assert_eq!(deleted, vec!["b", "c"]);
        assert_eq!(plan.inserts().count(), 0);
    }

    #[test]
    fn test_transparent_entry_completes_deadline() {
        let now = at(2025, 3, 1, 8, 0);
        let deadline = Deadline::new(at(2025, 3, 20, 15, 0), " Dentist");
        let mut event = stored(&deadline, now.date(), "a");
        event.transparency = Transparency::Transparent;
        let mut sink = RecordingSink::default();

        let plan = reconcile(
            std::slice::from_ref(&deadline),
            &[event],
            &ctx(now, None),
            &mut sink,
        )
        .unwrap();

        assert!(plan.is_empty());
        assert_eq!(sink.completed.len(), 1);
        assert!(sink.completed[0].done);
        assert_eq!(sink.completed[0], deadline);
    }

    #[test]
    fn test_edit_detected_by_identifier() {
        let now = at(2025, 3, 1, 8, 0);
        let mut deadline = Deadline::new(at(2025, 3, 20, 15, 0), " Dentist");
        deadline.external_id = Some("a".into());
        let mut event = stored(&deadline, now.date(), "a");
        event.summary = "Dentist (moved)".into();
        event.properties.remove(TEXT_PROPERTY);
        let mut sink = RecordingSink::default();

        let plan = reconcile(&[deadline], &[event], &ctx(now, None), &mut sink).unwrap();

        assert!(plan.is_empty());
        assert_eq!(sink.remote_only.len(), 1);
        assert_eq!(sink.remote_only[0].text(), "Dentist (moved)");
    }

    #[test]
    fn test_unmatched_past_entry_is_history() {
        let now = at(2025, 3, 1, 8, 0);
        let old = Deadline::new(at(2025, 2, 10, 9, 0), " Finished");
        let event = stored(&old, at(2025, 2, 1, 0, 0).date(), "past");
        let mut sink = RecordingSink::default();

        let plan = reconcile(&[], &[event], &ctx(now, None), &mut sink).unwrap();

        assert!(plan.is_empty());
        assert_eq!(plan.history, 1);
    }

    #[test]
    fn test_stale_overdue_entry_is_deleted() {
        let now = at(2025, 3, 2, 8, 0);
        let deadline = Deadline::whole_day(at(2025, 2, 10, 0, 0).date(), " Tax");
        let yesterday = stored(&deadline, at(2025, 3, 1, 0, 0).date(), "old");
        let mut sink = RecordingSink::default();

        let plan = reconcile(&[deadline], &[yesterday], &ctx(now, None), &mut sink).unwrap();

        assert_eq!(plan.counts(), (1, 1));
        let inserted = plan.inserts().next().unwrap();
        assert_eq!(inserted.start, EventTime::Date(now.date()));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_future_orphan_of_ours_is_deleted() {
        let now = at(2025, 3, 1, 8, 0);
        let gone = Deadline::new(at(2025, 3, 20, 15, 0), " Cancelled");
        let event = stored(&gone, now.date(), "x");
        let mut sink = RecordingSink::default();

        let plan = reconcile(&[], &[event], &ctx(now, None), &mut sink).unwrap();

        assert_eq!(plan.counts(), (0, 1));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_manual_entry_is_kept_and_surfaced() {
        let now = at(2025, 3, 1, 8, 0);
        let last_sync = Utc.with_ymd_and_hms(2025, 2, 28, 12, 0, 0).unwrap();
        let manual = RemoteEvent {
            id: Some("m".into()),
            summary: "Call Anna".into(),
            description: None,
            start: EventTime::Date(at(2025, 3, 5, 0, 0).date()),
            end: EventTime::Date(at(2025, 3, 6, 0, 0).date()),
            transparency: Transparency::Opaque,
            created: Some(last_sync + Duration::hours(1)),
            properties: Default::default(),
        };
        let mut sink = RecordingSink::default();

        let plan = reconcile(&[], &[manual], &ctx(now, Some(last_sync)), &mut sink).unwrap();

        assert!(plan.is_empty());
        assert_eq!(plan.manual, 1);
        assert_eq!(sink.remote_only.len(), 1);
        assert_eq!(sink.remote_only[0].info, "Call Anna");
    }
}
