#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use deadline_core::{
    CalendarRef, DeadlineError, DeadlineResult, EventPage, RemoteEvent, RemoteStore,
};
use tokio::sync::Notify;

/// Remote store kept in memory, with knobs for paging and failures.
pub struct MemoryRemote {
    calendar: Option<CalendarRef>,
    events: Mutex<Vec<RemoteEvent>>,
    next_id: AtomicUsize,
    page_size: usize,
    failures: Mutex<VecDeque<DeadlineError>>,
    mutation_failure: Mutex<Option<(usize, DeadlineError)>>,
    gate: Option<Arc<Notify>>,
    pub inserts: AtomicUsize,
    pub deletes: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub invalidations: AtomicUsize,
}

impl MemoryRemote {
    pub fn new() -> Self {
        MemoryRemote {
            calendar: Some(CalendarRef {
                id: "cal-1".into(),
                name: "Deadlines".into(),
            }),
            events: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            page_size: 250,
            failures: Mutex::new(VecDeque::new()),
            mutation_failure: Mutex::new(None),
            gate: None,
            inserts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            invalidations: AtomicUsize::new(0),
        }
    }

    pub fn without_calendar() -> Self {
        MemoryRemote {
            calendar: None,
            ..MemoryRemote::new()
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Listing waits until the gate is notified.
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Seed an event, assigning an identifier when it has none.
    pub fn seed(&self, mut event: RemoteEvent) -> RemoteEvent {
        if event.id.is_none() {
            event.id = Some(self.assign_id());
        }
        self.events.lock().unwrap().push(event.clone());
        event
    }

    /// The next listing call fails with `error`.
    pub fn fail_next(&self, error: DeadlineError) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// After `succeed` more inserts or deletes, the next one fails with `error`.
    pub fn fail_mutation_after(&self, succeed: usize, error: DeadlineError) {
        *self.mutation_failure.lock().unwrap() = Some((succeed, error));
    }

    pub fn events(&self) -> Vec<RemoteEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn check_mutation(&self) -> DeadlineResult<()> {
        let mut failure = self.mutation_failure.lock().unwrap();
        match failure.take() {
            Some((0, error)) => Err(error),
            Some((remaining, error)) => {
                *failure = Some((remaining - 1, error));
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn assign_id(&self) -> String {
        format!("ev{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

impl RemoteStore for MemoryRemote {
    async fn find_calendar(&self, prefix: &str) -> DeadlineResult<Option<CalendarRef>> {
        Ok(self
            .calendar
            .clone()
            .filter(|calendar| calendar.name.starts_with(prefix)))
    }

    async fn list_events(
        &self,
        _calendar: &CalendarRef,
        page_token: Option<&str>,
    ) -> DeadlineResult<EventPage> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        let start: usize = page_token.map_or(0, |t| t.parse().unwrap());
        let events = self.events.lock().unwrap();
        let end = (start + self.page_size).min(events.len());
        Ok(EventPage {
            events: events[start..end].to_vec(),
            next_page_token: (end < events.len()).then(|| end.to_string()),
        })
    }

    async fn insert_event(
        &self,
        _calendar: &CalendarRef,
        event: &RemoteEvent,
    ) -> DeadlineResult<RemoteEvent> {
        self.check_mutation()?;
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let inserted = RemoteEvent {
            id: Some(self.assign_id()),
            created: Some(chrono::Utc::now()),
            ..event.clone()
        };
        self.events.lock().unwrap().push(inserted.clone());
        Ok(inserted)
    }

    async fn delete_event(&self, _calendar: &CalendarRef, event_id: &str) -> DeadlineResult<()> {
        self.check_mutation()?;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.events
            .lock()
            .unwrap()
            .retain(|e| e.id.as_deref() != Some(event_id));
        Ok(())
    }

    async fn invalidate_credentials(&self) -> DeadlineResult<()> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, min, 0).unwrap()
}

pub fn local(naive: NaiveDateTime) -> DateTime<Local> {
    Local.from_local_datetime(&naive).earliest().unwrap()
}
