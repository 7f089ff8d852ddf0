//! Mapping between deadlines and remote events.
//!
//! Overdue deadlines are floated to today with a `! ` prefix and their original
//! date appended, so they stay visible in the calendar. The undecorated display
//! text, the raw info and the original instant travel in private extended
//! properties, which lets [`from_remote`] undo the decoration.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate, NaiveDateTime};

use crate::constants::{
    INFO_PROPERTY, ORIGINAL_WHEN_FORMAT, ORIGINAL_WHEN_PROPERTY, OVERDUE_MARKER,
    SHORT_DATE_FORMAT, TEXT_PROPERTY,
};
use crate::deadline::Deadline;
use crate::event::{EventTime, RemoteEvent, Transparency, local_to_utc};

const READ_ONLY_NOTE: &str = "READ-ONLY. See termin.txt";

/// Project a deadline onto a remote event as of `today`.
pub fn to_remote(deadline: &Deadline, today: NaiveDate) -> RemoteEvent {
    let text = deadline.text().trim();
    let overdue = deadline.is_overdue(today);

    let (summary, start) = if overdue {
        (
            format!(
                "{OVERDUE_MARKER}{text} ({})",
                deadline.when.format(SHORT_DATE_FORMAT)
            ),
            today.and_time(deadline.when.time()),
        )
    } else {
        (text.to_string(), deadline.when)
    };
    let end = start + (deadline.end() - deadline.when);

    let (start, end) = if deadline.whole_day {
        let day = start.date();
        (
            EventTime::Date(day),
            EventTime::Date(day.checked_add_days(Days::new(1)).unwrap_or(day)),
        )
    } else {
        (
            EventTime::DateTime(local_to_utc(start)),
            EventTime::DateTime(local_to_utc(end)),
        )
    };

    let mut properties = BTreeMap::new();
    properties.insert(TEXT_PROPERTY.to_string(), deadline.text().to_string());
    properties.insert(INFO_PROPERTY.to_string(), deadline.info.clone());
    if overdue {
        properties.insert(
            ORIGINAL_WHEN_PROPERTY.to_string(),
            deadline.when.format(ORIGINAL_WHEN_FORMAT).to_string(),
        );
    }

    let description = match deadline.recurrence_anchor {
        Some(anchor) => format!("{READ_ONLY_NOTE} - since ({})", anchor.format("%a %d.%m.%Y")),
        None => READ_ONLY_NOTE.to_string(),
    };

    RemoteEvent {
        id: deadline.external_id.clone(),
        summary: summary.trim().to_string(),
        description: Some(description),
        start,
        end,
        transparency: Transparency::Opaque,
        created: None,
        properties,
    }
}

/// Recover a deadline from a remote event.
///
/// Text comes from the side-channel property when present, else from the summary.
/// An overdue projection is moved back to its original instant.
pub fn from_remote(event: &RemoteEvent) -> Deadline {
    let text = event
        .properties
        .get(TEXT_PROPERTY)
        .cloned()
        .unwrap_or_else(|| event.summary.clone());
    let info = event
        .properties
        .get(INFO_PROPERTY)
        .cloned()
        .unwrap_or_else(|| text.clone());

    let start = event.start.to_local();
    let end = event.end.to_local();
    let whole_day = event.start.is_all_day();

    let when = if event.has_overdue_marker() {
        event
            .properties
            .get(ORIGINAL_WHEN_PROPERTY)
            .and_then(|s| NaiveDateTime::parse_from_str(s, ORIGINAL_WHEN_FORMAT).ok())
            .unwrap_or(start)
    } else {
        start
    };

    let end_time = if whole_day || end <= start {
        None
    } else {
        Some(when + (end - start))
    };

    Deadline {
        text_without_recurrence: Some(text),
        end_time,
        external_id: event.id.clone(),
        whole_day,
        ..Deadline::new(when, info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveTime};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn test_future_timed_projection() {
        let mut deadline = Deadline::new(at(2025, 3, 20, 15, 0), " 15:00 Dentist");
        deadline.end_time = Some(at(2025, 3, 20, 16, 0));

        let event = to_remote(&deadline, date(2025, 3, 1));

        assert_eq!(event.summary, "15:00 Dentist");
        assert_eq!(event.start, EventTime::DateTime(local_to_utc(at(2025, 3, 20, 15, 0))));
        assert_eq!(event.end, EventTime::DateTime(local_to_utc(at(2025, 3, 20, 16, 0))));
        assert!(event.is_self_generated());
        assert!(!event.has_overdue_marker());
        assert_eq!(event.description.as_deref(), Some(READ_ONLY_NOTE));
    }

    #[test]
    fn test_whole_day_projection_spans_one_day() {
        let deadline = Deadline::whole_day(date(2025, 3, 20), " Tax return");

        let event = to_remote(&deadline, date(2025, 3, 1));

        assert_eq!(event.start, EventTime::Date(date(2025, 3, 20)));
        assert_eq!(event.end, EventTime::Date(date(2025, 3, 21)));
    }

    #[test]
    fn test_overdue_projection_floats_to_today() {
        let deadline = Deadline::whole_day(date(2025, 2, 10), " Tax return");
        let today = date(2025, 3, 1);

        let event = to_remote(&deadline, today);

        assert_eq!(event.summary, "! Tax return (10.02.25)");
        assert_eq!(event.start, EventTime::Date(today));
        assert!(event.has_overdue_marker());
        assert_eq!(event.properties[TEXT_PROPERTY], " Tax return");
    }

    #[test]
    fn test_overdue_roundtrip_recovers_original() {
        let today = date(2025, 3, 1);
        let mut deadline = Deadline::new(at(2025, 2, 10, 9, 30), "*1w 09:30 Standup");
        deadline.text_without_recurrence = Some("*09:30 Standup".into());
        deadline.recurrence_anchor = Some(date(2025, 1, 6));

        let event = to_remote(&deadline, today);
        assert_eq!(event.start.to_local(), at(2025, 3, 1, 9, 30));

        let back = from_remote(&event);
        assert_eq!(back, deadline);
        assert_eq!(back.text(), "*09:30 Standup");
        assert!(!back.whole_day);
    }

    #[test]
    fn test_roundtrip_identity() {
        let today = date(2025, 3, 1);
        let cases = [
            Deadline::new(at(2025, 3, 20, 15, 0), " 15:00 Dentist"),
            Deadline::whole_day(date(2025, 4, 1), " Rent"),
            Deadline::whole_day(date(2025, 1, 1), " Overdue all-day"),
        ];
        for deadline in cases {
            let back = from_remote(&to_remote(&deadline, today));
            assert_eq!(back, deadline);
            assert_eq!(back.whole_day, deadline.whole_day);
            assert_eq!(back.text(), deadline.text());
        }
    }

    #[test]
    fn test_from_manual_event_uses_summary() {
        let event = RemoteEvent {
            id: Some("manual-1".into()),
            summary: "Call Anna".into(),
            description: None,
            start: EventTime::Date(date(2025, 3, 20)),
            end: EventTime::Date(date(2025, 3, 21)),
            transparency: Transparency::Opaque,
            created: None,
            properties: BTreeMap::new(),
        };

        let deadline = from_remote(&event);

        assert_eq!(deadline.info, "Call Anna");
        assert_eq!(deadline.text(), "Call Anna");
        assert_eq!(deadline.when, date(2025, 3, 20).and_time(NaiveTime::MIN));
        assert_eq!(deadline.external_id.as_deref(), Some("manual-1"));
        assert!(deadline.whole_day);
    }

    #[test]
    fn test_timed_end_survives_roundtrip() {
        let mut deadline = Deadline::new(at(2025, 3, 20, 15, 0), " Meeting");
        deadline.end_time = Some(at(2025, 3, 20, 15, 0) + Duration::minutes(45));

        let back = from_remote(&to_remote(&deadline, date(2025, 3, 1)));

        assert_eq!(back.end_time, deadline.end_time);
    }
}
