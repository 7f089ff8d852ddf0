use deadline_core::error::{DeadlineError, DeadlineResult};
use deadline_core::event::{EventTime, RemoteEvent, Transparency};

use crate::types::{ExtendedProperties, GoogleEvent, GoogleEventTime};

pub trait FromGoogle {
    fn from_google(event: GoogleEvent) -> DeadlineResult<Self>
    where
        Self: Sized;
}

pub trait ToGoogle {
    fn to_google(&self) -> GoogleEvent;
}

impl FromGoogle for RemoteEvent {
    fn from_google(event: GoogleEvent) -> DeadlineResult<Self> {
        let start = event_time(event.start.as_ref(), "start")?;
        let end = match event.end.as_ref() {
            Some(_) => event_time(event.end.as_ref(), "end")?,
            None => start.clone(),
        };

        let transparency = match event.transparency.as_deref() {
            Some("transparent") => Transparency::Transparent,
            _ => Transparency::Opaque,
        };

        Ok(RemoteEvent {
            id: event.id,
            summary: event.summary.unwrap_or_default(),
            description: event.description,
            start,
            end,
            transparency,
            created: event.created,
            properties: event
                .extended_properties
                .map(|props| props.private)
                .unwrap_or_default(),
        })
    }
}

impl ToGoogle for RemoteEvent {
    fn to_google(&self) -> GoogleEvent {
        let transparency = match self.transparency {
            Transparency::Opaque => "opaque",
            Transparency::Transparent => "transparent",
        };
        let extended_properties = (!self.properties.is_empty()).then(|| ExtendedProperties {
            private: self.properties.clone(),
            ..ExtendedProperties::default()
        });

        GoogleEvent {
            id: None,
            summary: Some(self.summary.clone()),
            description: self.description.clone(),
            start: Some(google_time(&self.start)),
            end: Some(google_time(&self.end)),
            transparency: Some(transparency.to_string()),
            created: None,
            extended_properties,
        }
    }
}

fn event_time(time: Option<&GoogleEventTime>, which: &str) -> DeadlineResult<EventTime> {
    match time {
        Some(GoogleEventTime {
            date_time: Some(dt),
            ..
        }) => Ok(EventTime::DateTime(*dt)),
        Some(GoogleEventTime { date: Some(d), .. }) => Ok(EventTime::Date(*d)),
        _ => Err(DeadlineError::Serialization(format!(
            "Event has no {which} time"
        ))),
    }
}

fn google_time(time: &EventTime) -> GoogleEventTime {
    match time {
        EventTime::DateTime(dt) => GoogleEventTime {
            date_time: Some(*dt),
            date: None,
        },
        EventTime::Date(d) => GoogleEventTime {
            date: Some(*d),
            date_time: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn test_from_google_json() {
        let json = r#"{
            "id": "abc",
            "summary": "Dentist",
            "start": {"dateTime": "2025-03-20T15:00:00+01:00"},
            "end": {"dateTime": "2025-03-20T16:00:00+01:00"},
            "transparency": "transparent",
            "created": "2025-03-01T10:00:00.000Z",
            "extendedProperties": {"private": {"TextWithoutRepeatingInfo": " Dentist"}}
        }"#;
        let google: GoogleEvent = serde_json::from_str(json).unwrap();

        let event = RemoteEvent::from_google(google).unwrap();

        assert_eq!(event.id.as_deref(), Some("abc"));
        assert_eq!(
            event.start,
            EventTime::DateTime(Utc.with_ymd_and_hms(2025, 3, 20, 14, 0, 0).unwrap())
        );
        assert_eq!(event.transparency, Transparency::Transparent);
        assert!(event.is_self_generated());
        assert!(event.created.is_some());
    }

    #[test]
    fn test_all_day_without_start_fails() {
        let google: GoogleEvent =
            serde_json::from_str(r#"{"id": "x", "summary": "Broken"}"#).unwrap();
        assert!(RemoteEvent::from_google(google).is_err());

        let google: GoogleEvent = serde_json::from_str(
            r#"{"id": "y", "start": {"date": "2025-03-20"}, "end": {"date": "2025-03-21"}}"#,
        )
        .unwrap();
        let event = RemoteEvent::from_google(google).unwrap();
        assert_eq!(
            event.start,
            EventTime::Date(NaiveDate::from_ymd_opt(2025, 3, 20).unwrap())
        );
        assert_eq!(event.summary, "");
        assert_eq!(event.transparency, Transparency::Opaque);
    }

    #[test]
    fn test_to_google_body() {
        let mut event = RemoteEvent {
            id: Some("ignored".into()),
            summary: "Rent".into(),
            description: Some("READ-ONLY. See termin.txt".into()),
            start: EventTime::Date(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()),
            end: EventTime::Date(NaiveDate::from_ymd_opt(2025, 4, 2).unwrap()),
            transparency: Transparency::Opaque,
            created: None,
            properties: Default::default(),
        };
        event
            .properties
            .insert("TextWithoutRepeatingInfo".into(), " Rent".into());

        let body = serde_json::to_value(event.to_google()).unwrap();

        assert!(body.get("id").is_none());
        assert_eq!(body["start"]["date"], "2025-04-01");
        assert!(body["start"].get("dateTime").is_none());
        assert_eq!(body["transparency"], "opaque");
        assert_eq!(
            body["extendedProperties"]["private"]["TextWithoutRepeatingInfo"],
            " Rent"
        );
    }
}
