//! The deadline model: one occurrence of a reminder.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::constants::{DATE_FORMAT, TIME_FORMAT};

/// One occurrence of a reminder, either a literal entry or an instance generated
/// from a recurrence rule.
///
/// Two deadlines are the same occurrence iff `when` and `info` are equal; `done`,
/// `end_time`, `external_id` and the display fields do not take part in equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deadline {
    /// Local wall-clock instant of the occurrence.
    pub when: NaiveDateTime,
    /// Raw text as authored, possibly starting with a recurrence rule.
    pub info: String,
    /// Display text with the recurrence rule stripped. Falls back to `info`.
    pub text_without_recurrence: Option<String>,
    pub done: bool,
    /// Anchor date of the rule this occurrence was generated from.
    pub recurrence_anchor: Option<NaiveDate>,
    pub end_time: Option<NaiveDateTime>,
    /// Identifier assigned by the remote calendar once synced.
    pub external_id: Option<String>,
    /// Projected as an all-day event instead of a timed one.
    pub whole_day: bool,
}

impl Deadline {
    /// A timed deadline.
    pub fn new(when: NaiveDateTime, info: impl Into<String>) -> Self {
        Deadline {
            when,
            info: info.into(),
            text_without_recurrence: None,
            done: false,
            recurrence_anchor: None,
            end_time: None,
            external_id: None,
            whole_day: false,
        }
    }

    /// A deadline covering the whole of `date`.
    pub fn whole_day(date: NaiveDate, info: impl Into<String>) -> Self {
        Deadline {
            whole_day: true,
            ..Deadline::new(date.and_time(NaiveTime::MIN), info)
        }
    }

    /// Display text (recurrence rule stripped).
    pub fn text(&self) -> &str {
        self.text_without_recurrence.as_deref().unwrap_or(&self.info)
    }

    /// End of the occurrence, defaulting to its start.
    pub fn end(&self) -> NaiveDateTime {
        self.end_time.unwrap_or(self.when)
    }

    /// Whether this occurrence was produced by recurrence expansion.
    pub fn is_generated(&self) -> bool {
        self.recurrence_anchor.is_some()
    }

    /// Whether the occurrence lies before the start of `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.when < today.and_time(NaiveTime::MIN)
    }
}

impl PartialEq for Deadline {
    fn eq(&self, other: &Self) -> bool {
        self.when == other.when && self.info == other.info
    }
}

impl Eq for Deadline {}

impl Hash for Deadline {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.when.hash(state);
        self.info.hash(state);
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.whole_day {
            write!(f, "{} {}", self.when.format(DATE_FORMAT), self.text().trim())
        } else {
            write!(
                f,
                "{} {} {}",
                self.when.format(DATE_FORMAT),
                self.when.format(TIME_FORMAT),
                self.text().trim()
            )
        }
    }
}

/// Remove every occurrence of `open` that also appears in `done` (by identity).
pub fn without_done(open: Vec<Deadline>, done: &[Deadline]) -> Vec<Deadline> {
    let done: HashSet<&Deadline> = done.iter().collect();
    open.into_iter().filter(|d| !done.contains(d)).collect()
}

/// Find the first `HH:MM` token in `text`.
///
/// Only tokens longer than three characters that start with a digit are considered,
/// so dates and rule tokens like `1d-25.05.2018` never match.
pub fn time_of_day(text: &str) -> Option<NaiveTime> {
    text.split_whitespace()
        .filter(|token| token.len() > 3 && token.starts_with(|c: char| c.is_ascii_digit()))
        .find_map(|token| NaiveTime::parse_from_str(token, TIME_FORMAT).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_identity_ignores_done_and_remote_fields() {
        let a = Deadline::new(at(2025, 3, 20, 15, 0), " Dentist");
        let mut b = a.clone();
        b.done = true;
        b.external_id = Some("abc".into());
        b.end_time = Some(at(2025, 3, 20, 16, 0));
        assert_eq!(a, b);

        let c = Deadline::new(at(2025, 3, 20, 15, 0), " Dentist!");
        assert_ne!(a, c);
    }

    #[test]
    fn test_without_done_subtracts_by_identity() {
        let a = Deadline::new(at(2025, 3, 20, 15, 0), " A");
        let b = Deadline::new(at(2025, 3, 21, 15, 0), " B");
        let mut done_b = b.clone();
        done_b.done = true;

        let open = without_done(vec![a.clone(), b], &[done_b]);
        assert_eq!(open, vec![a]);
    }

    #[test]
    fn test_text_defaults_to_info() {
        let mut d = Deadline::new(at(2025, 1, 1, 0, 0), "*1w Sport");
        assert_eq!(d.text(), "*1w Sport");
        d.text_without_recurrence = Some("*Sport".into());
        assert_eq!(d.text(), "*Sport");
    }

    #[test]
    fn test_time_of_day_skips_rule_tokens() {
        assert_eq!(
            time_of_day("*1d-25.05.2018 11:00 testDaily"),
            NaiveTime::from_hms_opt(11, 0, 0)
        );
        assert_eq!(time_of_day("*1w Sport"), None);
        assert_eq!(time_of_day(" 07:30 early"), NaiveTime::from_hms_opt(7, 30, 0));
        assert_eq!(time_of_day(" 25:99 nonsense"), None);
    }

    #[test]
    fn test_overdue_is_relative_to_start_of_today() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        assert!(Deadline::new(at(2025, 3, 19, 23, 59), "x").is_overdue(today));
        assert!(!Deadline::new(at(2025, 3, 20, 0, 0), "x").is_overdue(today));
    }
}
