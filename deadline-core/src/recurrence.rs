//! Recurrence rule parsing and expansion.
//!
//! A rule is written as a leading marker in a deadline's info:
//! `*[count]unit[-dd.MM.yyyy] text`, where `unit` is one of `d`, `w`, `m`, `y`
//! (case-insensitive). `*Some Name` without a rule token is a yearly rule.
//!
//! Expansion walks from the anchor date in steps and keeps a bounded window around
//! "now": a short lookback so that at least one past occurrence stays visible, and
//! everything up to the caller's horizon, capped per unit.

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, warn};

use crate::constants::DATE_FORMAT;
use crate::deadline::{Deadline, time_of_day};

/// Prefix that marks a deadline's info as a recurrence rule.
pub const RULE_PREFIX: char = '*';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepUnit {
    Day,
    Week,
    Month,
    Year,
}

impl StepUnit {
    fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'd' => Some(StepUnit::Day),
            'w' => Some(StepUnit::Week),
            'm' => Some(StepUnit::Month),
            'y' => Some(StepUnit::Year),
            _ => None,
        }
    }
}

/// A parsed recurrence rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub anchor: NaiveDate,
    pub unit: StepUnit,
    /// Multiplier on `unit`, at least 1.
    pub step: u32,
    /// Last date on which an occurrence may fall.
    pub end: Option<NaiveDate>,
    /// Time of day copied onto every occurrence.
    pub time: Option<NaiveTime>,
    /// Raw info as authored.
    pub info: String,
    /// Display text: the rule token removed, the leading `*` kept.
    pub text: String,
}

enum RuleToken {
    Rule {
        unit: StepUnit,
        step: u32,
        end: Option<NaiveDate>,
    },
    /// Ordinary text directly after the `*`, e.g. a name.
    Word,
    Malformed,
}

fn parse_token(token: &str) -> RuleToken {
    let (head, end) = match token.split_once('-') {
        Some((head, end)) => (head, Some(end)),
        None => (token, None),
    };

    let digits_len = head.chars().take_while(|c| c.is_ascii_digit()).count();
    let (digits, unit) = head.split_at(digits_len);

    let mut unit_chars = unit.chars();
    let unit = match (unit_chars.next(), unit_chars.next()) {
        (Some(c), None) => StepUnit::from_char(c),
        _ => None,
    };

    let Some(unit) = unit else {
        return if digits.is_empty() {
            RuleToken::Word
        } else {
            RuleToken::Malformed
        };
    };

    let step = if digits.is_empty() {
        1
    } else {
        match digits.parse::<u32>() {
            Ok(step) => step.max(1),
            Err(_) => return RuleToken::Malformed,
        }
    };

    let end = match end {
        Some(end) => match NaiveDate::parse_from_str(end, DATE_FORMAT) {
            Ok(date) => Some(date),
            Err(_) => return RuleToken::Malformed,
        },
        None => None,
    };

    RuleToken::Rule { unit, step, end }
}

impl RecurrenceRule {
    /// Parse the rule embedded in `info`, anchored at `anchor`.
    ///
    /// Returns `None` when `info` is not a recurrence rule at all. An unrecognised
    /// rule token is logged and falls back to a yearly rule.
    pub fn parse(anchor: NaiveDate, info: &str) -> Option<Self> {
        let rest = info.strip_prefix(RULE_PREFIX)?;
        let time = time_of_day(info);

        let yearly = |text: &str| RecurrenceRule {
            anchor,
            unit: StepUnit::Year,
            step: 1,
            end: None,
            time,
            info: info.to_string(),
            text: text.to_string(),
        };

        let Some((token, remainder)) = rest.split_once(' ') else {
            return Some(yearly(info));
        };
        if token.is_empty() {
            return Some(yearly(info));
        }

        match parse_token(token) {
            RuleToken::Rule { unit, step, end } => Some(RecurrenceRule {
                anchor,
                unit,
                step,
                end,
                time,
                info: info.to_string(),
                text: format!("{RULE_PREFIX}{}", remainder.trim_start()),
            }),
            RuleToken::Word => Some(yearly(info)),
            RuleToken::Malformed => {
                warn!("No valid recurrence in '{info}', treating it as yearly");
                Some(yearly(info))
            }
        }
    }

    /// The `k`-th occurrence date counted from the anchor.
    fn occurrence(&self, k: u32) -> Option<NaiveDate> {
        let n = k.checked_mul(self.step)?;
        match self.unit {
            StepUnit::Day => self.anchor.checked_add_days(Days::new(u64::from(n))),
            StepUnit::Week => self.anchor.checked_add_days(Days::new(u64::from(n) * 7)),
            StepUnit::Month => self.anchor.checked_add_months(Months::new(n)),
            StepUnit::Year => self
                .anchor
                .checked_add_months(Months::new(n.checked_mul(12)?)),
        }
    }

    /// Lookback boundary and maximum number of occurrences for this rule.
    fn window(&self, now: NaiveDateTime) -> (NaiveDateTime, Option<usize>) {
        let step = self.step as usize;
        match self.unit {
            StepUnit::Year => (
                now.checked_sub_months(Months::new(12)).unwrap_or(now),
                Some((4 / step).max(1)),
            ),
            StepUnit::Month => (
                now.checked_sub_months(Months::new(3)).unwrap_or(now),
                Some((12 / step).max(3)),
            ),
            StepUnit::Week => (
                now.checked_sub_days(Days::new(21)).unwrap_or(now),
                Some((40 / step).max(10)),
            ),
            StepUnit::Day => (
                now.checked_sub_days(Days::new(u64::from(self.step)))
                    .unwrap_or(now),
                None,
            ),
        }
    }

    /// Generate the occurrences visible from `now` up to and including `window_end`.
    pub fn expand(&self, now: NaiveDateTime, window_end: NaiveDateTime) -> Vec<Deadline> {
        let (lookback_start, cap) = self.window(now);
        let previous_year = now.year() - 1;
        let mut occurrences = Vec::new();

        for k in 0u32.. {
            let Some(date) = self.occurrence(k) else {
                break;
            };
            // Fast-forward through eras nobody looks at any more.
            if date.year() < previous_year {
                continue;
            }
            if self.end.is_some_and(|end| date > end) {
                break;
            }
            let when = date.and_time(self.time.unwrap_or(NaiveTime::MIN));
            if when > window_end {
                break;
            }
            if lookback_start < date.and_time(NaiveTime::MIN) {
                debug!("Match {when} for {} {}", self.anchor, self.info);
                occurrences.push(self.instance(when));
                if cap.is_some_and(|cap| occurrences.len() >= cap) {
                    break;
                }
            }
        }

        occurrences
    }

    fn instance(&self, when: NaiveDateTime) -> Deadline {
        Deadline {
            text_without_recurrence: Some(self.text.clone()),
            recurrence_anchor: Some(self.anchor),
            whole_day: self.time.is_none(),
            ..Deadline::new(when, self.info.clone())
        }
    }
}
