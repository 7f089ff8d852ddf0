//! The `dd.MM.yyyy<info>` line format of the deadline files.
//!
//! A line may carry its time outside the text as `dd.MM.yyyy@HH:MM[-HH:MM] info`.
//! Entries picked up from the calendar are written this way so their text stays
//! exactly the event summary.

use chrono::{Datelike, Days, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use log::debug;

use crate::constants::{DATE_FORMAT, TIME_FORMAT};
use crate::deadline::{Deadline, time_of_day};
use crate::recurrence::RecurrenceRule;

const COMMENT_PREFIXES: [&str; 2] = ["--", "#"];
const DATE_LEN: usize = 10;
const TIME_BLOCK_PREFIX: char = '@';

/// How recurrence rules in a line are treated.
#[derive(Debug, Clone, Copy)]
pub enum RuleHandling {
    /// Expand rules into occurrences up to the horizon.
    Expand { horizon: NaiveDateTime },
    /// Read every line as a single deadline.
    Literal,
}

/// Parse one line into the deadlines it describes.
///
/// Comments and blank lines yield nothing. A line without a readable date yields a
/// single deadline at `now` carrying the whole line as its info.
pub fn parse_line(line: &str, now: NaiveDateTime, rules: RuleHandling) -> Vec<Deadline> {
    if line.trim().is_empty() || COMMENT_PREFIXES.iter().any(|p| line.starts_with(p)) {
        return Vec::new();
    }

    let Some((date, info)) = split_date(line, now.year()) else {
        debug!("No date in line, keeping it as due now: {line}");
        return vec![Deadline::new(now, line)];
    };

    if let RuleHandling::Expand { horizon } = rules {
        if let Some(rule) = RecurrenceRule::parse(date, info) {
            return rule.expand(now, horizon);
        }
    }

    vec![single(date, info)]
}

/// Format a deadline as a storage line.
pub fn format_line(deadline: &Deadline) -> String {
    let date = deadline.when.format(DATE_FORMAT);
    match time_block(deadline) {
        Some(block) if !deadline.info.starts_with(char::is_whitespace) => {
            format!("{date}{block} {}", deadline.info)
        }
        Some(block) => format!("{date}{block}{}", deadline.info),
        None => format!("{date}{}", deadline.info),
    }
}

/// Format a deadline coming from the remote side. The text is written as is; the
/// time of timed entries goes into the time block.
pub fn format_remote_line(deadline: &Deadline) -> String {
    let block = time_block(deadline).unwrap_or_default();
    format!(
        "{}{block} {}",
        deadline.when.format(DATE_FORMAT),
        deadline.info.trim()
    )
}

/// `@HH:MM[-HH:MM]` for timed deadlines whose info doesn't already say when they
/// start, or that have an end time.
fn time_block(deadline: &Deadline) -> Option<String> {
    if deadline.whole_day {
        return None;
    }
    let end = deadline
        .end_time
        .filter(|end| *end > deadline.when && *end - deadline.when < Duration::days(1));
    if end.is_none() && time_of_day(&deadline.info) == Some(deadline.when.time()) {
        return None;
    }

    let mut block = format!("{TIME_BLOCK_PREFIX}{}", deadline.when.format(TIME_FORMAT));
    if let Some(end) = end {
        block.push('-');
        block.push_str(&end.format(TIME_FORMAT).to_string());
    }
    Some(block)
}

/// Split a leading time block off `info`. An end at or before the start is on the
/// following day.
fn split_time_block(info: &str) -> Option<(NaiveTime, Option<NaiveTime>, &str)> {
    let rest = info.strip_prefix(TIME_BLOCK_PREFIX)?;
    let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let (block, rest) = rest.split_at(len);

    let (start, end) = match block.split_once('-') {
        Some((start, end)) => (start, Some(end)),
        None => (block, None),
    };
    let start = NaiveTime::parse_from_str(start, TIME_FORMAT).ok()?;
    let end = match end {
        Some(end) => Some(NaiveTime::parse_from_str(end, TIME_FORMAT).ok()?),
        None => None,
    };
    Some((start, end, rest))
}

fn single(date: NaiveDate, info: &str) -> Deadline {
    if let Some((start, end, text)) = split_time_block(info) {
        let when = date.and_time(start);
        let end_time = end.map(|end| {
            let end = date.and_time(end);
            if end <= when {
                end + Duration::days(1)
            } else {
                end
            }
        });
        return Deadline {
            end_time,
            ..Deadline::new(when, text)
        };
    }

    match time_of_day(info) {
        Some(time) => Deadline::new(date.and_time(time), info),
        None => Deadline::whole_day(date, info),
    }
}

/// Split off the leading date. `?` reads as `0` and a year of `0000` means last year.
fn split_date(line: &str, current_year: i32) -> Option<(NaiveDate, &str)> {
    let head = line.get(..DATE_LEN)?;
    let info = &line[DATE_LEN..];

    let head = head.replace('?', "0");
    let mut parts = head.split('.');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || day.len() != 2 || month.len() != 2 || year.len() != 4 {
        return None;
    }

    let day: u32 = day.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let year: i32 = match year {
        "0000" => current_year - 1,
        y => y.parse().ok()?,
    };

    lenient_date(year, month, day).map(|date| (date, info))
}

/// Build a date the way a lenient calendar does: a day or month of zero rolls back
/// into the previous month or year, overflowing values roll forward.
fn lenient_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if month > 12 || day > 31 {
        return None;
    }
    let first = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let month_start = match month {
        0 => first.checked_sub_months(Months::new(1))?,
        m => first.checked_add_months(Months::new(m - 1))?,
    };
    match day {
        0 => month_start.checked_sub_days(Days::new(1)),
        d => month_start.checked_add_days(Days::new(u64::from(d - 1))),
    }
}
