//! Colored terminal rendering for deadline-core types.

use chrono::NaiveDate;
use deadline_core::reconcile::{Mutation, MutationKind};
use deadline_core::{Deadline, SyncState};
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for MutationKind {
    fn render(&self) -> String {
        let symbol = self.to_string();
        match self {
            MutationKind::Insert => symbol.green().to_string(),
            MutationKind::Delete => symbol.red().to_string(),
        }
    }
}

impl Render for Mutation {
    fn render(&self) -> String {
        let summary = match self.kind {
            MutationKind::Insert => self.event.summary.green().to_string(),
            MutationKind::Delete => self.event.summary.red().to_string(),
        };
        format!(
            "{} {} {}",
            self.kind.render(),
            summary,
            self.event.start.to_string().dimmed()
        )
    }
}

impl Render for SyncState {
    fn render(&self) -> String {
        let last = match self.last_successful_sync {
            Some(at) => at
                .with_timezone(&chrono::Local)
                .format("%d.%m.%Y %H:%M")
                .to_string(),
            None => "never".dimmed().to_string(),
        };
        let failures = match self.consecutive_failures {
            0 => "0".green().to_string(),
            n => n.to_string().red().to_string(),
        };
        format!("Last successful sync: {last}\nConsecutive failures: {failures}")
    }
}

/// One numbered line of the deadline list. Overdue entries are red, today's yellow.
pub fn render_deadline(number: usize, deadline: &Deadline, today: NaiveDate) -> String {
    let line = deadline.to_string();
    let line = if deadline.is_overdue(today) {
        line.red().to_string()
    } else if deadline.when.date() == today {
        line.yellow().to_string()
    } else {
        line
    };
    format!("{:>4} {}", number.dimmed(), line)
}

pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}
