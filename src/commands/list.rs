use anyhow::Result;
use chrono::Local;
use owo_colors::OwoColorize;

use super::{open_deadlines, open_storage};
use crate::config::Config;
use crate::render::{pluralize, render_deadline};

pub fn run(config: &Config, days: Option<i64>) -> Result<()> {
    let storage = open_storage(config)?;
    let deadlines = open_deadlines(config, &storage, days)?;
    let today = Local::now().date_naive();

    if deadlines.is_empty() {
        println!("{}", "No open deadlines".dimmed());
        return Ok(());
    }

    for (i, deadline) in deadlines.iter().enumerate() {
        println!("{}", render_deadline(i + 1, deadline, today));
    }

    let overdue = deadlines.iter().filter(|d| d.is_overdue(today)).count();
    if overdue > 0 {
        println!();
        println!(
            "{}",
            format!("{overdue} overdue {}", pluralize("deadline", overdue)).red()
        );
    }

    Ok(())
}
