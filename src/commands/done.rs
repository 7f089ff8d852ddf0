use anyhow::{Result, bail};
use owo_colors::OwoColorize;

use super::{open_deadlines, open_storage};
use crate::config::Config;

/// Mark the deadlines at the given 1-based positions of `list` as done.
pub fn run(config: &Config, numbers: &[usize]) -> Result<()> {
    let storage = open_storage(config)?;
    let mut deadlines = open_deadlines(config, &storage, None)?;
    let count = deadlines.len();

    for &number in numbers {
        let Some(deadline) = number.checked_sub(1).and_then(|i| deadlines.get_mut(i)) else {
            bail!("No open deadline number {number} (there are {count})");
        };
        deadline.done = true;
    }

    storage.record_completions(&deadlines)?;

    for deadline in deadlines.iter().filter(|d| d.done) {
        println!("{} {}", "✓".green(), deadline);
    }

    Ok(())
}
