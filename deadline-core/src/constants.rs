//! Shared constants.

use std::time::Duration;

/// Prefix of a projected event whose occurrence already lies in the past.
pub const OVERDUE_MARKER: &str = "! ";

/// Private extended property holding the display text (without recurrence rule or overdue marker).
pub const TEXT_PROPERTY: &str = "TextWithoutRepeatingInfo";

/// Private extended property holding the raw info as authored.
pub const INFO_PROPERTY: &str = "DeadlineInfo";

/// Private extended property holding the original occurrence instant of an overdue projection.
pub const ORIGINAL_WHEN_PROPERTY: &str = "DeadlineWhen";

/// Date format of the line-oriented storage files.
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Date format used in the overdue suffix of a projected summary.
pub const SHORT_DATE_FORMAT: &str = "%d.%m.%y";

/// Time-of-day format embedded in deadline text.
pub const TIME_FORMAT: &str = "%H:%M";

/// Format of the original instant stored on overdue projections.
pub const ORIGINAL_WHEN_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Deadlines further away than this are not projected to the remote calendar.
pub const MAX_PROJECTION_DAYS: i64 = 2 * 365;

/// Number of days of open deadlines a sync pass looks ahead by default.
pub const DEFAULT_HORIZON_DAYS: i64 = 400;

/// Consecutive failed passes after which the cached credential is dropped.
pub const CREDENTIAL_FAILURE_THRESHOLD: u32 = 10;

/// Delay between two mutating remote calls.
pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

/// Upper bound for a single remote call before it counts as a transient failure.
pub const REMOTE_TIMEOUT: Duration = Duration::from_secs(60);
