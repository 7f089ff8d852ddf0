//! Google Calendar remote store for deadline-reminder.
//!
//! Talks to the Calendar v3 REST API directly and keeps the OAuth access token fresh
//! from a stored refresh token.

pub mod calendar;
pub mod convert;
mod error;
pub mod session;
pub mod types;

pub use calendar::{Auth, DEFAULT_BASE_URL, GoogleCalendar};
pub use session::{GoogleCredentials, Session, SessionData};
