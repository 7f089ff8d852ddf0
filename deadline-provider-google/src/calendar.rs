//! Google Calendar as a [`RemoteStore`].

use std::time::Duration;

use deadline_core::error::{DeadlineError, DeadlineResult};
use deadline_core::event::{EventPage, RemoteEvent};
use deadline_core::remote::{CalendarRef, RemoteStore};
use log::{debug, warn};
use reqwest::{RequestBuilder, Response, StatusCode};
use url::Url;

use crate::convert::{FromGoogle, ToGoogle};
use crate::error::{check, from_transport};
use crate::session::Session;
use crate::types::{CalendarList, EventList, GoogleEvent};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

const PAGE_SIZE: &str = "250";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where access tokens come from.
pub enum Auth {
    /// A fixed bearer token.
    Static(String),
    /// Refreshable OAuth session.
    Session(Session),
}

impl Auth {
    async fn token(&self, http: &reqwest::Client) -> DeadlineResult<String> {
        match self {
            Auth::Static(token) => Ok(token.clone()),
            Auth::Session(session) => session.access_token(http).await,
        }
    }
}

pub struct GoogleCalendar {
    http: reqwest::Client,
    base_url: Url,
    auth: Auth,
}

impl GoogleCalendar {
    pub fn new(auth: Auth) -> DeadlineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DeadlineError::Config(format!("Failed to build HTTP client: {e}")))?;
        let base_url = parse_base_url(DEFAULT_BASE_URL)?;
        Ok(GoogleCalendar {
            http,
            base_url,
            auth,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> DeadlineResult<Self> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    fn url(&self, segments: &[&str]) -> DeadlineResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DeadlineError::Config(format!("Invalid base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn authorized(&self, request: RequestBuilder) -> DeadlineResult<Response> {
        let token = self.auth.token(&self.http).await?;
        request
            .bearer_auth(token)
            .send()
            .await
            .map_err(from_transport)
    }

    async fn send(&self, request: RequestBuilder) -> DeadlineResult<Response> {
        check(self.authorized(request).await?).await
    }
}

fn parse_base_url(base_url: &str) -> DeadlineResult<Url> {
    Url::parse(base_url).map_err(|e| DeadlineError::Config(format!("Invalid base URL {base_url}: {e}")))
}

impl RemoteStore for GoogleCalendar {
    /// Walks the calendar list in the order Google returns it and stops at the first
    /// name with the prefix. With several matching calendars, which one is used
    /// depends on that order, so keep the prefix unique.
    async fn find_calendar(&self, prefix: &str) -> DeadlineResult<Option<CalendarRef>> {
        let url = self.url(&["users", "me", "calendarList"])?;
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http.get(url.clone());
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let list: CalendarList = self
                .send(request)
                .await?
                .json()
                .await
                .map_err(from_transport)?;

            if let Some(entry) = list
                .items
                .iter()
                .find(|entry| entry.display_name().starts_with(prefix))
            {
                return Ok(Some(CalendarRef {
                    id: entry.id.clone(),
                    name: entry.display_name().to_string(),
                }));
            }

            match list.next_page_token {
                Some(token) => page_token = Some(token),
                None => return Ok(None),
            }
        }
    }

    async fn list_events(
        &self,
        calendar: &CalendarRef,
        page_token: Option<&str>,
    ) -> DeadlineResult<EventPage> {
        let url = self.url(&["calendars", &calendar.id, "events"])?;
        let mut request = self.http.get(url).query(&[("maxResults", PAGE_SIZE)]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let list: EventList = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(from_transport)?;
        debug!("Fetched {} events from {}", list.items.len(), calendar.name);

        let events = list
            .items
            .into_iter()
            .filter_map(|event| {
                let id = event.id.clone();
                RemoteEvent::from_google(event)
                    .inspect_err(|e| warn!("Skipping event {}: {e}", id.unwrap_or_default()))
                    .ok()
            })
            .collect();

        Ok(EventPage {
            events,
            next_page_token: list.next_page_token,
        })
    }

    async fn insert_event(
        &self,
        calendar: &CalendarRef,
        event: &RemoteEvent,
    ) -> DeadlineResult<RemoteEvent> {
        let url = self.url(&["calendars", &calendar.id, "events"])?;
        let request = self.http.post(url).json(&event.to_google());

        let created: GoogleEvent = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(from_transport)?;
        RemoteEvent::from_google(created)
    }

    async fn delete_event(&self, calendar: &CalendarRef, event_id: &str) -> DeadlineResult<()> {
        let url = self.url(&["calendars", &calendar.id, "events", event_id])?;
        let response = self.authorized(self.http.delete(url)).await?;

        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            debug!("Event {event_id} was already deleted");
            return Ok(());
        }
        check(response).await?;
        Ok(())
    }

    async fn invalidate_credentials(&self) -> DeadlineResult<()> {
        match &self.auth {
            Auth::Static(_) => Ok(()),
            Auth::Session(session) => session.invalidate().await,
        }
    }
}
