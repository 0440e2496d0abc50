//! Google Calendar v3 REST backend.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | create | `POST   {base}/calendars/{calendar_id}/events` |
//! | list   | `GET    {base}/calendars/{calendar_id}/events?timeMin&timeMax&singleEvents=true&orderBy=startTime` |
//! | delete | `DELETE {base}/calendars/{calendar_id}/events/{id}` |
//!
//! Event times are sent with `timeZone: "UTC"`. Listings follow
//! `nextPageToken` up to [`MAX_PAGES`] pages.

use std::time::Duration;

use async_trait::async_trait;
use calagent_application::ports::calendar_backend::{BackendError, CalendarBackend};
use calagent_domain::{CalendarEvent, NewEvent, TimeRange, parse_datetime};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::credential::CalendarCredential;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
const MAX_RESULTS: &str = "2500";
pub const MAX_PAGES: usize = 20;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

#[derive(Debug, Serialize)]
struct EventBody<'a> {
    summary: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    start: EventTime,
    end: EventTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    #[serde(default)]
    date_time: Option<String>,
    /// All-day events carry a date only
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    start: ApiEventTime,
    end: ApiEventTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventList {
    #[serde(default)]
    items: Vec<ApiEvent>,
    #[serde(default)]
    next_page_token: Option<String>,
}

fn utc_time(at: DateTime<Utc>) -> EventTime {
    EventTime {
        date_time: Some(at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        time_zone: Some("UTC".to_string()),
    }
}

fn parse_event_time(time: &ApiEventTime) -> Option<DateTime<Utc>> {
    if let Some(dt) = time.date_time.as_deref() {
        return parse_datetime(dt);
    }
    time.date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn into_event(api: ApiEvent) -> Result<CalendarEvent, BackendError> {
    let start = parse_event_time(&api.start)
        .ok_or_else(|| BackendError::Rejected(format!("event {} has no start time", api.id)))?;
    let end = parse_event_time(&api.end)
        .ok_or_else(|| BackendError::Rejected(format!("event {} has no end time", api.id)))?;
    Ok(CalendarEvent {
        id: api.id,
        summary: api.summary.unwrap_or_default(),
        description: api.description.unwrap_or_default(),
        start,
        end,
    })
}

fn status_error(status: StatusCode, body: String, id: Option<&str>) -> BackendError {
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => {
            BackendError::NotFound(id.unwrap_or("calendar").to_string())
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            BackendError::Unauthorized(format!("{}: {}", status, body))
        }
        _ => BackendError::Rejected(format!("{}: {}", status, body)),
    }
}

fn transport_error(err: reqwest::Error) -> BackendError {
    BackendError::Transport(err.to_string())
}

/// Calendar backend talking to the Google Calendar REST API.
#[derive(Debug)]
pub struct GoogleCalendarBackend {
    client: reqwest::Client,
    base_url: Url,
    calendar_id: String,
    credential: CalendarCredential,
}

impl GoogleCalendarBackend {
    pub fn new(
        credential: CalendarCredential,
        calendar_id: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, BackendError> {
        Self::with_base_url(DEFAULT_BASE_URL, credential, calendar_id, request_timeout)
    }

    pub fn with_base_url(
        base_url: &str,
        credential: CalendarCredential,
        calendar_id: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, BackendError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| BackendError::Transport(format!("invalid base URL {}: {}", base_url, e)))?;
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("calendar-agent/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(transport_error)?;
        Ok(Self {
            client,
            base_url,
            calendar_id: calendar_id.into(),
            credential,
        })
    }

    fn events_url(&self, event_id: Option<&str>) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| BackendError::Transport("base URL cannot have a path".into()))?;
            segments.pop_if_empty();
            segments.extend(["calendars", self.calendar_id.as_str(), "events"]);
            if let Some(id) = event_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn check(
        response: reqwest::Response,
        id: Option<&str>,
    ) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!(status = %status, "Calendar API request failed");
        Err(status_error(status, body, id))
    }
}

#[async_trait]
impl CalendarBackend for GoogleCalendarBackend {
    async fn create_event(&self, event: NewEvent) -> Result<CalendarEvent, BackendError> {
        let body = EventBody {
            summary: &event.summary,
            description: event.description.as_deref(),
            start: utc_time(event.start),
            end: utc_time(event.end),
        };
        let response = self
            .client
            .post(self.events_url(None)?)
            .bearer_auth(self.credential.bearer())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let created: ApiEvent = Self::check(response, None)
            .await?
            .json()
            .await
            .map_err(transport_error)?;
        debug!(id = %created.id, "Calendar event created");
        into_event(created)
    }

    async fn list_events(&self, range: TimeRange) -> Result<Vec<CalendarEvent>, BackendError> {
        let time_min = range.start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let time_max = range.end.to_rfc3339_opts(SecondsFormat::Secs, true);
        let url = self.events_url(None)?;

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        for page in 1..=MAX_PAGES {
            let mut request = self
                .client
                .get(url.clone())
                .bearer_auth(self.credential.bearer())
                .query(&[
                    ("timeMin", time_min.as_str()),
                    ("timeMax", time_max.as_str()),
                    ("singleEvents", "true"),
                    ("orderBy", "startTime"),
                    ("maxResults", MAX_RESULTS),
                ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let response = request.send().await.map_err(transport_error)?;
            let list: ApiEventList = Self::check(response, None)
                .await?
                .json()
                .await
                .map_err(transport_error)?;

            for item in list.items {
                events.push(into_event(item)?);
            }
            match list.next_page_token {
                Some(token) if page < MAX_PAGES => {
                    debug!(page, "Fetching next page of events");
                    page_token = Some(token);
                }
                Some(_) => {
                    warn!(
                        pages = MAX_PAGES,
                        events = events.len(),
                        "Event listing truncated at page limit"
                    );
                }
                None => break,
            }
        }

        events.sort_by(|a, b| a.start.cmp(&b.start));
        Ok(events)
    }

    async fn delete_event(&self, id: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .delete(self.events_url(Some(id))?)
            .bearer_auth(self.credential.bearer())
            .send()
            .await
            .map_err(transport_error)?;
        Self::check(response, Some(id)).await?;
        debug!(id = %id, "Calendar event deleted");
        Ok(())
    }
}
