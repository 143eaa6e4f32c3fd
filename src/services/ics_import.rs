//! ICS calendar import.
//!
//! Maps VEVENTs onto appointments: SUMMARY becomes the name, DESCRIPTION the
//! details, DTSTART/DTEND the window. Date-only values land on midnight UTC;
//! a missing DTEND defaults to one hour after the start. Events without a
//! parseable DTSTART, or with a non-positive span, are skipped and counted.
//! Re-imports deduplicate on (elder_id, UID).

use chrono::{DateTime, Duration, NaiveTime, Utc};
use icalendar::{
    parser::{read_calendar, unfold, Component},
    CalendarDateTime, DatePerhapsTime,
};
use serde::Serialize;
use sqlx::PgPool;
use std::time::Duration as StdDuration;
use thiserror::Error;
use uuid::Uuid;

use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::sanitize::{sanitize_rich_text, sanitize_text, truncate_chars};
use crate::schema::{APPOINTMENT_DETAILS_MAX_CHARS, APPOINTMENT_NAME_MAX_CHARS, LOCATION_MAX_CHARS};

const FETCH_TIMEOUT_SECS: u64 = 15;
const UNTITLED: &str = "(No title)";

#[derive(Debug, Error)]
pub enum IcsError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("unsupported URL: {0}")]
    UnsupportedUrl(String),

    #[error("fetch failed: {0}")]
    Fetch(String),
}

/// Outcome of one import run. `skipped` counts unparseable events and
/// duplicates of already-imported UIDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// A VEVENT reduced to the fields an appointment stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEvent {
    pub uid: Option<String>,
    pub name: String,
    pub details: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

pub struct IcsImportService {
    pool: PgPool,
    http: reqwest::Client,
}

impl IcsImportService {
    pub async fn new() -> Result<Self, ApiError> {
        let pool = DatabaseManager::pool().await?;
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                ApiError::internal_server_error("Calendar import is unavailable")
            })?;
        Ok(Self { pool, http })
    }

    /// Import from ICS text supplied in the request body.
    pub async fn import_text(
        &self,
        elder_id: Uuid,
        created_by: Uuid,
        ics_text: &str,
    ) -> Result<ImportSummary, ApiError> {
        let (events, unparseable) = parse_events(ics_text)?;
        let mut summary = self.insert_events(elder_id, created_by, &events).await?;
        summary.skipped += unparseable;
        Ok(summary)
    }

    /// Fetch a remote calendar and import it. `webcal://` is rewritten to
    /// `https://`; anything but http(s) is refused before any I/O.
    pub async fn import_url(
        &self,
        elder_id: Uuid,
        created_by: Uuid,
        url: &str,
    ) -> Result<ImportSummary, ApiError> {
        let url = normalize_url(url)?;

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| IcsError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IcsError::Fetch(format!("unexpected status {}", response.status())).into());
        }

        let text = response
            .text()
            .await
            .map_err(|e| IcsError::Fetch(e.to_string()))?;

        self.import_text(elder_id, created_by, &text).await
    }

    async fn insert_events(
        &self,
        elder_id: Uuid,
        created_by: Uuid,
        events: &[ParsedEvent],
    ) -> Result<ImportSummary, ApiError> {
        let mut imported = 0;
        let mut skipped = 0;

        for event in events {
            let name = sanitize_text(&event.name, APPOINTMENT_NAME_MAX_CHARS);
            let name = if name.is_empty() {
                UNTITLED.to_string()
            } else {
                name
            };
            let details = event
                .details
                .as_deref()
                .map(sanitize_rich_text)
                .map(|d| truncate_chars(&d, APPOINTMENT_DETAILS_MAX_CHARS))
                .filter(|d| !d.is_empty());
            let location = event
                .location
                .as_deref()
                .map(|l| sanitize_text(l, LOCATION_MAX_CHARS))
                .filter(|l| !l.is_empty());

            let result = sqlx::query(
                "INSERT INTO appointments
                    (elder_id, name, details, location, starts_at, ends_at, created_by, ics_uid)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 ON CONFLICT (elder_id, ics_uid) WHERE ics_uid IS NOT NULL DO NOTHING",
            )
            .bind(elder_id)
            .bind(&name)
            .bind(&details)
            .bind(&location)
            .bind(event.starts_at)
            .bind(event.ends_at)
            .bind(created_by)
            .bind(&event.uid)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 1 {
                imported += 1;
            } else {
                skipped += 1;
            }
        }

        tracing::info!(%elder_id, imported, skipped, "calendar import finished");
        Ok(ImportSummary { imported, skipped })
    }
}

/// Parse ICS text into events. Returns the mapped events and how many VEVENTs
/// had to be dropped.
pub fn parse_events(ics_text: &str) -> Result<(Vec<ParsedEvent>, usize), IcsError> {
    let unfolded = unfold(ics_text);
    let calendar = read_calendar(&unfolded).map_err(|e| IcsError::Parse(e.to_string()))?;

    let mut events = Vec::new();
    let mut dropped = 0;
    for component in calendar.components.iter().filter(|c| c.name == "VEVENT") {
        match map_event(component) {
            Some(event) => events.push(event),
            None => dropped += 1,
        }
    }
    Ok((events, dropped))
}

fn map_event(vevent: &Component) -> Option<ParsedEvent> {
    let starts_at = to_utc(DatePerhapsTime::try_from(vevent.find_prop("DTSTART")?).ok()?);
    let ends_at = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_utc)
        .unwrap_or_else(|| starts_at + Duration::hours(1));

    if ends_at <= starts_at {
        return None;
    }

    let uid = vevent.find_prop("UID").map(|p| p.val.to_string());
    let name = vevent
        .find_prop("SUMMARY")
        .map(|p| p.val.to_string())
        .unwrap_or_else(|| UNTITLED.to_string());
    let details = vevent.find_prop("DESCRIPTION").map(|p| p.val.to_string());
    let location = vevent.find_prop("LOCATION").map(|p| p.val.to_string());

    Some(ParsedEvent {
        uid,
        name,
        details,
        location,
        starts_at,
        ends_at,
    })
}

/// Flatten the calendar's date forms to UTC instants. Floating and TZID-local
/// times are taken as UTC; the importer carries no timezone database.
fn to_utc(value: DatePerhapsTime) -> DateTime<Utc> {
    match value {
        DatePerhapsTime::Date(date) => date.and_time(NaiveTime::MIN).and_utc(),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => dt,
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => naive.and_utc(),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, .. }) => {
            date_time.and_utc()
        }
    }
}

fn normalize_url(raw: &str) -> Result<String, IcsError> {
    let trimmed = raw.trim();
    let url = if trimmed.to_ascii_lowercase().starts_with("webcal://") {
        format!("https://{}", &trimmed["webcal://".len()..])
    } else {
        trimmed.to_string()
    };

    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Ok(url)
    } else {
        Err(IcsError::UnsupportedUrl(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const CALENDAR: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VEVENT\r\n\
UID:visit-1@clinic\r\n\
SUMMARY:GP checkup\r\n\
DESCRIPTION:Bring the medication list\r\n\
LOCATION:Clinic room 4\r\n\
DTSTART:20260301T100000Z\r\n\
DTEND:20260301T104500Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:allday-1@clinic\r\n\
SUMMARY:Respite day\r\n\
DTSTART;VALUE=DATE:20260305\r\n\
DTEND;VALUE=DATE:20260306\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:broken-1@clinic\r\n\
SUMMARY:No start\r\n\
END:VEVENT\r\n\
END:VCALENDAR";

    #[test]
    fn test_parse_maps_timed_event() {
        let (events, dropped) = parse_events(CALENDAR).unwrap();
        assert_eq!(dropped, 1);

        let event = &events[0];
        assert_eq!(event.uid.as_deref(), Some("visit-1@clinic"));
        assert_eq!(event.name, "GP checkup");
        assert_eq!(event.details.as_deref(), Some("Bring the medication list"));
        assert_eq!(event.location.as_deref(), Some("Clinic room 4"));
        assert_eq!(
            event.starts_at,
            Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(
            event.ends_at,
            Utc.with_ymd_and_hms(2026, 3, 1, 10, 45, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_coerces_date_only_to_midnight_span() {
        let (events, _) = parse_events(CALENDAR).unwrap();
        let all_day = events.iter().find(|e| e.name == "Respite day").unwrap();

        assert_eq!(
            all_day.starts_at,
            Utc.with_ymd_and_hms(2026, 3, 5, 0, 0, 0).unwrap()
        );
        assert_eq!(
            all_day.ends_at,
            Utc.with_ymd_and_hms(2026, 3, 6, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_missing_dtend_defaults_to_one_hour() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:open-ended@x\r\n\
SUMMARY:Walk\r\n\
DTSTART:20260310T140000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR";

        let (events, dropped) = parse_events(ics).unwrap();
        assert_eq!(dropped, 0);
        assert_eq!(events[0].ends_at - events[0].starts_at, Duration::hours(1));
    }

    #[test]
    fn test_missing_summary_gets_placeholder() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:untitled@x\r\n\
DTSTART:20260310T140000Z\r\n\
DTEND:20260310T150000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR";

        let (events, _) = parse_events(ics).unwrap();
        assert_eq!(events[0].name, UNTITLED);
    }

    #[test]
    fn test_negative_span_is_dropped() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:backwards@x\r\n\
SUMMARY:Backwards\r\n\
DTSTART:20260310T150000Z\r\n\
DTEND:20260310T140000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR";

        let (events, dropped) = parse_events(ics).unwrap();
        assert!(events.is_empty());
        assert_eq!(dropped, 1);
    }

    #[test]
    fn test_no_events_is_ok() {
        let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR";
        let (events, dropped) = parse_events(ics).unwrap();
        assert!(events.is_empty());
        assert_eq!(dropped, 0);
    }

    #[test]
    fn test_normalize_url_schemes() {
        assert_eq!(
            normalize_url("webcal://cal.example.com/feed.ics").unwrap(),
            "https://cal.example.com/feed.ics"
        );
        assert_eq!(
            normalize_url(" https://cal.example.com/feed.ics ").unwrap(),
            "https://cal.example.com/feed.ics"
        );
        assert!(normalize_url("ftp://cal.example.com/feed.ics").is_err());
        assert!(normalize_url("file:///etc/passwd").is_err());
    }
}
