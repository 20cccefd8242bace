//! Scheduling domain rules: conferencing provider detection and
//! schedule-time parsing.
//!
//! The calendar service wants the provider spelled exactly as it documents
//! it ("Zoom Meeting", not "Zoom"), and schedule times arrive as local IST
//! wall-clock strings.

use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use thiserror::Error;

/// Wall-clock input format for meeting start times.
const START_TIME_FORMAT: &str = "%Y-%m-%d %I:%M %p";
const DATE_FORMAT: &str = "%Y-%m-%d";

const IST_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;

#[derive(Debug, Clone, Error)]
pub enum ScheduleError {
    #[error("Meeting URL is required")]
    MissingMeetingLink,

    #[error(
        "Invalid Zoom meeting link. Use a standard join link (https://zoom.us/j/...) \
         instead of personal room or web client links."
    )]
    InvalidZoomLink,

    #[error("Invalid date/time '{0}'. Use the format 'YYYY-MM-DD HH:MM AM/PM'.")]
    InvalidDateTime(String),

    #[error("Invalid date '{0}'. Use the format 'YYYY-MM-DD'.")]
    InvalidDate(String),
}

/// Conferencing providers the calendar service recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConferencingProvider {
    GoogleMeet,
    ZoomMeeting,
    MicrosoftTeams,
    SkypeForBusiness,
    SkypeForConsumer,
}

impl ConferencingProvider {
    /// Exact provider name the calendar API expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GoogleMeet => "Google Meet",
            Self::ZoomMeeting => "Zoom Meeting",
            Self::MicrosoftTeams => "Microsoft Teams",
            Self::SkypeForBusiness => "Skype for Business",
            Self::SkypeForConsumer => "Skype for Consumer",
        }
    }

    /// Zoom bots are deployed by direct invitation rather than through the
    /// calendar event.
    pub fn deploys_by_invite(&self) -> bool {
        matches!(self, Self::ZoomMeeting)
    }
}

/// Detect the provider from a meeting URL. Unknown hosts fall back to
/// Google Meet, which the calendar service treats as a generic link.
pub fn detect_provider(meeting_link: &str) -> Result<ConferencingProvider, ScheduleError> {
    if meeting_link.trim().is_empty() {
        return Err(ScheduleError::MissingMeetingLink);
    }

    let url = meeting_link.to_lowercase();

    if url.contains("meet.google.com") {
        return Ok(ConferencingProvider::GoogleMeet);
    }

    if url.contains("zoom.us") {
        // Personal-room and web-client links cannot be joined by the bot.
        if url.contains("/wc/") || !url.contains("/j/") {
            return Err(ScheduleError::InvalidZoomLink);
        }
        return Ok(ConferencingProvider::ZoomMeeting);
    }

    if url.contains("teams.microsoft.com") || url.contains("teams.live.com") {
        return Ok(ConferencingProvider::MicrosoftTeams);
    }

    if url.contains("skype.com") {
        if url.contains("business") {
            return Ok(ConferencingProvider::SkypeForBusiness);
        }
        return Ok(ConferencingProvider::SkypeForConsumer);
    }

    Ok(ConferencingProvider::GoogleMeet)
}

fn ist() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECONDS).unwrap()
}

/// Scheduled meeting window in IST.
#[derive(Debug, Clone)]
pub struct ScheduledWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl ScheduledWindow {
    pub fn start_timestamp(&self) -> i64 {
        self.start.timestamp()
    }

    pub fn end_timestamp(&self) -> i64 {
        self.end.timestamp()
    }

    pub fn display_start(&self) -> String {
        format!("{} IST", self.start.format("%Y-%m-%d %I:%M %p"))
    }
}

/// Parse a `"YYYY-MM-DD HH:MM AM/PM"` IST start time. The calendar API
/// requires an end time when a notetaker is attached, so the window
/// defaults to one hour.
pub fn parse_meeting_start(start_time: &str) -> Result<ScheduledWindow, ScheduleError> {
    let naive = NaiveDateTime::parse_from_str(start_time.trim(), START_TIME_FORMAT)
        .map_err(|_| ScheduleError::InvalidDateTime(start_time.to_string()))?;

    let start = ist()
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| ScheduleError::InvalidDateTime(start_time.to_string()))?;

    Ok(ScheduledWindow {
        start,
        end: start + ChronoDuration::hours(1),
    })
}

/// Parse an inclusive IST date range for event listing. A missing end date
/// means the whole start day.
pub fn parse_date_range(
    start_date: &str,
    end_date: Option<&str>,
) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), ScheduleError> {
    let start_day = parse_date(start_date)?;
    let end_day = match end_date {
        Some(d) => parse_date(d)?,
        None => start_day,
    };

    let start = day_bound(start_day, 0, 0, 0, start_date)?;
    let end = day_bound(end_day, 23, 59, 59, end_date.unwrap_or(start_date))?;
    Ok((start, end))
}

/// Render a unix timestamp as IST wall-clock for responses.
pub fn format_timestamp(timestamp: i64) -> Option<String> {
    DateTime::from_timestamp(timestamp, 0)
        .map(|utc| format!("{} IST", utc.with_timezone(&ist()).format("%Y-%m-%d %I:%M %p")))
}

fn parse_date(date: &str) -> Result<NaiveDate, ScheduleError> {
    NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
        .map_err(|_| ScheduleError::InvalidDate(date.to_string()))
}

fn day_bound(
    day: NaiveDate,
    hour: u32,
    min: u32,
    sec: u32,
    raw: &str,
) -> Result<DateTime<FixedOffset>, ScheduleError> {
    day.and_hms_opt(hour, min, sec)
        .and_then(|naive| ist().from_local_datetime(&naive).single())
        .ok_or_else(|| ScheduleError::InvalidDate(raw.to_string()))
}
