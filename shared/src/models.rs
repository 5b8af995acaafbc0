//! Shared data models.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Calendar event normalized for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub subject: String,
    pub organizer: String,
    #[serde(serialize_with = "serialize_instant")]
    pub start_time: DateTime<Utc>,
    #[serde(serialize_with = "serialize_instant")]
    pub end_time: DateTime<Utc>,
    /// e.g. "9:00 AM - 9:30 AM" in the room's timezone
    pub time_range: String,
}

impl CalendarEvent {
    /// True when `now` falls in `[start, end)`.
    pub fn is_in_progress(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now < self.end_time
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.start_time > now
    }
}

/// Body of a successful status request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    pub room_email: String,
    #[serde(serialize_with = "serialize_instant")]
    pub current_time: DateTime<Utc>,
    pub is_occupied: bool,
    pub current_event: Option<CalendarEvent>,
    pub next_event: Option<CalendarEvent>,
    pub today_event_count: usize,
}

/// Body of a failed status request.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
        }
    }
}

/// Render an instant as UTC with millisecond precision, e.g. `2024-01-15T17:00:00.000Z`.
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_instant<S>(instant: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format_instant(instant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_serializes_camel_case() {
        let event = CalendarEvent {
            id: "AAMk1".to_string(),
            subject: "Standup".to_string(),
            organizer: "Ada Lovelace".to_string(),
            start_time: Utc.with_ymd_and_hms(2024, 1, 15, 17, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2024, 1, 15, 17, 30, 0).unwrap(),
            time_range: "9:00 AM - 9:30 AM".to_string(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["startTime"], "2024-01-15T17:00:00.000Z");
        assert_eq!(json["endTime"], "2024-01-15T17:30:00.000Z");
        assert_eq!(json["timeRange"], "9:00 AM - 9:30 AM");
        assert_eq!(json["organizer"], "Ada Lovelace");
    }

    #[test]
    fn test_in_progress_bounds() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 17, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 15, 17, 30, 0).unwrap();
        let event = CalendarEvent {
            id: "1".to_string(),
            subject: "Meeting".to_string(),
            organizer: "Unknown".to_string(),
            start_time: start,
            end_time: end,
            time_range: String::new(),
        };

        assert!(event.is_in_progress(start));
        assert!(!event.is_in_progress(end));
        assert!(!event.is_upcoming(start));
    }
}
