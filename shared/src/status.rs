//! Occupancy classification of a day's events.

use chrono::{DateTime, Utc};

use crate::models::{CalendarEvent, StatusResponse};

/// Build the status body for `events` as seen at `now`.
///
/// Events are scanned in the order given; the first in-progress event is
/// current and the first not-yet-started event is next.
pub fn build_status(
    room_email: &str,
    now: DateTime<Utc>,
    events: &[CalendarEvent],
) -> StatusResponse {
    let current_event = events.iter().find(|e| e.is_in_progress(now)).cloned();
    let next_event = events.iter().find(|e| e.is_upcoming(now)).cloned();

    StatusResponse {
        success: true,
        room_email: room_email.to_string(),
        current_time: now,
        is_occupied: current_event.is_some(),
        current_event,
        next_event,
        today_event_count: events.len(),
    }
}
