//! Microsoft Graph calendar access for the room mailbox.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{debug, info};

use crate::auth::TokenProvider;
use crate::models::{format_instant, CalendarEvent};
use crate::{Config, Error, Result};

/// Page size requested from calendarView. Later events are not fetched.
pub const MAX_EVENTS: u32 = 50;

const DEFAULT_SUBJECT: &str = "Meeting";
const DEFAULT_ORGANIZER: &str = "Unknown";

/// calendarView response
#[derive(Debug, Deserialize)]
struct CalendarViewResponse {
    #[serde(default)]
    value: Vec<GraphEvent>,
}

/// Event as returned by Graph
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphEvent {
    id: String,
    subject: Option<String>,
    organizer: Option<GraphRecipient>,
    start: GraphDateTime,
    end: GraphDateTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphRecipient {
    email_address: Option<GraphEmailAddress>,
}

#[derive(Debug, Deserialize)]
struct GraphEmailAddress {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDateTime {
    date_time: String,
    time_zone: Option<String>,
}

/// Reads the room's calendar on behalf of the app identity.
pub struct GraphClient {
    http_client: reqwest::Client,
    base_url: String,
    room_email: String,
    timezone: Tz,
    tokens: TokenProvider,
}

impl GraphClient {
    pub fn new(http_client: reqwest::Client, config: &Config, tokens: TokenProvider) -> Self {
        Self {
            http_client,
            base_url: config.graph_base_url.clone(),
            room_email: config.room_email.clone(),
            timezone: config.timezone,
            tokens,
        }
    }

    pub fn room_email(&self) -> &str {
        &self.room_email
    }

    /// Events of the current day, where "day" is taken from the server's
    /// local timezone rather than the room's display timezone.
    pub async fn today_events(&self, now: DateTime<Utc>) -> Result<Vec<CalendarEvent>> {
        let (start, end) = day_window(now, &Local);
        self.events_between(start, end).await
    }

    /// Events overlapping `[start, end)`, in the order Graph returns them.
    pub async fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>> {
        let access_token = self.tokens.access_token().await?;

        let url = format!("{}/users/{}/calendarView", self.base_url, self.room_email);
        debug!(
            "Fetching calendarView for {} from {} to {}",
            self.room_email,
            format_instant(&start),
            format_instant(&end)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&access_token)
            .header(
                "Prefer",
                format!("outlook.timezone=\"{}\"", self.timezone.name()),
            )
            .query(&[
                ("startDateTime", format_instant(&start)),
                ("endDateTime", format_instant(&end)),
                ("$orderby", "start/dateTime".to_string()),
                ("$top", MAX_EVENTS.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Graph {
                status: status.as_u16(),
                message,
            });
        }

        let view: CalendarViewResponse = response.json().await?;

        let events = view
            .value
            .into_iter()
            .map(|raw| normalize_event(raw, self.timezone))
            .collect::<Result<Vec<_>>>()?;

        info!("Fetched {} events for {}", events.len(), self.room_email);

        Ok(events)
    }
}

/// Boundaries of the calendar day containing `now` in `zone`, as UTC instants.
pub fn day_window<Z: TimeZone>(now: DateTime<Utc>, zone: &Z) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.with_timezone(zone).date_naive();
    let tomorrow = today.succ_opt().unwrap_or(today);
    (local_midnight(zone, today), local_midnight(zone, tomorrow))
}

fn local_midnight<Z: TimeZone>(zone: &Z, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    zone.from_local_datetime(&midnight)
        .earliest()
        // Midnight skipped by a DST jump: the day starts an hour later.
        .or_else(|| zone.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Render `start - end` on a 12-hour clock in `zone`, e.g. `9:00 AM - 9:30 AM`.
pub fn format_time_range(start: &DateTime<Utc>, end: &DateTime<Utc>, zone: Tz) -> String {
    format!(
        "{} - {}",
        start.with_timezone(&zone).format("%-I:%M %p"),
        end.with_timezone(&zone).format("%-I:%M %p")
    )
}

fn normalize_event(raw: GraphEvent, zone: Tz) -> Result<CalendarEvent> {
    let start_time = parse_graph_time(&raw.start, zone)?;
    let end_time = parse_graph_time(&raw.end, zone)?;

    let subject = raw
        .subject
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
    let organizer = raw
        .organizer
        .and_then(|o| o.email_address)
        .and_then(|a| a.name)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_ORGANIZER.to_string());

    Ok(CalendarEvent {
        id: raw.id,
        subject,
        organizer,
        time_range: format_time_range(&start_time, &end_time, zone),
        start_time,
        end_time,
    })
}

/// Graph sends wall-clock `dateTime` plus a `timeZone` name; offsets are
/// honored when present.
fn parse_graph_time(time: &GraphDateTime, fallback: Tz) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(&time.date_time) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(&time.date_time, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| Error::InvalidEvent(format!("Invalid dateTime {}: {}", time.date_time, e)))?;

    let zone = time
        .time_zone
        .as_deref()
        .and_then(|name| name.parse::<Tz>().ok())
        .unwrap_or(fallback);

    zone.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            Error::InvalidEvent(format!("Nonexistent local time {} in {}", naive, zone.name()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenCache;
    use crate::clock::FixedClock;
    use chrono::FixedOffset;
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> Config {
        let uri = server.uri();
        Config::from_lookup(move |key| match key {
            "TENANT_ID" => Some("tenant-1".to_string()),
            "CLIENT_ID" => Some("client-1".to_string()),
            "CLIENT_SECRET" => Some("s3cret".to_string()),
            "ROOM_EMAIL" => Some("boardroom@example.com".to_string()),
            "ROOM_TIMEZONE" => Some("America/Los_Angeles".to_string()),
            "AUTHORITY_HOST" => Some(uri.clone()),
            "GRAPH_BASE_URL" => Some(format!("{}/v1.0", uri)),
            _ => None,
        })
        .unwrap()
    }

    fn test_client(server: &MockServer) -> GraphClient {
        let config = test_config(server);
        let http = reqwest::Client::new();
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 15, 17, 0, 0).unwrap(),
        ));
        let tokens = TokenProvider::new(http.clone(), &config, Arc::new(TokenCache::new()), clock);
        GraphClient::new(http, &config, tokens)
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-1",
                "expires_in": 3599,
            })))
            .mount(server)
            .await;
    }

    fn pst(h: u32, m: u32) -> DateTime<Utc> {
        chrono_tz::America::Los_Angeles
            .with_ymd_and_hms(2024, 1, 15, h, m, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_day_window_in_zone() {
        let zone = FixedOffset::west_opt(8 * 3600).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 17, 15, 0).unwrap();
        let (start, end) = day_window(now, &zone);
        assert_eq!(format_instant(&start), "2024-01-15T08:00:00.000Z");
        assert_eq!(format_instant(&end), "2024-01-16T08:00:00.000Z");
    }

    #[test]
    fn test_day_window_follows_server_zone_not_room_zone() {
        // 23:30 in Los Angeles is already the next day in UTC. A server
        // running in UTC asks for the wrong day for a Los Angeles room.
        let now = pst(23, 30);
        let (utc_start, _) = day_window(now, &Utc);
        let (room_start, _) = day_window(now, &chrono_tz::America::Los_Angeles);
        assert_eq!(format_instant(&utc_start), "2024-01-16T00:00:00.000Z");
        assert_eq!(format_instant(&room_start), "2024-01-15T08:00:00.000Z");
        assert_ne!(utc_start, room_start);
    }

    #[test]
    fn test_day_window_across_dst_start() {
        let zone = chrono_tz::America::Los_Angeles;
        let now = zone
            .with_ymd_and_hms(2024, 3, 10, 12, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let (start, end) = day_window(now, &zone);
        assert_eq!(end - start, Duration::hours(23));
    }

    #[test]
    fn test_format_time_range() {
        let range = format_time_range(&pst(9, 0), &pst(13, 30), chrono_tz::America::Los_Angeles);
        assert_eq!(range, "9:00 AM - 1:30 PM");
    }

    #[test]
    fn test_normalize_defaults() {
        let raw: GraphEvent = serde_json::from_value(serde_json::json!({
            "id": "AAMk1",
            "subject": "",
            "start": { "dateTime": "2024-01-15T09:00:00.0000000", "timeZone": "America/Los_Angeles" },
            "end": { "dateTime": "2024-01-15T09:30:00.0000000", "timeZone": "America/Los_Angeles" }
        }))
        .unwrap();

        let event = normalize_event(raw, chrono_tz::America::Los_Angeles).unwrap();
        assert_eq!(event.subject, "Meeting");
        assert_eq!(event.organizer, "Unknown");
        assert_eq!(event.start_time, pst(9, 0));
        assert_eq!(event.time_range, "9:00 AM - 9:30 AM");
    }

    #[test]
    fn test_parse_graph_time_variants() {
        let zone = chrono_tz::America::Los_Angeles;

        let utc = GraphDateTime {
            date_time: "2024-01-15T17:00:00.0000000".to_string(),
            time_zone: Some("UTC".to_string()),
        };
        assert_eq!(parse_graph_time(&utc, zone).unwrap(), pst(9, 0));

        // Windows zone names are not known to chrono-tz; fall back to the room zone.
        let windows = GraphDateTime {
            date_time: "2024-01-15T09:00:00".to_string(),
            time_zone: Some("Pacific Standard Time".to_string()),
        };
        assert_eq!(parse_graph_time(&windows, zone).unwrap(), pst(9, 0));

        let offset = GraphDateTime {
            date_time: "2024-01-15T09:00:00-08:00".to_string(),
            time_zone: None,
        };
        assert_eq!(parse_graph_time(&offset, zone).unwrap(), pst(9, 0));

        let garbage = GraphDateTime {
            date_time: "tomorrow-ish".to_string(),
            time_zone: None,
        };
        assert!(matches!(
            parse_graph_time(&garbage, zone),
            Err(Error::InvalidEvent(_))
        ));
    }

    #[tokio::test]
    async fn test_events_between_sends_calendar_view_query() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path("/v1.0/users/boardroom@example.com/calendarView"))
            .and(header("authorization", "Bearer tok-1"))
            .and(header("prefer", "outlook.timezone=\"America/Los_Angeles\""))
            .and(query_param("startDateTime", "2024-01-15T08:00:00.000Z"))
            .and(query_param("endDateTime", "2024-01-16T08:00:00.000Z"))
            .and(query_param("$orderby", "start/dateTime"))
            .and(query_param("$top", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [
                    {
                        "id": "evt-1",
                        "subject": "Standup",
                        "organizer": { "emailAddress": { "name": "Ada Lovelace", "address": "ada@example.com" } },
                        "start": { "dateTime": "2024-01-15T09:00:00.0000000", "timeZone": "America/Los_Angeles" },
                        "end": { "dateTime": "2024-01-15T09:30:00.0000000", "timeZone": "America/Los_Angeles" }
                    },
                    {
                        "id": "evt-2",
                        "start": { "dateTime": "2024-01-15T10:00:00.0000000", "timeZone": "America/Los_Angeles" },
                        "end": { "dateTime": "2024-01-15T10:30:00.0000000", "timeZone": "America/Los_Angeles" }
                    }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let events = client
            .events_between(pst(0, 0), pst(0, 0) + Duration::days(1))
            .await
            .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, "evt-1");
        assert_eq!(events[0].organizer, "Ada Lovelace");
        assert_eq!(events[0].time_range, "9:00 AM - 9:30 AM");
        assert_eq!(events[1].subject, "Meeting");
        assert_eq!(events[1].start_time, pst(10, 0));
    }

    #[tokio::test]
    async fn test_graph_error_carries_status() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path("/v1.0/users/boardroom@example.com/calendarView"))
            .respond_with(ResponseTemplate::new(403).set_body_string("ErrorAccessDenied"))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.today_events(pst(9, 15)).await.unwrap_err();
        assert!(matches!(err, Error::Graph { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_token_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("AADSTS7000215"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.today_events(pst(9, 15)).await.unwrap_err();
        assert!(matches!(err, Error::Auth { status: 400, .. }));
    }
}
