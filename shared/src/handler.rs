//! Room status handler for `GET /api/status`.

use lambda_http::http::Method;
use lambda_http::{Body, Request, Response};
use std::sync::Arc;
use tracing::{error, info};

use crate::auth::{TokenCache, TokenProvider};
use crate::clock::Clock;
use crate::graph::GraphClient;
use crate::http::{empty_response, error_response, json_response};
use crate::status::build_status;
use crate::Config;

/// Message returned to callers for every upstream failure.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch calendar events";

/// Process-lifetime state shared by all invocations.
pub struct AppState {
    pub graph: GraphClient,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(config: &Config, cache: Arc<TokenCache>, clock: Arc<dyn Clock>) -> Self {
        let http_client = reqwest::Client::new();
        let tokens = TokenProvider::new(http_client.clone(), config, cache, Arc::clone(&clock));

        Self {
            graph: GraphClient::new(http_client, config, tokens),
            clock,
        }
    }
}

pub async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, lambda_http::Error> {
    if event.method() == Method::OPTIONS {
        return empty_response(200);
    }

    let now = state.clock.now();

    match state.graph.today_events(now).await {
        Ok(events) => {
            let status = build_status(state.graph.room_email(), now, &events);
            info!(
                "Room {} occupied={} events={}",
                status.room_email, status.is_occupied, status.today_event_count
            );
            json_response(200, &status)
        }
        Err(e) => {
            error!(
                kind = e.kind(),
                upstream_status = ?e.upstream_status(),
                "Error fetching calendar events: {}",
                e
            );
            error_response(500, FETCH_FAILED_MESSAGE)
        }
    }
}
