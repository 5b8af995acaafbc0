//! Shared library for the room status Lambda.
//!
//! This crate provides the token provider, Graph calendar client, occupancy
//! classification and HTTP handler used by the `room_status` function.

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod graph;
pub mod handler;
pub mod http;
pub mod models;
pub mod secrets;
pub mod status;

pub use auth::{TokenCache, TokenProvider};
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
pub use graph::GraphClient;
pub use handler::{handler, AppState};
pub use models::{CalendarEvent, ErrorResponse, StatusResponse};
pub use secrets::{get_client_secret, get_secret};
