//! Room Status Lambda - Handles /api/status endpoint.
//!
//! Reports whether the configured meeting room is in use right now and what
//! the next meeting is, based on the room's Microsoft Graph calendar.

use lambda_http::{run, service_fn, Error};
use shared::{handler, AppState, Config, SystemClock, TokenCache};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Resolve the client secret from Secrets Manager when only an ARN is configured.
async fn resolve_client_secret(config: &mut Config) -> Result<(), Error> {
    let Some(secret_arn) = config.client_secret_arn.clone() else {
        return Ok(());
    };
    if !config.client_secret.is_empty() {
        return Ok(());
    }

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let secrets_client = aws_sdk_secretsmanager::Client::new(&aws_config);

    config.client_secret = shared::get_client_secret(&secrets_client, &secret_arn).await?;
    info!("Loaded client secret from Secrets Manager");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let mut config = Config::from_env()?;
    resolve_client_secret(&mut config).await?;

    info!(
        "Serving room status for {} ({})",
        config.room_email,
        config.timezone.name()
    );

    // Lives as long as the execution environment; every invocation shares it.
    let token_cache = Arc::new(TokenCache::new());
    let state = Arc::new(AppState::new(&config, token_cache, Arc::new(SystemClock)));

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
