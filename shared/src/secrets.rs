//! AWS Secrets Manager integration.

use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;

use crate::{Error, Result};

/// App registration credentials stored as a JSON secret.
#[derive(Debug, Deserialize)]
struct ClientSecretDocument {
    client_secret: String,
}

/// Get a secret value from Secrets Manager.
///
/// Called once during cold start; the resolved value lives in `Config`.
pub async fn get_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    let response = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret: {}", e)))?;

    response
        .secret_string()
        .map(str::to_string)
        .ok_or_else(|| Error::Aws("Secret has no string value".to_string()))
}

/// Get the app registration client secret from Secrets Manager.
///
/// The secret may hold either the bare value or a JSON document with a
/// `client_secret` field.
pub async fn get_client_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    let secret_string = get_secret(client, secret_arn).await?;
    parse_client_secret(&secret_string)
}

fn parse_client_secret(secret_string: &str) -> Result<String> {
    let trimmed = secret_string.trim();
    if trimmed.starts_with('{') {
        let document: ClientSecretDocument = serde_json::from_str(trimmed)?;
        return Ok(document.client_secret);
    }
    Ok(trimmed.to_string())
}
