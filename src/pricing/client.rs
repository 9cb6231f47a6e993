use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::error::FetchError;

/// Shared outbound client. One per process; reqwest pools connections.
pub fn build_client(timeout: Duration) -> Result<Client, FetchError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("bullion-board/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(FetchError::Client)
}

/// GET `url` and decode the body as JSON.
pub async fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Request { url: url.to_string(), source })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() });
    }

    let body = response
        .bytes()
        .await
        .map_err(|source| FetchError::Request { url: url.to_string(), source })?;
    trace!(url, bytes = body.len(), "received response body");

    serde_json::from_slice(&body).map_err(|source| FetchError::Decode { url: url.to_string(), source })
}
