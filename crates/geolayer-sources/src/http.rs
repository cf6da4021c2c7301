//! Shared HTTP plumbing for the adapters.

use anyhow::{Context, Result};
use geolayer_core::{NetworkError, ReqwestErrorExt};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const USER_AGENT: &str = "Geolayer/0.1.0";

/// Build a client with a per-request timeout.
pub fn build_client(timeout: Duration, user_agent: &str) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .context("Failed to create HTTP client")
}

/// Send a request and decode a JSON body, classifying every failure.
pub async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, NetworkError> {
    let response = request
        .send()
        .await
        .map_err(ReqwestErrorExt::into_network_error)?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(NetworkError::ServerError {
            status: status.as_u16(),
            message: text,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| NetworkError::InvalidResponse(e.to_string()))
}

/// Trim a trailing slash so paths can be appended with `format!`.
pub fn normalize_base(base_url: impl Into<String>) -> String {
    let mut base = base_url.into();
    while base.ends_with('/') {
        base.pop();
    }
    base
}
