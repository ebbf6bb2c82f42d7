//! Shared HTTP client construction for upstream services

use std::time::Duration;

use reqwest::{Client, Response};

use crate::{Result, TourPlanError};

pub const DEFAULT_USER_AGENT: &str = "tourplan/0.1.0 (+https://example.com/contact)";

/// Create an HTTP client with a request timeout and descriptive user agent.
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|e| TourPlanError::config(format!("Failed to create HTTP client: {e}")))
}

/// Turn a non-success status into the matching upstream error.
pub fn check_status(response: Response, service: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        tracing::warn!(%status, service, "Upstream returned error status");
        Err(TourPlanError::from_status(status, service))
    }
}
