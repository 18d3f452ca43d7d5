//! Shared HTTP plumbing for service providers.
//!
//! Maps transport and status failures onto [`ServiceError`]:
//! - HTTP 429 (rate limited) and 5xx (server error) → transient
//! - other non-success statuses → fatal
//! - network errors and client-side timeouts → transient

use std::time::Duration;

use documind_core::ServiceError;
use reqwest::StatusCode;

pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ServiceError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ServiceError::Fatal(format!("failed to build HTTP client: {}", e)))
}

/// Classify a non-success response.
pub fn status_error(service: &str, status: StatusCode, body: &str) -> ServiceError {
    let msg = format!("{} API error {}: {}", service, status, body);
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ServiceError::Transient(msg)
    } else {
        ServiceError::Fatal(msg)
    }
}

/// Classify a transport-level failure.
pub fn transport_error(service: &str, err: reqwest::Error) -> ServiceError {
    ServiceError::Transient(format!("{} connection error: {}", service, err))
}

/// Send a JSON POST and return the parsed JSON body of a successful response.
pub async fn post_json(
    service: &str,
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ServiceError> {
    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| transport_error(service, e))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(status_error(service, status, &text));
    }

    response
        .json()
        .await
        .map_err(|e| ServiceError::Fatal(format!("{} returned invalid JSON: {}", service, e)))
}

/// Read a JSON array of numbers as an `f32` vector.
pub fn json_to_vector(value: &serde_json::Value, what: &str) -> Result<Vec<f32>, ServiceError> {
    value
        .as_array()
        .ok_or_else(|| ServiceError::Fatal(format!("{}: embedding is not an array", what)))?
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| ServiceError::Fatal(format!("{}: non-numeric embedding value", what)))
        })
        .collect()
}
