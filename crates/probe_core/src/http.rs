//! Shared POST-and-envelope plumbing for the HTTP service clients.

use crate::envelope::ResponseEnvelope;
use crate::error::{ProbeError, Result};
use crate::types::AuthToken;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Builds the HTTP client shared by all service clients.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProbeError::ConfigError(format!("failed to build http client: {e}")))
}

/// POSTs `body` as JSON (or nothing) and wraps the response.
///
/// Any completed response, whatever its status, becomes an envelope. Only a
/// call that never completed is an error; it is not retried.
pub(crate) async fn post_json<B, T>(
    client: &Client,
    url: &str,
    body: Option<&B>,
    bearer: Option<&AuthToken>,
) -> Result<ResponseEnvelope<T>>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let mut request = client.post(url);
    if let Some(body) = body {
        let json =
            serde_json::to_vec(body).map_err(|e| ProbeError::Serialization(e.to_string()))?;
        request = request
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(json);
    }
    if let Some(token) = bearer.filter(|t| !t.is_empty()) {
        request = request.bearer_auth(token.as_str());
    }

    debug!(url, bearer = bearer.is_some(), "POST");
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(url, &e))?;
    let status = response.status();
    let raw_body = response
        .text()
        .await
        .map_err(|e| transport_error(url, &e))?;
    debug!(url, %status, bytes = raw_body.len(), "response");

    Ok(ResponseEnvelope::from_parts(status, raw_body))
}

fn transport_error(url: &str, err: &reqwest::Error) -> ProbeError {
    if err.is_timeout() {
        return ProbeError::RequestTimeout {
            url: url.to_string(),
        };
    }
    ProbeError::Transport {
        url: url.to_string(),
        message: error_chain(err),
    }
}

/// Joins an error with its sources; reqwest's top-level message alone hides
/// the useful part ("Connection refused").
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = inner.source();
    }
    message
}
