//! Response envelope pairing an HTTP outcome with an optional typed payload.

use crate::types::{AllocateServerResponse, AuthToken, AuthenticationResponse};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// Result of decoding a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload<T> {
    /// The body decoded as `T`.
    Decoded(T),
    /// The body did not decode; the reason is kept for diagnostics only.
    Absent {
        /// Decoder message.
        reason: String,
    },
}

impl<T> Payload<T> {
    /// Returns the decoded value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Decoded(value) => Some(value),
            Self::Absent { .. } => None,
        }
    }

    /// True when the body decoded.
    pub fn is_decoded(&self) -> bool {
        matches!(self, Self::Decoded(_))
    }
}

/// Status, raw body and decoded payload of one completed HTTP call.
///
/// Built once per call and never mutated. The raw body is always present once
/// the transport completed; a body that fails to decode yields
/// [`Payload::Absent`] rather than an error.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope<T> {
    status: StatusCode,
    raw_body: String,
    payload: Payload<T>,
}

impl<T: DeserializeOwned> ResponseEnvelope<T> {
    /// Builds an envelope, decoding `raw_body` as `T`.
    pub fn from_parts(status: StatusCode, raw_body: String) -> Self {
        let payload = match serde_json::from_str::<T>(&raw_body) {
            Ok(value) => Payload::Decoded(value),
            Err(e) => {
                tracing::debug!(%status, error = %e, "response body did not decode");
                Payload::Absent {
                    reason: e.to_string(),
                }
            }
        };

        Self {
            status,
            raw_body,
            payload,
        }
    }
}

impl<T> ResponseEnvelope<T> {
    /// Transport status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Body exactly as received.
    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }

    /// Decoded payload, absent when the body did not decode.
    pub fn payload(&self) -> &Payload<T> {
        &self.payload
    }

    /// Shorthand for `payload().value()`.
    pub fn data(&self) -> Option<&T> {
        self.payload.value()
    }

    /// True iff the status is 200 OK. The body plays no part.
    pub fn is_success(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// Success and a decoded payload.
    pub fn is_success_with_data(&self) -> bool {
        self.is_success() && self.payload.is_decoded()
    }
}

impl ResponseEnvelope<AuthenticationResponse> {
    /// Success, a decoded payload, and a non-empty token.
    pub fn has_valid_token(&self) -> bool {
        self.token().is_some()
    }

    /// The issued token when [`Self::has_valid_token`] holds.
    pub fn token(&self) -> Option<AuthToken> {
        if !self.is_success() {
            return None;
        }
        self.data()
            .filter(|auth| !auth.token.is_empty())
            .map(|auth| AuthToken::new(auth.token.clone()))
    }
}

impl ResponseEnvelope<AllocateServerResponse> {
    /// Success, a decoded payload, and a non-empty server id.
    pub fn has_allocated_server(&self) -> bool {
        self.is_success() && self.data().is_some_and(|a| !a.server_id.is_empty())
    }
}
