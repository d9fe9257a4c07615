//! Request and response shapes exchanged with the probed services.
//!
//! Response types default every field, so a body missing a field still
//! decodes (with an empty value) while a body with a wrongly typed field does
//! not. Predicates on [`crate::ResponseEnvelope`] check the emptiness.

use serde::{Deserialize, Serialize};

/// Login credentials; built per case and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account identifier.
    pub identifier: String,
    /// Account secret.
    pub secret: String,
}

impl Credentials {
    /// Creates credentials from an identifier and secret.
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    /// Wire body for the login endpoint.
    pub fn to_login_request(&self) -> LoginRequest<'_> {
        LoginRequest {
            username: &self.identifier,
            password: &self.secret,
        }
    }
}

/// Opaque bearer credential issued by the authentication service.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wraps a raw token string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw token, as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of characters in the token.
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    /// True for the empty token.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First 20 characters, `...` and the length, safe to print.
    pub fn preview(&self) -> String {
        let head: String = self.0.chars().take(20).collect();
        format!("{head}... ({} chars)", self.len())
    }
}

// Keep the token out of logs and debug output.
impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthToken({} chars)", self.len())
    }
}

/// `POST auth/login` body.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// `POST auth/login` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthenticationResponse {
    pub token: String,
    pub refresh_token: String,
}

/// `POST registry/register` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterServerRequest {
    pub server_id: String,
    pub host: String,
    pub port: u16,
    pub max_players: u32,
}

/// `POST registry/register` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterServerResponse {
    pub message: String,
    pub server_id: String,
    /// Seconds between expected heartbeats.
    pub heartbeat_interval: u32,
}

/// `POST registry/heartbeat` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    pub server_id: String,
    pub current_players: u32,
}

/// `POST registry/heartbeat` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatResponse {
    pub message: String,
}

/// `POST registry/allocate` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AllocateServerResponse {
    pub server_id: String,
    pub host: String,
    pub port: u16,
    pub message: String,
}

/// `POST registry/disconnect` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectRequest {
    pub server_id: String,
}

/// `POST registry/disconnect` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisconnectResponse {
    pub message: String,
}
