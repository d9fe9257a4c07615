//! Error types for probe_core operations.

use thiserror::Error;

/// Core error type for client, session and configuration operations.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The HTTP call never produced a response (refused, reset, DNS failure).
    #[error("transport error calling {url}: {message}")]
    Transport {
        /// Endpoint that was being called
        url: String,
        /// Underlying transport message
        message: String,
    },

    /// The HTTP call did not complete within the client timeout.
    #[error("request to {url} timed out")]
    RequestTimeout {
        /// Endpoint that was being called
        url: String,
    },

    /// The WebSocket handshake was refused or failed.
    #[error("websocket handshake failed: {0}")]
    Handshake(String),

    /// No frame arrived before the receive deadline.
    #[error("timeout: no message received within {timeout_ms}ms")]
    ReceiveTimeout {
        /// Receive timeout in milliseconds
        timeout_ms: u64,
    },

    /// The peer closed the WebSocket connection.
    #[error("websocket connection closed by server{}", reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    ClosedByPeer {
        /// Close reason sent by the peer, if any
        reason: Option<String>,
    },

    /// A data frame of a kind other than text was received.
    #[error("unexpected message type: {kind}")]
    UnexpectedFrame {
        /// Frame kind that was received
        kind: String,
    },

    /// Operation requires an open session.
    #[error("websocket is not connected (state: {state})")]
    NotConnected {
        /// State the session was in
        state: String,
    },

    /// Invalid session state transition.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Source state
        from: String,
        /// Target state
        to: String,
    },

    /// The operation was cancelled by session or run cancellation.
    #[error("operation cancelled")]
    Cancelled,

    /// WebSocket protocol failure on an established connection.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// Request body could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    /// Returns true for failures that mean the service could not be reached
    /// or stopped answering.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::RequestTimeout { .. }
                | Self::Handshake(_)
                | Self::ReceiveTimeout { .. }
                | Self::ClosedByPeer { .. }
                | Self::Cancelled
                | Self::WebSocket(_)
        )
    }

    /// Returns true when an operation was invoked in a state that does not allow it.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::NotConnected { .. } | Self::InvalidStateTransition { .. }
        )
    }

    /// Returns true for either kind of timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::RequestTimeout { .. } | Self::ReceiveTimeout { .. }
        )
    }

    /// Returns a user-friendly recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Transport { .. } => {
                Some("Did you forget to start the services? Try 'docker compose up'.")
            }
            Self::Handshake(_) => {
                Some("The relay refused the upgrade. Check the token and the auth service.")
            }
            Self::RequestTimeout { .. } => {
                Some("The service accepted the connection but never answered. Check its logs.")
            }
            Self::ReceiveTimeout { .. } => {
                Some("Raise [timeouts] receive_timeout_ms if the relay is slow to greet.")
            }
            Self::NotConnected { .. } | Self::InvalidStateTransition { .. } => {
                Some("Sessions are single-use. Create a new session for each connection.")
            }
            Self::ConfigError(_) => {
                Some("Run 'probe config' to print the effective configuration.")
            }
            _ => None,
        }
    }
}

/// Convenience Result type for probe_core operations.
pub type Result<T> = std::result::Result<T, ProbeError>;
