//! Probe Core Library
//!
//! Integration probes for the authentication, registry and relay services:
//! - HTTP clients that wrap every response in a [`ResponseEnvelope`]
//! - A single-use WebSocket [`RelaySession`] with an explicit state machine
//! - A [`Sequencer`] that runs the fixed suites and classifies each outcome
//!
//! # Quick Start
//!
//! ```
//! use probe_core::{endpoint_url, websocket_url, Route};
//!
//! assert_eq!(
//!     endpoint_url("http://localhost:5000", "v0.2.1", Route::Login),
//!     "http://localhost:5000/api/v0.2.1/auth/login"
//! );
//! assert_eq!(
//!     websocket_url("https://relay.example.com", "abc"),
//!     "wss://relay.example.com/ws?token=abc"
//! );
//! ```
//!
//! # Features
//!
//! ## Lenient Decoding
//!
//! A body that does not decode is kept, never raised:
//!
//! ```
//! use probe_core::{AuthenticationResponse, ResponseEnvelope};
//! use reqwest::StatusCode;
//!
//! let envelope: ResponseEnvelope<AuthenticationResponse> =
//!     ResponseEnvelope::from_parts(StatusCode::OK, "<html>oops</html>".to_string());
//!
//! assert!(envelope.is_success());
//! assert!(envelope.data().is_none());
//! assert_eq!(envelope.raw_body(), "<html>oops</html>");
//! assert!(!envelope.has_valid_token());
//! ```
//!
//! ## Running Suites
//!
//! ```no_run
//! use probe_core::{catalogue, Config, Sequencer, SilentReporter, SuiteKind};
//!
//! # async fn run() -> probe_core::Result<()> {
//! let sequencer = Sequencer::from_config(&Config::default())?;
//! let suites = catalogue(&SuiteKind::ALL, false);
//! let report = sequencer.run(&suites, &mut SilentReporter).await;
//! std::process::exit(i32::from(report.exit_code()));
//! # }
//! ```

mod auth_client;
mod config;
mod endpoints;
mod envelope;
mod error;
mod http;
mod registry_client;
mod report;
mod sequencer;
mod session;
mod suite;
mod types;

pub use auth_client::AuthServiceClient;
pub use config::{
    ApiConfig, Config, ServiceEnv, ServicesConfig, SuiteConfig, TimeoutConfig,
    DEFAULT_CONFIG_FILE,
};
pub use endpoints::{endpoint_url, websocket_url, Route};
pub use envelope::{Payload, ResponseEnvelope};
pub use error::{ProbeError, Result};
pub use http::build_http_client;
pub use registry_client::RegistryServiceClient;
pub use report::{CasePreview, CaseResult, Reporter, RunReport, SilentReporter, TestOutcome};
pub use sequencer::Sequencer;
pub use session::{RelaySession, SessionState};
pub use suite::{
    auth_suite, catalogue, registry_suite, relay_suite, AuthMode, CaseAction, Expectation, Suite,
    SuiteKind, TestCase, TEST_SERVER_ID, WELCOME_MESSAGE,
};
pub use types::*;
