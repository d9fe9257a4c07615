//! Runs suites case by case and classifies every outcome.

use crate::auth_client::AuthServiceClient;
use crate::config::{Config, TimeoutConfig};
use crate::endpoints::{websocket_url, Route};
use crate::envelope::{Payload, ResponseEnvelope};
use crate::error::{ProbeError, Result};
use crate::http::build_http_client;
use crate::registry_client::RegistryServiceClient;
use crate::report::{CasePreview, CaseResult, Reporter, RunReport, TestOutcome};
use crate::session::RelaySession;
use crate::suite::{AuthMode, CaseAction, Expectation, Suite, TestCase};
use crate::types::AuthToken;
use reqwest::StatusCode;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const MASKED_TOKEN: &str = "***TOKEN***";

/// Executes test cases strictly one after another.
///
/// The sequencer never ends the process. A fatal connection error or a
/// cancelled run token stops it early and the returned [`RunReport`] is
/// flagged `aborted`.
#[derive(Debug)]
pub struct Sequencer {
    auth: AuthServiceClient,
    registry: RegistryServiceClient,
    relay_url: String,
    timeouts: TimeoutConfig,
    cancel: CancellationToken,
}

impl Sequencer {
    /// Creates a sequencer over already-built clients.
    pub fn new(
        auth: AuthServiceClient,
        registry: RegistryServiceClient,
        relay_url: impl Into<String>,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            auth,
            registry,
            relay_url: relay_url.into(),
            timeouts,
            cancel: CancellationToken::new(),
        }
    }

    /// Builds the clients described by `config` around one shared HTTP pool.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = build_http_client(config.timeouts.http_timeout())?;
        Ok(Self::new(
            AuthServiceClient::new(
                http.clone(),
                &config.services.auth_url,
                &config.api.auth_version,
            ),
            RegistryServiceClient::new(
                http,
                &config.services.registry_url,
                &config.api.registry_version,
            ),
            &config.services.relay_url,
            config.timeouts.clone(),
        ))
    }

    /// Uses `token` as the run-level cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Handle that stops the run. The in-flight case ends as cancelled and the
    /// rest are skipped.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs every case of every suite in order.
    pub async fn run(&self, suites: &[Suite], reporter: &mut dyn Reporter) -> RunReport {
        let total: usize = suites.iter().map(|s| s.cases.len()).sum();
        let mut report = RunReport::default();

        'suites: for suite in suites {
            reporter.section(&suite.title);
            for case in &suite.cases {
                if self.cancel.is_cancelled() {
                    report.abort("run cancelled");
                    break 'suites;
                }

                reporter.case_started(case, &self.preview(case));
                info!(case = %case.name, "case started");
                let started = Instant::now();
                let outcome = self.run_case(case).await;
                let result = CaseResult {
                    name: case.name.clone(),
                    fatal: case.fatal,
                    outcome,
                    elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                };
                info!(case = %case.name, outcome = result.outcome.label(), "case finished");
                reporter.case_finished(&result);

                let fatal = result.outcome.is_fatal();
                report.record(result);
                if fatal {
                    report.abort(format!("fatal case failed: {}", case.name));
                    break 'suites;
                }
                if self.cancel.is_cancelled() {
                    report.abort("run cancelled");
                    break 'suites;
                }
            }
        }

        report.skipped = total - report.executed();
        report
    }

    /// Runs one case. Every fault becomes an outcome.
    pub async fn run_case(&self, case: &TestCase) -> TestOutcome {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                TestOutcome::from_error(&ProbeError::Cancelled, case.fatal)
            }
            outcome = self.execute(case) => outcome,
        }
    }

    /// Describes what `case` will call and expect. No I/O.
    pub fn preview(&self, case: &TestCase) -> CasePreview {
        let (target, inputs) = match &case.action {
            CaseAction::Login(credentials) => (
                self.auth.login_url(),
                vec![
                    field("username", &credentials.identifier),
                    field("password", &"*".repeat(credentials.secret.chars().count())),
                ],
            ),
            CaseAction::Register(request) => (
                self.registry.url(Route::Register),
                vec![
                    field("serverId", &request.server_id),
                    field("host", &request.host),
                    field("port", &request.port.to_string()),
                    field("maxPlayers", &request.max_players.to_string()),
                ],
            ),
            CaseAction::Heartbeat(request) => (
                self.registry.url(Route::Heartbeat),
                vec![
                    field("serverId", &request.server_id),
                    field("currentPlayers", &request.current_players.to_string()),
                ],
            ),
            CaseAction::Allocate { auth } => (
                self.registry.url(Route::Allocate),
                vec![field("authorization", &describe_auth(auth))],
            ),
            CaseAction::Disconnect { request, auth } => (
                self.registry.url(Route::Disconnect),
                vec![
                    field("serverId", &request.server_id),
                    field("authorization", &describe_auth(auth)),
                ],
            ),
            CaseAction::RelayConnect { auth } => {
                let token = match auth {
                    AuthMode::Anonymous => "",
                    AuthMode::Login(_) => MASKED_TOKEN,
                };
                (
                    websocket_url(&self.relay_url, token),
                    vec![field("authorization", &describe_auth(auth))],
                )
            }
        };

        CasePreview {
            target,
            inputs,
            expected: case.expectation.describe(),
        }
    }

    async fn execute(&self, case: &TestCase) -> TestOutcome {
        let expectation = &case.expectation;
        match &case.action {
            CaseAction::Login(credentials) => match self.auth.login(credentials).await {
                Ok(envelope) => {
                    let token = envelope.token().map(|t| t.preview());
                    judge_http(expectation, &envelope, token)
                }
                Err(e) => TestOutcome::from_error(&e, case.fatal),
            },
            CaseAction::Register(request) => match self.registry.register(request).await {
                Ok(envelope) => judge_http(expectation, &envelope, None),
                Err(e) => TestOutcome::from_error(&e, case.fatal),
            },
            CaseAction::Heartbeat(request) => match self.registry.heartbeat(request).await {
                Ok(envelope) => judge_http(expectation, &envelope, None),
                Err(e) => TestOutcome::from_error(&e, case.fatal),
            },
            CaseAction::Allocate { auth } => {
                let token = match self.authorize(auth).await {
                    Ok(token) => token,
                    Err(abandoned) => return abandoned,
                };
                match self.registry.allocate(token.as_ref()).await {
                    Ok(envelope) => {
                        let server = envelope
                            .has_allocated_server()
                            .then(|| envelope.data().map(|a| a.server_id.clone()))
                            .flatten();
                        judge_http(expectation, &envelope, server)
                    }
                    Err(e) => TestOutcome::from_error(&e, case.fatal),
                }
            }
            CaseAction::Disconnect { request, auth } => {
                let token = match self.authorize(auth).await {
                    Ok(token) => token,
                    Err(abandoned) => return abandoned,
                };
                match self.registry.disconnect(request, token.as_ref()).await {
                    Ok(envelope) => judge_http(expectation, &envelope, None),
                    Err(e) => TestOutcome::from_error(&e, case.fatal),
                }
            }
            CaseAction::RelayConnect { auth } => {
                let token = match self.authorize(auth).await {
                    Ok(token) => token,
                    Err(abandoned) => return abandoned,
                };
                self.probe_relay(case, token.as_ref().map_or("", AuthToken::as_str))
                    .await
            }
        }
    }

    /// Resolves the bearer token for a case, or the outcome that abandons it.
    async fn authorize(
        &self,
        auth: &AuthMode,
    ) -> std::result::Result<Option<AuthToken>, TestOutcome> {
        let AuthMode::Login(credentials) = auth else {
            return Ok(None);
        };

        let envelope = self
            .auth
            .login(credentials)
            .await
            .map_err(|e| TestOutcome::Abandoned {
                reason: format!("prerequisite login failed: {e}"),
            })?;
        match envelope.token() {
            Some(token) => {
                info!(token = %token.preview(), "obtained token");
                Ok(Some(token))
            }
            None => Err(TestOutcome::Abandoned {
                reason: format!(
                    "prerequisite login did not yield a token (HTTP {})",
                    envelope.status().as_u16()
                ),
            }),
        }
    }

    async fn probe_relay(&self, case: &TestCase, token: &str) -> TestOutcome {
        let mut session = RelaySession::new(&self.relay_url)
            .with_connect_timeout(self.timeouts.connect_timeout())
            .with_close_timeout(self.timeouts.close_timeout())
            .with_cancellation(self.cancel.child_token());

        let outcome = match &case.expectation {
            Expectation::Rejected => self.expect_rejection(&mut session, token, case.fatal).await,
            Expectation::FirstMessage(expected) => {
                expect_first_message(
                    &mut session,
                    token,
                    expected,
                    self.timeouts.receive_timeout(),
                    case.fatal,
                )
                .await
            }
            other => TestOutcome::ContractViolation {
                message: format!("{} cannot be checked on a relay connection", other.describe()),
            },
        };

        if let Err(e) = session.disconnect().await {
            warn!(error = %e, "relay disconnect failed");
        }
        outcome
    }

    async fn expect_rejection(
        &self,
        session: &mut RelaySession,
        token: &str,
        fatal: bool,
    ) -> TestOutcome {
        match session.connect(token).await {
            Err(ProbeError::Handshake(reason)) => {
                return TestOutcome::Passed {
                    detail: format!("connection refused as expected ({reason})"),
                }
            }
            Err(e) => return TestOutcome::from_error(&e, fatal),
            Ok(()) => {}
        }

        // Accepted the upgrade; it still counts as refused if the peer drops it promptly.
        let grace = self.timeouts.rejection_grace();
        match session.receive_one_message(grace).await {
            Err(e @ (ProbeError::ClosedByPeer { .. } | ProbeError::WebSocket(_))) => {
                TestOutcome::Passed {
                    detail: format!("server dropped the unauthenticated connection ({e})"),
                }
            }
            Err(ProbeError::ReceiveTimeout { .. }) => TestOutcome::UnexpectedResult {
                expected: Expectation::Rejected.describe(),
                actual: format!(
                    "connection still open after {}ms",
                    self.timeouts.rejection_grace_ms
                ),
                body: String::new(),
            },
            Ok(message) => TestOutcome::UnexpectedResult {
                expected: Expectation::Rejected.describe(),
                actual: "connection open and serving messages".to_string(),
                body: message,
            },
            Err(e @ ProbeError::UnexpectedFrame { .. }) => TestOutcome::UnexpectedResult {
                expected: Expectation::Rejected.describe(),
                actual: format!("connection open ({e})"),
                body: String::new(),
            },
            Err(e) => TestOutcome::from_error(&e, fatal),
        }
    }
}

async fn expect_first_message(
    session: &mut RelaySession,
    token: &str,
    expected: &str,
    wait: std::time::Duration,
    fatal: bool,
) -> TestOutcome {
    if let Err(e) = session.connect(token).await {
        return TestOutcome::from_error(&e, fatal);
    }

    match session.receive_one_message(wait).await {
        Ok(message) if message == expected => TestOutcome::Passed {
            detail: format!("connected and received {message:?}"),
        },
        Ok(message) => TestOutcome::UnexpectedResult {
            expected: format!("{expected:?}"),
            actual: format!("{message:?}"),
            body: message,
        },
        // Connected, but the greeting never came.
        Err(
            e @ (ProbeError::ReceiveTimeout { .. }
            | ProbeError::ClosedByPeer { .. }
            | ProbeError::UnexpectedFrame { .. }),
        ) => TestOutcome::UnexpectedResult {
            expected: format!("{expected:?}"),
            actual: format!("connected, but {e}"),
            body: String::new(),
        },
        Err(e) => TestOutcome::from_error(&e, fatal),
    }
}

/// Compares a completed HTTP call against `expectation`.
///
/// `field` is the payload value the expectation needs (token preview or
/// server id), present only when the envelope's predicate holds.
fn judge_http<T>(
    expectation: &Expectation,
    envelope: &ResponseEnvelope<T>,
    field: Option<String>,
) -> TestOutcome {
    let status = envelope.status();
    let mismatch = |actual: String| TestOutcome::UnexpectedResult {
        expected: expectation.describe(),
        actual,
        body: envelope.raw_body().to_string(),
    };

    match expectation {
        Expectation::Status(code) => {
            if status.as_u16() == *code {
                TestOutcome::Passed {
                    detail: format!("received HTTP {code} as expected"),
                }
            } else {
                mismatch(format!("HTTP {}", status.as_u16()))
            }
        }
        Expectation::DecodedPayload => {
            if envelope.is_success_with_data() {
                TestOutcome::Passed {
                    detail: "HTTP 200 with a decoded payload".to_string(),
                }
            } else {
                mismatch(describe_response(envelope))
            }
        }
        Expectation::Token | Expectation::AllocatedServer => match field {
            Some(value) if status == StatusCode::OK => TestOutcome::Passed {
                detail: match expectation {
                    Expectation::Token => format!("token received: {value}"),
                    _ => format!("allocated server {value}"),
                },
            },
            _ => mismatch(describe_response(envelope)),
        },
        Expectation::Rejected | Expectation::FirstMessage(_) => TestOutcome::ContractViolation {
            message: format!("{} cannot be checked on an HTTP response", expectation.describe()),
        },
    }
}

fn describe_response<T>(envelope: &ResponseEnvelope<T>) -> String {
    let status = envelope.status().as_u16();
    match envelope.payload() {
        Payload::Decoded(_) => format!("HTTP {status} with decoded payload"),
        Payload::Absent { reason } => {
            format!("HTTP {status} without a usable payload ({reason})")
        }
    }
}

fn describe_auth(auth: &AuthMode) -> String {
    match auth {
        AuthMode::Anonymous => "none".to_string(),
        AuthMode::Login(credentials) => {
            format!("bearer token from login as {}", credentials.identifier)
        }
    }
}

fn field(name: &str, value: &str) -> (String, String) {
    (name.to_string(), value.to_string())
}
