//! Test cases and the fixed per-service catalogue.

use crate::types::{Credentials, DisconnectRequest, HeartbeatRequest, RegisterServerRequest};
use serde::Serialize;

/// Text the relay must send first on an authenticated connection.
pub const WELCOME_MESSAGE: &str = "Welcome to WEBSOCKET!";

/// Server registered by the registry suite.
pub const TEST_SERVER_ID: &str = "test-server-1";

/// How a case obtains its bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// No token; the call goes out unauthenticated.
    Anonymous,
    /// Log in first and use the issued token. A failed login abandons the case.
    Login(Credentials),
}

/// The single client or session operation a case performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseAction {
    Login(Credentials),
    Register(RegisterServerRequest),
    Heartbeat(HeartbeatRequest),
    Allocate { auth: AuthMode },
    Disconnect { request: DisconnectRequest, auth: AuthMode },
    RelayConnect { auth: AuthMode },
}

/// What a case must observe to pass. Comparisons are exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// This HTTP status, whatever the body.
    Status(u16),
    /// HTTP 200 and a body that decodes into the response type.
    DecodedPayload,
    /// HTTP 200 and a non-empty token.
    Token,
    /// HTTP 200 and a non-empty `serverId`.
    AllocatedServer,
    /// The relay refuses the connection or drops it within the grace period.
    Rejected,
    /// The relay accepts and the first text frame equals this string.
    FirstMessage(String),
}

impl Expectation {
    /// Human-readable form used in previews and mismatch reports.
    pub fn describe(&self) -> String {
        match self {
            Self::Status(code) => format!("HTTP {code}"),
            Self::DecodedPayload => "HTTP 200 with a JSON payload".to_string(),
            Self::Token => "HTTP 200 with a non-empty token".to_string(),
            Self::AllocatedServer => "HTTP 200 with a non-empty serverId".to_string(),
            Self::Rejected => "connection refused or closed by the server".to_string(),
            Self::FirstMessage(text) => format!("connection opens and first message is {text:?}"),
        }
    }
}

/// One named step of a suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub action: CaseAction,
    pub expectation: Expectation,
    /// A connection-level fault in this case ends the run.
    pub fatal: bool,
}

impl TestCase {
    /// Creates a non-fatal case.
    pub fn new(name: impl Into<String>, action: CaseAction, expectation: Expectation) -> Self {
        Self {
            name: name.into(),
            action,
            expectation,
            fatal: false,
        }
    }

    /// Marks the case fatal.
    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }
}

/// Which service a suite probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteKind {
    Auth,
    Registry,
    Relay,
}

impl SuiteKind {
    /// Every suite in run order.
    pub const ALL: [SuiteKind; 3] = [Self::Auth, Self::Registry, Self::Relay];
}

/// An ordered list of cases against one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suite {
    pub kind: SuiteKind,
    pub title: String,
    pub cases: Vec<TestCase>,
}

fn admin() -> Credentials {
    Credentials::new("admin", "admin")
}

/// Login checks. The first case is the only fatal one in the catalogue: if
/// the auth service cannot be reached nothing after it is meaningful.
pub fn auth_suite() -> Suite {
    Suite {
        kind: SuiteKind::Auth,
        title: "Authentication Service".to_string(),
        cases: vec![
            TestCase::new(
                "Test 1: Testing with invalid credentials",
                CaseAction::Login(Credentials::new("test", "test")),
                Expectation::Status(401),
            )
            .fatal(),
            TestCase::new(
                "Test 2: Testing with valid credentials",
                CaseAction::Login(admin()),
                Expectation::Token,
            ),
        ],
    }
}

/// Registry checks. `include_protected` adds the cases that need a bearer token.
pub fn registry_suite(include_protected: bool) -> Suite {
    let mut cases = vec![
        TestCase::new(
            "Test 3: Register game server",
            CaseAction::Register(RegisterServerRequest {
                server_id: TEST_SERVER_ID.to_string(),
                host: "game".to_string(),
                port: 7777,
                max_players: 10,
            }),
            Expectation::DecodedPayload,
        ),
        TestCase::new(
            "Test 4: Send heartbeat",
            CaseAction::Heartbeat(HeartbeatRequest {
                server_id: TEST_SERVER_ID.to_string(),
                current_players: 5,
            }),
            Expectation::DecodedPayload,
        ),
        TestCase::new(
            "Test 5: Allocate server WITHOUT JWT token",
            CaseAction::Allocate {
                auth: AuthMode::Anonymous,
            },
            Expectation::Status(401),
        ),
    ];

    if include_protected {
        cases.push(TestCase::new(
            "Test 6: Allocate server WITH JWT token",
            CaseAction::Allocate {
                auth: AuthMode::Login(admin()),
            },
            Expectation::AllocatedServer,
        ));
        cases.push(TestCase::new(
            "Test 7: Disconnect from server",
            CaseAction::Disconnect {
                request: DisconnectRequest {
                    server_id: TEST_SERVER_ID.to_string(),
                },
                auth: AuthMode::Login(admin()),
            },
            Expectation::DecodedPayload,
        ));
    }

    Suite {
        kind: SuiteKind::Registry,
        title: "Registry Service".to_string(),
        cases,
    }
}

/// Relay checks.
pub fn relay_suite() -> Suite {
    Suite {
        kind: SuiteKind::Relay,
        title: "Relay Service".to_string(),
        cases: vec![
            TestCase::new(
                "Test 8: WebSocket connection WITHOUT JWT token",
                CaseAction::RelayConnect {
                    auth: AuthMode::Anonymous,
                },
                Expectation::Rejected,
            ),
            TestCase::new(
                "Test 9: WebSocket connection WITH JWT token and receive welcome message",
                CaseAction::RelayConnect {
                    auth: AuthMode::Login(admin()),
                },
                Expectation::FirstMessage(WELCOME_MESSAGE.to_string()),
            ),
        ],
    }
}

/// Builds the suites for `kinds`, always in auth, registry, relay order.
pub fn catalogue(kinds: &[SuiteKind], include_protected: bool) -> Vec<Suite> {
    SuiteKind::ALL
        .into_iter()
        .filter(|kind| kinds.contains(kind))
        .map(|kind| match kind {
            SuiteKind::Auth => auth_suite(),
            SuiteKind::Registry => registry_suite(include_protected),
            SuiteKind::Relay => relay_suite(),
        })
        .collect()
}
