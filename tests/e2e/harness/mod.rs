//! E2E test harness for the probe.
//!
//! This module contains test infrastructure with builders and variants that
//! not every scenario uses.

#![allow(dead_code)]

pub mod runner;
pub mod stubs;

// Re-export commonly used types
pub use assertions::{Assertion, OutcomeMatch};
pub use runner::{stub_config, RecordingReporter, ScenarioRunner};
pub use scenario::Scenario;
pub use stubs::{
    unreachable_url, AnonymousPolicy, CloseStyle, RelayMode, ServiceStub, StubOptions, ISSUED_TOKEN,
};
