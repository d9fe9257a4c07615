//! Outcome types and the reporter seam.
//!
//! The sequencer produces structured outcomes and hands them to a
//! [`Reporter`]; rendering lives with the caller.

use crate::error::ProbeError;
use crate::suite::TestCase;
use serde::Serialize;

/// How a single case ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TestOutcome {
    /// The expectation held.
    Passed { detail: String },
    /// The call completed but status or content differed.
    UnexpectedResult {
        expected: String,
        actual: String,
        body: String,
    },
    /// The call never completed.
    ConnectionError {
        message: String,
        fatal: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        suggestion: Option<String>,
    },
    /// A prerequisite login failed, so the case could not run.
    Abandoned { reason: String },
    /// An operation was invoked in a state that does not allow it.
    ContractViolation { message: String },
}

impl TestOutcome {
    /// Classifies an error raised while running a case.
    pub fn from_error(err: &ProbeError, fatal: bool) -> Self {
        if err.is_contract_violation() {
            return Self::ContractViolation {
                message: err.to_string(),
            };
        }
        Self::ConnectionError {
            message: err.to_string(),
            fatal,
            suggestion: err.recovery_suggestion().map(str::to_string),
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }

    /// True for a connection error in a fatal case.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConnectionError { fatal: true, .. })
    }

    /// Short uppercase label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Passed { .. } => "PASSED",
            Self::UnexpectedResult { .. } => "UNEXPECTED RESULT",
            Self::ConnectionError { .. } => "FAILED - Connection Error",
            Self::Abandoned { .. } => "ABANDONED",
            Self::ContractViolation { .. } => "CONTRACT VIOLATION",
        }
    }
}

/// What a case is about to do, shown before it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CasePreview {
    /// Endpoint or relay URL. Tokens are masked.
    pub target: String,
    /// Input name/value pairs. Secrets are masked.
    pub inputs: Vec<(String, String)>,
    /// Expected behavior in words.
    pub expected: String,
}

/// A finished case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseResult {
    pub name: String,
    pub fatal: bool,
    #[serde(flatten)]
    pub outcome: TestOutcome,
    pub elapsed_ms: u64,
}

/// Receives progress from the sequencer.
pub trait Reporter {
    /// A suite is starting.
    fn section(&mut self, title: &str);

    /// A case is about to run.
    fn case_started(&mut self, case: &TestCase, preview: &CasePreview);

    /// A case finished.
    fn case_finished(&mut self, result: &CaseResult);
}

/// Reporter that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn section(&mut self, _title: &str) {}

    fn case_started(&mut self, _case: &TestCase, _preview: &CasePreview) {}

    fn case_finished(&mut self, _result: &CaseResult) {}
}

/// Summary of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub passed: usize,
    /// Unexpected results, connection errors and contract violations.
    pub failed: usize,
    pub abandoned: usize,
    /// Cases never started because the run stopped early.
    pub skipped: usize,
    /// A fatal case failed or the run was cancelled.
    pub aborted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
    pub cases: Vec<CaseResult>,
}

impl RunReport {
    /// Adds a finished case to the counts.
    pub fn record(&mut self, result: CaseResult) {
        match &result.outcome {
            TestOutcome::Passed { .. } => self.passed += 1,
            TestOutcome::Abandoned { .. } => self.abandoned += 1,
            _ => self.failed += 1,
        }
        self.cases.push(result);
    }

    /// Marks the run as stopped early.
    pub fn abort(&mut self, reason: impl Into<String>) {
        self.aborted = true;
        self.abort_reason = Some(reason.into());
    }

    /// Number of cases that ran.
    pub fn executed(&self) -> usize {
        self.cases.len()
    }

    /// Process exit status: 1 only when the run was aborted.
    pub fn exit_code(&self) -> u8 {
        u8::from(self.aborted)
    }

    /// Looks up a case result by name.
    pub fn case(&self, name: &str) -> Option<&CaseResult> {
        self.cases.iter().find(|c| c.name == name)
    }
}
