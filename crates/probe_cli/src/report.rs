//! Console rendering of case progress.

use console::style;
use probe_core::{CasePreview, CaseResult, Reporter, TestCase, TestOutcome};

/// Prints each case as it runs.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for ConsoleReporter {
    fn section(&mut self, title: &str) {
        println!();
        println!(
            "{}",
            style(format!("=== {} ===", title.to_uppercase())).bold()
        );
    }

    fn case_started(&mut self, case: &TestCase, preview: &CasePreview) {
        println!();
        println!("{}", style(&case.name).cyan().bold());
        println!("  Target:   {}", preview.target);
        for (name, value) in &preview.inputs {
            println!("  {name}: {value}");
        }
        println!("  Expected: {}", preview.expected);
    }

    fn case_finished(&mut self, result: &CaseResult) {
        let label = result.outcome.label();
        match &result.outcome {
            TestOutcome::Passed { detail } => {
                println!("  {} {}", style(format!("✓ {label}")).green().bold(), detail);
            }
            TestOutcome::UnexpectedResult {
                expected,
                actual,
                body,
            } => {
                println!("  {}", style(format!("✗ {label}")).yellow().bold());
                println!("    Expected: {expected}");
                println!("    Actual:   {actual}");
                println!("    Response: {}", display_body(body));
            }
            TestOutcome::ConnectionError {
                message,
                fatal,
                suggestion,
            } => {
                println!("  {}", style(format!("✗ {label}")).red().bold());
                println!("    Error: {message}");
                if let Some(tip) = suggestion {
                    println!("    {} {}", style("Tip:").cyan(), tip);
                }
                if *fatal {
                    println!("    {}", style("This case is fatal; stopping.").red());
                }
            }
            TestOutcome::Abandoned { reason } => {
                println!("  {} {}", style(format!("⊘ {label}")).yellow().bold(), reason);
            }
            TestOutcome::ContractViolation { message } => {
                println!("  {}", style(format!("✗ {label}")).magenta().bold());
                println!("    {message}");
            }
        }
        println!("  {}", style(format!("({} ms)", result.elapsed_ms)).dim());
    }
}

fn display_body(body: &str) -> &str {
    if body.trim().is_empty() {
        "(empty)"
    } else {
        body
    }
}
