use super::assertions::Assertion;
use super::stubs::{unreachable_url, ServiceStub, StubOptions};
use anyhow::{Context, Result};
use probe_core::{
    catalogue, CasePreview, CaseResult, Config, Reporter, RunReport, Sequencer, ServiceEnv,
    SuiteKind, TestCase,
};

/// Collects reporter callbacks for later inspection
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub sections: Vec<String>,
    pub previews: Vec<(String, CasePreview)>,
    pub finished: Vec<String>,
}

impl Reporter for RecordingReporter {
    fn section(&mut self, title: &str) {
        self.sections.push(title.to_string());
    }

    fn case_started(&mut self, case: &TestCase, preview: &CasePreview) {
        self.previews.push((case.name.clone(), preview.clone()));
    }

    fn case_finished(&mut self, result: &CaseResult) {
        self.finished.push(result.name.clone());
    }
}

/// Builds a config whose services all point at `base_url`, with short timeouts
pub fn stub_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.services.auth_url = base_url.to_string();
    config.services.registry_url = base_url.to_string();
    config.services.relay_url = base_url.to_string();
    config.timeouts.startup_delay_secs = 0;
    config.timeouts.http_timeout_secs = 5;
    config.timeouts.connect_timeout_ms = 5_000;
    config.timeouts.receive_timeout_ms = 2_000;
    config.timeouts.close_timeout_ms = 500;
    config.timeouts.rejection_grace_ms = 300;
    config
}

/// Executes a probe run against a freshly spawned stub
pub struct ScenarioRunner {
    stub: ServiceStub,
    config: Config,
    reporter: RecordingReporter,
}

impl ScenarioRunner {
    /// Spawn the stub and point every service at it, except those listed in `down`
    pub fn new(options: StubOptions, down: &[ServiceEnv]) -> Result<Self> {
        let stub = ServiceStub::spawn_with(options)?;
        let mut config = stub_config(stub.base_url());
        for service in down {
            let url = unreachable_url();
            match service {
                ServiceEnv::AuthUrl => config.services.auth_url = url,
                ServiceEnv::RegistryUrl => config.services.registry_url = url,
                ServiceEnv::RelayUrl => config.services.relay_url = url,
            }
        }

        Ok(Self {
            stub,
            config,
            reporter: RecordingReporter::default(),
        })
    }

    /// Mutable access for per-scenario config tweaks
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn stub(&self) -> &ServiceStub {
        &self.stub
    }

    pub fn reporter(&self) -> &RecordingReporter {
        &self.reporter
    }

    /// Run the selected suites
    pub async fn execute(
        &mut self,
        kinds: &[SuiteKind],
        include_protected: bool,
    ) -> Result<RunReport> {
        let sequencer =
            Sequencer::from_config(&self.config).context("sequencer setup failed")?;
        let suites = catalogue(kinds, include_protected);
        Ok(sequencer.run(&suites, &mut self.reporter).await)
    }

    /// Check every assertion, naming the first that fails
    pub fn verify(&self, report: &RunReport, assertions: &[Assertion]) -> Result<()> {
        for (i, assertion) in assertions.iter().enumerate() {
            assertion
                .check(report, &self.stub)
                .with_context(|| format!("Assertion {}: {:?}", i, assertion))?;
        }
        Ok(())
    }
}
