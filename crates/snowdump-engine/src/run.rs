//! Multi-target driver: targets are dumped one after another

use snowdump_catalog::Connector;
use snowdump_core::{
    DumpError, DumpFailure, DumpReport, DumpSettings, FailureLocation, FailurePolicy, Target,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::orchestrator::DumpOrchestrator;
use crate::paths::PathAllocator;

/// A complete run over a list of targets
pub struct DumpRun {
    connector: Arc<dyn Connector>,
    paths: Arc<PathAllocator>,
    settings: DumpSettings,
}

impl DumpRun {
    pub fn new(connector: Arc<dyn Connector>, output_root: impl Into<PathBuf>, settings: DumpSettings) -> Self {
        Self {
            connector,
            paths: Arc::new(PathAllocator::new(output_root)),
            settings,
        }
    }

    pub fn output_root(&self) -> &std::path::Path {
        self.paths.root()
    }

    /// Dump every target in order and report what happened.
    ///
    /// Under fail-fast the first error is recorded and no further target is
    /// started. A folder clash stops the run under either policy.
    pub async fn execute(&self, targets: &[Target]) -> DumpReport {
        let mut report = DumpReport::new(self.paths.root());

        for target in targets {
            match self.dump_one(target, &mut report).await {
                Ok(()) => {}
                Err(e) => {
                    error!(target = %target.name, "Run stopped: {}", e);
                    report.add_failure(DumpFailure::new(FailureLocation::target(&target.name), None, &e));
                    break;
                }
            }
        }

        info!(
            targets = report.targets.len(),
            objects = report.objects_written(),
            failures = report.failures.len(),
            "Run complete"
        );
        report
    }

    async fn dump_one(&self, target: &Target, report: &mut DumpReport) -> Result<(), DumpError> {
        let connection = match self.connector.connect(target).await {
            Ok(connection) => connection,
            Err(e) => {
                let err = DumpError::Connect {
                    target: target.name.clone(),
                    message: e.to_string(),
                };
                if self.settings.failure_policy == FailurePolicy::FailFast {
                    return Err(err);
                }
                warn!(target = %target.name, "{}", err);
                report.add_failure(DumpFailure::new(FailureLocation::target(&target.name), None, &err));
                return Ok(());
            }
        };
        info!(target = %target.name, adapter = connection.name(), "Connected");

        let orchestrator = DumpOrchestrator::new(Arc::clone(&connection), Arc::clone(&self.paths), &self.settings);
        let result = orchestrator.dump_target(target).await;

        if let Err(e) = connection.close().await {
            warn!(target = %target.name, "Closing connection failed: {}", e);
        }

        let outcome = result?;
        report.add_target(outcome.summary, outcome.failures);
        Ok(())
    }
}
