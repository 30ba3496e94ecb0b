//! Sequential driver over every selected case

use simreg_common::{CaseError, CaseResult, HarnessConfig, RunReport, StageResult, TestCase};
use simreg_compare::CaseComparator;
use simreg_reference::ReferenceProvider;
use simreg_runner::{CaseRunner, CaseStages};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, error, info, info_span, warn};

/// Remove `path` if present and recreate it empty
pub fn reset_run_dir(path: &Path) -> io::Result<()> {
    if path.exists() {
        std::fs::remove_dir_all(path)?;
    }
    std::fs::create_dir_all(path)
}

/// Runs every case through the runner and, on success, the comparator
pub struct RunLoop<S> {
    config: Arc<HarnessConfig>,
    runner: CaseRunner<S>,
    comparator: CaseComparator,
}

impl<S: CaseStages> RunLoop<S> {
    pub fn new(config: Arc<HarnessConfig>, stages: S, provider: Arc<dyn ReferenceProvider>) -> Self {
        let comparator = CaseComparator::new(Arc::clone(&config), provider);
        Self { config, runner: CaseRunner::new(stages), comparator }
    }

    /// Run `cases` in order, one result each.
    ///
    /// A fatal error records the current case and stops the loop; the report
    /// is marked aborted and later cases get no result.
    pub async fn run(&self, cases: &[TestCase]) -> RunReport {
        let mut report = RunReport::new();
        info!(target: "simreg::runner", "Regression test start.");

        for case in cases {
            let test_id = case.test_id();
            if report.get(&test_id).is_some() {
                warn!(target: "simreg::runner", "Skipping duplicate case {test_id}");
                continue;
            }

            let span = info_span!("case", test_id = %test_id);
            let started = Instant::now();
            let outcome = self.run_case(case, &test_id).instrument(span).await;
            let elapsed = started.elapsed();

            match outcome {
                Ok(()) => {
                    info!(target: "simreg::runner", "{test_id} passed in {:.1}s", elapsed.as_secs_f64());
                    report.record(test_id, CaseResult::success(elapsed));
                }
                Err(err) => {
                    error!(target: "simreg::runner", "{test_id} failed ({}): {}", err.status(), err.reason());
                    let fatal = err.is_fatal();
                    report.record(test_id.clone(), CaseResult::from_error(&err, elapsed));
                    if fatal {
                        error!(target: "simreg::runner", "Aborting run at {test_id}: {err}");
                        report.aborted = Some(err.reason());
                        break;
                    }
                }
            }
        }

        info!(target: "simreg::runner", "Regression test done.");
        report
    }

    async fn run_case(&self, case: &TestCase, test_id: &str) -> StageResult<()> {
        info!(target: "simreg::runner", "Start running case: {}", case.case_name());
        let run_dir = self.config.run_dir(test_id);
        reset_run_dir(&run_dir).map_err(|e| {
            CaseError::copy_files(format!("Cannot prepare {}: {e}", run_dir.display()))
        })?;

        self.runner.run(case, &run_dir).await?;
        self.comparator.compare(case, &run_dir).await
    }
}
