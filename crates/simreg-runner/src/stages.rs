use async_trait::async_trait;
use simreg_common::{StageResult, TestCase};
use std::path::Path;

/// The six side-effecting steps of a case run.
///
/// [`SimulatorStages`](crate::SimulatorStages) drives the real build tool and
/// simulator; tests substitute recording fakes.
#[async_trait]
pub trait CaseStages: Send + Sync {
    /// Configure and build the simulator for `case`
    async fn compile(&self, case: &TestCase, run_dir: &Path) -> StageResult<()>;

    /// Populate `run_dir` with inputs, binary and build log
    async fn stage(&self, case: &TestCase, run_dir: &Path) -> StageResult<()>;

    /// Apply the case's runtime parameters to the staged input files
    async fn configure(&self, case: &TestCase, run_dir: &Path) -> StageResult<()>;

    async fn pre_script(&self, case: &TestCase, run_dir: &Path) -> StageResult<()>;

    async fn execute(&self, case: &TestCase, run_dir: &Path) -> StageResult<()>;

    async fn post_script(&self, case: &TestCase, run_dir: &Path) -> StageResult<()>;
}
