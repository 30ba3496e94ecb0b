//! [`CaseStages`] backed by the real configure generator, `make` and simulator

use crate::input::edit_input_file;
use crate::stages::CaseStages;
use crate::staging::{copy_into, copy_tree};
use async_trait::async_trait;
use simreg_common::{
    CaseError, HarnessConfig, RestoreGuard, StageResult, TestCase, file_stdio, run_logged,
    run_scripts,
};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

const INPUT_PARAMETER: &str = "Input__Parameter";
const INPUT_TESTPROB: &str = "Input__TestProb";
const BUILD_LOG: &str = "make.log";
const MAKEFILE_LOG: &str = "Makefile.log";

pub struct SimulatorStages {
    config: Arc<HarnessConfig>,
}

impl SimulatorStages {
    pub fn new(config: Arc<HarnessConfig>) -> Self {
        Self { config }
    }

    /// `<python> configure.py --machine=<m> --<flag>=<value>... <forced args>`
    pub fn configure_command(&self, case: &TestCase) -> Command {
        let build = &self.config.build;
        let mut cmd = Command::new(&build.python);
        cmd.arg("configure.py").arg(format!("--machine={}", build.machine));
        for (flag, value) in &case.makefile_cfg {
            cmd.arg(format!("--{flag}={value}"));
        }
        cmd.args(&build.forced_args).current_dir(self.config.src_dir());
        cmd
    }

    /// The staged simulator binary, wrapped in the MPI launcher when enabled
    pub fn execute_command(&self, case: &TestCase, run_dir: &Path) -> Command {
        let binary = &self.config.build.binary_name;
        let mpi = &self.config.run.mpi;
        let mut cmd = if case.mpi_enabled() {
            let mut cmd = Command::new(&mpi.launcher);
            cmd.arg("-map-by")
                .arg(format!("ppr:{}:socket:pe={}", mpi.ranks, mpi.cores_per_rank))
                .arg("--report-bindings")
                .arg(format!("./{binary}"));
            cmd
        } else {
            Command::new(run_dir.join(binary))
        };
        cmd.current_dir(run_dir);
        cmd
    }

    async fn make(&self, src: &Path) -> StageResult<()> {
        let compile_err = || CaseError::compile("Compiling error.");
        let make = &self.config.build.make;

        let mut clean = Command::new(make);
        clean.arg("clean").current_dir(src);
        if !run_logged(&mut clean).await.map_err(|_| compile_err())?.success() {
            return Err(compile_err());
        }

        let jobs = self.config.build.jobs.map_or_else(|| "-j".to_string(), |n| format!("-j{n}"));
        let log = src.join(BUILD_LOG);
        let mut build = Command::new(make);
        build
            .arg(jobs)
            .current_dir(src)
            .stdout(file_stdio(&log, false).map_err(|e| CaseError::compile(e.to_string()))?);
        if !run_logged(&mut build).await.map_err(|_| compile_err())?.success() {
            return Err(compile_err());
        }
        if let Err(e) = std::fs::remove_file(&log) {
            warn!(target: "simreg::runner", "Cannot remove {}: {e}", log.display());
        }
        Ok(())
    }
}

#[async_trait]
impl CaseStages for SimulatorStages {
    async fn compile(&self, case: &TestCase, _run_dir: &Path) -> StageResult<()> {
        info!(target: "simreg::runner", "Start compiling the simulator");
        let src = self.config.src_dir();
        let makefile = src.join("Makefile");
        let _guard = RestoreGuard::new(&makefile).map_err(|e| {
            CaseError::editing(format!("Cannot back up {}: {e}", makefile.display()))
        })?;

        let mut configure = self.configure_command(case);
        debug!(target: "simreg::runner", "Generating Makefile using: {:?}", configure.as_std());
        let status = run_logged(&mut configure)
            .await
            .map_err(|e| CaseError::editing(format!("Error while editing Makefile: {e}")))?;
        if !status.success() {
            return Err(CaseError::editing("Error while editing Makefile."));
        }

        self.make(&src).await?;

        let binary = self.config.built_binary();
        if !binary.is_file() {
            return Err(CaseError::compile(format!("{} does not exist.", binary.display())));
        }
        info!(target: "simreg::runner", "Compiling the simulator done.");
        Ok(())
    }

    async fn stage(&self, case: &TestCase, run_dir: &Path) -> StageResult<()> {
        let inputs = self.config.paths.tests_root.join(&case.problem_name).join("Inputs");
        info!(
            target: "simreg::runner",
            "Copying the test folder: {} ---> {}",
            inputs.display(),
            run_dir.display()
        );
        let copy_err = |e: std::io::Error| {
            CaseError::copy_files(format!("Error when copying to {}: {e}", run_dir.display()))
        };
        copy_tree(&inputs, run_dir).map_err(copy_err)?;
        copy_into(&self.config.built_binary(), run_dir).map_err(copy_err)?;
        copy_into(&self.config.src_dir().join(MAKEFILE_LOG), run_dir).map_err(copy_err)?;
        info!(target: "simreg::runner", "Copy completed.");
        Ok(())
    }

    async fn configure(&self, case: &TestCase, run_dir: &Path) -> StageResult<()> {
        edit_input_file(&run_dir.join(INPUT_PARAMETER), &case.input_parameter)?;
        edit_input_file(&run_dir.join(INPUT_TESTPROB), &case.input_testprob)
    }

    async fn pre_script(&self, case: &TestCase, run_dir: &Path) -> StageResult<()> {
        run_scripts(&case.pre_scripts, run_dir, &self.config).await
    }

    async fn execute(&self, case: &TestCase, run_dir: &Path) -> StageResult<()> {
        let log = run_dir.join(&self.config.run.log_file);
        let log_err = |e: simreg_common::ProcessError| CaseError::external(e.to_string());

        let mut cmd = self.execute_command(case, run_dir);
        cmd.stdin(Stdio::null())
            .stdout(file_stdio(&log, true).map_err(log_err)?)
            .stderr(file_stdio(&log, true).map_err(log_err)?);
        info!(target: "simreg::runner", "Running the simulator.");
        debug!(target: "simreg::runner", "exec: {:?}", cmd.as_std());
        let status = cmd
            .status()
            .await
            .map_err(|e| CaseError::external(format!("Cannot start the simulator: {e}")))?;
        if !status.success() {
            return Err(CaseError::external("GAMER error"));
        }

        let marker = &self.config.run.marker_file;
        if !run_dir.join(marker).is_file() {
            return Err(CaseError::fail(format!(
                "No {marker} in {}.",
                run_dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
            )));
        }
        info!(target: "simreg::runner", "Simulator done.");
        Ok(())
    }

    async fn post_script(&self, case: &TestCase, run_dir: &Path) -> StageResult<()> {
        run_scripts(&case.post_scripts, run_dir, &self.config).await
    }
}
