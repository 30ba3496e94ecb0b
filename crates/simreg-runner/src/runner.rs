//! Fail-fast driver over [`CaseStages`]

use crate::stages::CaseStages;
use crate::state::CaseState;
use simreg_common::{StageResult, TestCase};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{Instrument, debug, error, info, info_span};

/// A state change with the time spent in the state that was left
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: CaseState,
    pub to: CaseState,
    pub elapsed: Duration,
}

/// Drives one case through its stages, stopping at the first failure
pub struct CaseRunner<S> {
    stages: S,
}

impl<S: CaseStages> CaseRunner<S> {
    pub fn new(stages: S) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &S {
        &self.stages
    }

    /// Run every stage of `case` in `run_dir`.
    ///
    /// Returns the first stage error unchanged; later stages never run.
    pub async fn run(&self, case: &TestCase, run_dir: &Path) -> StageResult<Vec<StateTransition>> {
        let mut state = CaseState::Init;
        let mut history = Vec::with_capacity(8);

        while let Some(phase) = state.phase() {
            let started = Instant::now();
            let outcome = self
                .run_stage(state, case, run_dir)
                .instrument(info_span!("phase", name = phase))
                .await;

            let next = if outcome.is_ok() { state.next() } else { CaseState::Failed };
            debug_assert!(state.can_transition_to(next));
            debug!(target: "simreg::runner", "{state} -> {next}");
            history.push(StateTransition { from: state, to: next, elapsed: started.elapsed() });

            if let Err(err) = outcome {
                error!(target: "simreg::runner", "{phase} failed ({}): {}", err.status(), err.reason());
                return Err(err);
            }
            state = next;
        }

        history.push(StateTransition { from: state, to: CaseState::Done, elapsed: Duration::ZERO });
        info!(target: "simreg::runner", "Case {} finished all stages", case.case_name());
        Ok(history)
    }

    async fn run_stage(&self, state: CaseState, case: &TestCase, run_dir: &Path) -> StageResult<()> {
        match state {
            CaseState::Init => self.stages.compile(case, run_dir).await,
            CaseState::Compiled => self.stages.stage(case, run_dir).await,
            CaseState::Staged => self.stages.configure(case, run_dir).await,
            CaseState::Configured => self.stages.pre_script(case, run_dir).await,
            CaseState::PreScripted => self.stages.execute(case, run_dir).await,
            CaseState::Executed => self.stages.post_script(case, run_dir).await,
            CaseState::PostScripted | CaseState::Done | CaseState::Failed => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use simreg_common::{CaseError, Status};
    use std::sync::Mutex;

    /// Records every stage call and fails the configured one
    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<&'static str>>,
        fail_at: Option<&'static str>,
    }

    impl Recording {
        fn failing_at(stage: &'static str) -> Self {
            Self { fail_at: Some(stage), ..Default::default() }
        }

        fn hit(&self, stage: &'static str) -> StageResult<()> {
            self.calls.lock().unwrap().push(stage);
            match self.fail_at {
                Some(s) if s == stage => Err(match stage {
                    "compile" => CaseError::compile("Compiling error."),
                    "stage" => CaseError::copy_files("copy failed"),
                    "configure" => CaseError::edit_file("edit failed"),
                    "execute" => CaseError::external("GAMER error"),
                    _ => CaseError::external(format!("Error while executing {stage}.")),
                }),
                _ => Ok(()),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CaseStages for Recording {
        async fn compile(&self, _: &TestCase, _: &Path) -> StageResult<()> {
            self.hit("compile")
        }
        async fn stage(&self, _: &TestCase, _: &Path) -> StageResult<()> {
            self.hit("stage")
        }
        async fn configure(&self, _: &TestCase, _: &Path) -> StageResult<()> {
            self.hit("configure")
        }
        async fn pre_script(&self, _: &TestCase, _: &Path) -> StageResult<()> {
            self.hit("pre_script")
        }
        async fn execute(&self, _: &TestCase, _: &Path) -> StageResult<()> {
            self.hit("execute")
        }
        async fn post_script(&self, _: &TestCase, _: &Path) -> StageResult<()> {
            self.hit("post_script")
        }
    }

    const ALL: [&str; 6] = ["compile", "stage", "configure", "pre_script", "execute", "post_script"];

    #[tokio::test]
    async fn runs_all_stages_in_order() {
        let runner = CaseRunner::new(Recording::default());
        let history = runner.run(&TestCase::new("p", "t", 0), Path::new("/tmp")).await.unwrap();

        assert_eq!(runner.stages().calls(), ALL);
        assert_eq!(history.last().map(|t| t.to), Some(CaseState::Done));
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        for (n, failing) in ALL.iter().enumerate() {
            let runner = CaseRunner::new(Recording::failing_at(failing));
            let err = runner.run(&TestCase::new("p", "t", 0), Path::new("/tmp")).await.unwrap_err();

            assert_eq!(runner.stages().calls(), &ALL[..=n], "failing at {failing}");
            let expected = match *failing {
                "compile" => Status::CompileErr,
                "stage" => Status::CopyFiles,
                "configure" => Status::EditFile,
                _ => Status::External,
            };
            assert_eq!(err.status(), expected);
        }
    }
}
