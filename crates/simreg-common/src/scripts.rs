use crate::config::HarnessConfig;
use crate::error::{CaseError, StageResult};
use crate::process::{file_stdio, run_logged};
use std::path::Path;
use tokio::process::Command;
use tracing::info;

/// Run user scripts in order with the run directory as argument and cwd.
///
/// Stops at the first missing script (`MISSING_FILE`) or failing script
/// (`EXTERNAL`). Script stdout is appended to the run log.
pub async fn run_scripts(
    scripts: &[String],
    run_dir: &Path,
    config: &HarnessConfig,
) -> StageResult<()> {
    for script in scripts {
        let path = config.resolve(script);
        if !path.is_file() {
            return Err(CaseError::missing_file(&path));
        }

        info!(target: "simreg::runner", "Executing: {}", path.display());
        let stdout = file_stdio(&run_dir.join(&config.run.log_file), true)
            .map_err(|e| CaseError::external(e.to_string()))?;
        let mut cmd = Command::new(&config.run.shell);
        cmd.arg(&path).arg(run_dir).current_dir(run_dir).stdout(stdout);

        let status = run_logged(&mut cmd)
            .await
            .map_err(|e| CaseError::external(format!("Error while executing {script}: {e}")))?;
        if !status.success() {
            return Err(CaseError::external(format!("Error while executing {script}.")));
        }
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::status::Status;
    use tempfile::TempDir;

    fn setup() -> (TempDir, HarnessConfig) {
        let root = TempDir::new().unwrap();
        let config =
            ConfigBuilder::new().source_root(Some(root.path().to_path_buf())).build().unwrap();
        (root, config)
    }

    #[tokio::test]
    async fn scripts_run_in_order_with_run_dir_argument() {
        let (root, config) = setup();
        let run_dir = root.path().join("run");
        std::fs::create_dir(&run_dir).unwrap();
        std::fs::write(root.path().join("a.sh"), "echo a >> \"$1/order\"\n").unwrap();
        std::fs::write(root.path().join("b.sh"), "echo b >> order\n").unwrap();

        run_scripts(&["a.sh".to_string(), "b.sh".to_string()], &run_dir, &config).await.unwrap();

        assert_eq!(std::fs::read_to_string(run_dir.join("order")).unwrap(), "a\nb\n");
    }

    #[tokio::test]
    async fn failing_script_stops_the_chain() {
        let (root, config) = setup();
        let run_dir = root.path().to_path_buf();
        std::fs::write(root.path().join("bad.sh"), "exit 1\n").unwrap();
        std::fs::write(root.path().join("later.sh"), "touch later_ran\n").unwrap();

        let err = run_scripts(&["bad.sh".to_string(), "later.sh".to_string()], &run_dir, &config)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Status::External);
        assert!(!run_dir.join("later_ran").exists());
    }

    #[tokio::test]
    async fn missing_script_is_missing_file() {
        let (root, config) = setup();
        let err = run_scripts(&["nope.sh".to_string()], root.path(), &config).await.unwrap_err();
        assert_eq!(err.status(), Status::MissingFile);
        assert!(err.reason().contains("nope.sh"));
    }
}
