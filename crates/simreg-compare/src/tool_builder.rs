//! Builds the structured-data compare tool once per test group

use crate::machine::{apply_machine_paths, parse_machine_paths};
use simreg_common::{
    CaseError, HarnessConfig, ParamMap, ParamValue, RestoreGuard, StageResult, TestCase,
    file_stdio, run_logged,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const MODEL_LINE: &str = "SIMU_OPTION += -DMODEL=HYDRO";

/// Makefile switches toggled by truthy build flags of the group's first case
const TOGGLES: &[(&str, &str)] = &[
    ("double", "SIMU_OPTION += -DFLOAT8"),
    ("debug", "SIMU_OPTION += -DGAMER_DEBUG"),
    ("hdf5", "SIMU_OPTION += -DSUPPORT_HDF5"),
];

/// Rewrite the compare tool's Makefile for one build configuration
pub fn configure_tool_makefile(
    original: &str,
    machine_paths: &[(String, String)],
    makefile_cfg: &ParamMap,
) -> StageResult<String> {
    let mut content = apply_machine_paths(original, machine_paths);

    if let Some(model) = makefile_cfg.get("model") {
        match model.as_str() {
            Some("HYDRO") => {}
            Some("ELBDM") => {
                content = content.replace(MODEL_LINE, "SIMU_OPTION += -DMODEL=ELBDM");
            }
            _ => {
                return Err(CaseError::fail(format!("Unknown model ({model}) for compare tool.")));
            }
        }
    }

    for (flag, option) in TOGGLES {
        if makefile_cfg.get(*flag).is_some_and(ParamValue::is_truthy) {
            content = content.replace(&format!("#{option}"), option);
        }
    }
    Ok(content)
}

/// Compiles the compare tool, caching the outcome per `<problem>_<type>` group
pub struct CompareToolBuilder {
    config: Arc<HarnessConfig>,
    built: Mutex<HashMap<String, StageResult<PathBuf>>>,
}

impl CompareToolBuilder {
    pub fn new(config: Arc<HarnessConfig>) -> Self {
        Self { config, built: Mutex::new(HashMap::new()) }
    }

    /// Build for `case`'s group unless this group was already attempted.
    ///
    /// The build always follows the group's first case, whichever case of the
    /// group gets here first.
    pub async fn ensure_built(&self, case: &TestCase) -> StageResult<PathBuf> {
        let group = case.group_key();
        let mut built = self.built.lock().await;
        if let Some(outcome) = built.get(&group) {
            return outcome.clone();
        }
        debug!(target: "simreg::compare", "Building compare tool for {group}");
        let outcome = self.build(&case.group_makefile_cfg).await;
        built.insert(group, outcome.clone());
        outcome
    }

    async fn build(&self, makefile_cfg: &ParamMap) -> StageResult<PathBuf> {
        info!(target: "simreg::compare", "Start compiling compare tool.");
        let tool_dir = &self.config.paths.compare_tool_dir;
        let makefile = tool_dir.join("Makefile");
        if !makefile.is_file() {
            return Err(CaseError::missing_file(&makefile));
        }
        let machine_config = self.config.machine_config();
        let profile = std::fs::read_to_string(&machine_config)
            .map_err(|_| CaseError::missing_file(&machine_config))?;
        let original = std::fs::read_to_string(&makefile)
            .map_err(|e| CaseError::compile(format!("Cannot read {}: {e}", makefile.display())))?;

        let content =
            configure_tool_makefile(&original, &parse_machine_paths(&profile), makefile_cfg)?;

        let _guard = RestoreGuard::new(&makefile)
            .map_err(|e| CaseError::compile(format!("Cannot back up {}: {e}", makefile.display())))?;
        std::fs::write(&makefile, content)
            .map_err(|e| CaseError::compile(format!("Cannot write {}: {e}", makefile.display())))?;
        info!(target: "simreg::compare", "Modified the Makefile of compare tool.");

        let make = &self.config.build.make;
        let compile_err = || CaseError::compile("Error while compiling the compare tool.");

        let mut clean = Command::new(make);
        clean.arg("clean").current_dir(tool_dir);
        let status = run_logged(&mut clean).await.map_err(|_| compile_err())?;
        if !status.success() {
            return Err(compile_err());
        }

        let make_log = tool_dir.join("make.log");
        let mut build = Command::new(make);
        build
            .current_dir(tool_dir)
            .stdout(file_stdio(&make_log, false).map_err(|e| CaseError::compile(e.to_string()))?);
        let status = run_logged(&mut build).await.map_err(|_| compile_err())?;
        if !status.success() {
            return Err(compile_err());
        }
        if let Err(e) = std::fs::remove_file(&make_log) {
            warn!(target: "simreg::compare", "Cannot remove {}: {e}", make_log.display());
        }

        let tool = self.config.compare_tool();
        if !tool.is_file() {
            return Err(CaseError::compile(format!(
                "Compare tool {} missing after build.",
                tool.display()
            )));
        }
        info!(target: "simreg::compare", "Compiling compare tool done.");
        Ok(tool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simreg_common::Status;

    const TOOL_MAKEFILE: &str = "\
HDF5_PATH := /usr
SIMU_OPTION += -DMODEL=HYDRO
#SIMU_OPTION += -DFLOAT8
#SIMU_OPTION += -DGAMER_DEBUG
#SIMU_OPTION += -DSUPPORT_HDF5
";

    fn cfg(pairs: &[(&str, ParamValue)]) -> ParamMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn toggles_follow_truthy_flags() {
        let out = configure_tool_makefile(
            TOOL_MAKEFILE,
            &[],
            &cfg(&[
                ("model", "ELBDM".into()),
                ("double", true.into()),
                ("debug", false.into()),
                ("hdf5", true.into()),
            ]),
        )
        .unwrap();

        assert!(out.contains("\nSIMU_OPTION += -DMODEL=ELBDM\n"));
        assert!(out.contains("\nSIMU_OPTION += -DFLOAT8\n"));
        assert!(out.contains("#SIMU_OPTION += -DGAMER_DEBUG"));
        assert!(out.contains("\nSIMU_OPTION += -DSUPPORT_HDF5\n"));
    }

    #[test]
    fn machine_paths_are_applied() {
        let out = configure_tool_makefile(
            TOOL_MAKEFILE,
            &[("HDF5_PATH".into(), "/opt/hdf5".into())],
            &ParamMap::new(),
        )
        .unwrap();
        assert!(out.starts_with("HDF5_PATH := /opt/hdf5\n# /usr\n"));
    }

    #[test]
    fn unknown_model_is_fail() {
        let err = configure_tool_makefile(TOOL_MAKEFILE, &[], &cfg(&[("model", "MHD".into())]))
            .unwrap_err();
        assert_eq!(err.status(), Status::Fail);
        assert!(err.reason().contains("MHD"));
    }
}
