//! The build configuration survives every compile attempt unchanged.
#![cfg(unix)]

use serial_test::serial;
use simreg_common::{ConfigBuilder, HarnessConfig, ParamValue, Status, TestCase};
use simreg_runner::{CaseStages, SimulatorStages};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const ORIGINAL: &str = "# hand-written Makefile\n";

fn setup(make_body: &str) -> (TempDir, Arc<HarnessConfig>) {
    let root = TempDir::new().unwrap();
    let src = root.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("Makefile"), ORIGINAL).unwrap();
    fs::write(src.join("configure.py"), "printf '%s\\n' \"$@\" > Makefile\n").unwrap();

    let make = root.path().join("fake-make");
    fs::write(&make, make_body).unwrap();
    fs::set_permissions(&make, fs::Permissions::from_mode(0o755)).unwrap();

    let mut config =
        ConfigBuilder::new().source_root(Some(root.path().to_path_buf())).build().unwrap();
    config.build.python = "sh".to_string();
    config.build.make = make.display().to_string();
    (root, Arc::new(config))
}

fn case() -> TestCase {
    let mut case = TestCase::new("Riemann", "input1", 0);
    case.makefile_cfg.insert("model".into(), ParamValue::from("HYDRO"));
    case
}

fn makefile(root: &Path) -> String {
    fs::read_to_string(root.join("src/Makefile")).unwrap()
}

#[tokio::test]
#[serial]
async fn restores_makefile_after_successful_build() {
    let (root, config) = setup("#!/bin/sh\n[ \"$1\" = clean ] || touch gamer\n");
    let stages = SimulatorStages::new(config);

    stages.compile(&case(), root.path()).await.unwrap();

    assert_eq!(makefile(root.path()), ORIGINAL);
    assert!(root.path().join("src/gamer").is_file());
    assert!(!root.path().join("src/make.log").exists());
}

#[tokio::test]
#[serial]
async fn restores_makefile_after_failed_build() {
    let (root, config) = setup("#!/bin/sh\n[ \"$1\" = clean ] || exit 2\n");
    let stages = SimulatorStages::new(config);

    let err = stages.compile(&case(), root.path()).await.unwrap_err();

    assert_eq!(err.status(), Status::CompileErr);
    assert_eq!(makefile(root.path()), ORIGINAL);
}

#[tokio::test]
#[serial]
async fn build_without_binary_is_a_compile_error() {
    let (root, config) = setup("#!/bin/sh\nexit 0\n");
    let stages = SimulatorStages::new(config);

    let err = stages.compile(&case(), root.path()).await.unwrap_err();

    assert_eq!(err.status(), Status::CompileErr);
    assert!(err.reason().contains("does not exist."));
}

#[tokio::test]
#[serial]
async fn failing_generator_is_an_editing_failure() {
    let (root, config) = setup("#!/bin/sh\nexit 0\n");
    fs::write(root.path().join("src/configure.py"), "exit 3\n").unwrap();
    let stages = SimulatorStages::new(config);

    let err = stages.compile(&case(), root.path()).await.unwrap_err();

    assert_eq!(err.status(), Status::EditingFail);
    assert_eq!(makefile(root.path()), ORIGINAL);
}
