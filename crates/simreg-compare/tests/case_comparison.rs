use async_trait::async_trait;
use simreg_common::{FileType, HarnessConfig, StageResult, Status, TestCase, TestReference};
use simreg_compare::CaseComparator;
use simreg_reference::ReferenceProvider;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Serves canned reference contents keyed by reference name
struct CannedProvider {
    contents: HashMap<String, String>,
}

#[async_trait]
impl ReferenceProvider for CannedProvider {
    async fn fetch(
        &self,
        _case: &TestCase,
        reference: &TestReference,
        dest_dir: &Path,
    ) -> StageResult<PathBuf> {
        let target = dest_dir.join(&reference.name);
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        if let Some(body) = self.contents.get(&reference.name) {
            std::fs::write(&target, body).unwrap();
        }
        Ok(target)
    }
}

fn reference(name: &str, file_type: FileType) -> TestReference {
    TestReference { name: name.into(), loc: "local:".parse().unwrap(), file_type }
}

fn comparator(error_level: &str, refs: &[(&str, &str)]) -> CaseComparator {
    let mut config = HarnessConfig::default();
    config.compare.error_level = error_level.to_string();
    let provider = CannedProvider {
        contents: refs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
    };
    CaseComparator::new(Arc::new(config), Arc::new(provider))
}

fn text_case(levels: &[(&str, f64)]) -> TestCase {
    let mut case = TestCase::new("AcousticWave", "input1", 0);
    case.references.push(reference("Xline_y0.000_z0.000_000001", FileType::Text));
    case.levels = levels.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    case
}

fn write_result(run_dir: &Path, body: &str) {
    std::fs::write(run_dir.join("Xline_y0.000_z0.000_000001"), body).unwrap();
}

#[tokio::test]
async fn text_within_tolerance_passes() {
    let run = TempDir::new().unwrap();
    write_result(run.path(), "# x rho\n0.0 1.00\n0.5 1.20\n");
    let cmp = comparator("level0", &[("Xline_y0.000_z0.000_000001", "0.0 1.00\n0.5 1.25\n")]);

    cmp.compare(&text_case(&[("level0", 0.1)]), run.path()).await.unwrap();
    assert!(run.path().join("reference/Xline_y0.000_z0.000_000001").is_file());
}

#[tokio::test]
async fn exceeded_tolerance_cites_observed_and_allowed() {
    let run = TempDir::new().unwrap();
    write_result(run.path(), "0.0 1.0\n0.5 1.5\n");
    let cmp = comparator("level1", &[("Xline_y0.000_z0.000_000001", "0.0 1.0\n0.5 1.0\n")]);

    let err = cmp
        .compare(&text_case(&[("level0", 1e-1), ("level1", 1e-3)]), run.path())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Status::Comparison);
    assert!(err.reason().contains("Expected: 1.0000e-3"), "{}", err.reason());
    assert!(err.reason().contains("Test: 5.0000e-1"), "{}", err.reason());
}

#[tokio::test]
async fn micro_level_rejects_double_the_allowed_error() {
    let run = TempDir::new().unwrap();
    write_result(run.path(), "0.0 2e-6\n");
    let cmp = comparator("level0", &[("Xline_y0.000_z0.000_000001", "0.0 0.0\n")]);

    let err = cmp.compare(&text_case(&[("level0", 1e-6)]), run.path()).await.unwrap_err();
    assert_eq!(err.status(), Status::Comparison);
    assert!(err.reason().contains("Expected: 1.0000e-6"), "{}", err.reason());
    assert!(err.reason().contains("Test: 2.0000e-6"), "{}", err.reason());
}

#[tokio::test]
async fn error_equal_to_level_passes() {
    let run = TempDir::new().unwrap();
    write_result(run.path(), "0.0 1e-6\n");
    let cmp = comparator("level0", &[("Xline_y0.000_z0.000_000001", "0.0 0.0\n")]);

    cmp.compare(&text_case(&[("level0", 1e-6)]), run.path()).await.unwrap();
}

#[tokio::test]
async fn undefined_level_falls_back_to_level0() {
    let run = TempDir::new().unwrap();
    write_result(run.path(), "1.0\n");
    let cmp = comparator("level7", &[("Xline_y0.000_z0.000_000001", "1.05\n")]);

    cmp.compare(&text_case(&[("level0", 0.1)]), run.path()).await.unwrap();
}

#[tokio::test]
async fn no_usable_level_is_comparison_failure() {
    let run = TempDir::new().unwrap();
    write_result(run.path(), "1.0\n");
    let cmp = comparator("level2", &[("Xline_y0.000_z0.000_000001", "1.0\n")]);

    let err = cmp.compare(&text_case(&[("level1", 0.1)]), run.path()).await.unwrap_err();
    assert_eq!(err.status(), Status::Comparison);
}

#[tokio::test]
async fn missing_artifact_is_missing_file() {
    let run = TempDir::new().unwrap();
    let cmp = comparator("level0", &[("Xline_y0.000_z0.000_000001", "1.0\n")]);

    let err = cmp.compare(&text_case(&[("level0", 0.1)]), run.path()).await.unwrap_err();
    assert_eq!(err.status(), Status::MissingFile);
    assert!(err.reason().ends_with("does not exist."));
}

#[tokio::test]
async fn missing_reference_is_missing_file() {
    let run = TempDir::new().unwrap();
    write_result(run.path(), "1.0\n");
    let cmp = comparator("level0", &[]);

    let err = cmp.compare(&text_case(&[("level0", 0.1)]), run.path()).await.unwrap_err();
    assert_eq!(err.status(), Status::MissingFile);
    assert!(err.reason().contains("reference"));
}

#[tokio::test]
async fn note_differences_never_fail_and_need_no_level() {
    let run = TempDir::new().unwrap();
    std::fs::write(run.path().join("Record__Note"), "S\n*****\nA 1\n*****\n").unwrap();
    let cmp = comparator("level0", &[("Record__Note", "S\n*****\nA 2\n*****\n")]);

    let mut case = TestCase::new("Riemann", "input1", 0);
    case.references.push(reference("Record__Note", FileType::Note));
    cmp.compare(&case, run.path()).await.unwrap();
}
