use async_trait::async_trait;
use simreg_common::{CaseError, StageResult, TestCase, TestReference};
use std::path::{Path, PathBuf};

/// Resolves a declared reference into a local file, and publishes new ones.
#[async_trait]
pub trait ReferenceProvider: Send + Sync {
    /// Materialise `reference` as `dest_dir/<reference.name>` and return that path.
    async fn fetch(
        &self,
        case: &TestCase,
        reference: &TestReference,
        dest_dir: &Path,
    ) -> StageResult<PathBuf>;

    /// Publish `source` as the new golden copy of `reference`.
    async fn push(
        &self,
        case: &TestCase,
        reference: &TestReference,
        source: &Path,
    ) -> StageResult<PathBuf> {
        let _ = (case, source);
        Err(CaseError::upload(format!(
            "Publishing to {} references is not supported.",
            reference.loc.kind()
        )))
    }
}

/// Destination of `reference` under `dest_dir`, with parent directories created
pub(crate) fn prepare_target(dest_dir: &Path, reference: &TestReference) -> StageResult<PathBuf> {
    let target = dest_dir.join(&reference.name);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            CaseError::external(format!("Can not create {}: {e}", parent.display()))
        })?;
    }
    Ok(target)
}
