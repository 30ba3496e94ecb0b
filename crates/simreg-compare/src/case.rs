//! Per-case comparison: fetch references, compare every artifact, run user checks

use crate::comparison::{Comparison, FileComparator, Outcome};
use crate::note::NoteComparator;
use crate::structured::StructuredComparator;
use crate::text::TextComparator;
use crate::tolerance::{self, Tolerance};
use crate::tool_builder::CompareToolBuilder;
use simreg_common::{CaseError, FileType, HarnessConfig, StageResult, TestCase, run_scripts};
use simreg_reference::ReferenceProvider;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Subdirectory of the run directory that receives fetched references
pub const REFERENCE_DIR: &str = "reference";

/// Compares a finished case's artifacts against its references
pub struct CaseComparator {
    config: Arc<HarnessConfig>,
    provider: Arc<dyn ReferenceProvider>,
    tools: CompareToolBuilder,
}

impl CaseComparator {
    pub fn new(config: Arc<HarnessConfig>, provider: Arc<dyn ReferenceProvider>) -> Self {
        let tools = CompareToolBuilder::new(Arc::clone(&config));
        Self { config, provider, tools }
    }

    /// Compare the artifacts of `case` found under `run_dir`.
    ///
    /// Every reference is compared even after a data mismatch, so the log shows
    /// all differing files; the first mismatch becomes the case's reason.
    /// A missing artifact or a comparator that cannot run stops immediately.
    /// User compare scripts only run once the automated comparison passed.
    pub async fn compare(&self, case: &TestCase, run_dir: &Path) -> StageResult<()> {
        info!(target: "simreg::compare", "Start comparing data.");
        let expected = self.fetch_references(case, run_dir).await?;

        let needs_tolerance = case.references.iter().any(|r| r.file_type != FileType::Note);
        let tolerance = if needs_tolerance {
            tolerance::resolve(&case.levels, &self.config.compare.error_level)?
        } else {
            Tolerance { level: self.config.compare.error_level.clone(), value: 0.0 }
        };

        let structured = if case.references.iter().any(|r| r.file_type == FileType::Hdf5) {
            let tool = self.tools.ensure_built(case).await?;
            Some(StructuredComparator::new(
                tool,
                self.config.compare.report_name.clone(),
                self.config.compare.dump_tool.clone(),
            ))
        } else {
            None
        };

        let mut first_mismatch: Option<Comparison> = None;
        for (reference, expected) in case.references.iter().zip(&expected) {
            let result = run_dir.join(&reference.name);
            if !result.is_file() {
                return Err(CaseError::missing_file(&result));
            }

            let comparison = match (reference.file_type, &structured) {
                (FileType::Text, _) => TextComparator.compare(&result, expected, tolerance.value).await,
                (FileType::Note, _) => NoteComparator.compare(&result, expected, tolerance.value).await,
                (FileType::Hdf5, Some(tool)) => tool.compare(&result, expected, tolerance.value).await,
                (FileType::Hdf5, None) => Comparison::external("Compare tool unavailable."),
            };

            match comparison.outcome {
                Outcome::Match => {}
                Outcome::External => return Err(CaseError::external(comparison.diagnostic)),
                Outcome::Mismatch => {
                    error!(
                        target: "simreg::compare",
                        "{} ({}) at {}: {}",
                        reference.name,
                        reference.file_type,
                        tolerance.level,
                        comparison.headline()
                    );
                    if first_mismatch.is_none() {
                        first_mismatch = Some(comparison);
                    }
                }
            }
        }

        if let Some(mismatch) = first_mismatch {
            return Err(CaseError::comparison(format!(
                "Fail data comparison: {}",
                mismatch.headline()
            )));
        }

        run_scripts(&case.user_compare_scripts, run_dir, &self.config).await?;
        info!(target: "simreg::compare", "Done comparing data.");
        Ok(())
    }

    /// Fetch every reference into `<run_dir>/reference`, in declaration order
    async fn fetch_references(&self, case: &TestCase, run_dir: &Path) -> StageResult<Vec<PathBuf>> {
        let dest = run_dir.join(REFERENCE_DIR);
        let mut fetched = Vec::with_capacity(case.references.len());
        for reference in &case.references {
            let path = self.provider.fetch(case, reference, &dest).await?;
            if !path.is_file() {
                return Err(CaseError::missing_file(&path));
            }
            fetched.push(path);
        }
        Ok(fetched)
    }
}
