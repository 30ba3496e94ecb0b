//! Opt-in promotion of failing cases' artifacts to new references

use crate::confirm::ConfirmationPort;
use anyhow::Result;
use simreg_common::{HarnessConfig, RunReport, TestCase};
use simreg_reference::ReferenceProvider;
use tracing::{error, info};

pub const UPLOAD_QUESTION: &str = "Would you like to update new result for fail test?";

/// What happened after the summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Every case passed
    NotNeeded,
    /// `no_upload` is set, or the run was aborted
    Suppressed,
    Declined,
    /// Number of artifacts published
    Published(usize),
    /// One message per artifact that could not be published
    Failed(Vec<String>),
}

/// Ask whether to publish the failing cases' artifacts, and do so if accepted
pub async fn offer_upload(
    report: &RunReport,
    cases: &[TestCase],
    config: &HarnessConfig,
    provider: &dyn ReferenceProvider,
    port: &mut dyn ConfirmationPort,
) -> Result<UploadOutcome> {
    if report.failed_count() == 0 {
        return Ok(UploadOutcome::NotNeeded);
    }
    if config.no_upload || report.aborted.is_some() {
        return Ok(UploadOutcome::Suppressed);
    }
    if !port.confirm(UPLOAD_QUESTION).await? {
        return Ok(UploadOutcome::Declined);
    }

    let mut published = 0;
    let mut failures = Vec::new();
    for (test_id, _) in report.failed() {
        let Some(case) = cases.iter().find(|c| c.test_id() == test_id) else {
            continue;
        };
        let run_dir = config.run_dir(test_id);
        for reference in &case.references {
            let source = run_dir.join(&reference.name);
            if !source.is_file() {
                failures.push(format!("{test_id}: {} does not exist.", source.display()));
                continue;
            }
            match provider.push(case, reference, &source).await {
                Ok(dest) => {
                    info!(target: "simreg::reference", "Published {} -> {}", source.display(), dest.display());
                    published += 1;
                }
                Err(err) => failures.push(format!("{test_id}: {}", err.reason())),
            }
        }
    }

    for failure in &failures {
        error!(target: "simreg::reference", "Upload failed: {failure}");
    }
    Ok(if failures.is_empty() {
        UploadOutcome::Published(published)
    } else {
        UploadOutcome::Failed(failures)
    })
}
