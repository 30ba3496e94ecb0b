// Exit codes for CI triage
use crate::upload::UploadOutcome;
use simreg_common::RunReport;

pub const EXIT_SUCCESS: i32 = 0;
/// At least one case failed and nothing was published
pub const EXIT_CASES_FAILED: i32 = 1;
pub const EXIT_UPLOAD_FAILED: i32 = 2;
/// A fatal error stopped the run before every case ran
pub const EXIT_ABORTED: i32 = 3;
/// Configuration, discovery or logging setup failed before any case ran
pub const EXIT_SETUP_FAILED: i32 = 4;

/// Process exit code for a finished run and its upload decision
pub fn exit_code(report: &RunReport, upload: &UploadOutcome) -> i32 {
    if report.aborted.is_some() {
        return EXIT_ABORTED;
    }
    if report.failed_count() == 0 {
        return EXIT_SUCCESS;
    }
    match upload {
        UploadOutcome::Published(_) => EXIT_SUCCESS,
        UploadOutcome::Failed(_) => EXIT_UPLOAD_FAILED,
        UploadOutcome::NotNeeded | UploadOutcome::Suppressed | UploadOutcome::Declined => {
            EXIT_CASES_FAILED
        }
    }
}
