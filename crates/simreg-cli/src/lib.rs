//! Library half of the `simreg` binary: run loop, summary, upload flow and
//! process plumbing, kept here so integration tests can drive them directly.

pub mod confirm;
pub mod exit;
pub mod logging;
pub mod run_loop;
pub mod summary;
pub mod upload;

pub use confirm::{ConfirmationPort, FixedConfirmation, PromptConfirmation, StdinConfirmation};
pub use exit::exit_code;
pub use run_loop::{RunLoop, reset_run_dir};
pub use summary::{print_summary, summary_rows};
pub use upload::{UploadOutcome, offer_upload};
