//! Common types and plumbing for the simreg regression harness
//!
//! This crate provides the foundational types shared by every stage of the
//! harness: the status taxonomy, case-level errors, the immutable test-case
//! model and its content-derived identity, the harness configuration, and the
//! helpers used to run external processes while draining their stderr into
//! the structured log.

pub mod config;
pub mod error;
pub mod guard;
pub mod model;
pub mod process;
pub mod result;
pub mod scripts;
pub mod status;

pub use config::{
    BuildConfig, CloudConfig, CompareConfig, ConfigBuilder, HarnessConfig, LoggingConfig,
    MpiConfig, PathConfig, RunConfig, SelectionConfig,
};
pub use error::{CaseError, ConfigError, ProcessError, StageResult};
pub use guard::RestoreGuard;
pub use model::{FileType, ParamMap, ParamValue, Priority, RefBackend, TestCase, TestReference};
pub use process::{file_stdio, run_logged};
pub use result::{CaseResult, RunReport};
pub use scripts::run_scripts;
pub use status::Status;

/// Name of the tolerance level every family is expected to define.
pub const BASELINE_LEVEL: &str = "level0";
