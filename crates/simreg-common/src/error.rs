use crate::status::Status;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure of one step of a case run.
///
/// Every variant maps to exactly one [`Status`]; the message becomes the
/// result's reason string.
#[derive(Debug, Clone, Error)]
pub enum CaseError {
    #[error("{reason}")]
    Stage { status: Status, reason: String },

    /// The shared reference manifest could not be downloaded. Fatal for the run.
    #[error("reference manifest unavailable: {reason}")]
    ManifestUnavailable { reason: String },
}

/// Result type for case stages
pub type StageResult<T> = Result<T, CaseError>;

impl CaseError {
    pub fn new<S: Into<String>>(status: Status, reason: S) -> Self {
        Self::Stage { status, reason: reason.into() }
    }

    pub fn fail<S: Into<String>>(reason: S) -> Self {
        Self::new(Status::Fail, reason)
    }

    pub fn compile<S: Into<String>>(reason: S) -> Self {
        Self::new(Status::CompileErr, reason)
    }

    pub fn editing<S: Into<String>>(reason: S) -> Self {
        Self::new(Status::EditingFail, reason)
    }

    pub fn external<S: Into<String>>(reason: S) -> Self {
        Self::new(Status::External, reason)
    }

    pub fn download<S: Into<String>>(reason: S) -> Self {
        Self::new(Status::Download, reason)
    }

    pub fn upload<S: Into<String>>(reason: S) -> Self {
        Self::new(Status::Upload, reason)
    }

    pub fn copy_files<S: Into<String>>(reason: S) -> Self {
        Self::new(Status::CopyFiles, reason)
    }

    pub fn edit_file<S: Into<String>>(reason: S) -> Self {
        Self::new(Status::EditFile, reason)
    }

    pub fn comparison<S: Into<String>>(reason: S) -> Self {
        Self::new(Status::Comparison, reason)
    }

    pub fn missing_file(path: &Path) -> Self {
        Self::new(Status::MissingFile, format!("{} does not exist.", path.display()))
    }

    pub fn manifest<S: Into<String>>(reason: S) -> Self {
        Self::ManifestUnavailable { reason: reason.into() }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Stage { status, .. } => *status,
            Self::ManifestUnavailable { .. } => Status::Download,
        }
    }

    pub fn reason(&self) -> String {
        self.to_string()
    }

    /// Whether the error must stop the whole run rather than just this case
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ManifestUnavailable { .. })
    }
}

/// Errors raised while loading configuration or test definitions
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid test definition in {location}: {message}")]
    Schema { location: String, message: String },

    #[error("{kind} index {index} out of range (0..{available})")]
    IndexOutOfRange { kind: &'static str, index: usize, available: usize },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl ConfigError {
    pub fn schema<L: Into<String>, M: Into<String>>(location: L, message: M) -> Self {
        Self::Schema { location: location.into(), message: message.into() }
    }

    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid { message: message.into() }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }
}

/// Errors from spawning or awaiting an external process
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
