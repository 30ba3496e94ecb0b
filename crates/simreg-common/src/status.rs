//! Outcome taxonomy shared by every stage of a case run

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of outcome recorded for a test case.
///
/// Exactly one status is attached to every [`crate::CaseResult`]. The
/// upper-case code names are what the summary table and the run log print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    /// Generic failure, e.g. the simulator exited cleanly without its marker file
    Fail,
    MissingFile,
    CompileErr,
    /// The build configuration generator rejected the case's flags
    EditingFail,
    /// An invoked script or external tool misbehaved
    External,
    Download,
    Upload,
    CopyFiles,
    /// Runtime input files could not be rewritten
    EditFile,
    Comparison,
}

impl Status {
    pub const ALL: [Status; 11] = [
        Status::Success,
        Status::Fail,
        Status::MissingFile,
        Status::CompileErr,
        Status::EditingFail,
        Status::External,
        Status::Download,
        Status::Upload,
        Status::CopyFiles,
        Status::EditFile,
        Status::Comparison,
    ];

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_failure(self) -> bool {
        !self.is_success()
    }

    /// Code name as printed in the summary table.
    pub fn code(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Fail => "FAIL",
            Self::MissingFile => "MISSING_FILE",
            Self::CompileErr => "COMPILE_ERR",
            Self::EditingFail => "EDITING_FAIL",
            Self::External => "EXTERNAL",
            Self::Download => "DOWNLOAD",
            Self::Upload => "UPLOAD",
            Self::CopyFiles => "COPY_FILES",
            Self::EditFile => "EDIT_FILE",
            Self::Comparison => "COMPARISON",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_success_is_success() {
        for status in Status::ALL {
            assert_eq!(status.is_success(), status == Status::Success, "{status}");
        }
    }

    #[test]
    fn codes_are_unique() {
        let mut codes: Vec<_> = Status::ALL.iter().map(|s| s.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), Status::ALL.len());
    }

    #[test]
    fn serde_uses_code_names() {
        let json = serde_json::to_string(&Status::CompileErr).unwrap();
        assert_eq!(json, "\"COMPILE_ERR\"");
        let back: Status = serde_json::from_str("\"COPY_FILES\"").unwrap();
        assert_eq!(back, Status::CopyFiles);
    }
}
