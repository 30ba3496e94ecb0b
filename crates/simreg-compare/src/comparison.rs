use async_trait::async_trait;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Match,
    /// The data differ beyond the tolerance
    Mismatch,
    /// The comparison itself could not be carried out
    External,
}

/// Verdict of comparing one produced file against its reference
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub outcome: Outcome,
    pub diagnostic: String,
}

impl Comparison {
    pub fn matched(diagnostic: impl Into<String>) -> Self {
        Self { outcome: Outcome::Match, diagnostic: diagnostic.into() }
    }

    pub fn mismatch(diagnostic: impl Into<String>) -> Self {
        Self { outcome: Outcome::Mismatch, diagnostic: diagnostic.into() }
    }

    pub fn external(diagnostic: impl Into<String>) -> Self {
        Self { outcome: Outcome::External, diagnostic: diagnostic.into() }
    }

    pub fn is_mismatch(&self) -> bool {
        self.outcome != Outcome::Match
    }

    /// First line of the diagnostic, for one-line reasons
    pub fn headline(&self) -> &str {
        self.diagnostic.lines().next().unwrap_or_default()
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagnostic)
    }
}

/// Compares a produced file with its reference at a tolerance
#[async_trait]
pub trait FileComparator: Send + Sync {
    async fn compare(&self, result: &Path, expected: &Path, tolerance: f64) -> Comparison;
}
