use crate::error::CaseError;
use crate::status::Status;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Final outcome of one case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub status: Status,
    pub reason: String,
    /// Wall time spent on the case
    pub wall_time: Duration,
}

impl CaseResult {
    pub fn success(wall_time: Duration) -> Self {
        Self { status: Status::Success, reason: String::new(), wall_time }
    }

    pub fn from_error(err: &CaseError, wall_time: Duration) -> Self {
        Self { status: err.status(), reason: err.reason(), wall_time }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Results of a whole run in enumeration order, keyed by test id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    entries: Vec<(String, CaseResult)>,
    /// Set when a fatal error stopped the run early
    pub aborted: Option<String>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result of a case. A second result for the same id is ignored.
    pub fn record(&mut self, test_id: String, result: CaseResult) -> bool {
        if self.get(&test_id).is_some() {
            return false;
        }
        self.entries.push((test_id, result));
        true
    }

    pub fn get(&self, test_id: &str) -> Option<&CaseResult> {
        self.entries.iter().find(|(id, _)| id == test_id).map(|(_, r)| r)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CaseResult)> {
        self.entries.iter().map(|(id, r)| (id.as_str(), r))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &CaseResult)> {
        self.iter().filter(|(_, r)| !r.is_success())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn passed_count(&self) -> usize {
        self.iter().filter(|(_, r)| r.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.len() - self.passed_count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0 || self.aborted.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order_and_first_result() {
        let mut report = RunReport::new();
        assert!(report.record("b".into(), CaseResult::success(Duration::ZERO)));
        assert!(report.record(
            "a".into(),
            CaseResult::from_error(&CaseError::compile("Compiling error."), Duration::ZERO)
        ));
        assert!(!report.record("b".into(), CaseResult::from_error(&CaseError::fail("x"), Duration::ZERO)));

        let ids: Vec<_> = report.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, ["b", "a"]);
        assert!(report.get("b").unwrap().is_success());
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.failed().next().unwrap().1.status, Status::CompileErr);
    }

    #[test]
    fn abort_counts_as_failure() {
        let mut report = RunReport::new();
        report.record("a".into(), CaseResult::success(Duration::ZERO));
        assert!(!report.has_failures());
        report.aborted = Some("manifest".into());
        assert!(report.has_failures());
    }
}
