//! Run-record (`Record__Note`) parameter diff.
//!
//! This comparison never fails a case; it only logs what changed.

use crate::comparison::{Comparison, FileComparator};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, error, info};

const SECTION_MARKER: &str = "*****";
const MISSING: &str = "EMPTY";

/// Sections whose values change from run to run
const VOLATILE_SECTIONS: &[&str] = &[
    "Flag Criterion (# of Particles per Patch)",
    "Flag Criterion (Lohner Error Estimator)",
    "Cell Size and Scale (scale = number of cells at the finest level)",
    "Compilation Time",
    "Current Time",
];

/// Parameter listing ends where the diagnosis sections begin
const END_SECTIONS: &[&str] = &["OpenMP Diagnosis", "Device Diagnosis"];

/// section → parameter → value
pub type NoteRecord = BTreeMap<String, BTreeMap<String, String>>;

pub fn parse_note(text: &str) -> NoteRecord {
    let mut record = NoteRecord::new();
    let mut in_section = false;
    let mut current = String::new();

    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        if line.contains(SECTION_MARKER) {
            in_section = !in_section;
            continue;
        }
        if !in_section {
            current = line.trim_end().to_string();
            if END_SECTIONS.contains(&current.as_str()) {
                break;
            }
            record.entry(current.clone()).or_default();
            continue;
        }
        if VOLATILE_SECTIONS.contains(&current.as_str()) {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((value, key)) = tokens.split_last() else { continue };
        record.entry(current.clone()).or_default().insert(key.join(" "), value.to_string());
    }
    record
}

/// One differing parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDiff {
    pub section: String,
    pub key: String,
    pub result: String,
    pub expected: String,
}

/// Symmetric difference: only-in-result, only-in-expected and changed values
pub fn diff_notes(result: &NoteRecord, expected: &NoteRecord) -> Vec<NoteDiff> {
    let empty = BTreeMap::new();
    let mut sections: Vec<&String> = result.keys().chain(expected.keys()).collect();
    sections.sort();
    sections.dedup();

    let mut diffs = Vec::new();
    for section in sections {
        let r = result.get(section).unwrap_or(&empty);
        let e = expected.get(section).unwrap_or(&empty);
        let mut keys: Vec<&String> = r.keys().chain(e.keys()).collect();
        keys.sort();
        keys.dedup();
        for key in keys {
            let (rv, ev) = (r.get(key), e.get(key));
            if rv != ev {
                diffs.push(NoteDiff {
                    section: section.clone(),
                    key: key.clone(),
                    result: rv.map_or(MISSING, String::as_str).to_string(),
                    expected: ev.map_or(MISSING, String::as_str).to_string(),
                });
            }
        }
    }
    diffs
}

/// Aligned three-column table of `diffs`
pub fn format_diff_table(diffs: &[NoteDiff]) -> Vec<String> {
    let mut lines =
        vec![format!("{:<30} | {:>40} | {:>40} |", "Parameter name", "result parameter", "expect parameter")];
    lines.extend(
        diffs.iter().map(|d| format!("{:<30} | {:>40} | {:>40} |", d.key, d.result, d.expected)),
    );
    lines
}

/// [`FileComparator`] for `NOTE` references; always reports a match
#[derive(Debug, Clone, Copy, Default)]
pub struct NoteComparator;

#[async_trait]
impl FileComparator for NoteComparator {
    async fn compare(&self, result: &Path, expected: &Path, _tolerance: f64) -> Comparison {
        let read = |path: &Path, label: &str| match std::fs::read_to_string(path) {
            Ok(text) => Some(parse_note(&text)),
            Err(e) => {
                error!(target: "simreg::compare", "{label} record ({}) unreadable: {e}", path.display());
                None
            }
        };
        let (Some(r), Some(e)) = (read(result, "Result"), read(expected, "Expect")) else {
            return Comparison::matched("Record comparison skipped.");
        };

        info!(
            target: "simreg::compare",
            "Comparing Record__Note: {} <-> {}",
            result.display(),
            expected.display()
        );
        let diffs = diff_notes(&r, &e);
        for line in format_diff_table(&diffs) {
            debug!(target: "simreg::compare", "{line}");
        }
        Comparison::matched(format!("{} record parameter(s) differ.", diffs.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTE: &str = "\
Makefile Options (numerical schemes)
***************************************
MODEL                           HYDRO
FLU_SCHEME                      MHM_RP
***************************************

Compilation Time
***************************************
Compilation Time                Jan 1 2024 10:00:00
***************************************

Parameters of Time-step
***************************************
DT__FLUID                       5.000000e-01
***************************************

OpenMP Diagnosis
***************************************
OMP__NUM_THREADS                16
***************************************
";

    #[test]
    fn parses_sections_and_skips_volatile_and_diagnosis() {
        let note = parse_note(NOTE);
        assert_eq!(note["Makefile Options (numerical schemes)"]["FLU_SCHEME"], "MHM_RP");
        assert_eq!(note["Parameters of Time-step"]["DT__FLUID"], "5.000000e-01");
        assert!(note["Compilation Time"].is_empty());
        assert!(!note.contains_key("OpenMP Diagnosis"));
    }

    #[test]
    fn multi_word_keys_keep_last_token_as_value() {
        let note = parse_note("Sec\n*****\nNumber of ranks   4\n*****\n");
        assert_eq!(note["Sec"]["Number of ranks"], "4");
    }

    #[test]
    fn diff_is_symmetric() {
        let a = parse_note("S\n*****\nA 1\nB 2\n*****\nOnlyA\n*****\nX 9\n*****\n");
        let b = parse_note("S\n*****\nA 1\nB 3\nC 4\n*****\n");
        let diffs = diff_notes(&a, &b);

        let rows: Vec<_> =
            diffs.iter().map(|d| (d.key.as_str(), d.result.as_str(), d.expected.as_str())).collect();
        assert_eq!(rows, [("X", "9", "EMPTY"), ("B", "2", "3"), ("C", "EMPTY", "4")]);
        assert!(diff_notes(&a, &a).is_empty());
    }

    #[tokio::test]
    async fn never_signals_mismatch() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = dir.path().join("a");
        std::fs::write(&a, "S\n*****\nA 1\n*****\n").unwrap();
        let b = dir.path().join("b");
        std::fs::write(&b, "S\n*****\nA 2\n*****\n").unwrap();

        let c = NoteComparator.compare(&a, &b, 0.0).await;
        assert!(!c.is_mismatch());
        assert!(c.diagnostic.starts_with("1 "), "{c}");

        let missing = NoteComparator.compare(&a, &dir.path().join("nope"), 0.0).await;
        assert!(!missing.is_mismatch());
    }
}
