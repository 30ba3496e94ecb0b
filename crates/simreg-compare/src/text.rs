//! Whitespace-separated numeric tables

use crate::comparison::{Comparison, FileComparator};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

/// A parsed numeric table, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    rows: Vec<Vec<f64>>,
}

impl Table {
    /// Parse a table; `#` starts a comment and blank lines are skipped.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut rows = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let data = line.split('#').next().unwrap_or_default();
            if data.trim().is_empty() {
                continue;
            }
            let row = data
                .split_whitespace()
                .map(|tok| {
                    tok.parse::<f64>()
                        .map_err(|_| format!("line {}: `{tok}` is not a number", lineno + 1))
                })
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(first) = rows.first().map(Vec::len)
                && first != row.len()
            {
                return Err(format!(
                    "line {}: expected {first} columns, found {}",
                    lineno + 1,
                    row.len()
                ));
            }
            rows.push(row);
        }
        Ok(Self { rows })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.rows.first().map_or(0, Vec::len))
    }

    fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().flatten().copied()
    }
}

/// Largest absolute element-wise difference, `NaN` if any difference is `NaN`
pub fn max_abs_diff(a: &Table, b: &Table) -> f64 {
    let mut max = 0.0f64;
    for (x, y) in a.values().zip(b.values()) {
        let d = (x - y).abs();
        if d.is_nan() {
            return f64::NAN;
        }
        max = max.max(d);
    }
    max
}

/// Compare two parsed tables at `tolerance`
pub fn compare_tables(result: &Table, expected: &Table, tolerance: f64) -> Comparison {
    if result.shape() != expected.shape() {
        let (rr, rc) = result.shape();
        let (er, ec) = expected.shape();
        return Comparison::mismatch(format!(
            "Data shapes are different: result {rr}x{rc}, expected {er}x{ec}."
        ));
    }

    let err = max_abs_diff(result, expected);
    if err.is_nan() || err > tolerance {
        Comparison::mismatch(format!(
            "Error is greater than expected. Expected: {tolerance:.4e}. Test: {err:.4e}."
        ))
    } else {
        Comparison::matched(format!("Max error {err:.4e} within {tolerance:.4e}."))
    }
}

/// [`FileComparator`] for `TEXT` references
#[derive(Debug, Clone, Copy, Default)]
pub struct TextComparator;

#[async_trait]
impl FileComparator for TextComparator {
    async fn compare(&self, result: &Path, expected: &Path, tolerance: f64) -> Comparison {
        info!(
            target: "simreg::compare",
            "Comparing TEXT: {} <--> {}",
            result.display(),
            expected.display()
        );
        let load = |path: &Path| {
            std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))
                .and_then(|text| {
                    Table::parse(&text).map_err(|e| format!("{}: {e}", path.display()))
                })
        };
        let (a, b) = match (load(result), load(expected)) {
            (Ok(a), Ok(b)) => (a, b),
            (Err(e), _) | (_, Err(e)) => return Comparison::mismatch(format!("Cannot load table, {e}")),
        };

        let comparison = compare_tables(&a, &b, tolerance);
        debug!(target: "simreg::compare", "{comparison}");
        comparison
    }
}
