//! Structured (HDF5) outputs compared through the external compare tool

use crate::comparison::{Comparison, FileComparator};
use async_trait::async_trait;
use regex::Regex;
use simreg_common::{file_stdio, run_logged};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::process::Command;
use tracing::{error, info};

const UNKNOWN: &str = "UNKNOWN";

/// Build provenance recorded inside a structured output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub git_branch: String,
    pub git_commit: String,
    pub unique_id: String,
}

impl Default for Provenance {
    fn default() -> Self {
        Self {
            git_branch: UNKNOWN.to_string(),
            git_commit: UNKNOWN.to_string(),
            unique_id: UNKNOWN.to_string(),
        }
    }
}

impl Provenance {
    /// Read `GitBranch`, `GitCommit` and `UniqueDataID` from a text dump of the
    /// compound `/Info/KeyInfo` dataset.
    pub fn from_dump(dump: &str) -> Self {
        static MEMBER: OnceLock<Regex> = OnceLock::new();
        let member = MEMBER.get_or_init(|| {
            Regex::new(r#""(\w+)";\s*$"#).expect("internal built-in regex must compile")
        });

        let mut info = Self::default();
        let Some((types, data)) = dump.split_once("DATA {") else {
            return info;
        };
        let names: Vec<&str> = types
            .lines()
            .filter_map(|line| member.captures(line).and_then(|c| c.get(1)))
            .map(|m| m.as_str())
            .collect();
        let Some(values) = first_record(data) else {
            return info;
        };

        for (name, value) in names.iter().zip(values) {
            let value = value.trim().trim_matches('"').to_string();
            if value.is_empty() {
                continue;
            }
            match *name {
                "GitBranch" => info.git_branch = value,
                "GitCommit" => info.git_commit = value,
                "UniqueDataID" => info.unique_id = value,
                _ => {}
            }
        }
        info
    }
}

/// Top-level fields of the first `(0): { ... }` record
fn first_record(data: &str) -> Option<Vec<String>> {
    let body = &data[data.find("(0):")?..];
    let body = &body[body.find('{')? + 1..];

    let mut fields = Vec::new();
    let mut field = String::new();
    let (mut depth, mut quoted) = (0usize, false);
    for ch in body.chars() {
        match ch {
            '"' => quoted = !quoted,
            '{' | '[' if !quoted => depth += 1,
            '}' | ']' if !quoted && depth > 0 => depth -= 1,
            '}' if !quoted => {
                fields.push(std::mem::take(&mut field));
                return Some(fields);
            }
            ',' if !quoted && depth == 0 => {
                fields.push(std::mem::take(&mut field));
                continue;
            }
            _ => {}
        }
        field.push(ch);
    }
    None
}

/// True iff the report holds nothing but blank lines and `#` comments
pub fn report_is_clean(report: &str) -> bool {
    report.lines().all(|line| line.trim().is_empty() || line.starts_with('#'))
}

/// [`FileComparator`] driving the compiled compare tool
#[derive(Debug, Clone)]
pub struct StructuredComparator {
    tool: PathBuf,
    report_name: String,
    dump_tool: String,
}

impl StructuredComparator {
    pub fn new(tool: PathBuf, report_name: impl Into<String>, dump_tool: impl Into<String>) -> Self {
        Self { tool, report_name: report_name.into(), dump_tool: dump_tool.into() }
    }

    async fn provenance(&self, file: &Path) -> Provenance {
        let output = Command::new(&self.dump_tool)
            .args(["-d", "/Info/KeyInfo"])
            .arg(file)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await;
        match output {
            Ok(out) if out.status.success() => {
                Provenance::from_dump(&String::from_utf8_lossy(&out.stdout))
            }
            _ => Provenance::default(),
        }
    }

    async fn provenance_table(&self, result: &Path, expected: &Path) -> Vec<String> {
        let r = self.provenance(result).await;
        let e = self.provenance(expected).await;
        let expected_name = expected.display().to_string();
        let result_name = result.display().to_string();
        let w = expected_name.len().max(result_name.len()).max(50);
        vec![
            format!("Type      : {:<w$} {:<w$}", "Expect", "Result"),
            format!("File name : {expected_name:<w$} {result_name:<w$}"),
            format!("Git Branch: {:<w$} {:<w$}", e.git_branch, r.git_branch),
            format!("Git Commit: {:<w$} {:<w$}", e.git_commit, r.git_commit),
            format!("Unique ID : {:<w$} {:<w$}", e.unique_id, r.unique_id),
        ]
    }
}

#[async_trait]
impl FileComparator for StructuredComparator {
    async fn compare(&self, result: &Path, expected: &Path, tolerance: f64) -> Comparison {
        info!(
            target: "simreg::compare",
            "Comparing HDF5: {} <--> {}",
            result.display(),
            expected.display()
        );
        let work_dir = result.parent().unwrap_or(Path::new("."));
        let report = work_dir.join(&self.report_name);
        if let Err(e) = std::fs::remove_file(&report)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            return Comparison::external(format!(
                "Cannot remove stale report {}: {e}",
                report.display()
            ));
        }

        let mut cmd = Command::new(&self.tool);
        cmd.arg("-i")
            .arg(result)
            .arg("-j")
            .arg(expected)
            .arg("-o")
            .arg(&report)
            .arg("-e")
            .arg(tolerance.to_string())
            .args(["-c", "-m"]);
        match file_stdio(&work_dir.join("compare.log"), false) {
            Ok(stdout) => {
                cmd.stdout(stdout);
            }
            Err(e) => return Comparison::external(e.to_string()),
        }
        let invocation = format!("{:?}", cmd.as_std());

        match run_logged(&mut cmd).await {
            Ok(status) if status.success() => {}
            Ok(status) => {
                error!(target: "simreg::compare", "The execution of '{invocation}' fails ({status}).");
                return Comparison::external(format!("Compare tool failed ({status})."));
            }
            Err(e) => return Comparison::external(format!("Compare tool failed: {e}")),
        }

        let Ok(text) = std::fs::read_to_string(&report) else {
            return Comparison::external(format!("Compare tool wrote no report at {}.", report.display()));
        };
        if report_is_clean(&text) {
            info!(target: "simreg::compare", "Comparing HDF5 done.");
            return Comparison::matched("Result data is identical to expect data.");
        }

        let mut lines = vec!["Result data is not identical to expect data.".to_string()];
        lines.extend(self.provenance_table(result, expected).await);
        for line in &lines {
            error!(target: "simreg::compare", "{line}");
        }
        Comparison::mismatch(lines.join("\n"))
    }
}
