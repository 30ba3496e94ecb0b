use crate::schema::{TypeSpec, load_problem};
use simreg_common::{ConfigError, SelectionConfig, TestCase};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Directory name never treated as a problem
pub const TEMPLATE_DIR: &str = "Template";

/// File inside each problem directory holding its types
pub const CONFIGS_FILE: &str = "configs";

/// A discovered test problem
#[derive(Debug, Clone)]
pub struct Problem {
    pub name: String,
    pub dir: PathBuf,
    pub types: Vec<TypeSpec>,
}

impl Problem {
    pub fn get_type(&self, name: &str) -> Option<&TypeSpec> {
        self.types.iter().find(|t| t.name == name)
    }
}

/// Discovers problems under the tests root and expands them into cases
#[derive(Debug, Clone)]
pub struct TestExplorer {
    tests_root: PathBuf,
    problems: Vec<Problem>,
    type_order: Vec<String>,
}

impl TestExplorer {
    /// Scan `tests_root` in sorted order and validate every `configs` file.
    ///
    /// Any schema violation fails the whole discovery.
    pub fn discover(tests_root: &Path) -> Result<Self, ConfigError> {
        if !tests_root.is_dir() {
            return Err(ConfigError::invalid(format!(
                "tests root {} is not a directory",
                tests_root.display()
            )));
        }

        let mut problems = Vec::new();
        let mut type_order: Vec<String> = Vec::new();

        let entries = WalkDir::new(tests_root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_type().is_dir());
        for entry in entries {
            let entry = entry.map_err(|e| ConfigError::Invalid {
                message: format!("failed to scan {}: {e}", tests_root.display()),
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == TEMPLATE_DIR {
                continue;
            }

            let configs = entry.path().join(CONFIGS_FILE);
            if !configs.is_file() {
                return Err(ConfigError::schema(&name, format!("missing {}", configs.display())));
            }
            let types = load_problem(&name, &configs)?;
            for t in &types {
                if !type_order.contains(&t.name) {
                    type_order.push(t.name.clone());
                }
            }
            debug!(target: "simreg::explorer", "problem {name}: {} type(s)", types.len());
            problems.push(Problem { name, dir: entry.path().to_path_buf(), types });
        }

        info!(
            target: "simreg::explorer",
            "Discovered {} problem(s), {} type(s) under {}",
            problems.len(),
            type_order.len(),
            tests_root.display()
        );
        Ok(Self { tests_root: tests_root.to_path_buf(), problems, type_order })
    }

    pub fn tests_root(&self) -> &Path {
        &self.tests_root
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    /// Type names in first-seen order across problems
    pub fn type_names(&self) -> &[String] {
        &self.type_order
    }

    /// Expand the selection into a flat case list.
    ///
    /// Order is type ordinal, then problem ordinal, then case index. Empty
    /// ordinal lists select everything; out-of-range ordinals are rejected.
    pub fn select(&self, selection: &SelectionConfig) -> Result<Vec<TestCase>, ConfigError> {
        let names = resolve_ordinals("problem", &selection.names, self.problems.len())?;
        let types = resolve_ordinals("type", &selection.types, self.type_order.len())?;

        let mut cases = Vec::new();
        for t in types {
            let type_name = &self.type_order[t];
            for &n in &names {
                let problem = &self.problems[n];
                let Some(spec) = problem.get_type(type_name) else { continue };
                if !spec.priority.meets(selection.priority) {
                    debug!(
                        target: "simreg::explorer",
                        "skip {}_{}: priority {} below {}",
                        problem.name,
                        type_name,
                        spec.priority,
                        selection.priority
                    );
                    continue;
                }
                cases.extend(expand(&problem.name, spec));
            }
        }
        Ok(cases)
    }

    /// Name/type index table printed by `--list`
    pub fn index_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Test types:");
        for (i, t) in self.type_order.iter().enumerate() {
            let _ = writeln!(out, "  {i:2} : {t}");
        }
        let _ = writeln!(out);

        let width = self.problems.iter().map(|p| p.name.len()).max().unwrap_or(0).max(20);
        let _ = write!(out, "{:>width$} (id)", "test name");
        for i in 0..self.type_order.len() {
            let _ = write!(out, " | {i:2}");
        }
        let _ = writeln!(out);
        for (i, problem) in self.problems.iter().enumerate() {
            let _ = write!(out, "{:>width$} ({i:2})", problem.name);
            for t in &self.type_order {
                let mark = problem
                    .get_type(t)
                    .map(|spec| spec.priority.as_str()[..1].to_ascii_uppercase())
                    .unwrap_or_default();
                let _ = write!(out, " | {mark:>2}");
            }
            let _ = writeln!(out);
        }
        out
    }
}

fn resolve_ordinals(
    kind: &'static str,
    requested: &[usize],
    available: usize,
) -> Result<Vec<usize>, ConfigError> {
    if requested.is_empty() {
        return Ok((0..available).collect());
    }
    if let Some(&index) = requested.iter().find(|&&i| i >= available) {
        return Err(ConfigError::IndexOutOfRange { kind, index, available });
    }
    Ok(requested.to_vec())
}

fn expand(problem: &str, spec: &TypeSpec) -> impl Iterator<Item = TestCase> {
    let group_makefile_cfg = spec.cases.first().map(|c| c.makefile.clone()).unwrap_or_default();
    spec.cases.iter().enumerate().map(move |(index, case)| TestCase {
        makefile_cfg: case.makefile.clone(),
        group_makefile_cfg: group_makefile_cfg.clone(),
        input_parameter: case.input_parameter.clone(),
        input_testprob: case.input_testprob.clone(),
        pre_scripts: spec.pre_scripts.clone(),
        post_scripts: spec.post_scripts.clone(),
        user_compare_scripts: spec.user_compare_scripts.clone(),
        references: spec.references.clone(),
        levels: spec.levels.clone(),
        priority: spec.priority,
        ..TestCase::new(problem, &spec.name, index)
    })
}
