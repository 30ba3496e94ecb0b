//! Strict YAML schema of a problem's `configs` file.
//!
//! ```yaml
//! <type_name>:
//!   priority: high | medium | low
//!   levels: { level0: 1.0e-12 }
//!   pre_script: [ ... ]
//!   post_script: [ ... ]
//!   user_compare_script: [ ... ]
//!   reference:
//!     - { name: case_00/Data_000010, loc: "cloud:case_00/Data_000010", file_type: HDF5 }
//!   cases:
//!     - Makefile: { model: HYDRO }
//!       Input__Parameter: { END_T: 0.1 }
//!       Input__TestProb: {}
//! ```
//!
//! Unknown keys are rejected at every level; there is no legacy shape.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use simreg_common::{ConfigError, ParamMap, Priority, TestReference};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawType {
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    levels: BTreeMap<String, f64>,
    #[serde(default)]
    pre_script: Vec<String>,
    #[serde(default)]
    post_script: Vec<String>,
    #[serde(default)]
    user_compare_script: Vec<String>,
    #[serde(default)]
    reference: Vec<TestReference>,
    cases: Vec<Value>,
}

/// Per-case settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseSpec {
    #[serde(rename = "Makefile", default)]
    pub makefile: ParamMap,
    #[serde(rename = "Input__Parameter", default)]
    pub input_parameter: ParamMap,
    #[serde(rename = "Input__TestProb", default)]
    pub input_testprob: ParamMap,
}

/// A validated test type of one problem
#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub name: String,
    pub priority: Priority,
    pub levels: BTreeMap<String, f64>,
    pub pre_scripts: Vec<String>,
    pub post_scripts: Vec<String>,
    pub user_compare_scripts: Vec<String>,
    pub references: Vec<TestReference>,
    pub cases: Vec<CaseSpec>,
}

/// Parse a problem's `configs` document, keeping the declared type order
pub fn parse_problem(problem: &str, text: &str) -> Result<Vec<TypeSpec>, ConfigError> {
    let doc: Value = serde_yaml::from_str(text)
        .map_err(|e| ConfigError::schema(problem, e.to_string()))?;
    let mapping: Mapping = match doc {
        Value::Mapping(m) => m,
        Value::Null => Mapping::new(),
        _ => return Err(ConfigError::schema(problem, "top level must map type names to types")),
    };

    let mut types = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
        let Some(type_name) = key.as_str().map(str::to_string) else {
            return Err(ConfigError::schema(problem, format!("type name {key:?} is not a string")));
        };
        let location = format!("{problem}/{type_name}");

        let raw: RawType = serde_yaml::from_value(value)
            .map_err(|e| ConfigError::schema(&location, e.to_string()))?;
        if raw.cases.is_empty() {
            return Err(ConfigError::schema(&location, "`cases` must not be empty"));
        }

        let mut cases = Vec::with_capacity(raw.cases.len());
        for (index, case) in raw.cases.into_iter().enumerate() {
            let spec = match case {
                Value::Null => CaseSpec::default(),
                other => serde_yaml::from_value(other).map_err(|e| {
                    ConfigError::schema(format!("{location}/case {index}"), e.to_string())
                })?,
            };
            cases.push(spec);
        }

        types.push(TypeSpec {
            name: type_name,
            priority: raw.priority,
            levels: raw.levels,
            pre_scripts: raw.pre_script,
            post_scripts: raw.post_script,
            user_compare_scripts: raw.user_compare_script,
            references: raw.reference,
            cases,
        });
    }
    Ok(types)
}

/// Read and parse `<problem_dir>/configs`
pub fn load_problem(problem: &str, path: &Path) -> Result<Vec<TypeSpec>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    parse_problem(problem, &text)
}
