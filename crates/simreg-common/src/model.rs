//! Immutable test-case model and its content-derived identity

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A scalar value from a test definition (build flag or runtime parameter)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// Truthiness as the build generator understands it
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => matches!(s.to_ascii_lowercase().as_str(), "true" | "yes" | "on" | "1"),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // configure.py parses capitalised booleans
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

/// Ordered name → value mapping
pub type ParamMap = BTreeMap<String, ParamValue>;

/// Kind of a reference artifact, selecting the comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "HDF5")]
    Hdf5,
    #[serde(rename = "NOTE")]
    Note,
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "TEXT",
            Self::Hdf5 => "HDF5",
            Self::Note => "NOTE",
        })
    }
}

/// Where a reference lives, parsed from `<backend>:<payload>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RefBackend {
    Local(String),
    Cloud(String),
    Url(String),
}

impl RefBackend {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Cloud(_) => "cloud",
            Self::Url(_) => "url",
        }
    }

    pub fn payload(&self) -> &str {
        match self {
            Self::Local(p) | Self::Cloud(p) | Self::Url(p) => p,
        }
    }
}

impl FromStr for RefBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, payload) = s.split_once(':').unwrap_or((s, ""));
        let payload = payload.trim().to_string();
        match kind.trim() {
            "local" => Ok(Self::Local(payload)),
            "cloud" => Ok(Self::Cloud(payload)),
            "url" => Ok(Self::Url(payload)),
            other => Err(ConfigError::invalid(format!(
                "unknown reference backend `{other}` in `{s}` (expected local, cloud or url)"
            ))),
        }
    }
}

impl TryFrom<String> for RefBackend {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RefBackend> for String {
    fn from(value: RefBackend) -> Self {
        value.to_string()
    }
}

impl fmt::Display for RefBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.payload())
    }
}

/// A declared golden artifact of a test type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestReference {
    /// Path of the produced artifact, relative to the run directory
    pub name: String,
    pub loc: RefBackend,
    pub file_type: FileType,
}

/// Test-type priority, ordered `Low < Medium < High`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    #[default]
    High,
}

impl Priority {
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }

    /// Whether a type of this priority passes the given floor
    pub fn meets(self, floor: Priority) -> bool {
        self.rank() >= floor.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(ConfigError::invalid(format!(
                "unknown priority `{other}` (expected high, medium or low)"
            ))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One runnable test case.
///
/// Built once by the explorer and never mutated. Its identity ([`TestCase::test_id`])
/// is derived from the fields alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub problem_name: String,
    pub type_name: String,
    pub case_index: usize,
    pub makefile_cfg: ParamMap,
    /// Build flags of case 0 of the same type; they configure the group's
    /// shared compare tool. Not part of the identity.
    #[serde(default)]
    pub group_makefile_cfg: ParamMap,
    pub input_parameter: ParamMap,
    pub input_testprob: ParamMap,
    pub pre_scripts: Vec<String>,
    pub post_scripts: Vec<String>,
    pub user_compare_scripts: Vec<String>,
    pub references: Vec<TestReference>,
    pub levels: BTreeMap<String, f64>,
    pub priority: Priority,
}

impl TestCase {
    /// Minimal case with empty mappings, used by the explorer and by tests
    pub fn new(problem_name: &str, type_name: &str, case_index: usize) -> Self {
        Self {
            problem_name: problem_name.to_string(),
            type_name: type_name.to_string(),
            case_index,
            makefile_cfg: ParamMap::new(),
            group_makefile_cfg: ParamMap::new(),
            input_parameter: ParamMap::new(),
            input_testprob: ParamMap::new(),
            pre_scripts: Vec::new(),
            post_scripts: Vec::new(),
            user_compare_scripts: Vec::new(),
            references: Vec::new(),
            levels: BTreeMap::new(),
            priority: Priority::default(),
        }
    }

    /// `<problem>_<type>`, the unit sharing references and the compare tool
    pub fn group_key(&self) -> String {
        format!("{}_{}", self.problem_name, self.type_name)
    }

    /// `case_NN`, the per-case folder name in the cloud store
    pub fn case_name(&self) -> String {
        format!("case_{:02}", self.case_index)
    }

    /// Stable identity: `<problem>_<type>_c<NN>_<hash12>`.
    ///
    /// The hash covers the case's own fields (not `group_makefile_cfg`)
    /// through a tagged, length-prefixed encoding with floats taken bit for
    /// bit, so two cases collide only when those fields are identical.
    pub fn test_id(&self) -> String {
        format!(
            "{}_{}_c{:02}_{}",
            self.problem_name,
            self.type_name,
            self.case_index,
            self.content_hash()
        )
    }

    fn content_hash(&self) -> String {
        let mut h = IdentityHasher::default();
        h.str(&self.problem_name);
        h.str(&self.type_name);
        h.len(self.case_index);
        h.params(&self.makefile_cfg);
        h.params(&self.input_parameter);
        h.params(&self.input_testprob);
        h.strings(&self.pre_scripts);
        h.strings(&self.post_scripts);
        h.strings(&self.user_compare_scripts);
        h.len(self.references.len());
        for reference in &self.references {
            h.str(&reference.name);
            h.str(&reference.loc.to_string());
            h.str(&reference.file_type.to_string());
        }
        h.len(self.levels.len());
        for (name, value) in &self.levels {
            h.str(name);
            h.f64(*value);
        }
        h.str(self.priority.as_str());

        let digest = h.0.finalize();
        let mut hex = String::with_capacity(12);
        for byte in &digest[..6] {
            hex.push_str(&format!("{byte:02x}"));
        }
        hex
    }

    /// Whether the case must be launched through the MPI launcher
    pub fn mpi_enabled(&self) -> bool {
        self.makefile_cfg.get("mpi").is_some_and(ParamValue::is_truthy)
    }
}

/// Digest input for [`TestCase::test_id`]: every item carries a tag byte and
/// a length prefix.
#[derive(Default)]
struct IdentityHasher(Sha256);

impl IdentityHasher {
    fn tagged(&mut self, tag: u8, bytes: &[u8]) {
        self.0.update([tag]);
        self.0.update((bytes.len() as u64).to_le_bytes());
        self.0.update(bytes);
    }

    fn str(&mut self, s: &str) {
        self.tagged(b's', s.as_bytes());
    }

    fn len(&mut self, n: usize) {
        self.tagged(b'n', &(n as u64).to_le_bytes());
    }

    fn f64(&mut self, x: f64) {
        self.tagged(b'f', &x.to_bits().to_le_bytes());
    }

    fn value(&mut self, value: &ParamValue) {
        match value {
            ParamValue::Bool(b) => self.tagged(b'b', &[u8::from(*b)]),
            ParamValue::Int(i) => self.tagged(b'i', &i.to_le_bytes()),
            ParamValue::Float(x) => self.f64(*x),
            ParamValue::Str(s) => self.str(s),
        }
    }

    fn params(&mut self, map: &ParamMap) {
        self.len(map.len());
        for (key, value) in map {
            self.str(key);
            self.value(value);
        }
    }

    fn strings(&mut self, items: &[String]) {
        self.len(items.len());
        for item in items {
            self.str(item);
        }
    }
}
