//! Harness configuration: file defaults, CLI overrides, one-time validation

use crate::error::ConfigError;
use crate::model::Priority;
use crate::BASELINE_LEVEL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const THREADS_PER_CORE: usize = 2;
const CORES_PER_RANK: usize = 8;

/// Complete, validated harness configuration.
///
/// Constructed once through [`ConfigBuilder::build`] and shared read-only by
/// every component. All paths are absolute after building.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HarnessConfig {
    pub paths: PathConfig,
    pub build: BuildConfig,
    pub run: RunConfig,
    pub compare: CompareConfig,
    pub cloud: CloudConfig,
    pub selection: SelectionConfig,
    pub logging: LoggingConfig,
    pub no_upload: bool,
}

/// Filesystem layout. Relative entries resolve against `source_root`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub source_root: PathBuf,
    pub tests_root: PathBuf,
    pub run_root: PathBuf,
    pub local_reference_root: PathBuf,
    pub compare_tool_dir: PathBuf,
    pub machine_config_dir: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("."),
            tests_root: PathBuf::from("regression_test/tests"),
            run_root: PathBuf::from("regression_test/run"),
            local_reference_root: PathBuf::from("regression_test/references/local"),
            compare_tool_dir: PathBuf::from("tool/analysis/gamer_compare_data"),
            machine_config_dir: PathBuf::from("configs"),
        }
    }
}

/// How the simulator is configured and compiled
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub machine: String,
    pub python: String,
    pub make: String,
    /// `make -j<N>`; plain `-j` when unset
    pub jobs: Option<usize>,
    pub binary_name: String,
    /// Appended verbatim to the configure generator command
    pub forced_args: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            machine: "eureka_intel".to_string(),
            python: "python3".to_string(),
            make: "make".to_string(),
            jobs: None,
            binary_name: "gamer".to_string(),
            forced_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MpiConfig {
    pub launcher: String,
    pub ranks: usize,
    pub cores_per_rank: usize,
}

impl Default for MpiConfig {
    fn default() -> Self {
        let cores = num_cpus::get() / THREADS_PER_CORE;
        Self {
            launcher: "mpirun".to_string(),
            ranks: (cores / CORES_PER_RANK).max(1),
            cores_per_rank: CORES_PER_RANK,
        }
    }
}

/// How the simulator and the user scripts are executed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub shell: String,
    pub mpi: MpiConfig,
    /// File the simulator writes on a clean finish
    pub marker_file: String,
    /// Simulator stdout/stderr, relative to the run directory
    pub log_file: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            mpi: MpiConfig::default(),
            marker_file: "Record__Note".to_string(),
            log_file: "log".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Requested tolerance level
    pub error_level: String,
    pub tool_binary: String,
    pub report_name: String,
    /// Attribute dump tool used for provenance of structured outputs
    pub dump_tool: String,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            error_level: BASELINE_LEVEL.to_string(),
            tool_binary: "GAMER_CompareData".to_string(),
            report_name: "compare_result".to_string(),
            dump_tool: "h5dump".to_string(),
        }
    }
}

/// Remote reference store. The API key is only ever read from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    pub api_url: String,
    pub root_folder_id: String,
    pub api_key_env: String,
    pub manifest_folder: String,
    pub manifest_item: String,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            api_url: "https://girder.hub.yt/api/v1".to_string(),
            root_folder_id: "6123170168085e0001634586".to_string(),
            api_key_env: "SIMREG_CLOUD_API_KEY".to_string(),
            manifest_folder: "compare_version_list".to_string(),
            manifest_item: "compare_list".to_string(),
        }
    }
}

impl CloudConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SelectionConfig {
    pub priority: Priority,
    /// Problem ordinals; empty selects all
    pub names: Vec<usize>,
    /// Type ordinals; empty selects all
    pub types: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file_level: String,
    /// Log basename; the file is `<output>.log`
    pub output: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_level: "debug".to_string(),
            output: "test".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn log_file(&self) -> PathBuf {
        PathBuf::from(format!("{}.log", self.output))
    }
}

impl HarnessConfig {
    pub fn src_dir(&self) -> PathBuf {
        self.paths.source_root.join("src")
    }

    /// Binary produced by `make` in the source directory
    pub fn built_binary(&self) -> PathBuf {
        self.src_dir().join(&self.build.binary_name)
    }

    pub fn machine_config(&self) -> PathBuf {
        self.paths.machine_config_dir.join(format!("{}.config", self.build.machine))
    }

    pub fn compare_tool(&self) -> PathBuf {
        self.paths.compare_tool_dir.join(&self.compare.tool_binary)
    }

    pub fn run_dir(&self, test_id: &str) -> PathBuf {
        self.paths.run_root.join(test_id)
    }

    /// Resolve a path from a test definition against the source root
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() { path.to_path_buf() } else { self.paths.source_root.join(path) }
    }
}

/// Layers file values, then CLI overrides, then validates
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: HarnessConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let config = toml::from_str(&text)
            .map_err(|e| ConfigError::Parse { path: path.to_path_buf(), message: e.to_string() })?;
        Ok(Self { config })
    }

    pub fn source_root(mut self, root: Option<PathBuf>) -> Self {
        if let Some(root) = root {
            self.config.paths.source_root = root;
        }
        self
    }

    pub fn error_level(mut self, level: Option<String>) -> Self {
        if let Some(level) = level {
            self.config.compare.error_level = level;
        }
        self
    }

    pub fn priority(mut self, priority: Option<Priority>) -> Self {
        if let Some(priority) = priority {
            self.config.selection.priority = priority;
        }
        self
    }

    pub fn names(mut self, names: Vec<usize>) -> Self {
        if !names.is_empty() {
            self.config.selection.names = names;
        }
        self
    }

    pub fn types(mut self, types: Vec<usize>) -> Self {
        if !types.is_empty() {
            self.config.selection.types = types;
        }
        self
    }

    pub fn output(mut self, output: Option<String>) -> Self {
        if let Some(output) = output {
            self.config.logging.output = output;
        }
        self
    }

    pub fn log_level(mut self, level: Option<String>) -> Self {
        if let Some(level) = level {
            self.config.logging.level = level;
        }
        self
    }

    pub fn no_upload(mut self, no_upload: bool) -> Self {
        self.config.no_upload |= no_upload;
        self
    }

    pub fn machine(mut self, machine: Option<String>) -> Self {
        if let Some(machine) = machine {
            self.config.build.machine = machine;
        }
        self
    }

    pub fn mpi_ranks(mut self, ranks: Option<usize>) -> Self {
        if let Some(ranks) = ranks {
            self.config.run.mpi.ranks = ranks;
        }
        self
    }

    pub fn mpi_cores_per_rank(mut self, cores: Option<usize>) -> Self {
        if let Some(cores) = cores {
            self.config.run.mpi.cores_per_rank = cores;
        }
        self
    }

    pub fn forced_args(mut self, args: Vec<String>) -> Self {
        self.config.build.forced_args.extend(args);
        self
    }

    /// Validate and resolve every path against the source root
    pub fn build(self) -> Result<HarnessConfig, ConfigError> {
        let mut config = self.config;

        let root = &config.paths.source_root;
        if !root.is_dir() {
            return Err(ConfigError::invalid(format!(
                "source root {} does not exist or is not a directory",
                root.display()
            )));
        }
        let root = std::fs::canonicalize(root).map_err(|e| ConfigError::io(root, e))?;

        let paths = &mut config.paths;
        for path in [
            &mut paths.tests_root,
            &mut paths.run_root,
            &mut paths.local_reference_root,
            &mut paths.compare_tool_dir,
            &mut paths.machine_config_dir,
        ] {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
        paths.source_root = root;

        if config.run.mpi.ranks == 0 {
            return Err(ConfigError::invalid("MPI rank count must be positive"));
        }
        if config.run.mpi.cores_per_rank == 0 {
            return Err(ConfigError::invalid("MPI cores per rank must be positive"));
        }
        if config.compare.error_level.trim().is_empty() {
            return Err(ConfigError::invalid("error level name must not be empty"));
        }
        if config.logging.output.trim().is_empty() {
            return Err(ConfigError::invalid("log output name must not be empty"));
        }
        if config.build.jobs == Some(0) {
            return Err(ConfigError::invalid("make job count must be positive"));
        }

        Ok(config)
    }
}
