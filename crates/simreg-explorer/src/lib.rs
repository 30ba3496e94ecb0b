//! Test definition discovery for simreg.
//!
//! Problems live under `<tests_root>/<problem>/` with a `configs` YAML file
//! and an `Inputs/` directory. The explorer validates every definition up
//! front and expands the selected ones into immutable [`TestCase`] values.
//!
//! [`TestCase`]: simreg_common::TestCase

pub mod explorer;
pub mod schema;

pub use explorer::{CONFIGS_FILE, Problem, TEMPLATE_DIR, TestExplorer};
pub use schema::{CaseSpec, TypeSpec, parse_problem};
