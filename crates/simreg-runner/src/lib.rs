//! Drives one simreg test case from a clean run directory to simulator output.
//!
//! [`CaseRunner`] walks the [`CaseState`] machine over a [`CaseStages`]
//! implementation and stops at the first failing stage. [`SimulatorStages`]
//! is the production implementation.

pub mod input;
pub mod runner;
pub mod simulator;
pub mod stages;
pub mod staging;
pub mod state;

pub use runner::{CaseRunner, StateTransition};
pub use simulator::SimulatorStages;
pub use stages::CaseStages;
pub use state::CaseState;
