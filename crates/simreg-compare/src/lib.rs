//! Comparison engine for simreg.
//!
//! [`FileComparator`] implementations judge one produced file against its
//! reference at a tolerance: [`TextComparator`] for numeric tables,
//! [`StructuredComparator`] for HDF5 snapshots (through an external tool built
//! by [`CompareToolBuilder`]) and [`NoteComparator`] for the run record, which
//! only ever logs its findings. [`CaseComparator`] ties them together for a
//! whole case.

pub mod case;
pub mod comparison;
pub mod machine;
pub mod note;
pub mod structured;
pub mod text;
pub mod tolerance;
pub mod tool_builder;

pub use case::{CaseComparator, REFERENCE_DIR};
pub use comparison::{Comparison, FileComparator, Outcome};
pub use note::NoteComparator;
pub use structured::{Provenance, StructuredComparator};
pub use text::{Table, TextComparator};
pub use tolerance::Tolerance;
pub use tool_builder::CompareToolBuilder;
