//! Dataset access backends for Verdict.
//!
//! Every backend implements [`verdict_core::DataSource`]; the evaluator is
//! agnostic to which one supplies the rows.

pub mod csv;
pub mod memory;
pub mod mock;

pub use crate::csv::{CsvSource, write_csv};
pub use memory::InMemorySource;
pub use mock::{DEFAULT_SEED, MockSource};
