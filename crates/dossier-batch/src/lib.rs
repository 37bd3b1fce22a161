//! Sequential batch generation driven by tabular input.
//!
//! Rows are generated one at a time, strictly in input order, with a fixed
//! pause between them. A failing row is recorded and the batch moves on.

pub mod archive;
pub mod input;
pub mod mapping;
pub mod runner;
pub mod sink;
pub mod types;

pub use archive::build_archive;
pub use input::{read_rows, read_rows_from_path};
pub use mapping::FieldMapping;
pub use runner::{BatchConfig, BatchGenerator, BatchRunner};
pub use sink::{FileSink, PersistenceSink};
pub use types::{BatchResult, BatchRow, DocumentRecord, RowOutcome, RowStatus};
