//! Stackdump Ingest Library
//!
//! Loads a Stack Exchange XML data dump into a single SQLite database.
//!
//! # Pipeline
//!
//! - [`record`]: one dump line to a sparse attribute set
//! - [`coerce`]: raw attribute text to integers, text and epoch seconds
//! - [`loader`]: insert one entity's records inside the run transaction
//! - [`batch`]: load the selected entities and commit once
//!
//! # Example
//!
//! ```no_run
//! use stackdump_ingest::{BatchRunner, DirectorySource, LoadOptions, SchemaRegistry};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut conn = rusqlite::Connection::open("stack.db")?;
//!     let runner = BatchRunner::new(
//!         SchemaRegistry::stack_exchange(),
//!         DirectorySource::new("./dump"),
//!         LoadOptions::default(),
//!     );
//!     let summary = runner.run(&mut conn, &["badges", "tags"])?;
//!     println!("{} rows", summary.rows_inserted);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod batch;
pub mod coerce;
pub mod config;
pub mod error;
pub mod loader;
pub mod record;
pub mod schema;
pub mod timestamp;

pub use batch::{BatchRunner, BatchSummary, DirectorySource, RecordSource};
pub use config::{ErrorPolicy, IngestConfig};
pub use error::{IngestError, Result};
pub use loader::{EntityLoader, LoadOptions, LoadStats};
pub use schema::{EntitySchema, SchemaRegistry};
