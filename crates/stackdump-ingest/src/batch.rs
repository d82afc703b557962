//! Whole-run orchestration
//!
//! A run resolves every requested entity up front, then loads them in order
//! inside one transaction on one connection. The transaction is committed
//! only after the last entity finished; any error rolls back everything,
//! tables created during the run included.

use crate::error::{IngestError, Result};
use crate::loader::{EntityLoader, LoadOptions, LoadStats};
use crate::schema::{EntitySchema, SchemaRegistry};
use rusqlite::{Connection, Transaction};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Where an entity's dump lines come from
pub trait RecordSource {
    fn open(&self, schema: &EntitySchema) -> Result<Box<dyn BufRead>>;
}

/// Dump files laid out as `<dir>/<Entity>.xml`
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, schema: &EntitySchema) -> PathBuf {
        self.dir.join(schema.source_file)
    }
}

impl RecordSource for DirectorySource {
    fn open(&self, schema: &EntitySchema) -> Result<Box<dyn BufRead>> {
        let path = self.path_for(schema);
        debug!(entity = schema.name, path = %path.display(), "Opening source");

        let file = File::open(&path).map_err(|source| IngestError::Source { path, source })?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Result of a committed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub entities: Vec<LoadStats>,
    pub rows_inserted: u64,
    pub records_skipped: u64,
    pub elapsed_ms: u64,
}

impl BatchSummary {
    fn from_stats(entities: Vec<LoadStats>, started: Instant) -> Self {
        Self {
            rows_inserted: entities.iter().map(|s| s.rows_inserted).sum(),
            records_skipped: entities.iter().map(|s| s.records_skipped).sum(),
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            entities,
        }
    }
}

pub struct BatchRunner<S> {
    registry: SchemaRegistry,
    source: S,
    options: LoadOptions,
}

impl<S: RecordSource> BatchRunner<S> {
    pub fn new(registry: SchemaRegistry, source: S, options: LoadOptions) -> Self {
        Self {
            registry,
            source,
            options,
        }
    }

    /// Load `entities` in the given order and commit once at the end.
    ///
    /// Unknown entity names are reported before any file is opened or any
    /// statement is issued.
    pub fn run<E: AsRef<str>>(&self, conn: &mut Connection, entities: &[E]) -> Result<BatchSummary> {
        let started = Instant::now();

        let schemas = entities
            .iter()
            .map(|e| self.registry.schema_for(e.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        info!(
            entities = schemas.len(),
            policy = %self.options.error_policy,
            "Starting load"
        );

        let tx = conn.transaction()?;

        match self.load_all(&tx, &schemas) {
            Ok(stats) => {
                tx.commit()?;
                let summary = BatchSummary::from_stats(stats, started);
                info!(
                    rows = summary.rows_inserted,
                    skipped = summary.records_skipped,
                    elapsed_ms = summary.elapsed_ms,
                    "Load committed"
                );
                Ok(summary)
            },
            Err(e) => {
                error!(error = %e, "Load failed, rolling back");
                if let Err(rollback) = tx.rollback() {
                    warn!(error = %rollback, "Rollback failed");
                }
                Err(e)
            },
        }
    }

    fn load_all(&self, tx: &Transaction<'_>, schemas: &[&EntitySchema]) -> Result<Vec<LoadStats>> {
        let mut stats = Vec::with_capacity(schemas.len());

        for schema in schemas {
            let source = self.source.open(schema)?;
            stats.push(EntityLoader::new(schema, self.options).load(tx, source)?);
        }

        Ok(stats)
    }
}
