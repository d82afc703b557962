//! Stream one entity's dump lines into its table
//!
//! For every line: parse, coerce, then insert with a statement built from the
//! record's own attribute list. Column names are quoted identifiers and values
//! are always bound parameters. Statements go through the connection's
//! statement cache because sparse records repeat a handful of column sets.

use crate::coerce::{coerce, CoercedRow};
use crate::config::{ErrorPolicy, DEFAULT_PROGRESS_INTERVAL};
use crate::error::{IngestError, RecordError, Result};
use crate::record;
use crate::schema::{quote_ident, EntitySchema};
use rusqlite::{params_from_iter, ErrorCode, Transaction};
use serde::Serialize;
use std::io::BufRead;
use std::path::PathBuf;
use tracing::{debug, info, info_span, warn};

/// Per-entity knobs taken from the run configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub error_policy: ErrorPolicy,
    pub progress_interval: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::FailFast,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Outcome of loading one entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub entity: String,
    pub lines_read: u64,
    pub rows_inserted: u64,
    pub records_skipped: u64,
}

impl LoadStats {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            ..Default::default()
        }
    }
}

/// `INSERT INTO "t" ("a", "b") VALUES (?, ?)` for exactly the row's columns
pub fn insert_sql(table: &str, row: &CoercedRow) -> String {
    let columns: Vec<String> = row.columns().map(quote_ident).collect();
    let placeholders = vec!["?"; row.len()].join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns.join(", "),
        placeholders
    )
}

/// Loads the records of a single entity inside the caller's transaction
pub struct EntityLoader<'s> {
    schema: &'s EntitySchema,
    options: LoadOptions,
}

impl<'s> EntityLoader<'s> {
    pub fn new(schema: &'s EntitySchema, options: LoadOptions) -> Self {
        Self { schema, options }
    }

    /// Issue the entity's idempotent `CREATE TABLE IF NOT EXISTS`
    pub fn ensure_table(&self, tx: &Transaction<'_>) -> Result<()> {
        let ddl = self.schema.ddl();
        debug!(entity = self.schema.name, ddl = %ddl, "Ensuring table");
        tx.execute_batch(&ddl)?;
        Ok(())
    }

    /// Create the table if needed, then insert every record of `source` in
    /// source order.
    ///
    /// Nothing is committed here; durability is the caller's decision.
    pub fn load<R: BufRead>(&self, tx: &Transaction<'_>, mut source: R) -> Result<LoadStats> {
        let entity = self.schema.name;
        let _span = info_span!("load", entity).entered();

        self.ensure_table(tx)?;

        let mut stats = LoadStats::new(entity);
        let mut buf = Vec::new();
        let mut line_no = 0;

        loop {
            buf.clear();
            let read = source
                .read_until(b'\n', &mut buf)
                .map_err(|err| IngestError::Source {
                    path: PathBuf::from(self.schema.source_file),
                    source: err,
                })?;
            if read == 0 {
                break;
            }

            line_no += 1;
            stats.lines_read += 1;

            let outcome = decode_line(&buf)
                .map_err(|e| e.at(entity, line_no))
                .and_then(|line| self.load_line(tx, line, line_no));

            match outcome {
                Ok(false) => {},
                Ok(true) => {
                    stats.rows_inserted += 1;
                    if self.options.progress_interval > 0
                        && stats.rows_inserted % self.options.progress_interval == 0
                    {
                        info!(entity, rows = stats.rows_inserted, "rows inserted ...");
                    }
                },
                Err(e) if e.is_per_record() && self.options.error_policy == ErrorPolicy::Skip => {
                    warn!(entity, line = line_no, error = %e, "Skipping record");
                    stats.records_skipped += 1;
                },
                Err(e) => return Err(e),
            }
        }

        info!(
            entity,
            rows = stats.rows_inserted,
            skipped = stats.records_skipped,
            "Total {} rows inserted",
            stats.rows_inserted
        );

        Ok(stats)
    }

    /// Returns whether the line produced a row
    fn load_line(&self, tx: &Transaction<'_>, line: &str, line_no: usize) -> Result<bool> {
        let entity = self.schema.name;

        let Some(record) = record::parse(line).map_err(|e| e.at(entity, line_no))? else {
            return Ok(false);
        };

        if record.is_empty() {
            return Err(RecordError::unparsable("row element has no attributes").at(entity, line_no));
        }

        let row = coerce(self.schema, record).map_err(|e| e.at(entity, line_no))?;
        self.insert(tx, &row, line_no)?;

        Ok(true)
    }

    fn insert(&self, tx: &Transaction<'_>, row: &CoercedRow, line_no: usize) -> Result<()> {
        let violation = |source: rusqlite::Error| IngestError::StoreConstraintViolation {
            entity: self.schema.name.to_string(),
            line: line_no,
            source,
        };

        // Preparing fails when the record names a column the table lacks
        let mut stmt = tx
            .prepare_cached(&insert_sql(self.schema.name, row))
            .map_err(violation)?;

        stmt.execute(params_from_iter(row.values())).map_err(|e| {
            if rejects_record(&e) {
                violation(e)
            } else {
                IngestError::Database(e)
            }
        })?;

        Ok(())
    }
}

/// One raw line without its `\n` or `\r\n` terminator
fn decode_line(raw: &[u8]) -> std::result::Result<&str, RecordError> {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);

    std::str::from_utf8(raw)
        .map_err(|e| RecordError::unparsable(format!("line is not valid UTF-8: {}", e)))
}

/// Statement-level failures caused by the record's content
fn rejects_record(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::ConstraintViolation | ErrorCode::TypeMismatch)
    )
}
