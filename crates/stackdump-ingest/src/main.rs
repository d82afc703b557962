//! Stackdump Ingest - load a Stack Exchange dump into SQLite

use anyhow::{Context, Result};
use clap::Parser;
use stackdump_common::logging::{init_logging, LogConfig, LogLevel};
use stackdump_ingest::config::{parse_entity_list, IngestConfigBuilder};
use stackdump_ingest::{BatchRunner, DirectorySource, ErrorPolicy, IngestConfig, SchemaRegistry};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "stackdump-ingest")]
#[command(author, version, about = "Load a Stack Exchange XML dump into SQLite")]
struct Cli {
    /// SQLite database file [default: stack.db]
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Directory holding Badges.xml, Posts.xml, ... [default: .]
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Comma-separated entities to load, in order [default: all eight]
    #[arg(short, long)]
    entities: Option<String>,

    /// What to do with a bad record: fail-fast or skip [default: fail-fast]
    #[arg(long)]
    on_error: Option<ErrorPolicy>,

    /// Rows between progress log lines [default: 1000]
    #[arg(long)]
    progress_interval: Option<u64>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Environment first, then any flag given on the command line
    fn ingest_config(&self) -> Result<IngestConfig> {
        let mut builder = IngestConfigBuilder::from_config(IngestConfig::from_env()?);

        if let Some(path) = &self.database {
            builder = builder.database_path(path.clone());
        }
        if let Some(dir) = &self.data_dir {
            builder = builder.data_dir(dir.clone());
        }
        if let Some(list) = &self.entities {
            builder = builder.entities(parse_entity_list(list));
        }
        if let Some(policy) = self.on_error {
            builder = builder.error_policy(policy);
        }
        if let Some(rows) = self.progress_interval {
            builder = builder.progress_interval(rows);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }
}

/// `LOG_*` environment over the defaults, then `--verbose` over both
fn log_config(verbose: bool) -> Result<LogConfig> {
    let mut config = LogConfig::builder()
        .log_file_prefix("stackdump-ingest")
        .build()
        .merge_env()?;

    if verbose {
        config.level = LogLevel::Debug;
    }

    Ok(config)
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let guard = match log_config(cli.verbose).and_then(|c| init_logging(&c)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {:#}", e);
            std::process::exit(1);
        },
    };

    if let Err(e) = run(&cli) {
        error!(error = %e, "Ingestion failed");
        eprintln!("Error: {:#}", e);
        // Flush the file appender before exiting
        drop(guard);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.ingest_config()?;

    info!(
        database = %config.database_path.display(),
        data_dir = %config.data_dir.display(),
        entities = %config.entities.join(","),
        "Ingesting Stack Exchange dump"
    );

    let mut conn = rusqlite::Connection::open(&config.database_path)
        .with_context(|| format!("opening database {}", config.database_path.display()))?;

    let runner = BatchRunner::new(
        SchemaRegistry::stack_exchange(),
        DirectorySource::new(config.data_dir.clone()),
        config.load_options(),
    );
    let summary = runner.run(&mut conn, &config.entities)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    info!(rows = summary.rows_inserted, "Ingestion complete");
    Ok(())
}
