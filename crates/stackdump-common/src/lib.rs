//! Stackdump Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Ambient functionality shared by the stackdump workspace members.
//!
//! - **Logging**: `tracing` subscriber configuration for console and
//!   rolling log files, driven by the environment or a builder.
//!
//! # Example
//!
//! ```no_run
//! use stackdump_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel, LogOutput};
