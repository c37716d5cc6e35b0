//! # tally-core
//!
//! Core errors, logging and configuration for tally.
//!
//! This crate provides:
//! - [`TallyError`] - Error types for configuration, I/O and logging setup
//! - [`logging`] - Tracing setup and log management utilities
//! - [`config`] - The YAML dashboard configuration
//!
//! ## Example
//!
//! ```no_run
//! use tally_core::{TallyConfig, logging};
//!
//! fn main() -> tally_core::Result<()> {
//!     let _guard = logging::init_logging(None, false)?;
//!     let config = TallyConfig::load_default()?;
//!     tracing::info!(factor = config.extrapolation_factor, "configuration ready");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;

pub use config::{ALL_ACCOUNTS, TallyConfig};
pub use error::{Result, TallyError};
pub use logging::{LogGuard, init_logging};
