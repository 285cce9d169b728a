//! CLI module for obi
//!
//! This module provides:
//! - Command implementations (workflows, select, run, chat, personas, validate)
//! - Output handlers (console, JSON, quiet)
//! - Signal handling for graceful cancellation
//!
//! # Example
//!
//! ```ignore
//! use obi::cli::{commands, output, signals};
//!
//! let handler = output::create_handler(output::OutputMode::Console, false);
//! let exit_code = commands::run_workflow("background", &catalog, &settings, &token, &*handler).await;
//! ```

pub mod commands;
pub mod output;
pub mod signals;

pub use output::{OutputMode, create_handler};
pub use signals::{CancellationToken, setup_signal_handlers};
