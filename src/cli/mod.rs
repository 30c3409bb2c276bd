//! CLI layer - Command-line interface
//!
//! Contains argument parsing, output formatting, logging setup, signal
//! handling, and the runners that drive a recording session.

pub mod app;
pub mod args;
pub mod config_cmd;
pub mod logging;
pub mod presenter;
pub mod signals;

// Re-export commonly used types
pub use app::{run_check, run_record, RecordOptions, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE_ERROR};
pub use args::{Cli, Commands, ConfigAction};
pub use presenter::Presenter;
pub use signals::{StopRequest, StopSignals};
