//! Host layer for qsweep sweeps
//!
//! Wraps the `qsweep_core` engine with what a program running sweeps needs:
//! - File logging with size-based rotation
//! - Run settings loaded from YAML
//! - A [`Session`] that applies settings to a simulation and runs it

pub mod logging;
pub mod session;
pub mod settings;

pub use logging::{LogRotation, init_logging};
pub use session::Session;
pub use settings::RunSettings;
