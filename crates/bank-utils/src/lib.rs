//! Shared utilities for bank-rs
//!
//! Logging setup and environment-variable helpers used by the binaries and
//! configuration layers of the workspace.

pub mod env;
pub mod logging;

pub use env::{env_or, env_parse, load_dotenv};
pub use logging::{init_tracing, init_tracing_json};
