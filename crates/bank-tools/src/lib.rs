//! Tool framework for bank-rs
//!
//! Tools are the functions the language model may call while answering a
//! question. Each tool declares a [`ParamSchema`]; the [`ToolRegistry`]
//! validates every call against that schema before the handler runs and
//! wraps the outcome in a uniform [`ToolResult`] envelope.

pub mod args;
pub mod error;
pub mod registry;
pub mod result;
pub mod schema;
pub mod tool;

pub use args::Arguments;
pub use error::{Result, ToolError};
pub use registry::{ToolRegistry, ToolRegistryBuilder};
pub use result::ToolResult;
pub use schema::{Param, ParamSchema, ParamType};
pub use tool::Tool;
