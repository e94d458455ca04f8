//! Tool trait definition

use crate::{Arguments, ParamSchema, Result};
use async_trait::async_trait;
use serde_json::Value;

/// A function the model may call.
///
/// Handlers receive arguments that already passed [`ParamSchema`]
/// validation and must not mutate shared state: calls from one model turn
/// run concurrently.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Run the tool; the returned value becomes the envelope's `data`
    async fn execute(&self, args: Arguments) -> Result<Value>;

    /// Unique tool name as advertised to the model
    fn name(&self) -> &str;

    /// Description shown to the model
    fn description(&self) -> &str;

    /// Declared parameters
    fn parameters(&self) -> ParamSchema;
}
