//! Prompt texts for the assistant
//!
//! - `system`: system prompts for the tool loop, the parser, answers and
//!   generated commentary
//! - `user`: user message builders that embed question and data

mod system;
mod user;

pub use system::*;
pub use user::*;
