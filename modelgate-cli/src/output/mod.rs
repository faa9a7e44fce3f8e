//! Output formatting for CLI.

mod json;
mod text;

pub use json::{AdapterOutput, DailyOutput, JsonFormatter, ResolveOutput, UsageOutput};
pub use text::TextFormatter;
