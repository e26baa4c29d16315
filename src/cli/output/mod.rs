//! CLI output formatting module
//!
//! Every command renders through [`CommandOutput`], either as human-readable
//! text or as JSON on stdout.

pub mod progress;
pub mod table;

use serde::Serialize;

pub use progress::create_progress_bar;
pub use table::TableFormatter;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}
