//! Table output formatting for CLI commands
//!
//! Renders per-file optimization results and per-round history using
//! comfy-table, with color-coded outcomes when the terminal supports it.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use crate::domain::models::{OptimizationResult, Outcome, Verdict};

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<usize>,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    pub fn with_config(use_colors: bool, max_width: Option<usize>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// One row per input file.
    pub fn format_results(&self, results: &[OptimizationResult]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["File", "Outcome", "Reason", "Rounds", "Best", "Score", "Output"]));

        for result in results {
            let file = result
                .input_file
                .file_name()
                .map_or_else(|| result.input_file.display().to_string(), |n| n.to_string_lossy().into_owned());
            let outcome = if self.use_colors {
                Cell::new(result.outcome.to_string()).fg(outcome_color(result.outcome))
            } else {
                Cell::new(format!("{} {}", outcome_icon(result.outcome), result.outcome))
            };
            let best = result
                .best_round
                .map_or_else(|| "-".to_string(), |r| if r == 0 { "raw".to_string() } else { r.to_string() });
            let output = result
                .final_output
                .as_ref()
                .map_or_else(|| "-".to_string(), |p| truncate_text(&p.display().to_string(), 48));

            table.add_row(vec![
                Cell::new(truncate_text(&file, 32)),
                outcome,
                Cell::new(result.termination.to_string()),
                Cell::new(result.rounds_executed()),
                Cell::new(best),
                Cell::new(format_score(result.best_score)),
                Cell::new(output),
            ]);
        }

        table.to_string()
    }

    /// Per-round history of one file, raw file first.
    pub fn format_rounds(&self, result: &OptimizationResult) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Round", "Parameters", "Score", "Verdict", "Retained"]));

        if let Some(baseline) = &result.baseline {
            table.add_row(vec![
                Cell::new("raw"),
                Cell::new("-"),
                Cell::new(format_score(Some(baseline.score))),
                Cell::new(if baseline.acceptable { "ACCEPTED" } else { "-" }),
                Cell::new("100.0%"),
            ]);
        }

        for record in &result.records {
            let verdict = if self.use_colors {
                Cell::new(record.verdict.to_string()).fg(verdict_color(record.verdict))
            } else {
                Cell::new(record.verdict.to_string())
            };
            let retained = record
                .trim_report
                .retention_rate()
                .map_or_else(|| "-".to_string(), |r| format!("{:.1}%", r * 100.0));
            table.add_row(vec![
                Cell::new(record.round),
                Cell::new(record.parameters.to_string()),
                Cell::new(format_score(record.score)),
                verdict,
                Cell::new(retained),
            ]);
        }

        table.to_string()
    }

    /// Create a base table with common settings
    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(u16::try_from(width).unwrap_or(u16::MAX));
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|n| Cell::new(n).add_attribute(Attribute::Bold))
        .collect()
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

fn outcome_color(outcome: Outcome) -> Color {
    match outcome {
        Outcome::Success => Color::Green,
        Outcome::Partial => Color::Yellow,
        Outcome::Failed => Color::Red,
    }
}

fn outcome_icon(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Success => "✓",
        Outcome::Partial => "◐",
        Outcome::Failed => "✗",
    }
}

fn verdict_color(verdict: Verdict) -> Color {
    match verdict {
        Verdict::Accepted => Color::Green,
        Verdict::Improved => Color::Cyan,
        Verdict::NoImprovement => Color::Yellow,
        Verdict::Failed => Color::Red,
    }
}

fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| "-".to_string(), |s| format!("{s:.3}"))
}

/// Truncate text to max length with ellipsis
fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
