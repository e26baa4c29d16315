//! Prompt construction for the recommendation service.

use serde_json::json;
use std::fmt::Write as _;
use std::path::Path;
use tracing::warn;

use crate::domain::errors::ProposalError;
use crate::domain::models::{IterationRecord, QualityMetrics, RecommenderConfig, Verdict};

/// Built-in instructions used when no template file is configured.
pub const DEFAULT_TEMPLATE: &str = r#"You are a quality-control parameter optimizer for FASTQ sequencing data.

Your task: read the FastQC metrics below and choose fastp trimming parameters
that bring the file within quality targets while discarding as few reads as possible.

Output format:
{
  "quality": <int 0-40>,
  "length": <int 1-300>,
  "trim_front": <int 0-50>,
  "trim_tail": <int 0-50>,
  "adapter_trim": <bool>,
  "poly_g_trim": <bool>
}

Guidelines:
1. Minimize data loss; prefer the mildest setting that fixes the problem.
2. average_quality above 30: quality=20 with minimal trimming.
3. average_quality 25-30: quality=22 with light trimming.
4. average_quality below 25: quality=25 with moderate trimming.
5. adapter_contamination above 5%: adapter_trim=true.
6. adapter_contamination above 15%: adapter_trim=true and trim_tail=10.
7. Quality dropping at read ends: use trim_front / trim_tail.
8. max_n_content above 5%: raise the quality threshold.
9. Keep length at 40 or more unless reads are short.
10. PolyG artifacts (NextSeq/NovaSeq): poly_g_trim=true.

Module status hints:
- FAIL in "Per base sequence quality": raise quality or trim read ends.
- FAIL in "Adapter Content": enable adapter trimming and trim the tail.
- FAIL in "Per base N content": raise quality.
- WARN statuses: apply moderate corrections."#;

const CLOSING_INSTRUCTION: &str =
    "Respond with ONLY a valid JSON object containing the parameters above. No explanations.";

const STRICT_INSTRUCTION: &str = "Your previous answer could not be used. Reply with exactly one JSON \
object and nothing else: no markdown, no prose, keys quality, length, trim_front, trim_tail, \
adapter_trim, poly_g_trim.";

/// What the prompt should say about the previous round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    /// First proposal for this file
    Initial,
    /// The last round scored better than everything before it
    Improved,
    /// The last round did not beat the best score
    NoImprovement,
}

impl Feedback {
    /// Derive feedback from the most recent record, if any.
    pub fn from_history(history: &[IterationRecord]) -> Self {
        match history.last().map(|r| r.verdict) {
            None => Self::Initial,
            Some(Verdict::Improved | Verdict::Accepted) => Self::Improved,
            Some(Verdict::NoImprovement | Verdict::Failed) => Self::NoImprovement,
        }
    }
}

/// Assembles bounded-size prompts from a template, metrics and history.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: String,
    max_chars: usize,
    history_window: usize,
}

impl PromptBuilder {
    pub fn new(template: impl Into<String>, max_chars: usize, history_window: usize) -> Self {
        Self {
            template: template.into(),
            max_chars,
            history_window,
        }
    }

    /// Builder using the configured template file. An unreadable or empty
    /// file is logged and the built-in template is used instead.
    pub fn from_config(config: &RecommenderConfig) -> Self {
        let template = match config.prompt_template.as_deref().map(load_template) {
            Some(Ok(text)) => text,
            Some(Err(e)) => {
                warn!(error = %e, "using built-in prompt template");
                DEFAULT_TEMPLATE.to_string()
            }
            None => DEFAULT_TEMPLATE.to_string(),
        };
        Self::new(template, config.max_prompt_chars, config.history_window)
    }

    /// Prompt for the next proposal. `strict` appends the retry instruction.
    pub fn build(&self, metrics: &QualityMetrics, history: &[IterationRecord], strict: bool) -> String {
        let head = self.head(metrics);
        let feedback = feedback_section(Feedback::from_history(history), history.len() + 1);
        let tail = if strict {
            format!("{CLOSING_INSTRUCTION}\n\n{STRICT_INSTRUCTION}")
        } else {
            CLOSING_INSTRUCTION.to_string()
        };

        let window = history.len().saturating_sub(self.history_window);
        let mut entries: Vec<String> = history[window..].iter().map(history_entry).collect();

        loop {
            let prompt = assemble(&head, &entries, &feedback, &tail);
            if prompt.chars().count() <= self.max_chars {
                return prompt;
            }
            if entries.is_empty() {
                return truncate_keeping_tail(&prompt, &tail, self.max_chars);
            }
            // Oldest rounds go first
            entries.remove(0);
        }
    }

    fn head(&self, metrics: &QualityMetrics) -> String {
        let summary = metrics_summary(metrics);
        let rendered = serde_json::to_string_pretty(&summary).unwrap_or_else(|_| summary.to_string());
        format!("{}\n\nFASTQ quality metrics:\n{rendered}\n", self.template.trim_end())
    }
}

pub fn load_template(path: &Path) -> Result<String, ProposalError> {
    let text = std::fs::read_to_string(path).map_err(|e| ProposalError::Template {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if text.trim().is_empty() {
        return Err(ProposalError::Template {
            path: path.to_path_buf(),
            reason: "template is empty".to_string(),
        });
    }
    Ok(text)
}

/// Compact metrics view sent to the service.
pub fn metrics_summary(metrics: &QualityMetrics) -> serde_json::Value {
    let q = &metrics.quality_summary;
    let mut summary = json!({
        "module_status": metrics.module_status,
        "quality_summary": {
            "average_quality": round2(q.average_quality),
            "min_quality": round2(q.min_quality),
            "mean_scores": q.mean_scores.iter().map(|v| round2(*v)).collect::<Vec<_>>(),
        },
        "adapter_contamination": round2(metrics.adapter_contamination),
    });
    if let Some(map) = summary.as_object_mut() {
        if let Some(total) = metrics.total_sequences {
            map.insert("total_sequences".into(), json!(total));
        }
        if let Some(length) = metrics.read_length {
            map.insert("read_length".into(), json!(length.to_string()));
        }
        if let Some(gc) = metrics.gc_percent {
            map.insert("gc_percent".into(), json!(round2(gc)));
        }
        if let Some(n) = metrics.max_n_content {
            map.insert("max_n_content".into(), json!(round2(n)));
        }
        if let Some(dedup) = metrics.deduplicated_percentage {
            map.insert("deduplicated_percentage".into(), json!(round2(dedup)));
        }
        if metrics.overrepresented_count > 0 {
            map.insert(
                "overrepresented_count".into(),
                json!(metrics.overrepresented_count),
            );
        }
    }
    summary
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn history_entry(record: &IterationRecord) -> String {
    let mut line = format!("- round {}: {}", record.round, record.parameters);
    match record.score {
        Some(score) => {
            let _ = write!(line, " -> score {score:.3}");
        }
        None => line.push_str(" -> no score"),
    }
    let _ = write!(line, ", {}", record.verdict);
    if let Some(rate) = record.trim_report.retention_rate() {
        let _ = write!(line, ", {:.1}% reads retained", rate * 100.0);
    }
    line
}

fn feedback_section(feedback: Feedback, next_round: usize) -> String {
    match feedback {
        Feedback::Initial => String::new(),
        Feedback::Improved => format!(
            "This is round {next_round}. The last parameters improved quality but targets are \
             still not met. Adjust them further while minimizing data loss.\n"
        ),
        Feedback::NoImprovement => format!(
            "This is round {next_round}. The last parameters did NOT improve on the best result \
             so far. Propose a clearly different parameter set; do not repeat earlier attempts.\n"
        ),
    }
}

fn assemble(head: &str, entries: &[String], feedback: &str, tail: &str) -> String {
    let mut prompt = String::from(head);
    if !entries.is_empty() {
        prompt.push_str("\nPrevious rounds:\n");
        for entry in entries {
            prompt.push_str(entry);
            prompt.push('\n');
        }
    }
    if !feedback.is_empty() {
        prompt.push('\n');
        prompt.push_str(feedback);
    }
    prompt.push('\n');
    prompt.push_str(tail);
    prompt
}

fn truncate_keeping_tail(prompt: &str, tail: &str, max_chars: usize) -> String {
    let tail_chars = tail.chars().count() + 1;
    if tail_chars >= max_chars {
        return tail.chars().take(max_chars).collect();
    }
    let body: String = prompt.chars().take(max_chars - tail_chars).collect();
    format!("{body}\n{tail}")
}
