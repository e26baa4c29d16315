//! Parses FastQC `fastqc_data.txt` reports into [`QualityMetrics`].
//!
//! The report is a sequence of tab-separated modules:
//!
//! ```text
//! >>Per base sequence quality	fail
//! #Base	Mean	Median	...
//! 1	32.1	33.0	...
//! >>END_MODULE
//! ```
//!
//! Unknown modules are recorded in `module_status` and otherwise ignored.

use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::domain::errors::ParseError;
use crate::domain::models::{ModuleStatus, QualityMetrics, QualitySummary, ReadLength};

const PER_BASE_QUALITY: &str = "Per base sequence quality";
const ADAPTER_CONTENT: &str = "Adapter Content";
const BASIC_STATISTICS: &str = "Basic Statistics";
const N_CONTENT: &str = "Per base N content";
const DUPLICATION: &str = "Sequence Duplication Levels";
const OVERREPRESENTED: &str = "Overrepresented sequences";
const DEDUP_HEADER: &str = "#Total Deduplicated Percentage";

/// Number of leading per-position means kept for prompt context.
const MEAN_SCORE_PREVIEW: usize = 10;

/// Data row of a module with its 1-based line number.
#[derive(Debug)]
struct Row<'a> {
    line: usize,
    columns: Vec<&'a str>,
}

#[derive(Debug, Default)]
struct Section<'a> {
    rows: Vec<Row<'a>>,
    dedup_percentage: Option<&'a str>,
}

/// Stateless report parser.
pub struct MetricsExtractor;

impl MetricsExtractor {
    /// Read and parse the report at `path`.
    pub async fn extract(path: &Path) -> Result<QualityMetrics, ParseError> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ParseError::ReportNotFound(path.to_path_buf()));
            }
            Err(e) => {
                return Err(ParseError::Unreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };
        Self::parse(&text)
    }

    /// Parse report text. Pure: the same input always yields the same
    /// metrics.
    pub fn parse(text: &str) -> Result<QualityMetrics, ParseError> {
        let (module_status, sections) = split_modules(text);
        if module_status.is_empty() {
            return Err(ParseError::MissingField("module_status"));
        }

        let quality_summary = sections
            .get(PER_BASE_QUALITY)
            .ok_or(ParseError::MissingField("quality_summary"))
            .and_then(parse_quality_summary)?;

        let adapter_contamination = match sections.get(ADAPTER_CONTENT) {
            Some(section) => max_over_columns(ADAPTER_CONTENT, section, 1..)?.unwrap_or(0.0),
            None => {
                warn!("report has no '{ADAPTER_CONTENT}' module, assuming no contamination");
                0.0
            }
        };

        let BasicStatistics {
            total_sequences,
            read_length,
            gc_percent,
        } = sections
            .get(BASIC_STATISTICS)
            .map(parse_basic_statistics)
            .unwrap_or_default();

        let max_n_content = match sections.get(N_CONTENT) {
            Some(section) => max_over_columns(N_CONTENT, section, 1..2)?,
            None => None,
        };

        let deduplicated_percentage = sections
            .get(DUPLICATION)
            .and_then(|s| s.dedup_percentage)
            .and_then(|v| v.trim().parse::<f64>().ok());

        let overrepresented_count = sections.get(OVERREPRESENTED).map_or(0, |s| s.rows.len());

        let metrics = QualityMetrics {
            module_status,
            quality_summary,
            adapter_contamination,
            total_sequences,
            read_length,
            gc_percent,
            max_n_content,
            deduplicated_percentage,
            overrepresented_count,
        };
        debug!(
            average_quality = metrics.quality_summary.average_quality,
            min_quality = metrics.quality_summary.min_quality,
            adapter = metrics.adapter_contamination,
            failing = metrics.count(ModuleStatus::Fail),
            "parsed quality report"
        );
        Ok(metrics)
    }
}

fn split_modules(text: &str) -> (BTreeMap<String, ModuleStatus>, BTreeMap<&str, Section<'_>>) {
    let mut statuses = BTreeMap::new();
    let mut sections: BTreeMap<&str, Section<'_>> = BTreeMap::new();
    let mut current: Option<&str> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix(">>") {
            if header.starts_with("END_MODULE") {
                current = None;
                continue;
            }
            let mut parts = header.split('\t');
            let name = parts.next().unwrap_or_default().trim();
            if name.is_empty() {
                continue;
            }
            match parts.next().map(str::parse::<ModuleStatus>) {
                Some(Ok(status)) => {
                    statuses.insert(name.to_string(), status);
                }
                Some(Err(e)) => warn!(module = name, error = %e, "ignoring module status"),
                None => warn!(module = name, "module header without status"),
            }
            sections.entry(name).or_default();
            current = Some(name);
            continue;
        }

        let Some(name) = current else { continue };
        let Some(section) = sections.get_mut(name) else { continue };

        if let Some(value) = line.strip_prefix(DEDUP_HEADER) {
            section.dedup_percentage = Some(value.trim_start_matches('\t'));
        } else if !line.starts_with('#') {
            section.rows.push(Row {
                line: idx + 1,
                columns: line.split('\t').collect(),
            });
        }
    }

    (statuses, sections)
}

fn parse_number(section: &str, row: &Row<'_>, column: usize) -> Result<f64, ParseError> {
    let value = row.columns.get(column).copied().unwrap_or_default().trim();
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(ParseError::MalformedNumber {
            section: section.to_string(),
            line: row.line,
            value: value.to_string(),
        }),
    }
}

fn parse_quality_summary(section: &Section<'_>) -> Result<QualitySummary, ParseError> {
    let means = section
        .rows
        .iter()
        .map(|row| parse_number(PER_BASE_QUALITY, row, 1))
        .collect::<Result<Vec<f64>, _>>()?;

    if means.is_empty() {
        return Err(ParseError::MissingField("quality_summary"));
    }

    let average_quality = means.iter().sum::<f64>() / means.len() as f64;
    let min_quality = means.iter().copied().fold(f64::INFINITY, f64::min);
    let max_quality = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Ok(QualitySummary {
        average_quality,
        min_quality,
        max_quality,
        mean_scores: means.into_iter().take(MEAN_SCORE_PREVIEW).collect(),
    })
}

/// Largest value across the given columns of every row.
fn max_over_columns(
    name: &str,
    section: &Section<'_>,
    columns: impl std::ops::RangeBounds<usize>,
) -> Result<Option<f64>, ParseError> {
    let mut max: Option<f64> = None;
    for row in &section.rows {
        for (column, _) in row
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| columns.contains(i))
        {
            let value = parse_number(name, row, column)?;
            max = Some(max.map_or(value, |m| m.max(value)));
        }
    }
    Ok(max)
}

#[derive(Debug, Default)]
struct BasicStatistics {
    total_sequences: Option<u64>,
    read_length: Option<ReadLength>,
    gc_percent: Option<f64>,
}

/// Basic Statistics values are informational; unparseable ones are skipped.
fn parse_basic_statistics(section: &Section<'_>) -> BasicStatistics {
    let lookup = |key: &str| {
        section
            .rows
            .iter()
            .find(|r| r.columns.first().map(|c| c.trim()) == Some(key))
            .and_then(|r| r.columns.get(1))
            .map(|v| v.trim())
    };
    BasicStatistics {
        total_sequences: lookup("Total Sequences").and_then(|v| v.parse().ok()),
        read_length: lookup("Sequence length").and_then(|v| v.parse().ok()),
        gc_percent: lookup("%GC").and_then(|v| v.parse().ok()),
    }
}
