//! Implementation of the `trimwise check` command.

use anyhow::Result;
use clap::Args;
use console::style;
use serde::Serialize;

use crate::adapters::ollama::OllamaClient;
use crate::adapters::tools::{FastQcAnalyzer, FastpTrimmer};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::domain::ports::{QualityAnalyzer, Recommender, ServiceHealth, Trimmer};
use crate::infrastructure::retry::RetryPolicy;

#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Download the configured model when the service does not have it
    #[arg(long)]
    pub pull: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckItem {
    pub name: String,
    pub ok: bool,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub ready: bool,
    pub checks: Vec<CheckItem>,
}

impl CommandOutput for CheckOutput {
    fn to_human(&self) -> String {
        let mut lines: Vec<String> = self
            .checks
            .iter()
            .map(|c| {
                let mark = if c.ok {
                    style("✓").green().bold()
                } else {
                    style("✗").red().bold()
                };
                format!("{mark} {:<22} {}", c.name, style(&c.detail).dim())
            })
            .collect();
        lines.push(String::new());
        lines.push(if self.ready {
            style("All dependencies are available.").green().to_string()
        } else {
            style("Some dependencies are missing.").red().to_string()
        });
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn item(name: &str, ok: bool, detail: impl Into<String>) -> CheckItem {
    CheckItem {
        name: name.to_string(),
        ok,
        detail: detail.into(),
    }
}

/// Returns whether every dependency is usable.
pub async fn execute(args: CheckArgs, config: Config, json_mode: bool) -> Result<bool> {
    let analyzer = FastQcAnalyzer::new(&config.tools, RetryPolicy::none());
    let trimmer = FastpTrimmer::new(&config.tools, RetryPolicy::none());

    let mut checks = vec![
        tool_check(
            analyzer.name(),
            &config.tools.fastqc_binary,
            analyzer.is_available().await,
        ),
        tool_check(
            trimmer.name(),
            &config.tools.fastp_binary,
            trimmer.is_available().await,
        ),
    ];

    let service = format!("service {}", config.recommender.base_url);
    match OllamaClient::new(&config.recommender) {
        Ok(client) => match client.health_check().await {
            Ok(ServiceHealth::Ready) => {
                checks.push(item(&service, true, "reachable"));
                checks.push(item(
                    &format!("model {}", client.model()),
                    true,
                    "installed",
                ));
            }
            Ok(ServiceHealth::ModelMissing { available }) => {
                checks.push(item(&service, true, "reachable"));
                let name = format!("model {}", client.model());
                if args.pull {
                    checks.push(match client.pull_model().await {
                        Ok(()) => item(&name, true, "pulled"),
                        Err(e) => item(&name, false, format!("pull failed: {e}")),
                    });
                } else {
                    let detail = missing_model_detail(client.model(), &available);
                    checks.push(item(&name, false, detail));
                }
            }
            Err(e) => checks.push(item(&service, false, e.to_string())),
        },
        Err(e) => checks.push(item(&service, false, e.to_string())),
    }

    let ready = checks.iter().all(|c| c.ok);
    output(&CheckOutput { ready, checks }, json_mode);
    Ok(ready)
}

fn tool_check(tool: &str, binary: &str, available: bool) -> CheckItem {
    if available {
        return item(binary, true, "found");
    }
    let mut detail = format!("not found on PATH; set tools.{tool}_binary to its path");
    if let Some(hint) = install_hint(tool) {
        detail.push_str("; ");
        detail.push_str(hint);
    }
    item(binary, false, detail)
}

fn install_hint(tool: &str) -> Option<&'static str> {
    match tool {
        "fastqc" => Some(
            "install with `conda install -c bioconda fastqc` or from \
             https://www.bioinformatics.babraham.ac.uk/projects/fastqc/",
        ),
        "fastp" => Some(
            "install with `conda install -c bioconda fastp` or from https://github.com/OpenGene/fastp",
        ),
        _ => None,
    }
}

fn missing_model_detail(model: &str, available: &[String]) -> String {
    let installed = if available.is_empty() {
        "no models available".to_string()
    } else {
        format!("available: {}", available.join(", "))
    };
    format!("not installed ({installed}); run `trimwise check --pull` or `ollama pull {model}`")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_output_lists_checks() {
        let out = CheckOutput {
            ready: false,
            checks: vec![
                item("fastqc", true, "found"),
                item("fastp", false, "not found on PATH"),
            ],
        };
        let text = console::strip_ansi_codes(&out.to_human()).into_owned();
        assert!(text.contains("✓ fastqc"));
        assert!(text.contains("✗ fastp"));
        assert!(text.contains("Some dependencies are missing."));
        assert_eq!(out.to_json()["checks"][1]["ok"], false);
    }

    #[test]
    fn test_missing_tool_detail_carries_install_hint() {
        let found = tool_check("fastqc", "fastqc", true);
        assert!(found.ok);
        assert_eq!(found.detail, "found");

        let missing = tool_check("fastp", "/opt/bin/fastp", false);
        assert!(!missing.ok);
        assert_eq!(missing.name, "/opt/bin/fastp");
        assert!(missing.detail.starts_with("not found on PATH"));
        assert!(missing.detail.contains("tools.fastp_binary"));
        assert!(missing.detail.contains("conda install -c bioconda fastp"));

        let fastqc = tool_check("fastqc", "fastqc", false);
        assert!(fastqc.detail.contains("conda install -c bioconda fastqc"));
    }

    #[test]
    fn test_missing_model_detail_suggests_pull() {
        let detail = missing_model_detail("llama3:8b", &["mistral:7b".to_string()]);
        assert!(detail.contains("available: mistral:7b"));
        assert!(detail.contains("trimwise check --pull"));
        assert!(detail.contains("ollama pull llama3:8b"));

        let detail = missing_model_detail("llama3:8b", &[]);
        assert!(detail.contains("no models available"));
    }
}
