use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "trimwise.yaml";

/// Configuration error types
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid max_iterations: {0}. Must be between 1 and 20")]
    InvalidMaxIterations(u32),

    #[error("Invalid per_file_timeout_secs: {0}. Must be positive")]
    InvalidFileTimeout(u64),

    #[error("Invalid quality threshold {name}: {value}. Must be between 0 and 60")]
    InvalidQualityThreshold { name: &'static str, value: f64 },

    #[error("Invalid max_adapter_contamination: {0}. Must be between 0 and 100")]
    InvalidAdapterCeiling(f64),

    #[error("Invalid score weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid workers: {0}. Must be between 1 and 64")]
    InvalidWorkers(usize),

    #[error("Invalid threads: {0}. Must be at least 1")]
    InvalidThreads(u32),

    #[error("Invalid timeout for {name}: must be positive")]
    InvalidTimeout { name: &'static str },

    #[error("Invalid max_prompt_chars: {0}. Must be at least 512")]
    InvalidPromptBudget(usize),

    #[error("Recommender {0} cannot be empty")]
    EmptyRecommenderField(&'static str),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. ./trimwise.yaml (project config, optional)
    /// 3. Explicit config file passed on the command line (optional)
    /// 4. Environment variables (TRIMWISE_* prefix, `__` for nesting)
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(DEFAULT_CONFIG_FILE));

        if let Some(path) = explicit {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }

        let config: Config = figment
            .merge(Env::prefixed("TRIMWISE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, without env overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let optimizer = &config.optimizer;
        if optimizer.max_iterations == 0 || optimizer.max_iterations > 20 {
            return Err(ConfigError::InvalidMaxIterations(optimizer.max_iterations));
        }
        if optimizer.per_file_timeout_secs == 0 {
            return Err(ConfigError::InvalidFileTimeout(
                optimizer.per_file_timeout_secs,
            ));
        }

        let gate = &config.quality_gate;
        for (name, value) in [
            ("min_average_quality", gate.min_average_quality),
            ("min_min_quality", gate.min_min_quality),
        ] {
            if !(0.0..=60.0).contains(&value) {
                return Err(ConfigError::InvalidQualityThreshold { name, value });
            }
        }
        if !(0.0..=100.0).contains(&gate.max_adapter_contamination) {
            return Err(ConfigError::InvalidAdapterCeiling(
                gate.max_adapter_contamination,
            ));
        }

        let weights = &gate.weights;
        if [
            weights.average_quality,
            weights.min_quality,
            weights.adapter,
            weights.module_health,
        ]
        .iter()
        .any(|w| !w.is_finite() || *w < 0.0)
        {
            return Err(ConfigError::InvalidWeights(
                "weights must be finite and non-negative".to_string(),
            ));
        }
        if weights.total() <= 0.0 {
            return Err(ConfigError::InvalidWeights(
                "at least one weight must be positive".to_string(),
            ));
        }

        if config.batch.workers == 0 || config.batch.workers > 64 {
            return Err(ConfigError::InvalidWorkers(config.batch.workers));
        }

        let tools = &config.tools;
        if tools.threads == 0 {
            return Err(ConfigError::InvalidThreads(tools.threads));
        }
        if tools.analysis_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout {
                name: "analysis_timeout_secs",
            });
        }
        if tools.trim_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout {
                name: "trim_timeout_secs",
            });
        }

        let recommender = &config.recommender;
        if recommender.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyRecommenderField("base_url"));
        }
        if recommender.model.trim().is_empty() {
            return Err(ConfigError::EmptyRecommenderField("model"));
        }
        if recommender.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout {
                name: "recommender.timeout_secs",
            });
        }
        if recommender.max_prompt_chars < 512 {
            return Err(ConfigError::InvalidPromptBudget(
                recommender.max_prompt_chars,
            ));
        }

        if config.retry.initial_backoff_ms > config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.optimizer.max_iterations, 3);
        assert_eq!(config.optimizer.no_improvement_tolerance, 1);
        assert!((config.quality_gate.min_average_quality - 25.0).abs() < f64::EPSILON);
        assert!((config.quality_gate.min_min_quality - 20.0).abs() < f64::EPSILON);
        assert!((config.quality_gate.max_adapter_contamination - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.recommender.model, "llama3:8b");
        assert_eq!(config.retry.max_retries, 1);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
optimizer:
  max_iterations: 5
  keep_intermediate: true
quality_gate:
  min_average_quality: 28.0
  weights:
    adapter: 0.5
recommender:
  model: qwen2.5:7b
batch:
  workers: 4
logging:
  level: debug
  format: json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.optimizer.max_iterations, 5);
        assert!(config.optimizer.keep_intermediate);
        assert_eq!(config.optimizer.no_improvement_tolerance, 1);
        assert!((config.quality_gate.min_average_quality - 28.0).abs() < f64::EPSILON);
        assert!((config.quality_gate.weights.adapter - 0.5).abs() < f64::EPSILON);
        assert!((config.quality_gate.weights.min_quality - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.recommender.model, "qwen2.5:7b");
        assert_eq!(config.batch.workers, 4);
        assert_eq!(config.logging.format, "json");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "optimizer:\n  max_iterations: 2\ntools:\n  threads: 8").unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.optimizer.max_iterations, 2);
        assert_eq!(config.tools.threads, 8);
        assert_eq!(config.tools.fastp_binary, "fastp");
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "optimizer:\n  max_iterations: 0").unwrap();

        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_env_overrides_nested_values() {
        temp_env::with_vars(
            [
                ("TRIMWISE_OPTIMIZER__MAX_ITERATIONS", Some("7")),
                ("TRIMWISE_RECOMMENDER__MODEL", Some("mistral")),
            ],
            || {
                let config = ConfigLoader::load(None).unwrap();
                assert_eq!(config.optimizer.max_iterations, 7);
                assert_eq!(config.recommender.model, "mistral");
            },
        );
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = ConfigLoader::load(Some(Path::new("/nonexistent/trimwise.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_zero_iterations() {
        let mut config = Config::default();
        config.optimizer.max_iterations = 0;

        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxIterations(0))
        );
    }

    #[test]
    fn test_validate_quality_threshold_out_of_range() {
        let mut config = Config::default();
        config.quality_gate.min_min_quality = -1.0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidQualityThreshold {
                name: "min_min_quality",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_adapter_ceiling() {
        let mut config = Config::default();
        config.quality_gate.max_adapter_contamination = 150.0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidAdapterCeiling(_))
        ));
    }

    #[test]
    fn test_validate_weights() {
        let mut config = Config::default();
        config.quality_gate.weights.adapter = -0.1;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidWeights(_))
        ));

        let mut config = Config::default();
        config.quality_gate.weights.average_quality = 0.0;
        config.quality_gate.weights.min_quality = 0.0;
        config.quality_gate.weights.adapter = 0.0;
        config.quality_gate.weights.module_health = 0.0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidWeights(_))
        ));
    }

    #[test]
    fn test_validate_zero_workers() {
        let mut config = Config::default();
        config.batch.workers = 0;

        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidWorkers(0))
        );
    }

    #[test]
    fn test_validate_invalid_backoff() {
        let mut config = Config::default();
        config.retry.initial_backoff_ms = 30_000;
        config.retry.max_backoff_ms = 10_000;

        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBackoff(30_000, 10_000))
        );
    }

    #[test]
    fn test_validate_empty_model() {
        let mut config = Config::default();
        config.recommender.model = "  ".to_string();

        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyRecommenderField("model"))
        );
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();

        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "verbose"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }
}
