//! Scripted port doubles for exercising the optimizer without external tools.
//!
//! Every double is driven by a queue of canned results. Analyzer scripts can
//! be keyed by a path fragment so one shared instance can serve several files
//! in a batch.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use super::tools::fastqc::report_base_name;
use crate::domain::errors::{ExecutionError, ProposalError};
use crate::domain::models::TrimReport;
use crate::domain::ports::{
    QualityAnalyzer, Recommender, ServiceHealth, TrimOutcome, TrimRequest, Trimmer,
};

/// One scripted analysis step.
#[derive(Debug, Clone)]
pub enum MockAnalysis {
    /// Write this text as the report artifact
    Report(String),
    /// Fail the invocation
    Error(ExecutionError),
}

struct Script {
    key: String,
    steps: VecDeque<MockAnalysis>,
    last: Option<MockAnalysis>,
}

/// Quality analyzer that writes canned `fastqc_data.txt` contents.
///
/// When a script runs dry its last step is repeated.
pub struct MockAnalyzer {
    scripts: Mutex<Vec<Script>>,
    calls: Mutex<Vec<PathBuf>>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockAnalyzer {
    /// A single script shared by every input.
    pub fn new(steps: Vec<MockAnalysis>) -> Self {
        Self::keyed(vec![(String::new(), steps)])
    }

    /// Scripts selected by the first key contained in the analyzed path.
    pub fn keyed(scripts: Vec<(String, Vec<MockAnalysis>)>) -> Self {
        let scripts = scripts
            .into_iter()
            .map(|(key, steps)| Script {
                key,
                steps: steps.into(),
                last: None,
            })
            .collect();
        Self {
            scripts: Mutex::new(scripts),
            calls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Hold each invocation open for `delay`.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Inputs analyzed so far, in call order.
    pub async fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().await.clone()
    }

    /// Highest number of simultaneous invocations observed.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn next_step(&self, input: &Path) -> Option<MockAnalysis> {
        let path = input.to_string_lossy();
        let mut scripts = self.scripts.lock().await;
        let script = scripts.iter_mut().find(|s| path.contains(s.key.as_str()))?;
        match script.steps.pop_front() {
            Some(step) => {
                script.last = Some(step.clone());
                Some(step)
            }
            None => script.last.clone(),
        }
    }
}

#[async_trait]
impl QualityAnalyzer for MockAnalyzer {
    fn name(&self) -> &'static str {
        "mock-analyzer"
    }

    async fn analyze(&self, input: &Path, output_dir: &Path) -> Result<PathBuf, ExecutionError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        self.calls.lock().await.push(input.to_path_buf());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = match self.next_step(input).await {
            Some(MockAnalysis::Report(text)) => write_report(input, output_dir, &text).await,
            Some(MockAnalysis::Error(e)) => Err(e),
            None => Err(ExecutionError::MissingOutput {
                tool: self.name().to_string(),
                path: output_dir.to_path_buf(),
            }),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn is_available(&self) -> bool {
        true
    }
}

async fn write_report(input: &Path, output_dir: &Path, text: &str) -> Result<PathBuf, ExecutionError> {
    let io_err = |e: std::io::Error| ExecutionError::Io {
        tool: "mock-analyzer".to_string(),
        reason: e.to_string(),
    };
    let dir = output_dir.join(format!("{}_fastqc", report_base_name(input)));
    tokio::fs::create_dir_all(&dir).await.map_err(io_err)?;
    let path = dir.join("fastqc_data.txt");
    tokio::fs::write(&path, text).await.map_err(io_err)?;
    Ok(path)
}

/// Trimmer that copies its input to the requested output.
pub struct MockTrimmer {
    failures: Mutex<VecDeque<Option<ExecutionError>>>,
    requests: Mutex<Vec<TrimRequest>>,
    report: TrimReport,
}

impl Default for MockTrimmer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTrimmer {
    pub fn new() -> Self {
        Self::scripted(Vec::new())
    }

    /// `None` entries succeed, `Some` entries fail; succeeds once exhausted.
    pub fn scripted(failures: Vec<Option<ExecutionError>>) -> Self {
        Self {
            failures: Mutex::new(failures.into()),
            requests: Mutex::new(Vec::new()),
            report: TrimReport {
                reads_before: Some(1_000),
                reads_after: Some(900),
                ..TrimReport::default()
            },
        }
    }

    pub async fn requests(&self) -> Vec<TrimRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl Trimmer for MockTrimmer {
    fn name(&self) -> &'static str {
        "mock-trimmer"
    }

    async fn trim(&self, request: &TrimRequest) -> Result<TrimOutcome, ExecutionError> {
        self.requests.lock().await.push(request.clone());
        if let Some(Some(err)) = self.failures.lock().await.pop_front() {
            return Err(err);
        }

        if let Some(parent) = request.output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ExecutionError::Io {
                    tool: self.name().to_string(),
                    reason: e.to_string(),
                })?;
        }
        let content = tokio::fs::read(&request.input).await.unwrap_or_default();
        tokio::fs::write(&request.output, content)
            .await
            .map_err(|e| ExecutionError::Io {
                tool: self.name().to_string(),
                reason: e.to_string(),
            })?;

        Ok(TrimOutcome {
            output_file: request.output.clone(),
            report: self.report.clone(),
        })
    }

    async fn is_available(&self) -> bool {
        true
    }
}

/// Recommender answering from a queue of canned responses.
pub struct MockRecommender {
    responses: Mutex<VecDeque<Result<String, ProposalError>>>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
}

impl MockRecommender {
    /// Once the queue is empty every call answers with default parameters.
    pub fn new(responses: Vec<Result<String, ProposalError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            fallback: r#"{"quality": 20, "length": 35, "trim_front": 0, "trim_tail": 0, "adapter_trim": true, "poly_g_trim": false}"#
                .to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `response`.
    pub fn always(response: impl Into<String>) -> Self {
        let mut mock = Self::new(Vec::new());
        mock.fallback = response.into();
        mock
    }

    /// Prompts received so far, in call order.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl Recommender for MockRecommender {
    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProposalError> {
        self.prompts.lock().await.push(prompt.to_string());
        match self.responses.lock().await.pop_front() {
            Some(response) => response,
            None => Ok(self.fallback.clone()),
        }
    }

    async fn health_check(&self) -> Result<ServiceHealth, ProposalError> {
        Ok(ServiceHealth::Ready)
    }
}
