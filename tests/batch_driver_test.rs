//! Integration tests for batch execution across several files.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{config, controller, good, poor, temp_dir, write_fastq};
use trimwise::adapters::mock::{MockAnalysis, MockAnalyzer, MockRecommender, MockTrimmer};
use trimwise::domain::errors::ExecutionError;
use trimwise::domain::models::{OptimizationResult, Outcome, TerminationReason};
use trimwise::services::BatchDriver;

#[tokio::test]
async fn test_failing_file_does_not_affect_others() {
    let dir = temp_dir();
    let inputs = vec![
        write_fastq(dir.path(), "alpha.fastq"),
        write_fastq(dir.path(), "beta.fastq"),
        write_fastq(dir.path(), "gamma.fastq"),
    ];
    let analyzer = MockAnalyzer::keyed(vec![
        ("alpha".to_string(), vec![good()]),
        (
            "beta".to_string(),
            vec![MockAnalysis::Error(ExecutionError::NonZeroExit {
                tool: "fastqc".to_string(),
                code: Some(1),
                stderr: "Failed to process file beta.fastq".to_string(),
            })],
        ),
        ("gamma".to_string(), vec![poor(0), good()]),
    ]);

    let mut cfg = config(3);
    cfg.batch.output_dir = dir.path().join("out");
    cfg.batch.workers = 2;
    let ctl = controller(
        &cfg,
        Arc::new(analyzer),
        Arc::new(MockTrimmer::new()),
        Arc::new(MockRecommender::new(vec![])),
    );

    let summary = BatchDriver::new(Arc::new(ctl), &cfg)
        .run(&inputs)
        .await
        .unwrap();

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert!(!summary.all_succeeded());
    assert_eq!(summary.by_reason[&TerminationReason::QualityMet], 2);
    assert_eq!(summary.by_reason[&TerminationReason::HardFailure], 1);

    // Results come back in input order regardless of completion order
    let files: Vec<_> = summary.results.iter().map(|r| r.input_file.clone()).collect();
    assert_eq!(files, inputs);
    assert_eq!(summary.results[1].outcome, Outcome::Failed);
    assert!(summary.results[1]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("fastqc exited")));
    assert_eq!(summary.results[2].best_round, Some(1));
}

#[tokio::test]
async fn test_summaries_are_persisted() {
    let dir = temp_dir();
    let out = dir.path().join("out");
    let inputs = vec![
        write_fastq(dir.path(), "alpha.fastq"),
        write_fastq(dir.path(), "beta.fq"),
    ];
    let mut cfg = config(2);
    cfg.batch.output_dir = out.clone();
    let ctl = controller(
        &cfg,
        Arc::new(MockAnalyzer::new(vec![poor(0), good()])),
        Arc::new(MockTrimmer::new()),
        Arc::new(MockRecommender::new(vec![])),
    );

    let summary = BatchDriver::new(Arc::new(ctl), &cfg)
        .run(&inputs)
        .await
        .unwrap();

    assert!(out.join("batch_summary.json").exists());
    for name in ["alpha", "beta"] {
        let text = std::fs::read_to_string(out.join(name).join("summary.json")).unwrap();
        let result: OptimizationResult = serde_json::from_str(&text).unwrap();
        assert!(result.input_file.ends_with(if name == "alpha" {
            "alpha.fastq"
        } else {
            "beta.fq"
        }));
    }

    let text = std::fs::read_to_string(out.join("batch_summary.json")).unwrap();
    let persisted: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(persisted["total_files"], 2);
    assert_eq!(persisted["run_id"], summary.run_id.to_string());
}

#[tokio::test]
async fn test_worker_limit_bounds_concurrency() {
    let dir = temp_dir();
    let inputs: Vec<_> = (0..5)
        .map(|i| write_fastq(dir.path(), &format!("sample{i}.fastq")))
        .collect();
    let analyzer =
        Arc::new(MockAnalyzer::new(vec![good()]).with_delay(Duration::from_millis(50)));

    let mut cfg = config(3);
    cfg.batch.output_dir = dir.path().join("out");
    cfg.batch.workers = 2;
    let ctl = controller(
        &cfg,
        analyzer.clone(),
        Arc::new(MockTrimmer::new()),
        Arc::new(MockRecommender::new(vec![])),
    );

    let summary = BatchDriver::new(Arc::new(ctl), &cfg)
        .run(&inputs)
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 5);
    assert_eq!(analyzer.calls().await.len(), 5);
    assert!(analyzer.peak_concurrency() <= 2);
}

#[tokio::test]
async fn test_invalid_input_is_rejected_without_running() {
    let dir = temp_dir();
    let bogus = dir.path().join("notes.fastq");
    std::fs::write(&bogus, "just some text\n").unwrap();
    let inputs = vec![
        bogus,
        dir.path().join("missing.fastq"),
        write_fastq(dir.path(), "alpha.fastq"),
    ];
    let analyzer = Arc::new(MockAnalyzer::new(vec![good()]));

    let mut cfg = config(3);
    cfg.batch.output_dir = dir.path().join("out");
    let ctl = controller(
        &cfg,
        analyzer.clone(),
        Arc::new(MockTrimmer::new()),
        Arc::new(MockRecommender::new(vec![])),
    );

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let summary = BatchDriver::new(Arc::new(ctl), &cfg)
        .with_progress(Arc::new(move |_result: &OptimizationResult| {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .run(&inputs)
        .await
        .unwrap();

    assert_eq!(summary.failed, 2);
    assert_eq!(summary.succeeded, 1);
    assert!(summary.results[0]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("does not look like FASTQ")));
    assert_eq!(analyzer.calls().await.len(), 1);
    assert_eq!(seen.load(Ordering::SeqCst), 3);
    assert!(dir.path().join("out/notes/summary.json").exists());
}

#[tokio::test]
async fn test_duplicate_sample_names_get_separate_workdirs() {
    let dir = temp_dir();
    std::fs::create_dir_all(dir.path().join("a")).unwrap();
    std::fs::create_dir_all(dir.path().join("b")).unwrap();
    let inputs = vec![
        write_fastq(&dir.path().join("a"), "alpha.fastq"),
        write_fastq(&dir.path().join("b"), "alpha.fastq"),
    ];
    let out = dir.path().join("out");
    let mut cfg = config(3);
    cfg.batch.output_dir = out.clone();
    let ctl = controller(
        &cfg,
        Arc::new(MockAnalyzer::new(vec![poor(0), good()])),
        Arc::new(MockTrimmer::new()),
        Arc::new(MockRecommender::new(vec![])),
    );

    let summary = BatchDriver::new(Arc::new(ctl), &cfg)
        .run(&inputs)
        .await
        .unwrap();

    let outputs: Vec<_> = summary
        .results
        .iter()
        .filter_map(|r| r.final_output.clone())
        .collect();
    assert_eq!(outputs.len(), 2);
    assert_ne!(outputs[0], outputs[1]);
    assert!(out.join("alpha/summary.json").exists());
    assert!(out.join("alpha_2/summary.json").exists());
}
