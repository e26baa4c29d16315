//! Integration tests for the iteration controller state machine.

mod common;

use std::sync::Arc;

use common::{config, controller, garbage, good, poor, temp_dir, write_fastq};
use trimwise::adapters::mock::{MockAnalysis, MockAnalyzer, MockRecommender, MockTrimmer};
use trimwise::domain::errors::{ExecutionError, ProposalError};
use trimwise::domain::models::{Outcome, TerminationReason, Verdict};

#[tokio::test]
async fn test_acceptable_raw_file_needs_no_rounds() {
    let dir = temp_dir();
    let input = write_fastq(dir.path(), "sample.fastq");
    let trimmer = Arc::new(MockTrimmer::new());
    let recommender = Arc::new(MockRecommender::new(vec![]));
    let ctl = controller(
        &config(3),
        Arc::new(MockAnalyzer::new(vec![good()])),
        trimmer.clone(),
        recommender.clone(),
    );

    let result = ctl.optimize(&input, &dir.path().join("work")).await;

    assert_eq!(result.termination, TerminationReason::QualityMet);
    assert_eq!(result.outcome, Outcome::Success);
    assert!(result.records.is_empty());
    assert_eq!(result.best_round, Some(0));
    assert_eq!(result.final_output.as_deref(), Some(input.as_path()));
    assert!(result.baseline.as_ref().is_some_and(|b| b.acceptable));
    assert!(trimmer.requests().await.is_empty());
    assert!(recommender.prompts().await.is_empty());
}

#[tokio::test]
async fn test_improving_then_accepted_round_is_chosen() {
    let dir = temp_dir();
    let input = write_fastq(dir.path(), "sample.fastq");
    let workdir = dir.path().join("work");
    let trimmer = Arc::new(MockTrimmer::new());
    let ctl = controller(
        &config(3),
        Arc::new(MockAnalyzer::new(vec![poor(0), poor(4), good()])),
        trimmer.clone(),
        Arc::new(MockRecommender::new(vec![])),
    );

    let result = ctl.optimize(&input, &workdir).await;

    assert_eq!(result.termination, TerminationReason::QualityMet);
    assert_eq!(result.outcome, Outcome::Success);
    let verdicts: Vec<Verdict> = result.records.iter().map(|r| r.verdict).collect();
    assert_eq!(verdicts, vec![Verdict::Improved, Verdict::Accepted]);
    assert_eq!(result.best_round, Some(2));

    let final_output = result.final_output.clone().unwrap();
    assert_eq!(final_output, workdir.join("sample_trimmed.fastq"));
    assert!(final_output.exists());

    // Round two starts from round one's file, which is then superseded
    let requests = trimmer.requests().await;
    assert_eq!(requests[0].input, input);
    assert_eq!(requests[1].input, result.records[0].output_file);
    assert!(!result.records[0].output_file.exists());
}

#[tokio::test]
async fn test_two_non_improving_rounds_stop_with_best_round() {
    let dir = temp_dir();
    let input = write_fastq(dir.path(), "sample.fastq");
    let workdir = dir.path().join("work");
    let trimmer = Arc::new(MockTrimmer::new());
    let recommender = Arc::new(MockRecommender::new(vec![]));
    let ctl = controller(
        &config(3),
        Arc::new(MockAnalyzer::new(vec![poor(0), poor(5), poor(3), poor(3)])),
        trimmer.clone(),
        recommender.clone(),
    );

    let result = ctl.optimize(&input, &workdir).await;

    assert_eq!(result.termination, TerminationReason::NoFurtherImprovement);
    assert_eq!(result.outcome, Outcome::Partial);
    let verdicts: Vec<Verdict> = result.records.iter().map(|r| r.verdict).collect();
    assert_eq!(
        verdicts,
        vec![Verdict::Improved, Verdict::NoImprovement, Verdict::NoImprovement]
    );
    assert_eq!(result.best_round, Some(1));
    assert_eq!(result.best_score, result.records[0].score);
    assert_eq!(result.final_parameters, Some(result.records[0].parameters));
    assert!(workdir.join("sample_trimmed.fastq").exists());

    // Rounds after a non-improving one retry from the best file
    let requests = trimmer.requests().await;
    assert_eq!(requests[1].input, result.records[0].output_file);
    assert_eq!(requests[2].input, result.records[0].output_file);

    let prompts = recommender.prompts().await;
    assert_eq!(prompts.len(), 3);
    assert!(prompts[2].contains("did NOT improve"));
    for record in &result.records {
        assert!(!record.output_file.exists());
    }
}

#[tokio::test]
async fn test_no_json_before_first_round_is_hard_failure() {
    let dir = temp_dir();
    let input = write_fastq(dir.path(), "sample.fastq");
    let trimmer = Arc::new(MockTrimmer::new());
    let recommender = Arc::new(MockRecommender::always("I would trim a bit more aggressively."));
    let ctl = controller(
        &config(3),
        Arc::new(MockAnalyzer::new(vec![poor(0)])),
        trimmer.clone(),
        recommender.clone(),
    );

    let result = ctl.optimize(&input, &dir.path().join("work")).await;

    assert_eq!(result.termination, TerminationReason::HardFailure);
    assert_eq!(result.outcome, Outcome::Failed);
    assert!(result.records.is_empty());
    assert_eq!(
        result.error.as_deref(),
        Some(ProposalError::NoJsonFound.to_string().as_str())
    );
    // One retry with the stricter prompt
    assert_eq!(recommender.prompts().await.len(), 2);
    assert!(trimmer.requests().await.is_empty());
}

#[tokio::test]
async fn test_single_round_budget_runs_exactly_one_round() {
    for next in [poor(3), poor(0)] {
        let dir = temp_dir();
        let input = write_fastq(dir.path(), "sample.fastq");
        let trimmer = Arc::new(MockTrimmer::new());
        let ctl = controller(
            &config(1),
            Arc::new(MockAnalyzer::new(vec![poor(1), next])),
            trimmer.clone(),
            Arc::new(MockRecommender::new(vec![])),
        );

        let result = ctl.optimize(&input, &dir.path().join("work")).await;

        assert_eq!(result.termination, TerminationReason::MaxIterations);
        assert_eq!(result.rounds_executed(), 1);
        assert_eq!(trimmer.requests().await.len(), 1);
    }
}

#[tokio::test]
async fn test_max_iterations_keeps_best_round() {
    let dir = temp_dir();
    let input = write_fastq(dir.path(), "sample.fastq");
    let ctl = controller(
        &config(3),
        Arc::new(MockAnalyzer::new(vec![poor(0), poor(2), poor(1), poor(4)])),
        Arc::new(MockTrimmer::new()),
        Arc::new(MockRecommender::new(vec![])),
    );

    let result = ctl.optimize(&input, &dir.path().join("work")).await;

    assert_eq!(result.termination, TerminationReason::MaxIterations);
    let verdicts: Vec<Verdict> = result.records.iter().map(|r| r.verdict).collect();
    assert_eq!(
        verdicts,
        vec![Verdict::Improved, Verdict::NoImprovement, Verdict::Improved]
    );
    assert_eq!(result.best_round, Some(3));
}

#[tokio::test]
async fn test_unparseable_reports_fail_rounds_not_the_file() {
    let dir = temp_dir();
    let input = write_fastq(dir.path(), "sample.fastq");
    let ctl = controller(
        &config(3),
        Arc::new(MockAnalyzer::new(vec![poor(0), garbage()])),
        Arc::new(MockTrimmer::new()),
        Arc::new(MockRecommender::new(vec![])),
    );

    let result = ctl.optimize(&input, &dir.path().join("work")).await;

    assert_eq!(result.termination, TerminationReason::NoFurtherImprovement);
    assert_eq!(result.outcome, Outcome::Partial);
    assert_eq!(result.records.len(), 2);
    for record in &result.records {
        assert_eq!(record.verdict, Verdict::Failed);
        assert!(record.score.is_none() && record.metrics.is_none());
        assert!(record.notes[0].contains("module_status"));
    }
    assert_eq!(result.best_round, Some(0));
    assert_eq!(result.final_output.as_deref(), Some(input.as_path()));
}

#[tokio::test]
async fn test_trim_failure_surfaces_best_prior_round() {
    let dir = temp_dir();
    let input = write_fastq(dir.path(), "sample.fastq");
    let workdir = dir.path().join("work");
    let trimmer = Arc::new(MockTrimmer::scripted(vec![
        None,
        Some(ExecutionError::NonZeroExit {
            tool: "fastp".to_string(),
            code: Some(255),
            stderr: "ERROR: sequence and quality have different length".to_string(),
        }),
    ]));
    let ctl = controller(
        &config(3),
        Arc::new(MockAnalyzer::new(vec![poor(0), poor(3)])),
        trimmer,
        Arc::new(MockRecommender::new(vec![])),
    );

    let result = ctl.optimize(&input, &workdir).await;

    assert_eq!(result.termination, TerminationReason::HardFailure);
    assert_eq!(result.outcome, Outcome::Partial);
    assert_eq!(result.best_round, Some(1));
    assert!(result.error.as_deref().is_some_and(|e| e.contains("fastp exited")));
    assert!(workdir.join("sample_trimmed.fastq").exists());
}

#[tokio::test]
async fn test_analysis_failure_after_trim_removes_unevaluated_output() {
    let dir = temp_dir();
    let input = write_fastq(dir.path(), "sample.fastq");
    let workdir = dir.path().join("work");
    let trimmer = Arc::new(MockTrimmer::new());
    let ctl = controller(
        &config(3),
        Arc::new(MockAnalyzer::new(vec![
            poor(0),
            MockAnalysis::Error(ExecutionError::NonZeroExit {
                tool: "fastqc".to_string(),
                code: Some(1),
                stderr: "Failed to process file sample_round1.fastq".to_string(),
            }),
        ])),
        trimmer.clone(),
        Arc::new(MockRecommender::new(vec![])),
    );

    let result = ctl.optimize(&input, &workdir).await;

    assert_eq!(result.termination, TerminationReason::HardFailure);
    assert_eq!(result.outcome, Outcome::Failed);
    assert!(result.records.is_empty());
    assert_eq!(result.best_round, Some(0));
    assert_eq!(result.final_output.as_deref(), Some(input.as_path()));

    let requests = trimmer.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].output, workdir.join("round1").join("sample_round1.fastq"));
    assert!(!requests[0].output.exists());
    assert!(input.exists());
}

#[tokio::test]
async fn test_analysis_failure_with_keep_intermediate_leaves_output() {
    let dir = temp_dir();
    let input = write_fastq(dir.path(), "sample.fastq");
    let workdir = dir.path().join("work");
    let mut cfg = config(3);
    cfg.optimizer.keep_intermediate = true;
    let ctl = controller(
        &cfg,
        Arc::new(MockAnalyzer::new(vec![
            poor(0),
            MockAnalysis::Error(ExecutionError::Timeout {
                tool: "fastqc".to_string(),
                secs: 1,
            }),
        ])),
        Arc::new(MockTrimmer::new()),
        Arc::new(MockRecommender::new(vec![])),
    );

    let result = ctl.optimize(&input, &workdir).await;

    assert_eq!(result.termination, TerminationReason::HardFailure);
    assert!(workdir.join("round1").join("sample_round1.fastq").exists());
}

#[tokio::test]
async fn test_raw_analysis_failure_is_hard_failure() {
    let dir = temp_dir();
    let input = write_fastq(dir.path(), "sample.fastq");
    let ctl = controller(
        &config(3),
        Arc::new(MockAnalyzer::new(vec![garbage()])),
        Arc::new(MockTrimmer::new()),
        Arc::new(MockRecommender::new(vec![])),
    );

    let result = ctl.optimize(&input, &dir.path().join("work")).await;

    assert_eq!(result.termination, TerminationReason::HardFailure);
    assert_eq!(result.outcome, Outcome::Failed);
    assert!(result.baseline.is_none());
    assert!(result.best_round.is_none());
    assert!(result.final_output.is_none());
}

#[tokio::test]
async fn test_file_budget_exhaustion_is_hard_failure() {
    let dir = temp_dir();
    let input = write_fastq(dir.path(), "sample.fastq");
    let mut cfg = config(3);
    cfg.optimizer.per_file_timeout_secs = 1;
    let analyzer =
        MockAnalyzer::new(vec![poor(0)]).with_delay(std::time::Duration::from_secs(5));
    let ctl = controller(
        &cfg,
        Arc::new(analyzer),
        Arc::new(MockTrimmer::new()),
        Arc::new(MockRecommender::new(vec![])),
    );

    let result = ctl.optimize(&input, &dir.path().join("work")).await;

    assert_eq!(result.termination, TerminationReason::HardFailure);
    assert!(result.error.as_deref().is_some_and(|e| e.contains("time budget")));
}

#[tokio::test]
async fn test_keep_intermediate_retains_round_outputs() {
    let dir = temp_dir();
    let input = write_fastq(dir.path(), "sample.fastq");
    let workdir = dir.path().join("work");
    let mut cfg = config(3);
    cfg.optimizer.keep_intermediate = true;
    let ctl = controller(
        &cfg,
        Arc::new(MockAnalyzer::new(vec![poor(0), poor(5), poor(3), poor(3)])),
        Arc::new(MockTrimmer::new()),
        Arc::new(MockRecommender::new(vec![])),
    );

    let result = ctl.optimize(&input, &workdir).await;

    for record in &result.records {
        assert!(record.output_file.exists(), "{}", record.output_file.display());
    }
    assert!(workdir.join("sample_trimmed.fastq").exists());
}

#[tokio::test]
async fn test_corrections_are_recorded_on_the_round() {
    let dir = temp_dir();
    let input = write_fastq(dir.path(), "sample.fastq");
    let trimmer = Arc::new(MockTrimmer::new());
    let ctl = controller(
        &config(1),
        Arc::new(MockAnalyzer::new(vec![poor(0), poor(2)])),
        trimmer.clone(),
        Arc::new(MockRecommender::always(
            "```json\n{\"quality\": 70, \"length\": 40, \"trim_front\": 0, \"trim_tail\": 0, \
             \"adapter_trim\": true, \"poly_g_trim\": false}\n```",
        )),
    );

    let result = ctl.optimize(&input, &dir.path().join("work")).await;

    let record = &result.records[0];
    assert_eq!(record.parameters.quality, 40);
    assert_eq!(record.corrections.len(), 1);
    assert_eq!(record.corrections[0].field, "quality");
    assert_eq!(trimmer.requests().await[0].parameters.quality, 40);
}
