//! End-to-end runs through the orchestrator with a scripted model
//!
//! Covers the happy path, degraded runs (hypothesis and creative failures),
//! fatal aborts, cancellation and concurrent run isolation.

mod common;

use ads_evidence::config::PipelineConfig;
use ads_evidence::decision_log::Component;
use ads_evidence::evaluation::ValidationStatus;
use ads_evidence::llm::{PromptTask, ScriptedModel};
use ads_evidence::orchestrator::{Orchestrator, RunState};
use ads_evidence::retry::{ExternalError, FailureKind};
use ads_evidence::Error;
use common::{campaign_batch, creative_response, fast_config, happy_model, hypotheses_response};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn orchestrator(model: ScriptedModel) -> (Orchestrator<ScriptedModel>, Arc<ScriptedModel>) {
    let model = Arc::new(model);
    let orchestrator = Orchestrator::new(fast_config(), Arc::clone(&model)).unwrap();
    (orchestrator, model)
}

#[tokio::test]
async fn test_happy_path_report() {
    let (orchestrator, model) = orchestrator(happy_model());

    let report = orchestrator
        .run(&campaign_batch(), "Why did Spring Sale CTR drop?")
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Done);
    assert!(!report.is_degraded());
    assert!((report.quality.quality_score - 100.0).abs() < f64::EPSILON);
    assert_eq!(report.quality.dropped_rows(), 0);
    assert_eq!(report.dataset.unique_campaigns, 4);

    let windows = report.windows.unwrap();
    assert_eq!(windows.current.start, common::day(8));
    assert_eq!(windows.baseline.start, common::day(1));

    let statuses: Vec<(&str, ValidationStatus)> = report
        .evaluations
        .iter()
        .map(|e| (e.hypothesis_id(), e.validation_status()))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("H1", ValidationStatus::Confirmed),
            ("H2", ValidationStatus::Refuted),
            ("H3", ValidationStatus::InsufficientData),
        ]
    );
    assert_eq!(report.malformed_hypotheses.len(), 1);
    assert_eq!(report.malformed_hypotheses[0].index, 3);
    assert_eq!(report.evaluation_summary.rejected.len(), 2);

    let campaigns: Vec<&str> = report
        .low_ctr_campaigns
        .iter()
        .map(|c| c.campaign_name.as_str())
        .collect();
    assert_eq!(campaigns, vec!["Clearance", "Flash Deal"]);
    let creatives: Vec<&str> = report
        .creatives
        .iter()
        .map(|c| c.campaign_name.as_str())
        .collect();
    assert_eq!(creatives, vec!["Clearance", "Flash Deal"]);

    assert_eq!(model.calls(PromptTask::Hypotheses), 1);
    assert_eq!(model.calls(PromptTask::Creatives), 2);
}

#[tokio::test]
async fn test_creative_prompts_carry_only_supported_hypotheses() {
    let (orchestrator, model) = orchestrator(happy_model());
    orchestrator.run(&campaign_batch(), "q").await.unwrap();

    for prompt in model.prompts().iter().filter(|p| p.task == PromptTask::Creatives) {
        let supporting = prompt.payload["validated_hypotheses"].as_array().unwrap();
        assert_eq!(supporting.len(), 1);
        assert_eq!(supporting[0]["hypothesis_id"], "H1");
        let top = prompt.payload["top_performers"].as_array().unwrap();
        assert_eq!(top[0]["creative_type"], "image");
    }
}

#[tokio::test]
async fn test_decision_log_is_ordered_and_scoped_to_run() {
    let (orchestrator, _) = orchestrator(happy_model());
    let report = orchestrator.run(&campaign_batch(), "q").await.unwrap();
    let entries = report.decision_log.entries();

    assert_eq!(report.decision_log.run_id(), report.run_id);
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.sequence(), i as u64);
        assert_eq!(entry.run_id(), report.run_id);
    }
    assert_eq!(entries.first().unwrap().decision(), "run_started");
    assert_eq!(entries.last().unwrap().decision(), "run_completed");

    let evaluated: Vec<&str> = report
        .decision_log
        .for_component(Component::Evaluator)
        .filter(|e| e.decision() == "hypothesis_evaluated")
        .map(|e| e.inputs()["hypothesis_id"].as_str().unwrap())
        .collect();
    assert_eq!(evaluated, vec!["H1", "H2", "H3"]);

    let stages: Vec<&str> = report
        .decision_log
        .entries()
        .iter()
        .filter(|e| e.decision() == "stage_entered")
        .map(|e| e.reasoning())
        .collect();
    assert_eq!(stages.len(), 6);
    assert_eq!(stages[5], "awaiting_creatives -> done");
}

#[tokio::test]
async fn test_hypothesis_failure_degrades_run() {
    let (orchestrator, model) = orchestrator(ScriptedModel::new(|prompt, _| match prompt.task {
        PromptTask::Hypotheses => Err(ExternalError::server("503 from provider")),
        PromptTask::Creatives => Ok(creative_response(prompt.subject.as_deref().unwrap_or("?"))),
    }));

    let report = orchestrator.run(&campaign_batch(), "q").await.unwrap();

    assert_eq!(report.state, RunState::Done);
    assert!(report.evaluations.is_empty());
    assert_eq!(report.evaluation_summary.total, 0);
    assert_eq!(report.degradations.len(), 1);
    assert_eq!(report.degradations[0].component, Component::HypothesisGenerator);
    assert_eq!(report.degradations[0].stage, RunState::AwaitingHypotheses);
    assert_eq!(model.calls(PromptTask::Hypotheses), 3);
    assert_eq!(report.creatives.len(), 2);

    let retry = report
        .decision_log
        .for_component(Component::RetryPolicy)
        .next()
        .unwrap();
    assert_eq!(retry.outputs()["attempts"], 3);
    assert!(report.render_summary().contains("## Degradations"));
}

#[tokio::test]
async fn test_unparseable_hypotheses_are_not_retried() {
    let (orchestrator, model) = orchestrator(ScriptedModel::new(|prompt, _| match prompt.task {
        PromptTask::Hypotheses => Ok("I could not find anything interesting.".to_string()),
        PromptTask::Creatives => Ok(creative_response(prompt.subject.as_deref().unwrap_or("?"))),
    }));

    let report = orchestrator.run(&campaign_batch(), "q").await.unwrap();

    assert_eq!(model.calls(PromptTask::Hypotheses), 1);
    assert!(report.is_degraded());
    assert!(report.degradations[0].reason.contains("no JSON object"));
}

#[tokio::test]
async fn test_transient_hypothesis_failure_recovers() {
    let (orchestrator, model) = orchestrator(ScriptedModel::new(|prompt, call| match prompt.task {
        PromptTask::Hypotheses if call < 2 => Err(ExternalError::rate_limited("429")),
        PromptTask::Hypotheses => Ok(hypotheses_response()),
        PromptTask::Creatives => Ok(creative_response(prompt.subject.as_deref().unwrap_or("?"))),
    }));

    let report = orchestrator.run(&campaign_batch(), "q").await.unwrap();

    assert_eq!(model.calls(PromptTask::Hypotheses), 3);
    assert!(!report.is_degraded());
    assert_eq!(report.evaluations.len(), 3);
}

#[tokio::test]
async fn test_creative_failure_degrades_one_campaign() {
    let (orchestrator, _) = orchestrator(ScriptedModel::new(|prompt, _| match prompt.task {
        PromptTask::Hypotheses => Ok(hypotheses_response()),
        PromptTask::Creatives => match prompt.subject.as_deref() {
            Some("Flash Deal") => Err(ExternalError::new(
                FailureKind::MalformedRequest,
                "prompt rejected",
            )),
            subject => Ok(creative_response(subject.unwrap_or("?"))),
        },
    }));

    let report = orchestrator.run(&campaign_batch(), "q").await.unwrap();

    assert_eq!(report.state, RunState::Done);
    assert_eq!(report.creatives.len(), 1);
    assert_eq!(report.creatives[0].campaign_name, "Clearance");
    assert_eq!(report.degradations.len(), 1);
    assert_eq!(report.degradations[0].subject.as_deref(), Some("Flash Deal"));
    assert_eq!(report.evaluations.len(), 3);
}

#[tokio::test]
async fn test_missing_identifier_column_aborts() {
    let (orchestrator, model) = orchestrator(happy_model());
    let batch = campaign_batch();
    let without_date = batch.project(&[0, 2, 3, 4, 5, 6, 7]).unwrap();

    let aborted = orchestrator.run(&without_date, "q").await.unwrap_err();

    assert_eq!(aborted.stage, RunState::Validating);
    assert!(matches!(&aborted.error, Error::Schema { missing } if missing == &["date".to_string()]));
    assert_eq!(aborted.decision_log.run_id(), aborted.run_id);
    let decisions: Vec<&str> = aborted
        .decision_log
        .entries()
        .iter()
        .map(|e| e.decision())
        .collect();
    assert!(decisions.contains(&"run_aborted"));
    assert_eq!(
        aborted.decision_log.entries().last().unwrap().reasoning(),
        "validating -> aborted"
    );
    assert!(model.prompts().is_empty());
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let (orchestrator, model) = orchestrator(happy_model());
    let token = CancellationToken::new();
    token.cancel();

    let aborted = orchestrator
        .run_with_cancel(&campaign_batch(), "q", token)
        .await
        .unwrap_err();

    assert_eq!(aborted.stage, RunState::Validating);
    assert!(matches!(aborted.error, Error::Cancelled));
    assert!(model.prompts().is_empty());
}

#[tokio::test]
async fn test_cancelled_during_hypothesis_retries() {
    let token = CancellationToken::new();
    let trigger = token.clone();
    let (orchestrator, model) = orchestrator(ScriptedModel::new(move |_, _| {
        trigger.cancel();
        Err(ExternalError::server("busy"))
    }));

    let aborted = orchestrator
        .run_with_cancel(&campaign_batch(), "q", token)
        .await
        .unwrap_err();

    assert_eq!(aborted.stage, RunState::AwaitingHypotheses);
    assert!(aborted.error.is_fatal());
    assert!(matches!(&aborted.error, Error::ExternalCall(err) if err.is_cancelled()));
    assert_eq!(model.calls(PromptTask::Hypotheses), 1);
}

#[tokio::test]
async fn test_concurrent_runs_are_isolated() {
    let (orchestrator, model) = orchestrator(happy_model());
    let orchestrator = Arc::new(orchestrator);
    let batch = campaign_batch();

    let mut handles = Vec::new();
    for i in 0..4 {
        let orchestrator = Arc::clone(&orchestrator);
        let batch = batch.clone();
        handles.push(tokio::spawn(async move {
            orchestrator.run(&batch, &format!("query {i}")).await
        }));
    }

    let mut run_ids = HashSet::new();
    for handle in handles {
        let report = handle.await.unwrap().unwrap();
        assert!(report
            .decision_log
            .entries()
            .iter()
            .all(|e| e.run_id() == report.run_id));
        assert_eq!(report.evaluations.len(), 3);
        run_ids.insert(report.run_id);
    }
    assert_eq!(run_ids.len(), 4);
    assert_eq!(model.calls(PromptTask::Hypotheses), 4);
}

#[tokio::test]
async fn test_empty_dataset_completes_without_evidence() {
    let (orchestrator, model) = orchestrator(ScriptedModel::new(|_, _| {
        Ok(hypotheses_response())
    }));
    let empty = common::raw_batch(&[]);

    let report = orchestrator.run(&empty, "q").await.unwrap();

    assert_eq!(report.state, RunState::Done);
    assert!(report.windows.is_none());
    assert!(report.evidence.is_empty());
    assert!(report
        .evaluations
        .iter()
        .all(|e| e.validation_status() == ValidationStatus::InsufficientData));
    assert!(report.evaluations[0]
        .reasoning()
        .contains("no evidence for the target metric and segment"));
    assert!(report.creatives.is_empty());
    assert_eq!(model.calls(PromptTask::Creatives), 0);
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = PipelineConfig::default();
    config.retry.max_retries = 0;
    let result = Orchestrator::new(config, Arc::new(happy_model()));
    assert!(matches!(result, Err(Error::Config(_))));
}
