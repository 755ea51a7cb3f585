//! Hypothesis evaluation against fixture evidence

mod common;

use ads_evidence::comparison::{Evidence, Metric, PeriodComparator, Segment};
use ads_evidence::config::{ConfidenceWeights, PipelineConfig, Thresholds};
use ads_evidence::decision_log::{Component, DecisionLog};
use ads_evidence::evaluation::{
    Direction, EvaluationSummary, Evaluator, Hypothesis, Impact, ValidationStatus,
};
use common::campaign_table;

fn evidence() -> Vec<Evidence> {
    PeriodComparator::default().compare(&campaign_table(), 7).unwrap()
}

fn campaign(name: &str) -> Segment {
    Segment::Campaign(name.to_string())
}

fn evaluator() -> Evaluator {
    Evaluator::from_config(&PipelineConfig::default())
}

#[test]
fn test_each_status_reachable() {
    let hypotheses = vec![
        Hypothesis::new("confirmed", "c", Metric::Ctr, campaign("Spring Sale"), Direction::Decrease),
        Hypothesis::new("partial", "p", Metric::Ctr, campaign("Flash Deal"), Direction::Decrease),
        Hypothesis::new("flat", "f", Metric::Ctr, campaign("Evergreen"), Direction::Decrease),
        Hypothesis::new("unknown", "u", Metric::Ctr, campaign("Nope"), Direction::Decrease),
    ];
    let mut log = DecisionLog::new("run-eval");

    let evaluations = evaluator().evaluate(&hypotheses, &evidence(), &mut log);
    let statuses: Vec<ValidationStatus> =
        evaluations.iter().map(|e| e.validation_status()).collect();

    assert_eq!(
        statuses,
        vec![
            ValidationStatus::Confirmed,
            ValidationStatus::PartiallyConfirmed,
            ValidationStatus::Refuted,
            ValidationStatus::InsufficientData,
        ]
    );
    assert_eq!(log.for_component(Component::Evaluator).count(), 4);

    let summary = EvaluationSummary::from_evaluations(&evaluations);
    assert_eq!(summary.supported(), 2);
    assert_eq!(summary.rejected[0].hypothesis_id, "flat");
}

#[test]
fn test_confirmed_confidence_and_impact() {
    let hypothesis =
        Hypothesis::new("H1", "roas fell", Metric::Roas, campaign("Spring Sale"), Direction::Decrease);

    let evaluation = evaluator().evaluate_one(&hypothesis, &evidence());

    assert_eq!(evaluation.validation_status(), ValidationStatus::Confirmed);
    // 0.4 * 35/100 + 0.3 * 1 + 0.3 * (33.3/50)
    assert!((evaluation.confidence() - 0.64).abs() < 1e-9);
    assert_eq!(evaluation.impact(), Impact::High);
    assert_eq!(evaluation.evidence().unwrap().metric, Metric::Roas);
    assert!(evaluation.reasoning().starts_with("confirmed:"));
}

#[test]
fn test_contradiction_is_capped() {
    let hypothesis =
        Hypothesis::new("H2", "ctr rose", Metric::Ctr, Segment::Overall, Direction::Increase)
            .with_preliminary_confidence(0.95);

    let evaluation = evaluator().evaluate_one(&hypothesis, &evidence());

    assert_eq!(evaluation.validation_status(), ValidationStatus::Refuted);
    assert!(evaluation.confidence() <= 0.3 + f64::EPSILON);
}

#[test]
fn test_below_break_even_roas_is_critical() {
    let hypothesis =
        Hypothesis::new("H3", "roas fell", Metric::Roas, campaign("Clearance"), Direction::Decrease);

    let evaluation = evaluator().evaluate_one(&hypothesis, &evidence());

    // Flat at 0.75: refuted, but losing money on every unit of spend.
    assert_eq!(evaluation.validation_status(), ValidationStatus::Refuted);
    assert_eq!(evaluation.impact(), Impact::Critical);
}

#[test]
fn test_sample_below_minimum_is_insufficient() {
    let thresholds = Thresholds {
        min_sample_size: 50,
        ..Thresholds::default()
    };
    let evaluator = Evaluator::new(thresholds, ConfidenceWeights::default());
    let hypothesis =
        Hypothesis::new("H4", "ctr fell", Metric::Ctr, campaign("Spring Sale"), Direction::Decrease);

    let evaluation = evaluator.evaluate_one(&hypothesis, &evidence());

    assert_eq!(evaluation.validation_status(), ValidationStatus::InsufficientData);
    assert!(evaluation.confidence().abs() < f64::EPSILON);
    assert!(evaluation.evidence().is_some());
    assert!(evaluation.reasoning().contains("sample size 35 < minimum 50"));
}

#[test]
fn test_output_order_matches_input() {
    let ids: Vec<String> = (0..64).map(|i| format!("H{i}")).collect();
    let hypotheses: Vec<Hypothesis> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let metric = Metric::ALL[i % Metric::ALL.len()];
            Hypothesis::new(id.clone(), "claim", metric, Segment::Overall, Direction::Decrease)
        })
        .collect();
    let mut log = DecisionLog::new("run-order");

    let evaluations = evaluator().evaluate(&hypotheses, &evidence(), &mut log);

    let out: Vec<&str> = evaluations.iter().map(|e| e.hypothesis_id()).collect();
    assert_eq!(out, ids.iter().map(String::as_str).collect::<Vec<_>>());
    let logged: Vec<&str> = log
        .entries()
        .iter()
        .map(|e| e.inputs()["hypothesis_id"].as_str().unwrap())
        .collect();
    assert_eq!(logged, out);
}
