use thiserror::Error;

use super::factors::{breakpoints, decisive_values, RangeOp};
use super::rules::{RuleSet, ScoreBucket, TierBands};
use super::types::{AuditInputs, Tier};

/// The single failure kind of the scoring engine. Every variant is caught
/// before any arithmetic runs, so a failed call never yields partial results.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInput {
    #[error("audit must contain at least one issue")]
    EmptyIssueList,

    #[error("key control failure percentage must be within 0-100, got {0}")]
    PercentOutOfRange(f64),

    #[error("unrecognized {field} value '{value}'")]
    UnrecognizedValue { field: &'static str, value: String },

    #[error("rule table {table} has no bucket for {value}%")]
    NoMatchingBucket { table: &'static str, value: f64 },
}

/// Check audit inputs before scoring.
pub fn validate_inputs(inputs: &AuditInputs) -> Result<(), InvalidInput> {
    if inputs.issues.is_empty() {
        return Err(InvalidInput::EmptyIssueList);
    }

    let pct = inputs.key_control_failure_pct;
    // NaN fails both comparisons, so it is rejected here too.
    if !(0.0..=100.0).contains(&pct) {
        return Err(InvalidInput::PercentOutOfRange(pct));
    }

    Ok(())
}

/// Validate a rule set at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_rules(rules: &RuleSet) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let weights = [
        ("classification.severe", rules.classification.severe),
        ("classification.high", rules.classification.high),
        ("classification.medium", rules.classification.medium),
        ("area_impact.almost_all_areas", rules.area_impact.almost_all_areas),
        ("area_impact.multiple_areas", rules.area_impact.multiple_areas),
        ("area_impact.limited_areas", rules.area_impact.limited_areas),
        ("action_plan.not_defined", rules.action_plan.not_defined),
        ("action_plan.somewhat_defined", rules.action_plan.somewhat_defined),
        (
            "action_plan.somewhat_defined_monitored",
            rules.action_plan.somewhat_defined_monitored,
        ),
        ("action_plan.well_defined", rules.action_plan.well_defined),
        (
            "management_support.not_supportive",
            rules.management_support.not_supportive,
        ),
        (
            "management_support.somewhat_supportive",
            rules.management_support.somewhat_supportive,
        ),
        (
            "management_support.fully_supportive",
            rules.management_support.fully_supportive,
        ),
    ];
    for (path, value) in weights {
        if !value.is_finite() || value < 0.0 {
            errors.push(format!("rules.{}: must be a non-negative number", path));
        }
    }

    if !rules.escalation_threshold.is_finite() {
        errors.push("rules.escalation_threshold: must be a finite number".to_string());
    }

    validate_percent_buckets("key_control", &rules.key_control, &mut errors);
    validate_percent_buckets("awareness", &rules.awareness, &mut errors);
    validate_tier_bands("ce_tiers", &rules.ce_tiers, &mut errors);
    validate_tier_bands("mca_tiers", &rules.mca_tiers, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_percent_buckets(name: &str, buckets: &[ScoreBucket], errors: &mut Vec<String>) {
    if buckets.is_empty() {
        errors.push(format!("rules.{}: at least one bucket is required", name));
        return;
    }

    let mut parsed = Vec::with_capacity(buckets.len());
    for (i, bucket) in buckets.iter().enumerate() {
        match RangeOp::parse(&bucket.range) {
            Ok(op) => parsed.push(op),
            Err(e) => errors.push(format!(
                "rules.{}[{}].range: invalid '{}' - {}",
                name, i, bucket.range, e
            )),
        }
        if !bucket.score.is_finite() || bucket.score < 0.0 {
            errors.push(format!(
                "rules.{}[{}].score: must be a non-negative number",
                name, i
            ));
        }
    }

    // Only meaningful once every range parsed.
    if parsed.len() == buckets.len() {
        let points: Vec<f64> = breakpoints(&parsed, &[0.0, 100.0])
            .into_iter()
            .filter(|p| (0.0..=100.0).contains(p))
            .collect();
        let uncovered = decisive_values(&points)
            .into_iter()
            .find(|pct| !parsed.iter().any(|op| op.matches(*pct)));
        if let Some(gap) = uncovered {
            errors.push(format!(
                "rules.{}: no bucket covers {}%",
                name, gap
            ));
        }
    }
}

fn validate_tier_bands(name: &str, bands: &TierBands, errors: &mut Vec<String>) {
    let mut all_parsed = true;
    for (tier, range) in bands.entries() {
        if let Err(e) = RangeOp::parse(range) {
            all_parsed = false;
            errors.push(format!(
                "rules.{}.{}: invalid '{}' - {}",
                name, tier, range, e
            ));
        }
    }
    let ops: Vec<RangeOp> = bands
        .entries()
        .iter()
        .filter_map(|(_, range)| RangeOp::parse(range).ok())
        .collect();
    if !all_parsed {
        return;
    }

    // Scores are non-negative and unbounded above; past the last bound
    // every band answers the same way.
    let points: Vec<f64> = breakpoints(&ops, &[0.0])
        .into_iter()
        .filter(|p| *p >= 0.0)
        .collect();
    let mut scores = decisive_values(&points);
    if let Some(last) = points.last() {
        scores.push(last + 1.0);
    }

    // A higher score must never earn a better tier.
    let mut previous = Tier::Strong;
    for score in scores {
        let tier = bands.tier_of(score);
        if tier < previous {
            errors.push(format!(
                "rules.{}: score {} rates {} after a lower score rated {}",
                name, score, tier, previous
            ));
            return;
        }
        previous = tier;
    }
}
