use serde::Serialize;
use tracing::debug;

use super::aggregate::aggregate_issues;
use super::rules::{McaPolicy, RuleRevision, RuleSet};
use super::types::{AggregateScores, AuditInputs, RatingResult};
use super::validation::{validate_inputs, InvalidInput};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorContribution {
    pub label: String,       // e.g. "Area impact", "Management awareness"
    pub description: String, // e.g. "limited areas", "0/2 self-identified (0.0%)"
    pub score: f64,
}

/// Everything computed during one scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreReport {
    pub revision: RuleRevision,
    pub aggregate: AggregateScores,
    pub area_impact_score: f64,
    pub key_control_score: f64,
    pub awareness_score: f64,
    pub management_support_score: f64,
    /// True when the CE score exceeded the escalation threshold.
    pub escalated: bool,
    pub factors: Vec<FactorContribution>,
    pub result: RatingResult,
}

/// Rate one audit and return only the four headline values.
pub fn score(inputs: &AuditInputs, rules: &RuleSet) -> Result<RatingResult, InvalidInput> {
    evaluate(inputs, rules).map(|report| report.result)
}

/// Rate one audit, keeping every intermediate score for display and logging.
pub fn evaluate(inputs: &AuditInputs, rules: &RuleSet) -> Result<ScoreReport, InvalidInput> {
    validate_inputs(inputs)?;
    let aggregate = aggregate_issues(&inputs.issues, rules)?;

    // Control effectiveness
    let area_impact_score = rules.area_impact.weight(inputs.area_impact);
    let key_control_score = rules
        .key_control_score(inputs.key_control_failure_pct)
        .ok_or(InvalidInput::NoMatchingBucket {
            table: "key_control",
            value: inputs.key_control_failure_pct,
        })?;
    let ce_score = aggregate.total_classification_score + area_impact_score + key_control_score;
    let ce_tier = rules.ce_tiers.tier_of(ce_score);

    // Management control awareness
    let awareness_score = rules.awareness_score(aggregate.self_identified_pct).ok_or(
        InvalidInput::NoMatchingBucket {
            table: "awareness",
            value: aggregate.self_identified_pct,
        },
    )?;
    let management_support_score = rules.management_support.weight(inputs.management_support);
    let escalated = ce_score > rules.escalation_threshold;
    let mca_score = match (rules.mca_policy, escalated) {
        (McaPolicy::Simple, true) => awareness_score,
        (McaPolicy::Simple, false) => aggregate.total_action_plan_score,
        (McaPolicy::Additive, true) => {
            awareness_score + aggregate.total_action_plan_score + management_support_score
        }
        (McaPolicy::Additive, false) => awareness_score,
    };
    let mca_tier = rules.mca_tiers.tier_of(mca_score);

    debug!(
        revision = %rules.revision,
        ce_score,
        %ce_tier,
        mca_score,
        %mca_tier,
        escalated,
        "audit scored"
    );

    let factors = vec![
        FactorContribution {
            label: "Issue classification".to_string(),
            description: format!("{} issue(s)", aggregate.issue_count),
            score: aggregate.total_classification_score,
        },
        FactorContribution {
            label: "Area impact".to_string(),
            description: inputs.area_impact.to_string(),
            score: area_impact_score,
        },
        FactorContribution {
            label: "Key control failures".to_string(),
            description: format!("{}% failed", inputs.key_control_failure_pct),
            score: key_control_score,
        },
        FactorContribution {
            label: "Management awareness".to_string(),
            description: format!(
                "{}/{} self-identified ({:.1}%)",
                aggregate.self_identified_count,
                aggregate.issue_count,
                aggregate.self_identified_pct
            ),
            score: awareness_score,
        },
        FactorContribution {
            label: "Action plans".to_string(),
            description: format!("scored over {}", rules.action_plan_scope.label()),
            score: aggregate.total_action_plan_score,
        },
        FactorContribution {
            label: "Management support".to_string(),
            description: inputs.management_support.to_string(),
            score: management_support_score,
        },
    ];

    Ok(ScoreReport {
        revision: rules.revision,
        aggregate,
        area_impact_score,
        key_control_score,
        awareness_score,
        management_support_score,
        escalated,
        factors,
        result: RatingResult {
            ce_score,
            ce_tier,
            mca_score,
            mca_tier,
        },
    })
}
