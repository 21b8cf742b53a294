use super::rules::{ActionPlanScope, RuleSet};
use super::types::{AggregateScores, IssueRecord};
use super::validation::InvalidInput;

/// Fold the issue list into per-audit totals.
///
/// Pure and order-independent: every total is a sum or a count.
pub fn aggregate_issues(
    issues: &[IssueRecord],
    rules: &RuleSet,
) -> Result<AggregateScores, InvalidInput> {
    if issues.is_empty() {
        return Err(InvalidInput::EmptyIssueList);
    }

    let issue_count = issues.len();
    let total_classification_score = issues
        .iter()
        .map(|issue| rules.classification.weight(issue.classification))
        .sum();
    let self_identified_count = issues.iter().filter(|issue| issue.self_identified).count();
    let total_action_plan_score = issues
        .iter()
        .filter(|issue| match rules.action_plan_scope {
            ActionPlanScope::SelfIdentified => issue.self_identified,
            ActionPlanScope::AllIssues => true,
        })
        .map(|issue| rules.action_plan.weight(issue.action_plan))
        .sum();

    Ok(AggregateScores {
        issue_count,
        total_classification_score,
        self_identified_count,
        self_identified_pct: 100.0 * self_identified_count as f64 / issue_count as f64,
        total_action_plan_score,
    })
}
