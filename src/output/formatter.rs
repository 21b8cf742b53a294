use owo_colors::OwoColorize;
use std::io::IsTerminal;

use crate::history::HistoryRow;
use crate::rating::{AuditInputs, RuleSet, ScoreBucket, ScoreReport, Tier};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format a score without noise: whole numbers print bare ("140"), others
/// keep at most two decimals ("62.5").
pub fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{:.0}", score)
    } else {
        let formatted = format!("{:.2}", score);
        formatted.trim_end_matches('0').to_string()
    }
}

/// Tier label, colored by severity when requested
pub fn format_tier(tier: Tier, use_colors: bool) -> String {
    if !use_colors {
        return tier.label().to_string();
    }
    match tier {
        Tier::Strong => tier.label().green().to_string(),
        Tier::SatisfactoryWithExceptions => tier.label().yellow().to_string(),
        Tier::NeedsImprovement => tier.label().magenta().to_string(),
        Tier::Weak => tier.label().red().bold().to_string(),
    }
}

/// Multi-line report for one scored audit: headline ratings then the
/// per-factor breakdown.
pub fn format_report(inputs: &AuditInputs, report: &ScoreReport, use_colors: bool) -> String {
    let title = match (inputs.audit_name.is_empty(), inputs.auditor_name.is_empty()) {
        (false, false) => format!("{} (by {})", inputs.audit_name, inputs.auditor_name),
        (false, true) => inputs.audit_name.clone(),
        (true, false) => format!("Audit by {}", inputs.auditor_name),
        (true, true) => "Audit".to_string(),
    };

    let mut lines = Vec::new();
    if use_colors {
        lines.push(format!("{}", title.bold()));
    } else {
        lines.push(title);
    }
    lines.push(format!("  Rules: {}", report.revision));
    lines.push(format!(
        "  CE rating:  {:>7}  {}",
        format_score(report.result.ce_score),
        format_tier(report.result.ce_tier, use_colors)
    ));
    lines.push(format!(
        "  MCA rating: {:>7}  {}",
        format_score(report.result.mca_score),
        format_tier(report.result.mca_tier, use_colors)
    ));
    lines.push(String::new());
    lines.push("  Breakdown:".to_string());

    let label_width = report
        .factors
        .iter()
        .map(|factor| factor.label.len())
        .max()
        .unwrap_or(0);
    for factor in &report.factors {
        let score = format!("{:>7}", format_score(factor.score));
        let description = if use_colors {
            factor.description.dimmed().to_string()
        } else {
            factor.description.clone()
        };
        lines.push(format!(
            "    {:<width$}  {}  {}",
            factor.label,
            score,
            description,
            width = label_width
        ));
    }

    if report.escalated {
        lines.push(String::new());
        lines.push("  CE above escalation threshold: MCA uses the escalated policy branch".to_string());
    }

    lines.join("\n")
}

/// Truncate a name to fit a column, accounting for Unicode
fn truncate_name(name: &str, max_width: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_width {
        name.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Format history rows as an aligned table, newest last.
/// Columns: Index, Date, Audit, CE score, CE tier, MCA score, MCA tier
pub fn format_history_table(rows: &[HistoryRow], use_colors: bool) -> String {
    if rows.is_empty() {
        return "No audits recorded.".to_string();
    }

    let name_width = 28;
    rows.iter()
        .enumerate()
        .map(|(idx, row)| {
            let index_str = format!("{:>3}.", idx + 1);
            let date = row.recorded_at.format("%Y-%m-%d").to_string();
            let name = truncate_name(&row.audit_name, name_width);
            let ce = format!("{:>7}", format_score(row.ce_score));
            let mca = format!("{:>7}", format_score(row.mca_score));
            // Pad before coloring so escape codes don't skew alignment
            let ce_tier = format!("{:<28}", row.ce_tier.label());
            let ce_tier = if use_colors {
                ce_tier.replace(row.ce_tier.label(), &format_tier(row.ce_tier, true))
            } else {
                ce_tier
            };

            if use_colors {
                format!(
                    "{} {}  {:<width$}  {} {}  {} {}",
                    index_str.dimmed(),
                    date,
                    name,
                    ce.bold(),
                    ce_tier,
                    mca.bold(),
                    format_tier(row.mca_tier, true),
                    width = name_width
                )
            } else {
                format!(
                    "{} {}  {:<width$}  {} {}  {} {}",
                    index_str,
                    date,
                    name,
                    ce,
                    ce_tier,
                    mca,
                    row.mca_tier.label(),
                    width = name_width
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format history rows as tab-separated values for scripting
/// Columns: recorded_at, auditor, audit, ce_score, ce_tier, mca_score, mca_tier
/// (no headers, no colors)
pub fn format_tsv(rows: &[HistoryRow]) -> String {
    rows.iter()
        .map(|row| {
            format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                row.recorded_at.to_rfc3339(),
                row.auditor_name,
                row.audit_name,
                row.ce_score,
                row.ce_tier.label(),
                row.mca_score,
                row.mca_tier.label()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_buckets(buckets: &[ScoreBucket]) -> String {
    buckets
        .iter()
        .map(|bucket| format!("{} -> {}", bucket.range, format_score(bucket.score)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Human-readable dump of the effective rule tables
pub fn format_rules(rules: &RuleSet) -> String {
    let lines = [
        format!("Revision: {}", rules.revision),
        format!(
            "Classification: severe {}, high {}, medium {}",
            format_score(rules.classification.severe),
            format_score(rules.classification.high),
            format_score(rules.classification.medium)
        ),
        format!(
            "Area impact: almost all {}, multiple {}, limited {}",
            format_score(rules.area_impact.almost_all_areas),
            format_score(rules.area_impact.multiple_areas),
            format_score(rules.area_impact.limited_areas)
        ),
        format!("Key control failure %: {}", format_buckets(&rules.key_control)),
        format!("Self-identified %: {}", format_buckets(&rules.awareness)),
        format!(
            "Action plan: not defined {}, somewhat {}, somewhat (monitored) {}, well defined {}",
            format_score(rules.action_plan.not_defined),
            format_score(rules.action_plan.somewhat_defined),
            format_score(rules.action_plan.somewhat_defined_monitored),
            format_score(rules.action_plan.well_defined)
        ),
        format!(
            "Management support: not {}, somewhat {}, fully {}",
            format_score(rules.management_support.not_supportive),
            format_score(rules.management_support.somewhat_supportive),
            format_score(rules.management_support.fully_supportive)
        ),
        format!("Action plan scope: {}", rules.action_plan_scope.label()),
        format!(
            "MCA policy: {} (escalates above CE {})",
            rules.mca_policy.as_str(),
            format_score(rules.escalation_threshold)
        ),
        format!(
            "CE tiers: strong {}, satisfactory {}, needs improvement {}, else weak",
            rules.ce_tiers.strong, rules.ce_tiers.satisfactory_with_exceptions, rules.ce_tiers.needs_improvement
        ),
        format!(
            "MCA tiers: strong {}, satisfactory {}, needs improvement {}, else weak",
            rules.mca_tiers.strong, rules.mca_tiers.satisfactory_with_exceptions, rules.mca_tiers.needs_improvement
        ),
    ];
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::{
        evaluate, ActionPlanStatus, AreaImpact, Classification, IssueRecord, ManagementSupport,
        RuleRevision,
    };
    use chrono::{TimeZone, Utc};

    fn sample_inputs() -> AuditInputs {
        AuditInputs {
            auditor_name: "Jane Doe".to_string(),
            audit_name: "Treasury".to_string(),
            area_impact: AreaImpact::LimitedAreas,
            key_control_failure_pct: 50.0,
            management_support: ManagementSupport::FullySupportive,
            issues: vec![IssueRecord {
                classification: Classification::Severe,
                self_identified: true,
                action_plan: ActionPlanStatus::WellDefined,
            }],
        }
    }

    fn sample_row(name: &str) -> HistoryRow {
        HistoryRow {
            recorded_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            revision: RuleRevision::Standard,
            auditor_name: "Jane Doe".to_string(),
            audit_name: name.to_string(),
            ce_score: 140.0,
            ce_tier: Tier::NeedsImprovement,
            mca_score: 2.0,
            mca_tier: Tier::Strong,
            total_classification_score: 125.0,
            area_impact_score: 2.5,
            key_control_score: 12.5,
            issue_count: 1,
            self_identified_count: 1,
            total_action_plan_score: 2.0,
        }
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(140.0), "140");
        assert_eq!(format_score(62.5), "62.5");
        assert_eq!(format_score(2.25), "2.25");
        assert_eq!(format_score(0.0), "0");
    }

    #[test]
    fn test_format_tier_plain() {
        assert_eq!(format_tier(Tier::NeedsImprovement, false), "Needs Improvement");
        assert!(format_tier(Tier::Weak, true).contains("Weak"));
    }

    #[test]
    fn test_format_report() {
        let inputs = sample_inputs();
        let report = evaluate(&inputs, &RuleSet::default()).unwrap();
        let result = format_report(&inputs, &report, false);
        assert!(result.starts_with("Treasury (by Jane Doe)"));
        assert!(result.contains("Rules: standard"));
        assert!(result.contains("CE rating:      140  Needs Improvement"));
        assert!(result.contains("MCA rating:       2  Strong"));
        assert!(result.contains("Area impact"));
        assert!(result.contains("escalation threshold"));
    }

    #[test]
    fn test_format_history_table_empty() {
        assert_eq!(format_history_table(&[], false), "No audits recorded.");
    }

    #[test]
    fn test_format_history_table_rows() {
        let rows = vec![sample_row("Treasury"), sample_row("A very long audit name that will not fit")];
        let result = format_history_table(&rows, false);
        let lines: Vec<&str> = result.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("  1. 2024-03-01  Treasury"));
        assert!(lines[0].contains("Needs Improvement"));
        assert!(lines[1].contains("A very long audit name th..."));
    }

    #[test]
    fn test_format_tsv() {
        let result = format_tsv(&[sample_row("Treasury")]);
        assert_eq!(
            result,
            "2024-03-01T09:30:00+00:00\tJane Doe\tTreasury\t140\tNeeds Improvement\t2\tStrong"
        );
        assert_eq!(format_tsv(&[]), "");
    }

    #[test]
    fn test_format_rules_lists_tables() {
        let result = format_rules(&RuleSet::preset(RuleRevision::Streamlined));
        assert!(result.contains("Revision: streamlined"));
        assert!(result.contains("Self-identified %: <40 -> 83, <80 -> 17, >=80 -> 3"));
        assert!(result.contains("MCA policy: additive (escalates above CE 100)"));
        assert!(result.contains("Action plan scope: self-identified issues only"));
        assert!(!result.contains("SelfIdentified"));
    }
}
