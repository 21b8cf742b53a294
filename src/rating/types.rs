use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::validation::InvalidInput;

/// Severity assigned to a single audit finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Severe,
    High,
    Medium,
}

/// How well the remediation plan for a finding is defined and tracked.
///
/// `SomewhatDefined` covers plans whose progress is not monitored or whose
/// issues have been open for more than a year; `SomewhatDefinedMonitored`
/// covers monitored plans for issues open less than a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPlanStatus {
    NotDefined,
    SomewhatDefined,
    SomewhatDefinedMonitored,
    WellDefined,
}

/// Spread of the audited weaknesses across the organisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaImpact {
    AlmostAllAreas,
    MultipleAreas,
    LimitedAreas,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagementSupport {
    NotSupportive,
    SomewhatSupportive,
    FullySupportive,
}

/// Four-level qualitative rating shared by CE and MCA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Strong,
    SatisfactoryWithExceptions,
    NeedsImprovement,
    Weak,
}

impl Tier {
    pub const ALL: [Tier; 4] = [
        Tier::Strong,
        Tier::SatisfactoryWithExceptions,
        Tier::NeedsImprovement,
        Tier::Weak,
    ];

    /// Human-facing label, as shown in reports and written to the history log.
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Strong => "Strong",
            Tier::SatisfactoryWithExceptions => "Satisfactory with exceptions",
            Tier::NeedsImprovement => "Needs Improvement",
            Tier::Weak => "Weak",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One finding in an audit report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub classification: Classification,
    pub self_identified: bool,
    pub action_plan: ActionPlanStatus,
}

/// Everything the engine needs to rate one audit.
///
/// `auditor_name` and `audit_name` are carried through to the history log
/// and never influence the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditInputs {
    pub auditor_name: String,
    pub audit_name: String,
    pub area_impact: AreaImpact,
    pub key_control_failure_pct: f64,
    pub management_support: ManagementSupport,
    pub issues: Vec<IssueRecord>,
}

/// Per-audit totals folded from the issue list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateScores {
    pub issue_count: usize,
    pub total_classification_score: f64,
    pub self_identified_count: usize,
    pub self_identified_pct: f64,
    pub total_action_plan_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingResult {
    pub ce_score: f64,
    pub ce_tier: Tier,
    pub mca_score: f64,
    pub mca_tier: Tier,
}

// Free-text labels drift between form revisions ("Well defined and tracked",
// "well_defined", "WELL DEFINED"), so every label is reduced to lowercase
// words before matching.
fn normalize_label(raw: &str) -> String {
    raw.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

fn unrecognized(field: &'static str, raw: &str) -> InvalidInput {
    InvalidInput::UnrecognizedValue {
        field,
        value: raw.to_string(),
    }
}

impl FromStr for Classification {
    type Err = InvalidInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "severe" => Ok(Classification::Severe),
            "high" => Ok(Classification::High),
            "medium" => Ok(Classification::Medium),
            _ => Err(unrecognized("classification", s)),
        }
    }
}

impl FromStr for ActionPlanStatus {
    type Err = InvalidInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = normalize_label(s);
        match label.as_str() {
            "not defined" | "not defined and monitored" | "undefined" => {
                Ok(ActionPlanStatus::NotDefined)
            }
            "somewhat defined" | "somewhat defined unmonitored" => {
                Ok(ActionPlanStatus::SomewhatDefined)
            }
            "somewhat defined monitored" => Ok(ActionPlanStatus::SomewhatDefinedMonitored),
            "well defined" | "well defined and tracked" => Ok(ActionPlanStatus::WellDefined),
            // Long-form form options carry extra clauses about monitoring and age.
            _ if label.starts_with("somewhat defined but the progress is not monitored") => {
                Ok(ActionPlanStatus::SomewhatDefined)
            }
            _ if label.starts_with("somewhat defined and progress is monitored") => {
                Ok(ActionPlanStatus::SomewhatDefinedMonitored)
            }
            _ => Err(unrecognized("action_plan", s)),
        }
    }
}

impl AreaImpact {
    pub fn label(&self) -> &'static str {
        match self {
            AreaImpact::AlmostAllAreas => "almost all areas",
            AreaImpact::MultipleAreas => "multiple areas",
            AreaImpact::LimitedAreas => "limited areas",
        }
    }
}

impl fmt::Display for AreaImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl ManagementSupport {
    pub fn label(&self) -> &'static str {
        match self {
            ManagementSupport::NotSupportive => "not supportive",
            ManagementSupport::SomewhatSupportive => "somewhat supportive",
            ManagementSupport::FullySupportive => "fully supportive",
        }
    }
}

impl fmt::Display for ManagementSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AreaImpact {
    type Err = InvalidInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = normalize_label(s);
        let core = label
            .strip_prefix("spread across ")
            .unwrap_or(label.as_str())
            .trim_end_matches(" of the bank");
        match core {
            "almost all areas" => Ok(AreaImpact::AlmostAllAreas),
            "multiple areas" => Ok(AreaImpact::MultipleAreas),
            "limited areas" => Ok(AreaImpact::LimitedAreas),
            _ => Err(unrecognized("area_impact", s)),
        }
    }
}

impl FromStr for ManagementSupport {
    type Err = InvalidInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "not supportive" => Ok(ManagementSupport::NotSupportive),
            "somewhat supportive" => Ok(ManagementSupport::SomewhatSupportive),
            "fully supportive" => Ok(ManagementSupport::FullySupportive),
            _ => Err(unrecognized("management_support", s)),
        }
    }
}

impl FromStr for Tier {
    type Err = InvalidInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "strong" => Ok(Tier::Strong),
            "satisfactory with exceptions" => Ok(Tier::SatisfactoryWithExceptions),
            "needs improvement" => Ok(Tier::NeedsImprovement),
            "weak" => Ok(Tier::Weak),
            _ => Err(unrecognized("tier", s)),
        }
    }
}
