use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::factors::{first_match, RangeOp};
use super::types::{ActionPlanStatus, AreaImpact, Classification, ManagementSupport, Tier};

/// Named rule revisions shipped with the engine.
///
/// Each revision is a complete [`RuleSet`]; callers pick one explicitly and
/// may override individual tables from the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleRevision {
    /// Rules as first deployed: action plans scored for every issue and a
    /// separate, tighter set of MCA tier bands.
    Legacy,
    #[default]
    Standard,
    /// Three-bucket awareness weighting with additive MCA aggregation.
    Streamlined,
}

impl RuleRevision {
    pub const ALL: [RuleRevision; 3] = [
        RuleRevision::Legacy,
        RuleRevision::Standard,
        RuleRevision::Streamlined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleRevision::Legacy => "legacy",
            RuleRevision::Standard => "standard",
            RuleRevision::Streamlined => "streamlined",
        }
    }
}

impl fmt::Display for RuleRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleRevision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(RuleRevision::Legacy),
            "standard" => Ok(RuleRevision::Standard),
            "streamlined" => Ok(RuleRevision::Streamlined),
            other => Err(format!(
                "unknown rule revision '{}' (expected legacy, standard or streamlined)",
                other
            )),
        }
    }
}

/// Which issues contribute to the cumulative action-plan score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPlanScope {
    SelfIdentified,
    AllIssues,
}

impl ActionPlanScope {
    pub fn label(&self) -> &'static str {
        match self {
            ActionPlanScope::SelfIdentified => "self-identified issues only",
            ActionPlanScope::AllIssues => "all issues",
        }
    }
}

/// How the MCA score is assembled once the CE score is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McaPolicy {
    /// Above the escalation threshold the awareness score alone; otherwise the
    /// cumulative action-plan score.
    Simple,
    /// Above the escalation threshold awareness + action plan + management
    /// support; otherwise the awareness score alone.
    Additive,
}

impl McaPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            McaPolicy::Simple => "simple",
            McaPolicy::Additive => "additive",
        }
    }
}

/// Threshold bucket mapping a numeric input to a score.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoreBucket {
    /// Range expression (e.g., "<10", ">=90", "40-79")
    pub range: String,
    pub score: f64,
}

impl ScoreBucket {
    pub fn new(range: &str, score: f64) -> Self {
        Self {
            range: range.to_string(),
            score,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ClassificationWeights {
    pub severe: f64,
    pub high: f64,
    pub medium: f64,
}

impl ClassificationWeights {
    pub fn weight(&self, classification: Classification) -> f64 {
        match classification {
            Classification::Severe => self.severe,
            Classification::High => self.high,
            Classification::Medium => self.medium,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AreaImpactWeights {
    pub almost_all_areas: f64,
    pub multiple_areas: f64,
    pub limited_areas: f64,
}

impl AreaImpactWeights {
    pub fn weight(&self, area: AreaImpact) -> f64 {
        match area {
            AreaImpact::AlmostAllAreas => self.almost_all_areas,
            AreaImpact::MultipleAreas => self.multiple_areas,
            AreaImpact::LimitedAreas => self.limited_areas,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ActionPlanWeights {
    pub not_defined: f64,
    pub somewhat_defined: f64,
    pub somewhat_defined_monitored: f64,
    pub well_defined: f64,
}

impl ActionPlanWeights {
    pub fn weight(&self, status: ActionPlanStatus) -> f64 {
        match status {
            ActionPlanStatus::NotDefined => self.not_defined,
            ActionPlanStatus::SomewhatDefined => self.somewhat_defined,
            ActionPlanStatus::SomewhatDefinedMonitored => self.somewhat_defined_monitored,
            ActionPlanStatus::WellDefined => self.well_defined,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SupportWeights {
    pub not_supportive: f64,
    pub somewhat_supportive: f64,
    pub fully_supportive: f64,
}

impl SupportWeights {
    pub fn weight(&self, support: ManagementSupport) -> f64 {
        match support {
            ManagementSupport::NotSupportive => self.not_supportive,
            ManagementSupport::SomewhatSupportive => self.somewhat_supportive,
            ManagementSupport::FullySupportive => self.fully_supportive,
        }
    }
}

/// Score ranges for the three lower tiers, checked in severity order.
/// A score matching none of them is `Weak`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TierBands {
    pub strong: String,
    pub satisfactory_with_exceptions: String,
    pub needs_improvement: String,
}

impl TierBands {
    /// `<=50`, `<100`, `<=250`, then `Weak`.
    pub fn control_effectiveness() -> Self {
        Self {
            strong: "<=50".to_string(),
            satisfactory_with_exceptions: "<100".to_string(),
            needs_improvement: "<=250".to_string(),
        }
    }

    /// Tighter MCA bands used by the legacy revision.
    pub fn legacy_awareness() -> Self {
        Self {
            strong: "<=25".to_string(),
            satisfactory_with_exceptions: "<=50".to_string(),
            needs_improvement: "<=100".to_string(),
        }
    }

    pub fn tier_of(&self, score: f64) -> Tier {
        let bands = [
            (self.strong.as_str(), Tier::Strong),
            (
                self.satisfactory_with_exceptions.as_str(),
                Tier::SatisfactoryWithExceptions,
            ),
            (self.needs_improvement.as_str(), Tier::NeedsImprovement),
        ];
        for (range, tier) in bands {
            if let Ok(op) = RangeOp::parse(range) {
                if op.matches(score) {
                    return tier;
                }
            }
        }
        Tier::Weak
    }

    pub(crate) fn entries(&self) -> [(&'static str, &str); 3] {
        [
            ("strong", self.strong.as_str()),
            (
                "satisfactory_with_exceptions",
                self.satisfactory_with_exceptions.as_str(),
            ),
            ("needs_improvement", self.needs_improvement.as_str()),
        ]
    }
}

/// Complete, versioned scoring policy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    pub revision: RuleRevision,
    pub classification: ClassificationWeights,
    pub area_impact: AreaImpactWeights,
    /// Buckets over the key-control failure percentage.
    pub key_control: Vec<ScoreBucket>,
    /// Buckets over the self-identified percentage.
    pub awareness: Vec<ScoreBucket>,
    pub action_plan: ActionPlanWeights,
    pub management_support: SupportWeights,
    pub action_plan_scope: ActionPlanScope,
    pub mca_policy: McaPolicy,
    /// CE scores strictly above this switch the MCA policy to its escalated branch.
    pub escalation_threshold: f64,
    pub ce_tiers: TierBands,
    pub mca_tiers: TierBands,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::preset(RuleRevision::default())
    }
}

impl RuleSet {
    pub fn preset(revision: RuleRevision) -> Self {
        match revision {
            RuleRevision::Legacy => Self {
                revision,
                action_plan_scope: ActionPlanScope::AllIssues,
                mca_tiers: TierBands::legacy_awareness(),
                ..Self::four_bucket(revision)
            },
            RuleRevision::Standard => Self::four_bucket(revision),
            RuleRevision::Streamlined => Self {
                awareness: vec![
                    ScoreBucket::new("<40", 83.0),
                    ScoreBucket::new("<80", 17.0),
                    ScoreBucket::new(">=80", 3.0),
                ],
                action_plan: ActionPlanWeights {
                    not_defined: 83.0,
                    somewhat_defined: 17.0,
                    somewhat_defined_monitored: 17.0,
                    well_defined: 3.0,
                },
                management_support: SupportWeights {
                    not_supportive: 83.0,
                    somewhat_supportive: 17.0,
                    fully_supportive: 3.0,
                },
                mca_policy: McaPolicy::Additive,
                ..Self::four_bucket(revision)
            },
        }
    }

    fn four_bucket(revision: RuleRevision) -> Self {
        Self {
            revision,
            classification: ClassificationWeights {
                severe: 125.0,
                high: 25.0,
                medium: 5.0,
            },
            area_impact: AreaImpactWeights {
                almost_all_areas: 62.5,
                multiple_areas: 12.5,
                limited_areas: 2.5,
            },
            key_control: vec![
                ScoreBucket::new(">=80", 62.5),
                ScoreBucket::new(">=40", 12.5),
                ScoreBucket::new("<40", 2.5),
            ],
            awareness: vec![
                ScoreBucket::new("<10", 102.0),
                ScoreBucket::new("<40", 26.0),
                ScoreBucket::new("<90", 6.0),
                ScoreBucket::new(">=90", 2.0),
            ],
            action_plan: ActionPlanWeights {
                not_defined: 102.0,
                somewhat_defined: 26.0,
                somewhat_defined_monitored: 6.0,
                well_defined: 2.0,
            },
            management_support: SupportWeights {
                not_supportive: 102.0,
                somewhat_supportive: 26.0,
                fully_supportive: 2.0,
            },
            action_plan_scope: ActionPlanScope::SelfIdentified,
            mca_policy: McaPolicy::Simple,
            escalation_threshold: 100.0,
            ce_tiers: TierBands::control_effectiveness(),
            mca_tiers: TierBands::control_effectiveness(),
        }
    }

    /// Apply partial overrides on top of this rule set.
    pub fn with_overrides(mut self, overrides: &RuleOverrides) -> Self {
        if let Some(weights) = overrides.classification {
            self.classification = weights;
        }
        if let Some(weights) = overrides.area_impact {
            self.area_impact = weights;
        }
        if let Some(ref buckets) = overrides.key_control {
            self.key_control = buckets.clone();
        }
        if let Some(ref buckets) = overrides.awareness {
            self.awareness = buckets.clone();
        }
        if let Some(weights) = overrides.action_plan {
            self.action_plan = weights;
        }
        if let Some(weights) = overrides.management_support {
            self.management_support = weights;
        }
        if let Some(scope) = overrides.action_plan_scope {
            self.action_plan_scope = scope;
        }
        if let Some(policy) = overrides.mca_policy {
            self.mca_policy = policy;
        }
        if let Some(threshold) = overrides.escalation_threshold {
            self.escalation_threshold = threshold;
        }
        if let Some(ref bands) = overrides.ce_tiers {
            self.ce_tiers = bands.clone();
        }
        if let Some(ref bands) = overrides.mca_tiers {
            self.mca_tiers = bands.clone();
        }
        self
    }

    /// Score for a key-control failure percentage, or `None` when no bucket
    /// covers it.
    pub fn key_control_score(&self, pct: f64) -> Option<f64> {
        first_match(pct, &self.key_control, |b| b.range.as_str(), |b| b.score).map(|hit| hit.score)
    }

    /// Score for the share of self-identified issues, or `None` when no
    /// bucket covers it.
    pub fn awareness_score(&self, self_identified_pct: f64) -> Option<f64> {
        first_match(
            self_identified_pct,
            &self.awareness,
            |b| b.range.as_str(),
            |b| b.score,
        )
        .map(|hit| hit.score)
    }
}

/// Partial rule-set overrides read from the config file.
///
/// Example YAML:
/// ```yaml
/// rules:
///   mca_policy: additive
///   awareness:
///     - { range: "<40", score: 83 }
///     - { range: "<80", score: 17 }
///     - { range: ">=80", score: 3 }
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleOverrides {
    #[serde(default)]
    pub classification: Option<ClassificationWeights>,
    #[serde(default)]
    pub area_impact: Option<AreaImpactWeights>,
    #[serde(default)]
    pub key_control: Option<Vec<ScoreBucket>>,
    #[serde(default)]
    pub awareness: Option<Vec<ScoreBucket>>,
    #[serde(default)]
    pub action_plan: Option<ActionPlanWeights>,
    #[serde(default)]
    pub management_support: Option<SupportWeights>,
    #[serde(default)]
    pub action_plan_scope: Option<ActionPlanScope>,
    #[serde(default)]
    pub mca_policy: Option<McaPolicy>,
    #[serde(default)]
    pub escalation_threshold: Option<f64>,
    #[serde(default)]
    pub ce_tiers: Option<TierBands>,
    #[serde(default)]
    pub mca_tiers: Option<TierBands>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_standard() {
        let rules = RuleSet::default();
        assert_eq!(rules.revision, RuleRevision::Standard);
        assert_eq!(rules.mca_policy, McaPolicy::Simple);
        assert_eq!(rules.action_plan_scope, ActionPlanScope::SelfIdentified);
        assert_eq!(rules.ce_tiers, rules.mca_tiers);
    }

    #[test]
    fn test_legacy_differs_in_scope_and_mca_bands() {
        let legacy = RuleSet::preset(RuleRevision::Legacy);
        assert_eq!(legacy.action_plan_scope, ActionPlanScope::AllIssues);
        assert_eq!(legacy.mca_tiers, TierBands::legacy_awareness());
        assert_eq!(legacy.awareness, RuleSet::default().awareness);
    }

    #[test]
    fn test_streamlined_tables() {
        let rules = RuleSet::preset(RuleRevision::Streamlined);
        assert_eq!(rules.mca_policy, McaPolicy::Additive);
        assert_eq!(rules.awareness_score(39.9), Some(83.0));
        assert_eq!(rules.awareness_score(40.0), Some(17.0));
        assert_eq!(rules.awareness_score(80.0), Some(3.0));
        assert_eq!(rules.action_plan.weight(ActionPlanStatus::SomewhatDefinedMonitored), 17.0);
        assert_eq!(rules.management_support.weight(ManagementSupport::NotSupportive), 83.0);
    }

    #[test]
    fn test_four_bucket_awareness() {
        let rules = RuleSet::default();
        assert_eq!(rules.awareness_score(0.0), Some(102.0));
        assert_eq!(rules.awareness_score(9.99), Some(102.0));
        assert_eq!(rules.awareness_score(10.0), Some(26.0));
        assert_eq!(rules.awareness_score(39.0), Some(26.0));
        assert_eq!(rules.awareness_score(40.0), Some(6.0));
        assert_eq!(rules.awareness_score(89.9), Some(6.0));
        assert_eq!(rules.awareness_score(90.0), Some(2.0));
        assert_eq!(rules.awareness_score(100.0), Some(2.0));
    }

    #[test]
    fn test_key_control_tiers() {
        let rules = RuleSet::default();
        assert_eq!(rules.key_control_score(0.0), Some(2.5));
        assert_eq!(rules.key_control_score(39.5), Some(2.5));
        assert_eq!(rules.key_control_score(40.0), Some(12.5));
        assert_eq!(rules.key_control_score(79.0), Some(12.5));
        assert_eq!(rules.key_control_score(80.0), Some(62.5));
        assert_eq!(rules.key_control_score(100.0), Some(62.5));
    }

    #[test]
    fn test_ce_tier_breakpoints() {
        let bands = TierBands::control_effectiveness();
        assert_eq!(bands.tier_of(0.0), Tier::Strong);
        assert_eq!(bands.tier_of(50.0), Tier::Strong);
        assert_eq!(bands.tier_of(50.5), Tier::SatisfactoryWithExceptions);
        assert_eq!(bands.tier_of(51.0), Tier::SatisfactoryWithExceptions);
        assert_eq!(bands.tier_of(99.0), Tier::SatisfactoryWithExceptions);
        assert_eq!(bands.tier_of(99.5), Tier::SatisfactoryWithExceptions);
        assert_eq!(bands.tier_of(100.0), Tier::NeedsImprovement);
        assert_eq!(bands.tier_of(250.0), Tier::NeedsImprovement);
        assert_eq!(bands.tier_of(250.5), Tier::Weak);
        assert_eq!(bands.tier_of(10_000.0), Tier::Weak);
    }

    #[test]
    fn test_legacy_mca_breakpoints() {
        let bands = TierBands::legacy_awareness();
        assert_eq!(bands.tier_of(25.0), Tier::Strong);
        assert_eq!(bands.tier_of(26.0), Tier::SatisfactoryWithExceptions);
        assert_eq!(bands.tier_of(50.0), Tier::SatisfactoryWithExceptions);
        assert_eq!(bands.tier_of(100.0), Tier::NeedsImprovement);
        assert_eq!(bands.tier_of(102.0), Tier::Weak);
    }

    #[test]
    fn test_overrides_replace_only_named_tables() {
        let overrides = RuleOverrides {
            mca_policy: Some(McaPolicy::Additive),
            escalation_threshold: Some(150.0),
            ..Default::default()
        };
        let rules = RuleSet::default().with_overrides(&overrides);
        assert_eq!(rules.mca_policy, McaPolicy::Additive);
        assert_eq!(rules.escalation_threshold, 150.0);
        assert_eq!(rules.awareness, RuleSet::default().awareness);
        assert_eq!(rules.revision, RuleRevision::Standard);
    }

    #[test]
    fn test_revision_from_str() {
        assert_eq!("Streamlined".parse::<RuleRevision>().unwrap(), RuleRevision::Streamlined);
        assert!("v2".parse::<RuleRevision>().is_err());
        for revision in RuleRevision::ALL {
            assert_eq!(revision.to_string().parse::<RuleRevision>().unwrap(), revision);
        }
    }

    #[test]
    fn test_rule_set_serde_roundtrip() {
        let rules = RuleSet::preset(RuleRevision::Streamlined);
        let yaml = serde_saphyr::to_string(&rules).unwrap();
        let parsed: RuleSet = serde_saphyr::from_str(&yaml).unwrap();
        assert_eq!(rules, parsed);
    }

    #[test]
    fn test_partial_overrides_parse() {
        let yaml = r#"
mca_policy: additive
awareness:
  - range: "<50"
    score: 40
  - range: ">=50"
    score: 4
"#;
        let overrides: RuleOverrides = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(overrides.mca_policy, Some(McaPolicy::Additive));
        assert_eq!(overrides.awareness.unwrap().len(), 2);
        assert!(overrides.classification.is_none());
    }

    #[test]
    fn test_overrides_reject_unknown_fields() {
        let yaml = "awarness: []\n";
        assert!(serde_saphyr::from_str::<RuleOverrides>(yaml).is_err());
    }
}
