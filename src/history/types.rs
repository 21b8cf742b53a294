use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::rating::{AuditInputs, RatingResult, RuleRevision, ScoreReport, Tier};

/// One line of the audit history log.
///
/// Rows are append-only and carry no key; scoring the same audit twice
/// produces two rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub recorded_at: DateTime<Utc>,
    pub revision: RuleRevision,
    pub auditor_name: String,
    pub audit_name: String,
    pub ce_score: f64,
    #[serde(serialize_with = "tier_label", deserialize_with = "parse_tier")]
    pub ce_tier: Tier,
    pub mca_score: f64,
    #[serde(serialize_with = "tier_label", deserialize_with = "parse_tier")]
    pub mca_tier: Tier,
    pub total_classification_score: f64,
    pub area_impact_score: f64,
    pub key_control_score: f64,
    pub issue_count: usize,
    pub self_identified_count: usize,
    pub total_action_plan_score: f64,
}

impl HistoryRow {
    pub fn from_report(
        inputs: &AuditInputs,
        report: &ScoreReport,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            recorded_at,
            revision: report.revision,
            auditor_name: inputs.auditor_name.clone(),
            audit_name: inputs.audit_name.clone(),
            ce_score: report.result.ce_score,
            ce_tier: report.result.ce_tier,
            mca_score: report.result.mca_score,
            mca_tier: report.result.mca_tier,
            total_classification_score: report.aggregate.total_classification_score,
            area_impact_score: report.area_impact_score,
            key_control_score: report.key_control_score,
            issue_count: report.aggregate.issue_count,
            self_identified_count: report.aggregate.self_identified_count,
            total_action_plan_score: report.aggregate.total_action_plan_score,
        }
    }

    pub fn rating(&self) -> RatingResult {
        RatingResult {
            ce_score: self.ce_score,
            ce_tier: self.ce_tier,
            mca_score: self.mca_score,
            mca_tier: self.mca_tier,
        }
    }
}

fn tier_label<S: Serializer>(tier: &Tier, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(tier.label())
}

fn parse_tier<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Tier, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}
