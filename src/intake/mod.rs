//! Reading audit descriptions written by people.
//!
//! Files carry free-text labels exactly as they appear on the collection
//! form (or their short identifiers). Everything is normalised onto the
//! engine's closed enumerations here, so the engine never sees raw text.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::rating::{AuditInputs, InvalidInput, IssueRecord};

/// Audit as written in an intake file, before normalisation.
///
/// Example YAML:
/// ```yaml
/// auditor_name: Jane Doe
/// audit_name: Treasury Operations
/// area_impact: Spread across limited areas of the Bank
/// key_control_failure_pct: 50
/// management_support: fully supportive
/// issues:
///   - classification: Severe
///     self_identified: yes
///     action_plan: well defined and tracked
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RawAudit {
    #[serde(default)]
    pub auditor_name: String,
    #[serde(default)]
    pub audit_name: String,
    pub area_impact: String,
    pub key_control_failure_pct: f64,
    pub management_support: String,
    pub issues: Vec<RawIssue>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RawIssue {
    pub classification: String,
    pub self_identified: YesNo,
    pub action_plan: String,
}

/// Boolean answer given either as a real boolean or as `yes`/`no` text.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum YesNo {
    Bool(bool),
    Text(String),
}

impl YesNo {
    fn resolve(&self) -> Result<bool, InvalidInput> {
        match self {
            YesNo::Bool(value) => Ok(*value),
            YesNo::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "yes" | "y" | "true" => Ok(true),
                "no" | "n" | "false" => Ok(false),
                _ => Err(InvalidInput::UnrecognizedValue {
                    field: "self_identified",
                    value: text.clone(),
                }),
            },
        }
    }
}

impl RawAudit {
    /// Map every label onto its enumeration. Fails on the first unknown value.
    pub fn normalize(&self) -> Result<AuditInputs, InvalidInput> {
        let issues = self
            .issues
            .iter()
            .map(|raw| -> Result<IssueRecord, InvalidInput> {
                Ok(IssueRecord {
                    classification: raw.classification.parse()?,
                    self_identified: raw.self_identified.resolve()?,
                    action_plan: raw.action_plan.parse()?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AuditInputs {
            auditor_name: self.auditor_name.trim().to_string(),
            audit_name: self.audit_name.trim().to_string(),
            area_impact: self.area_impact.parse()?,
            key_control_failure_pct: self.key_control_failure_pct,
            management_support: self.management_support.parse()?,
            issues,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeFormat {
    Yaml,
    Json,
}

impl IntakeFormat {
    /// Pick the format from the file extension; anything unrecognised is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => IntakeFormat::Json,
            _ => IntakeFormat::Yaml,
        }
    }
}

/// Parse intake text without normalising it.
pub fn parse_raw(content: &str, format: IntakeFormat) -> Result<RawAudit> {
    let raw = match format {
        IntakeFormat::Yaml => serde_saphyr::from_str(content).context("invalid YAML audit")?,
        IntakeFormat::Json => serde_json::from_str(content).context("invalid JSON audit")?,
    };
    Ok(raw)
}

/// Parse and normalise intake text.
pub fn parse_audit(content: &str, format: IntakeFormat) -> Result<AuditInputs> {
    let raw = parse_raw(content, format)?;
    Ok(raw.normalize()?)
}

/// Load an audit file from disk, choosing the format from its extension.
pub fn load_audit(path: &Path) -> Result<AuditInputs> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read audit file at {}", path.display()))?;
    let audit = parse_audit(&content, IntakeFormat::from_path(path))
        .with_context(|| format!("Failed to load audit from {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        issues = audit.issues.len(),
        "audit loaded"
    );
    Ok(audit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::{ActionPlanStatus, AreaImpact, Classification, ManagementSupport};
    use std::env;

    const FORM_YAML: &str = r#"
auditor_name: " Jane Doe "
audit_name: Treasury Operations
area_impact: Spread across limited areas of the Bank
key_control_failure_pct: 50
management_support: Fully Supportive
issues:
  - classification: Severe
    self_identified: "Yes"
    action_plan: well defined and tracked
  - classification: medium
    self_identified: false
    action_plan: Somewhat defined but the progress is not monitored and the issues are open for more than one year
"#;

    #[test]
    fn test_parse_form_labels() {
        let audit = parse_audit(FORM_YAML, IntakeFormat::Yaml).unwrap();
        assert_eq!(audit.auditor_name, "Jane Doe");
        assert_eq!(audit.area_impact, AreaImpact::LimitedAreas);
        assert_eq!(audit.management_support, ManagementSupport::FullySupportive);
        assert_eq!(audit.key_control_failure_pct, 50.0);
        assert_eq!(audit.issues.len(), 2);
        assert_eq!(audit.issues[0].classification, Classification::Severe);
        assert!(audit.issues[0].self_identified);
        assert_eq!(audit.issues[0].action_plan, ActionPlanStatus::WellDefined);
        assert!(!audit.issues[1].self_identified);
        assert_eq!(audit.issues[1].action_plan, ActionPlanStatus::SomewhatDefined);
    }

    #[test]
    fn test_parse_json_identifiers() {
        let json = r#"{
            "auditor_name": "Sam",
            "audit_name": "Payments",
            "area_impact": "multiple_areas",
            "key_control_failure_pct": 12.5,
            "management_support": "not_supportive",
            "issues": [
                {"classification": "high", "self_identified": true, "action_plan": "not_defined"}
            ]
        }"#;
        let audit = parse_audit(json, IntakeFormat::Json).unwrap();
        assert_eq!(audit.area_impact, AreaImpact::MultipleAreas);
        assert_eq!(audit.management_support, ManagementSupport::NotSupportive);
        assert_eq!(audit.issues[0].action_plan, ActionPlanStatus::NotDefined);
    }

    #[test]
    fn test_unknown_label_is_invalid_input() {
        let yaml = FORM_YAML.replace("classification: Severe", "classification: Critical");
        let err = parse_audit(&yaml, IntakeFormat::Yaml).unwrap_err();
        let invalid = err.downcast_ref::<InvalidInput>().unwrap();
        assert_eq!(
            invalid,
            &InvalidInput::UnrecognizedValue {
                field: "classification",
                value: "Critical".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_yes_no_answer() {
        let raw = YesNo::Text("maybe".to_string());
        assert!(raw.resolve().is_err());
        assert!(YesNo::Text(" Y ".to_string()).resolve().unwrap());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = format!("{}\nreviewer: Bob\n", FORM_YAML);
        assert!(parse_raw(&yaml, IntakeFormat::Yaml).is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(IntakeFormat::from_path(Path::new("a.JSON")), IntakeFormat::Json);
        assert_eq!(IntakeFormat::from_path(Path::new("a.yml")), IntakeFormat::Yaml);
        assert_eq!(IntakeFormat::from_path(Path::new("audit")), IntakeFormat::Yaml);
    }

    #[test]
    fn test_load_audit_from_file() {
        let temp_path = env::temp_dir().join("audit_rating_test_intake.yaml");
        std::fs::write(&temp_path, FORM_YAML).unwrap();

        let audit = load_audit(&temp_path).unwrap();
        assert_eq!(audit.audit_name, "Treasury Operations");

        let _ = std::fs::remove_file(&temp_path);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_path = env::temp_dir().join("audit_rating_test_missing_intake.yaml");
        let _ = std::fs::remove_file(&temp_path);
        let err = load_audit(&temp_path).unwrap_err();
        assert!(err.to_string().contains("Failed to read audit file"));
    }
}
