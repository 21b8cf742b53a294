use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::rating::{RuleOverrides, RuleRevision, RuleSet};

/// Application configuration.
///
/// Example YAML:
/// ```yaml
/// revision: streamlined
/// history_path: /srv/audits/history.csv
/// log_level: info
/// rules:
///   escalation_threshold: 120
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Rule revision to start from (default: standard)
    #[serde(default)]
    pub revision: Option<RuleRevision>,

    /// Partial overrides applied on top of the revision's tables
    #[serde(default)]
    pub rules: Option<RuleOverrides>,

    /// History CSV location (default: ~/.config/audit-rating/history.csv)
    #[serde(default)]
    pub history_path: Option<PathBuf>,

    /// tracing filter directive, e.g. "info" or "audit_rating=debug"
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Config {
    /// Build the effective rule set. `revision` takes precedence over the file.
    pub fn rule_set(&self, revision: Option<RuleRevision>) -> RuleSet {
        let revision = revision.or(self.revision).unwrap_or_default();
        let rules = RuleSet::preset(revision);
        match self.rules {
            Some(ref overrides) => rules.with_overrides(overrides),
            None => rules,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::McaPolicy;

    #[test]
    fn test_empty_config_parse() {
        let config: Config = serde_saphyr::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.rule_set(None), RuleSet::default());
    }

    #[test]
    fn test_full_config_parse() {
        let yaml = r#"
revision: legacy
history_path: /tmp/history.csv
log_level: debug
rules:
  mca_policy: additive
  key_control:
    - range: ">=50"
      score: 50
    - range: "<50"
      score: 5
"#;
        let config: Config = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(config.revision, Some(RuleRevision::Legacy));
        assert_eq!(config.history_path, Some(PathBuf::from("/tmp/history.csv")));
        assert_eq!(config.log_level.as_deref(), Some("debug"));

        let rules = config.rule_set(None);
        assert_eq!(rules.revision, RuleRevision::Legacy);
        assert_eq!(rules.mca_policy, McaPolicy::Additive);
        assert_eq!(rules.key_control_score(60.0), Some(50.0));
    }

    #[test]
    fn test_cli_revision_wins() {
        let config = Config {
            revision: Some(RuleRevision::Legacy),
            ..Default::default()
        };
        let rules = config.rule_set(Some(RuleRevision::Streamlined));
        assert_eq!(rules, RuleSet::preset(RuleRevision::Streamlined));
    }

    #[test]
    fn test_unknown_revision_rejected() {
        assert!(serde_saphyr::from_str::<Config>("revision: v3\n").is_err());
    }
}
