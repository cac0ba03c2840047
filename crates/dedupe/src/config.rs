use std::collections::HashSet;

use serde::Deserialize;

use crate::error::DedupeError;
use crate::model::Source;
use crate::similarity::SimilarityMetric;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DedupeConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Order in which source batches are resolved within a cycle.
    #[serde(default = "default_source_order")]
    pub source_order: Vec<Source>,
    /// Sources whose batches are skipped entirely.
    #[serde(default)]
    pub disabled: Vec<Source>,
    /// Trust ranking, most trusted first. Must list every source exactly once.
    #[serde(default = "default_trust")]
    pub trust: Vec<Source>,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

fn default_name() -> String {
    "rentradar".into()
}

fn default_source_order() -> Vec<Source> {
    vec![
        Source::Rightmove,
        Source::Zoopla,
        Source::OnTheMarket,
        Source::SpareRoom,
    ]
}

fn default_trust() -> Vec<Source> {
    vec![
        Source::Rightmove,
        Source::OnTheMarket,
        Source::Zoopla,
        Source::SpareRoom,
    ]
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            source_order: default_source_order(),
            disabled: Vec::new(),
            trust: default_trust(),
            matching: MatchingConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchingConfig {
    /// Max relative rent difference `|a-b| / max(a,b)` when both rents are known.
    #[serde(default = "default_rent_tolerance")]
    pub rent_tolerance: f64,
    /// Minimum street similarity for a fuzzy match.
    #[serde(default = "default_street_similarity")]
    pub street_similarity: f64,
    #[serde(default)]
    pub metric: SimilarityMetric,
    #[serde(default)]
    pub strategy: MatchStrategy,
    /// Require rent/bedroom agreement on exact key hits too. Off by default: an
    /// exact key hit is a duplicate whatever the attributes say.
    #[serde(default = "default_guard_exact")]
    pub guard_exact: bool,
}

fn default_rent_tolerance() -> f64 {
    0.08
}

fn default_street_similarity() -> f64 {
    0.92
}

fn default_guard_exact() -> bool {
    false
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            rent_tolerance: default_rent_tolerance(),
            street_similarity: default_street_similarity(),
            metric: SimilarityMetric::default(),
            strategy: MatchStrategy::default(),
            guard_exact: default_guard_exact(),
        }
    }
}

/// Fuzzy scan policy within one postcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// First entry in insertion order that passes every predicate.
    #[default]
    FirstMatch,
    /// Passing entry with the highest street similarity.
    BestMatch,
}

// ---------------------------------------------------------------------------
// Retention
// ---------------------------------------------------------------------------

/// Longest accepted `ttl_hours` (ten years).
pub const MAX_TTL_HOURS: u64 = 10 * 365 * 24;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Evict registry entries not seen for this many hours. `None` keeps them forever.
    #[serde(default)]
    pub ttl_hours: Option<u64>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl DedupeConfig {
    pub fn from_toml(input: &str) -> Result<Self, DedupeError> {
        let config: DedupeConfig =
            toml::from_str(input).map_err(|e| DedupeError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DedupeError> {
        if self.source_order.is_empty() {
            return Err(DedupeError::ConfigValidation(
                "source_order must list at least one source".into(),
            ));
        }

        let mut seen = HashSet::new();
        for source in &self.source_order {
            if !seen.insert(*source) {
                return Err(DedupeError::ConfigValidation(format!(
                    "source_order lists '{source}' more than once"
                )));
            }
        }

        // Trust must be a total order over all sources
        let mut seen = HashSet::new();
        for source in &self.trust {
            if !seen.insert(*source) {
                return Err(DedupeError::ConfigValidation(format!(
                    "trust lists '{source}' more than once"
                )));
            }
        }
        if let Some(missing) = Source::ALL.iter().find(|s| !seen.contains(*s)) {
            return Err(DedupeError::ConfigValidation(format!(
                "trust must rank every source, missing '{missing}'"
            )));
        }

        let m = &self.matching;
        if !(0.0..=1.0).contains(&m.rent_tolerance) {
            return Err(DedupeError::ConfigValidation(format!(
                "matching.rent_tolerance must be within [0, 1], got {}",
                m.rent_tolerance
            )));
        }
        if !(0.0..=1.0).contains(&m.street_similarity) {
            return Err(DedupeError::ConfigValidation(format!(
                "matching.street_similarity must be within [0, 1], got {}",
                m.street_similarity
            )));
        }

        match self.retention.ttl_hours {
            Some(0) => {
                return Err(DedupeError::ConfigValidation(
                    "retention.ttl_hours must be greater than 0".into(),
                ))
            }
            Some(hours) if hours > MAX_TTL_HOURS => {
                return Err(DedupeError::ConfigValidation(format!(
                    "retention.ttl_hours must be at most {MAX_TTL_HOURS}, got {hours}"
                )))
            }
            _ => {}
        }

        Ok(())
    }

    pub fn is_enabled(&self, source: Source) -> bool {
        !self.disabled.contains(&source)
    }

    /// Position of `source` in the processing order, `None` when unlisted.
    pub fn order_of(&self, source: Source) -> Option<usize> {
        self.source_order.iter().position(|s| *s == source)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
name = "Lincoln + Wirral"
source_order = ["rightmove", "zoopla", "otm", "spareroom"]
disabled = ["spareroom"]
trust = ["rightmove", "onthemarket", "zoopla", "spareroom"]

[matching]
rent_tolerance = 0.1
street_similarity = 0.9
metric = "jaro_winkler"
strategy = "best_match"
guard_exact = false

[retention]
ttl_hours = 72
"#;

    #[test]
    fn parse_full() {
        let config = DedupeConfig::from_toml(FULL).unwrap();
        assert_eq!(config.name, "Lincoln + Wirral");
        assert_eq!(config.source_order[2], Source::OnTheMarket);
        assert!(!config.is_enabled(Source::SpareRoom));
        assert!(config.is_enabled(Source::Zoopla));
        assert_eq!(config.matching.rent_tolerance, 0.1);
        assert_eq!(config.matching.metric, SimilarityMetric::JaroWinkler);
        assert_eq!(config.matching.strategy, MatchStrategy::BestMatch);
        assert!(!config.matching.guard_exact);
        assert_eq!(config.retention.ttl_hours, Some(72));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = DedupeConfig::from_toml("").unwrap();
        assert_eq!(config.name, "rentradar");
        assert_eq!(config.source_order.len(), 4);
        assert_eq!(config.trust[0], Source::Rightmove);
        assert_eq!(config.trust[3], Source::SpareRoom);
        assert_eq!(config.matching.rent_tolerance, 0.08);
        assert_eq!(config.matching.street_similarity, 0.92);
        assert_eq!(config.matching.strategy, MatchStrategy::FirstMatch);
        assert!(!config.matching.guard_exact);
        assert!(config.retention.ttl_hours.is_none());
    }

    #[test]
    fn order_of_sources() {
        let config = DedupeConfig::default();
        assert_eq!(config.order_of(Source::Rightmove), Some(0));
        assert_eq!(config.order_of(Source::OnTheMarket), Some(2));

        let partial = DedupeConfig::from_toml(r#"source_order = ["zoopla"]"#).unwrap();
        assert_eq!(partial.order_of(Source::Rightmove), None);
    }

    #[test]
    fn reject_duplicate_source_order() {
        let err = DedupeConfig::from_toml(r#"source_order = ["zoopla", "zoopla"]"#).unwrap_err();
        assert!(err.to_string().contains("'zoopla' more than once"));
    }

    #[test]
    fn reject_empty_source_order() {
        let err = DedupeConfig::from_toml("source_order = []").unwrap_err();
        assert!(err.to_string().contains("at least one source"));
    }

    #[test]
    fn reject_incomplete_trust() {
        let err =
            DedupeConfig::from_toml(r#"trust = ["rightmove", "zoopla", "spareroom"]"#).unwrap_err();
        assert!(err.to_string().contains("missing 'onthemarket'"));
    }

    #[test]
    fn reject_out_of_range_threshold() {
        let err = DedupeConfig::from_toml("[matching]\nstreet_similarity = 1.5").unwrap_err();
        assert!(err.to_string().contains("street_similarity"));
    }

    #[test]
    fn reject_zero_ttl() {
        let err = DedupeConfig::from_toml("[retention]\nttl_hours = 0").unwrap_err();
        assert!(err.to_string().contains("ttl_hours"));
    }

    #[test]
    fn ttl_upper_bound() {
        let err = DedupeConfig::from_toml("[retention]\nttl_hours = 9223372036854775807").unwrap_err();
        assert!(matches!(err, DedupeError::ConfigValidation(_)), "{err}");
        assert!(err.to_string().contains("at most 87600"), "{err}");

        let at_cap = format!("[retention]\nttl_hours = {MAX_TTL_HOURS}");
        let config = DedupeConfig::from_toml(&at_cap).unwrap();
        assert_eq!(config.retention.ttl_hours, Some(MAX_TTL_HOURS));
    }

    #[test]
    fn reject_unknown_source_name() {
        let err = DedupeConfig::from_toml(r#"source_order = ["gumtree"]"#).unwrap_err();
        assert!(matches!(err, DedupeError::ConfigParse(_)));
    }

    #[test]
    fn reject_typo_in_strategy() {
        let err = DedupeConfig::from_toml("[matching]\nstrategy = \"first\"");
        assert!(err.is_err(), "typo in strategy should fail deserialization");
    }
}
