//! Brand rules and writer-lock configuration.

use rentsync_policy::OperationMode;
use serde::Deserialize;

use super::ConfigError;
use crate::domain::Brand;

/// Night-length range a brand accepts for new bookings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BrandRule {
    pub name: Brand,
    pub min_nights: u32,
    pub max_nights: u32,
}

impl BrandRule {
    pub fn accepts(&self, nights: i64) -> bool {
        nights >= i64::from(self.min_nights) && nights <= i64::from(self.max_nights)
    }
}

/// Check that brand night ranges are well formed, contiguous and disjoint.
pub fn validate_brand_rules(rules: &[BrandRule]) -> Result<(), ConfigError> {
    let mut sorted: Vec<&BrandRule> = rules.iter().collect();
    sorted.sort_by_key(|r| r.min_nights);

    for rule in &sorted {
        if rule.min_nights == 0 || rule.min_nights > rule.max_nights {
            return Err(ConfigError::InvalidNightRange {
                brand: rule.name.to_string(),
                min: rule.min_nights,
                max: rule.max_nights,
            });
        }
    }

    for (i, rule) in sorted.iter().enumerate() {
        if sorted[..i].iter().any(|r| r.name == rule.name) {
            return Err(ConfigError::DuplicateBrand(rule.name.to_string()));
        }
    }

    for pair in sorted.windows(2) {
        let (previous, next) = (pair[0], pair[1]);
        if next.min_nights <= previous.max_nights {
            return Err(ConfigError::OverlappingNightRanges {
                previous: previous.name.to_string(),
                next: next.name.to_string(),
            });
        }
        if previous.max_nights.checked_add(1).is_some_and(|end| next.min_nights > end) {
            return Err(ConfigError::NightRangeGap {
                previous: previous.name.to_string(),
                next: next.name.to_string(),
            });
        }
    }
    Ok(())
}

/// Writer-lock settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WriterLockConfig {
    /// Mode assumed for brands with no row in the shared mode table.
    pub default_mode: OperationMode,
    /// Upper bound on how stale a cached brand mode may be.
    pub mode_cache_ttl_ms: u64,
}

impl Default for WriterLockConfig {
    fn default() -> Self {
        Self {
            default_mode: OperationMode::Standalone,
            mode_cache_ttl_ms: 2_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str, min: u32, max: u32) -> BrandRule {
        BrandRule {
            name: Brand::new(name),
            min_nights: min,
            max_nights: max,
        }
    }

    #[test]
    fn test_contiguous_ranges_accepted() {
        let rules = vec![rule("monthly", 28, 365), rule("shortstay", 1, 27)];
        assert!(validate_brand_rules(&rules).is_ok());
        assert!(rules[1].accepts(27));
        assert!(!rules[1].accepts(28));
    }

    #[test]
    fn test_overlap_rejected() {
        let rules = vec![rule("shortstay", 1, 28), rule("monthly", 28, 365)];
        assert!(matches!(
            validate_brand_rules(&rules),
            Err(ConfigError::OverlappingNightRanges { .. })
        ));
    }

    #[test]
    fn test_gap_rejected() {
        let rules = vec![rule("shortstay", 1, 20), rule("monthly", 28, 365)];
        assert!(matches!(
            validate_brand_rules(&rules),
            Err(ConfigError::NightRangeGap { .. })
        ));
    }

    #[test]
    fn test_open_ended_range_at_u32_max() {
        let rules = vec![rule("shortstay", 1, 27), rule("monthly", 28, u32::MAX)];
        assert!(validate_brand_rules(&rules).is_ok());
        assert!(rules[1].accepts(i64::from(u32::MAX)));

        let rules = vec![rule("monthly", 1, u32::MAX), rule("longstay", u32::MAX, u32::MAX)];
        assert!(matches!(
            validate_brand_rules(&rules),
            Err(ConfigError::OverlappingNightRanges { .. })
        ));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let rules = vec![rule("monthly", 30, 28)];
        assert!(matches!(
            validate_brand_rules(&rules),
            Err(ConfigError::InvalidNightRange { .. })
        ));
    }

    #[test]
    fn test_duplicate_brand_rejected() {
        let rules = vec![rule("monthly", 1, 27), rule("Monthly", 28, 365)];
        assert!(matches!(
            validate_brand_rules(&rules),
            Err(ConfigError::DuplicateBrand(_))
        ));
    }

    #[test]
    fn test_writer_lock_defaults() {
        let config = WriterLockConfig::default();
        assert_eq!(config.default_mode, OperationMode::Standalone);
        assert_eq!(config.mode_cache_ttl_ms, 2_000);
    }
}
