//! Tier classification
//!
//! Maps an affinity ratio to a tier name. Thresholds are evaluated from the
//! highest down; the first tier whose minimum ratio is at or below the input
//! wins. Ratios at or below zero always map to the zero tier.

use accel_common::config::{AccelerationConfig, TierSpec};

/// Ordered threshold table plus the distinguished zero tier
#[derive(Debug, Clone)]
pub struct TierTable {
    /// Strictly descending by `min_ratio`
    tiers: Vec<TierSpec>,
    zero_tier: String,
}

impl TierTable {
    pub fn new(mut tiers: Vec<TierSpec>, zero_tier: &str) -> Self {
        tiers.sort_by(|a, b| b.min_ratio.total_cmp(&a.min_ratio));
        Self {
            tiers,
            zero_tier: zero_tier.to_string(),
        }
    }

    pub fn from_config(config: &AccelerationConfig) -> Self {
        Self::new(config.tiers.clone(), &config.zero_tier)
    }

    pub fn zero_tier(&self) -> &str {
        &self.zero_tier
    }

    /// Tier name for `ratio`
    pub fn classify(&self, ratio: f64) -> &str {
        if ratio.is_nan() || ratio <= 0.0 {
            return &self.zero_tier;
        }

        for tier in &self.tiers {
            if ratio >= tier.min_ratio {
                return &tier.name;
            }
        }

        // Positive but under the lowest threshold
        self.tiers
            .last()
            .map(|t| t.name.as_str())
            .unwrap_or(&self.zero_tier)
    }

    /// Position of a tier from the bottom: zero tier is 0, highest tier is `len`
    pub fn rank(&self, name: &str) -> Option<usize> {
        if name == self.zero_tier {
            return Some(0);
        }
        self.tiers
            .iter()
            .position(|t| t.name == name)
            .map(|idx| self.tiers.len() - idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accel_common::config::default_tiers;

    fn table() -> TierTable {
        TierTable::new(default_tiers(), "Stationary")
    }

    #[test]
    fn test_two_thirds_is_supersonic() {
        assert_eq!(table().classify(10.0 / 15.0), "Supersonic");
    }

    #[test]
    fn test_boundaries_inclusive() {
        let table = table();
        assert_eq!(table.classify(0.90), "Light-speed");
        assert_eq!(table.classify(0.70), "Hypersonic");
        assert_eq!(table.classify(0.50), "Supersonic");
        assert_eq!(table.classify(0.30), "Speeding");
        assert_eq!(table.classify(0.15), "Cruising");
        assert_eq!(table.classify(0.01), "Crawling");
        assert_eq!(table.classify(1.0), "Light-speed");
    }

    #[test]
    fn test_zero_and_negative_map_to_zero_tier() {
        let table = table();
        assert_eq!(table.classify(0.0), "Stationary");
        assert_eq!(table.classify(-0.4), "Stationary");
        assert_eq!(table.classify(f64::NAN), "Stationary");
    }

    #[test]
    fn test_tiny_positive_ratio_gets_lowest_tier() {
        assert_eq!(table().classify(0.005), "Crawling");
    }

    #[test]
    fn test_classification_is_monotonic() {
        let table = table();
        let mut previous = 0;
        for step in -10..=1000 {
            let ratio = step as f64 / 1000.0;
            let rank = table.rank(table.classify(ratio)).unwrap();
            assert!(rank >= previous, "rank dropped at ratio {}", ratio);
            previous = rank;
        }
        assert_eq!(previous, 6);
    }

    #[test]
    fn test_unsorted_input_is_ordered() {
        let table = TierTable::new(
            vec![TierSpec::new(0.2, "Low"), TierSpec::new(0.8, "High")],
            "None",
        );
        assert_eq!(table.classify(0.9), "High");
        assert_eq!(table.classify(0.5), "Low");
        assert_eq!(table.rank("High"), Some(2));
        assert_eq!(table.rank("None"), Some(0));
        assert_eq!(table.rank("Unknown"), None);
    }
}
