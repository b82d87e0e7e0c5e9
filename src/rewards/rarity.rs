//! Rarity tier tables: drop weights and upgrade transition chances.

use crate::types::RarityTier;

/// Base drop weight per tier (1..=5). Sums to 1.0.
pub const DROP_WEIGHTS: [f64; 5] = [0.7992, 0.1598, 0.032, 0.0064, 0.0026];

/// Chance that a single item of rarity `row + 1` upgrades into rarity
/// `col + 1`.
pub const BASE_UPGRADE_CHANCES: [[f64; 5]; 5] = [
    [0.5, 0.2, 0.1, 0.05, 0.002],
    [0.2, 0.5, 0.2, 0.1, 0.01],
    [0.1, 0.2, 0.5, 0.2, 0.05],
    [0.05, 0.1, 0.2, 0.5, 0.1],
    [0.002, 0.01, 0.05, 0.1, 0.5],
];

/// Each additional contributed item counts for less.
pub const DIMINISHING_RATE: f64 = 0.9;

pub fn drop_weight(tier: RarityTier) -> f64 {
    DROP_WEIGHTS[tier.index()]
}

pub fn upgrade_chance(from: RarityTier, to: RarityTier) -> f64 {
    BASE_UPGRADE_CHANCES[from.index()][to.index()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_weights_sum_to_one() {
        let total: f64 = DROP_WEIGHTS.iter().sum();
        assert!((total - 1.0).abs() < 1e-9, "weights sum to {}", total);
    }

    #[test]
    fn test_same_tier_upgrade_is_coin_toss() {
        for tier in 1..=5 {
            let tier = RarityTier(tier);
            assert_eq!(upgrade_chance(tier, tier), 0.5);
        }
    }

    #[test]
    fn test_long_jumps_are_rare() {
        assert_eq!(upgrade_chance(RarityTier(1), RarityTier(5)), 0.002);
        assert_eq!(upgrade_chance(RarityTier(5), RarityTier(1)), 0.002);
    }
}
