//! Rarity-upgrade gamble.

use crate::rewards::rarity::{upgrade_chance, DIMINISHING_RATE};
use crate::types::RarityTier;
use rand::Rng;

/// Combined success probability for a set of contributed items. Each item
/// multiplies in its base transition chance scaled by 0.9^position, so later
/// items contribute less.
pub fn upgrade_success_chance(sources: &[RarityTier], target: RarityTier) -> f64 {
    let mut total = 1.0;
    let mut diminishing = 1.0;
    for rarity in sources {
        total *= upgrade_chance(*rarity, target) * diminishing;
        diminishing *= DIMINISHING_RATE;
    }
    if sources.is_empty() {
        0.0
    } else {
        total
    }
}

/// One uniform draw against the combined chance.
pub fn roll_upgrade<R: Rng + ?Sized>(
    sources: &[RarityTier],
    target: RarityTier,
    rng: &mut R,
) -> bool {
    rng.gen::<f64>() < upgrade_success_chance(sources, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_no_sources_never_succeeds() {
        assert_eq!(upgrade_success_chance(&[], RarityTier(3)), 0.0);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(!roll_upgrade(&[], RarityTier(3), &mut rng));
    }

    #[test]
    fn test_single_item_uses_base_chance() {
        let chance = upgrade_success_chance(&[RarityTier(2)], RarityTier(3));
        assert_eq!(chance, 0.2);
    }

    #[test]
    fn test_later_items_are_diminished() {
        // Two same-tier items: 0.5 * (0.5 * 0.9) = 0.225.
        let chance = upgrade_success_chance(&[RarityTier(3), RarityTier(3)], RarityTier(3));
        assert!((chance - 0.225).abs() < 1e-12);
    }

    #[test]
    fn test_adding_items_lowers_combined_chance() {
        let one = upgrade_success_chance(&[RarityTier(4)], RarityTier(5));
        let two = upgrade_success_chance(&[RarityTier(4), RarityTier(4)], RarityTier(5));
        assert!(two < one);
    }

    #[test]
    fn test_roll_rate_approximates_chance() {
        let sources = [RarityTier(3)];
        let target = RarityTier(4);
        let expected = upgrade_success_chance(&sources, target);

        let mut rng = StdRng::seed_from_u64(31);
        let trials = 50_000;
        let successes = (0..trials)
            .filter(|_| roll_upgrade(&sources, target, &mut rng))
            .count();

        let observed = successes as f64 / trials as f64;
        assert!(
            (observed - expected).abs() < 0.01,
            "observed {} expected {}",
            observed,
            expected
        );
    }
}
