//! Case-opening draws.

use crate::errors::{EngineError, EngineResult};
use crate::rewards::rarity::{drop_weight, DROP_WEIGHTS};
use crate::types::{CaseTemplate, ItemInstance, RarityTier};
use chrono::{DateTime, Utc};
use rand::Rng;

/// Draw one item from a case: sample a rarity tier by cumulative weight, then
/// pick uniformly among the case's items of that tier. When the sampled tier
/// has no items in this case, a uniformly-chosen tier that does stands in.
/// Every draw stamps a fresh unique instance id, even for a template already
/// drawn.
pub fn draw_case_item<R: Rng + ?Sized>(
    case: &CaseTemplate,
    rng: &mut R,
    now: DateTime<Utc>,
) -> EngineResult<ItemInstance> {
    if case.items.is_empty() {
        return Err(EngineError::validation(format!(
            "Case '{}' has no items to draw",
            case.title
        )));
    }

    let grouped = case.items_by_rarity();
    let sampled = sample_tier(rng);

    let pool = match grouped.get(&sampled) {
        Some(pool) => pool,
        None => {
            // Fallback: uniform pick among the tiers actually present.
            let mut present: Vec<(&RarityTier, &Vec<&crate::types::ItemTemplate>)> =
                grouped.iter().collect();
            present.sort_by_key(|(tier, _)| **tier);
            present[rng.gen_range(0..present.len())].1
        }
    };

    let template = pool[rng.gen_range(0..pool.len())];
    Ok(ItemInstance::stamp(template, now))
}

/// Cumulative-weight sample over the fixed tier table.
fn sample_tier<R: Rng + ?Sized>(rng: &mut R) -> RarityTier {
    let roll: f64 = rng.gen();
    let mut cumulative = 0.0;
    for tier in RarityTier::MIN..=RarityTier::MAX {
        let tier = RarityTier(tier);
        cumulative += drop_weight(tier);
        if roll <= cumulative {
            return tier;
        }
    }
    // Floating-point slack at the top of the table lands on the rarest tier.
    debug_assert!((DROP_WEIGHTS.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    RarityTier(RarityTier::MAX)
}
