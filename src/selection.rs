//! Weighted item selection.
//!
//! Weights come from the candidate set as a whole:
//!
//! 1. display probabilities, if any candidate has a positive one
//! 2. otherwise draw weights (2 for pickup, 1 for regular)
//! 3. otherwise uniform
//!
//! A uniform value is clamped to `[0, 0.9999999999]`, scaled by the total
//! weight and resolved with a cumulative-sum scan.

use crate::pool::ItemDefinition;
use crate::random::RandomSource;

/// Largest uniform value the selector will use.
pub const MAX_ROLL: f64 = 0.999_999_999_9;

fn candidate_weights(candidates: &[&ItemDefinition]) -> Vec<f64> {
    let by_probability: Vec<f64> = candidates
        .iter()
        .map(|item| {
            if item.probability.is_finite() && item.probability > 0.0 {
                item.probability
            } else {
                0.0
            }
        })
        .collect();
    if by_probability.iter().sum::<f64>() > 0.0 {
        return by_probability;
    }
    let by_weight: Vec<f64> = candidates
        .iter()
        .map(|item| f64::from(item.draw_weight))
        .collect();
    if by_weight.iter().sum::<f64>() > 0.0 {
        return by_weight;
    }
    vec![1.0; candidates.len()]
}

/// Pick one candidate.
///
/// Returns `None` only when `candidates` is empty.
///
/// # Examples
///
/// ```rust
/// use gachaplan::catalog::{CatalogItem, GachaCatalog, RarityTable};
/// use gachaplan::pool::build_gacha_pool;
/// use gachaplan::random::ConstantRandom;
/// use gachaplan::selection::select_weighted;
/// use gachaplan::IssuedCounts;
///
/// let catalog = GachaCatalog::new("g")
///     .with_item(CatalogItem::new("a", "A", "R"))
///     .with_item(CatalogItem::new("b", "B", "R").pickup());
/// let pool = build_gacha_pool(&catalog, &RarityTable::new(), 2, &IssuedCounts::new());
/// let candidates: Vec<_> = pool.items.iter().collect();
///
/// // "b" is a pickup item and holds two thirds of the mass
/// // so 0.5 lands on it.
/// let picked = select_weighted(&candidates, &mut ConstantRandom(0.5)).unwrap();
/// assert_eq!(picked.item_id.as_str(), "b");
/// ```
pub fn select_weighted<'a, R>(
    candidates: &[&'a ItemDefinition],
    rng: &mut R,
) -> Option<&'a ItemDefinition>
where
    R: RandomSource + ?Sized,
{
    let last = *candidates.last()?;
    let weights = candidate_weights(candidates);
    let total: f64 = weights.iter().sum();

    let roll = rng.next_f64();
    let roll = if roll.is_finite() {
        roll.clamp(0.0, MAX_ROLL)
    } else {
        0.0
    };
    let target = roll * total;

    let mut cumulative = 0.0;
    for (item, weight) in candidates.iter().zip(&weights) {
        cumulative += weight;
        if target < cumulative {
            return Some(*item);
        }
    }
    Some(last)
}
