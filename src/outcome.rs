//! Execution results.
//!
//! Individual draws are recorded as [`DrawInstance`]s while a plan
//! executes, then folded into one [`DrawnItem`] per item for the result.

use crate::error::{DrawError, DrawWarning};
use crate::id::{ItemId, RarityId};
use crate::plan::DrawPlan;
use crate::pool::GachaPool;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A single draw. Lives only for the duration of one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawInstance {
    pub item_id: ItemId,
    pub rarity_id: RarityId,
    pub was_guaranteed: bool,
}

/// All draws of one item in a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawnItem {
    pub item_id: ItemId,
    pub rarity_id: RarityId,
    pub name: String,
    pub rarity_label: String,
    pub rarity_color: Option<String>,
    pub count: u64,
    /// How many of `count` came from guarantees.
    pub guaranteed_count: u64,
}

/// The outcome of executing a plan.
///
/// `points_spent` and `points_remainder` are taken from the plan as is.
/// `actual_total_pulls` is the number of draws made, which may be below
/// the plan's `total_pulls` when stock ran out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub plan: DrawPlan,
    /// Sorted by descending count, then by name.
    pub items: Vec<DrawnItem>,
    pub points_spent: f64,
    pub points_remainder: f64,
    pub actual_total_pulls: u64,
    pub complete_executions: u64,
    pub warnings: Vec<DrawWarning>,
    pub errors: Vec<DrawError>,
}

impl ExecutionResult {
    /// A result with no draws, carrying the plan's diagnostics.
    pub fn rejected(plan: DrawPlan) -> Self {
        Self {
            points_spent: 0.0,
            points_remainder: plan.points_remainder,
            actual_total_pulls: 0,
            complete_executions: 0,
            warnings: plan.warnings.clone(),
            errors: plan.errors.clone(),
            items: Vec::new(),
            plan,
        }
    }

    /// Whether the result has no terminal errors.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Sum of all item counts. Always equals `actual_total_pulls`.
    pub fn total_count(&self) -> u64 {
        self.items.iter().map(|item| item.count).sum()
    }

    /// Number of draws that came from guarantees.
    pub fn guaranteed_total(&self) -> u64 {
        self.items.iter().map(|item| item.guaranteed_count).sum()
    }

    /// The aggregated entry for an item, if it was drawn.
    pub fn item(&self, item_id: &ItemId) -> Option<&DrawnItem> {
        self.items.iter().find(|item| &item.item_id == item_id)
    }
}

/// Order names the way a person scanning a list would.
///
/// Case-insensitive first, then case-sensitive so the order is total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| a.cmp(b))
}

/// Fold draws into one entry per item.
///
/// Names and rarity labels come from `pool`. Draws of items missing from
/// the pool fall back to their ids.
pub fn aggregate_draws(pool: &GachaPool, draws: &[DrawInstance]) -> Vec<DrawnItem> {
    let mut tallies: BTreeMap<&ItemId, DrawnItem> = BTreeMap::new();
    for draw in draws {
        let entry = tallies.entry(&draw.item_id).or_insert_with(|| {
            let definition = pool.item(&draw.item_id);
            DrawnItem {
                item_id: draw.item_id.clone(),
                rarity_id: draw.rarity_id.clone(),
                name: definition
                    .map(|d| d.name.clone())
                    .unwrap_or_else(|| draw.item_id.to_string()),
                rarity_label: definition
                    .map(|d| d.rarity_label.clone())
                    .unwrap_or_else(|| draw.rarity_id.to_string()),
                rarity_color: definition.and_then(|d| d.rarity_color.clone()),
                count: 0,
                guaranteed_count: 0,
            }
        });
        entry.count += 1;
        if draw.was_guaranteed {
            entry.guaranteed_count += 1;
        }
    }

    let mut items: Vec<DrawnItem> = tallies.into_values().collect();
    items.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| compare_names(&a.name, &b.name))
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    items
}
