//! Pool building and rate aggregation.
//!
//! A pool is the drawable view of one gacha catalog at one moment:
//!
//! 1. Remaining stock is resolved for every item.
//! 2. Rarity rates are resolved (explicit rates, plus the auto-adjust tier
//!    absorbing whatever mass is left unassigned).
//! 3. Rarities with a nonzero rate but no item in stock hand their mass
//!    to a single target rarity, and a [`RateRedistribution`] records it.
//! 4. Each in-stock item gets `rate × weight / rarity total weight`.
//!
//! Out-of-stock items stay in the pool's item list (complete sets and
//! guarantee overrides can still reach them), but they never belong to a
//! rarity group and their probability is zero.

use crate::catalog::{GachaCatalog, RarityDefinition, RarityTable};
use crate::id::{GachaId, ItemId, RarityId};
use crate::stock::{normalize_stock_cap, resolve_remaining_stock, IssuedCounts};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Draw weight of a pickup item.
pub const PICKUP_WEIGHT: u32 = 2;
/// Draw weight of a regular item.
pub const NORMAL_WEIGHT: u32 = 1;

const MIN_FRACTION_DIGITS: usize = 2;
const MAX_FRACTION_DIGITS: usize = 10;

/// An item as it sits in a pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDefinition {
    pub item_id: ItemId,
    pub name: String,
    pub rarity_id: RarityId,
    pub rarity_label: String,
    pub rarity_color: Option<String>,
    /// Effective emit rate of the item's rarity after redistribution.
    pub rarity_emit_rate: f64,
    /// Probability of drawing this item on a single random pull.
    pub probability: f64,
    /// `probability` as a percentage string, zero padded.
    pub probability_label: String,
    pub pickup: bool,
    pub draw_weight: u32,
    /// Configured lifetime cap. `None` means unlimited.
    pub stock_cap: Option<u64>,
    /// Stock left to issue. `None` means unlimited.
    pub remaining_stock: Option<u64>,
}

impl ItemDefinition {
    pub fn is_in_stock(&self) -> bool {
        self.remaining_stock != Some(0)
    }
}

/// The in-stock members of one rarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RarityGroup {
    pub rarity_id: RarityId,
    pub label: String,
    pub color: Option<String>,
    pub emit_rate: f64,
    pub item_count: usize,
    pub total_weight: u32,
    pub items: Vec<ItemId>,
}

/// Which rule picked the target of a redistribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedistributionStrategy {
    /// The auto-adjust rarity still had stock and absorbed the mass.
    #[serde(rename = "auto-adjust")]
    AutoAdjust,
    /// The lowest in-stock tier in sort order absorbed the mass.
    #[serde(rename = "next-highest")]
    NextHighest,
}

/// Probability mass moved away from depleted rarities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRedistribution {
    pub target_rarity_id: RarityId,
    pub source_rarity_ids: Vec<RarityId>,
    pub total_missing_rate: f64,
    pub strategy: RedistributionStrategy,
}

/// The drawable view of one gacha.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GachaPool {
    pub gacha_id: GachaId,
    /// Every catalog item in catalog order, including depleted ones.
    pub items: Vec<ItemDefinition>,
    /// Groups for rarities with at least one in-stock item.
    pub rarity_groups: BTreeMap<RarityId, RarityGroup>,
    /// Rarity ids in sort order.
    pub rarity_order: Vec<RarityId>,
    pub redistributions: Vec<RateRedistribution>,
    pub fraction_digits: usize,
}

impl GachaPool {
    /// Look up an item by id.
    pub fn item(&self, item_id: &ItemId) -> Option<&ItemDefinition> {
        self.items.iter().find(|item| &item.item_id == item_id)
    }

    /// Items that a weighted random draw may select.
    pub fn drawable_items(&self) -> impl Iterator<Item = &ItemDefinition> {
        self.items.iter().filter(|item| item.is_in_stock())
    }

    /// Every catalog member of a rarity, in stock or not.
    pub fn items_of_rarity<'a>(
        &'a self,
        rarity_id: &'a RarityId,
    ) -> impl Iterator<Item = &'a ItemDefinition> + 'a {
        self.items.iter().filter(move |item| &item.rarity_id == rarity_id)
    }

    /// Number of items one complete execution covers.
    pub fn complete_item_count(&self, include_out_of_stock: bool) -> usize {
        if include_out_of_stock {
            self.items.len()
        } else {
            self.drawable_items().count()
        }
    }
}

/// Fraction digits needed to display every configured rate as a percentage.
///
/// Always between 2 and 10.
///
/// # Examples
///
/// ```rust
/// use gachaplan::catalog::RarityDefinition;
/// use gachaplan::pool::infer_rate_fraction_digits;
///
/// let rarities = vec![
///     RarityDefinition::new("SSR", "SSR").with_rate(0.00125),
///     RarityDefinition::new("SR", "SR").with_rate(0.1),
/// ];
/// assert_eq!(infer_rate_fraction_digits(&rarities), 3); // 0.125%
/// ```
pub fn infer_rate_fraction_digits<'a>(
    rarities: impl IntoIterator<Item = &'a RarityDefinition>,
) -> usize {
    rarities
        .into_iter()
        .filter_map(RarityDefinition::configured_rate)
        .map(|rate| {
            let scale = 10f64.powi(MAX_FRACTION_DIGITS as i32);
            let percent = (rate * 100.0 * scale).round() / scale;
            let text = format!("{percent}");
            text.split_once('.')
                .map(|(_, fraction)| fraction.trim_end_matches('0').len())
                .unwrap_or(0)
        })
        .fold(MIN_FRACTION_DIGITS, usize::max)
        .min(MAX_FRACTION_DIGITS)
}

/// Format a probability as a zero padded percentage.
pub fn format_probability(probability: f64, fraction_digits: usize) -> String {
    format!("{:.*}%", fraction_digits, probability * 100.0)
}

/// Build pools for several gachas.
///
/// `fraction_digits` defaults to [`infer_rate_fraction_digits`] over
/// `rarities`. `issued` defaults to nothing issued.
///
/// # Examples
///
/// ```rust
/// use gachaplan::catalog::{CatalogItem, GachaCatalog, RarityDefinition, RarityTable};
/// use gachaplan::{build_gacha_pools, GachaId};
///
/// let mut rarities = RarityTable::new();
/// rarities.insert("SSR".into(), RarityDefinition::new("SSR", "SSR").with_rate(0.1).with_sort_order(0));
/// rarities.insert("R".into(), RarityDefinition::new("R", "Rare").with_sort_order(1));
///
/// let catalog = GachaCatalog::new("g")
///     .with_item(CatalogItem::new("star", "Star", "SSR").pickup())
///     .with_item(CatalogItem::new("moon", "Moon", "SSR"))
///     .with_item(CatalogItem::new("rock", "Rock", "R"));
///
/// let pools = build_gacha_pools(&[catalog], &rarities, None, None);
/// let pool = &pools[&GachaId::from_str("g")];
///
/// // R absorbs the unassigned 90%
/// assert!((pool.items[2].probability - 0.9).abs() < 1e-12);
/// // The pickup item gets two thirds of the SSR mass
/// assert!((pool.items[0].probability - 0.1 * 2.0 / 3.0).abs() < 1e-12);
/// ```
pub fn build_gacha_pools(
    catalogs: &[GachaCatalog],
    rarities: &RarityTable,
    fraction_digits: Option<usize>,
    issued: Option<&IssuedCounts>,
) -> BTreeMap<GachaId, GachaPool> {
    let digits = fraction_digits.unwrap_or_else(|| infer_rate_fraction_digits(rarities.values()));
    let nothing_issued = IssuedCounts::new();
    let issued = issued.unwrap_or(&nothing_issued);
    catalogs
        .iter()
        .map(|catalog| {
            let pool = build_gacha_pool(catalog, rarities, digits, issued);
            (pool.gacha_id.clone(), pool)
        })
        .collect()
}

/// Per-rarity stock tallies gathered while walking the catalog.
#[derive(Default)]
struct RarityTally {
    in_stock_count: usize,
    total_weight: u32,
    members: Vec<ItemId>,
}

/// Build the pool for a single gacha.
pub fn build_gacha_pool(
    catalog: &GachaCatalog,
    rarities: &RarityTable,
    fraction_digits: usize,
    issued: &IssuedCounts,
) -> GachaPool {
    let rarity_order = catalog.sorted_rarities(rarities);

    let mut items: Vec<ItemDefinition> = catalog
        .items
        .iter()
        .map(|item| {
            let rarity = rarities.get(&item.rarity_id);
            ItemDefinition {
                item_id: item.item_id.clone(),
                name: item.name.clone(),
                rarity_id: item.rarity_id.clone(),
                rarity_label: rarity
                    .map(|r| r.label.clone())
                    .unwrap_or_else(|| item.rarity_id.to_string()),
                rarity_color: rarity.and_then(|r| r.color.clone()),
                rarity_emit_rate: 0.0,
                probability: 0.0,
                probability_label: String::new(),
                pickup: item.pickup_target,
                draw_weight: if item.pickup_target {
                    PICKUP_WEIGHT
                } else {
                    NORMAL_WEIGHT
                },
                stock_cap: normalize_stock_cap(item.stock_count),
                remaining_stock: resolve_remaining_stock(&item.item_id, item.stock_count, issued),
            }
        })
        .collect();

    let mut tallies: BTreeMap<RarityId, RarityTally> = BTreeMap::new();
    for item in items.iter().filter(|item| item.is_in_stock()) {
        let tally = tallies.entry(item.rarity_id.clone()).or_default();
        tally.in_stock_count += 1;
        tally.total_weight += item.draw_weight;
        tally.members.push(item.item_id.clone());
    }
    let in_stock = |id: &RarityId| tallies.get(id).is_some_and(|t| t.in_stock_count > 0);

    let auto_adjust = find_auto_adjust_rarity(&rarity_order, rarities);
    let mut rates = resolve_base_rates(&rarity_order, rarities, auto_adjust.as_ref());

    let mut redistributions = Vec::new();
    let sources: Vec<RarityId> = rarity_order
        .iter()
        .filter(|id| rates.get(*id).is_some_and(|rate| *rate > 0.0) && !in_stock(*id))
        .cloned()
        .collect();
    if !sources.is_empty() {
        let target = match auto_adjust.as_ref().filter(|id| in_stock(*id)) {
            Some(id) => Some((id.clone(), RedistributionStrategy::AutoAdjust)),
            None => rarity_order
                .iter()
                .rev()
                .find(|id| in_stock(*id))
                .map(|id| (id.clone(), RedistributionStrategy::NextHighest)),
        };
        if let Some((target_id, strategy)) = target {
            let total_missing_rate: f64 = sources.iter().filter_map(|id| rates.get(id)).sum();
            for id in &sources {
                rates.insert(id.clone(), 0.0);
            }
            *rates.entry(target_id.clone()).or_insert(0.0) += total_missing_rate;
            tracing::debug!(
                gacha = %catalog.gacha_id,
                target = %target_id,
                sources = sources.len(),
                total_missing_rate,
                ?strategy,
                "redistributed rarity rate"
            );
            redistributions.push(RateRedistribution {
                target_rarity_id: target_id,
                source_rarity_ids: sources,
                total_missing_rate,
                strategy,
            });
        }
    }

    for item in &mut items {
        let rate = rates.get(&item.rarity_id).copied().unwrap_or(0.0);
        item.rarity_emit_rate = rate;
        item.probability = match tallies.get(&item.rarity_id) {
            Some(tally) if item.is_in_stock() && tally.total_weight > 0 => {
                rate * f64::from(item.draw_weight) / f64::from(tally.total_weight)
            }
            _ => 0.0,
        };
        item.probability_label = format_probability(item.probability, fraction_digits);
    }

    let rarity_groups = tallies
        .into_iter()
        .map(|(rarity_id, tally)| {
            let rarity = rarities.get(&rarity_id);
            let group = RarityGroup {
                label: rarity
                    .map(|r| r.label.clone())
                    .unwrap_or_else(|| rarity_id.to_string()),
                color: rarity.and_then(|r| r.color.clone()),
                emit_rate: rates.get(&rarity_id).copied().unwrap_or(0.0),
                item_count: tally.in_stock_count,
                total_weight: tally.total_weight,
                items: tally.members,
                rarity_id: rarity_id.clone(),
            };
            (rarity_id, group)
        })
        .collect();

    GachaPool {
        gacha_id: catalog.gacha_id.clone(),
        items,
        rarity_groups,
        rarity_order,
        redistributions,
        fraction_digits,
    }
}

/// The rarity that absorbs unassigned probability mass.
///
/// An explicit `auto_adjust = true` wins. Without one, the lowest-sorted
/// rarity with no configured rate is used. "Lowest" means the lowest tier,
/// i.e. the one with the largest `sort_order` (sort order runs from the
/// rarest tier down), so untagged tiers above it get a rate of zero.
fn find_auto_adjust_rarity(rarity_order: &[RarityId], rarities: &RarityTable) -> Option<RarityId> {
    let explicit = rarity_order
        .iter()
        .find(|id| rarities.get(*id).and_then(|r| r.auto_adjust) == Some(true));
    if explicit.is_some() {
        return explicit.cloned();
    }
    rarity_order
        .iter()
        .rev()
        .find(|id| rarities.get(*id).and_then(RarityDefinition::configured_rate).is_none())
        .cloned()
}

fn resolve_base_rates(
    rarity_order: &[RarityId],
    rarities: &RarityTable,
    auto_adjust: Option<&RarityId>,
) -> BTreeMap<RarityId, f64> {
    let mut rates: BTreeMap<RarityId, f64> = rarity_order
        .iter()
        .map(|id| {
            let rate = rarities
                .get(id)
                .and_then(RarityDefinition::configured_rate)
                .unwrap_or(0.0);
            (id.clone(), rate)
        })
        .collect();

    if let Some(id) = auto_adjust {
        let explicit = rarities.get(id).and_then(RarityDefinition::configured_rate);
        if explicit.is_none() {
            let assigned: f64 = rates.values().sum();
            rates.insert(id.clone(), (1.0 - assigned).max(0.0));
        }
    }
    rates
}
