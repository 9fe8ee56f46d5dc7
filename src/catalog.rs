//! Catalog and rarity snapshots.
//!
//! These are the shapes the surrounding application hands to the pool
//! builder. The engine does not interpret them beyond what pool building
//! needs, and it never keeps them between calls.

use crate::id::{GachaId, ItemId, RarityId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One item as authored in a gacha catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub item_id: ItemId,
    pub name: String,
    pub rarity_id: RarityId,
    /// Pickup items weigh twice as much as their rarity peers.
    #[serde(default)]
    pub pickup_target: bool,
    /// Lifetime issuance cap. Absent or invalid means unlimited.
    #[serde(default)]
    pub stock_count: Option<f64>,
}

impl CatalogItem {
    /// Create an unlimited, non-pickup item.
    pub fn new(
        item_id: impl Into<ItemId>,
        name: impl Into<String>,
        rarity_id: impl Into<RarityId>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            name: name.into(),
            rarity_id: rarity_id.into(),
            pickup_target: false,
            stock_count: None,
        }
    }

    /// Mark the item as a pickup target.
    pub fn pickup(mut self) -> Self {
        self.pickup_target = true;
        self
    }

    /// Cap the item's lifetime issuance.
    pub fn with_stock(mut self, stock: f64) -> Self {
        self.stock_count = Some(stock);
        self
    }
}

/// A rarity tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RarityDefinition {
    pub id: RarityId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub color: Option<String>,
    /// Probability mass of the tier in `[0, 1]`. `None` means "not set".
    #[serde(default)]
    pub emit_rate: Option<f64>,
    #[serde(default)]
    pub sort_order: Option<i64>,
    /// Explicitly marks the tier that absorbs unassigned probability mass.
    #[serde(default)]
    pub auto_adjust: Option<bool>,
}

impl RarityDefinition {
    /// Create a tier with no configured rate.
    pub fn new(id: impl Into<RarityId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            color: None,
            emit_rate: None,
            sort_order: None,
            auto_adjust: None,
        }
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.emit_rate = Some(rate);
        self
    }

    pub fn with_sort_order(mut self, sort_order: i64) -> Self {
        self.sort_order = Some(sort_order);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn auto_adjust(mut self) -> Self {
        self.auto_adjust = Some(true);
        self
    }

    /// The configured rate, if it is a usable number.
    pub fn configured_rate(&self) -> Option<f64> {
        self.emit_rate.filter(|rate| rate.is_finite() && *rate >= 0.0)
    }
}

/// All rarity entities known to the application, keyed by id.
pub type RarityTable = BTreeMap<RarityId, RarityDefinition>;

/// One gacha: its ordered items and ordered rarity ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GachaCatalog {
    pub gacha_id: GachaId,
    pub items: Vec<CatalogItem>,
    #[serde(default)]
    pub rarity_order: Vec<RarityId>,
}

impl GachaCatalog {
    pub fn new(gacha_id: impl Into<GachaId>) -> Self {
        Self {
            gacha_id: gacha_id.into(),
            items: Vec::new(),
            rarity_order: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: CatalogItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_rarity(mut self, rarity_id: impl Into<RarityId>) -> Self {
        self.rarity_order.push(rarity_id.into());
        self
    }

    /// Rarity ids in sort order.
    ///
    /// Ids from `rarity_order` come first in the order given, followed by
    /// any rarity only referenced by an item. The combined list is then
    /// stably sorted by `sort_order`, so unsorted tiers keep their
    /// position relative to each other.
    pub fn sorted_rarities(&self, rarities: &RarityTable) -> Vec<RarityId> {
        let mut ids: Vec<RarityId> = Vec::new();
        let referenced = self.items.iter().map(|item| &item.rarity_id);
        for id in self.rarity_order.iter().chain(referenced) {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids.sort_by_key(|id| {
            rarities
                .get(id)
                .and_then(|rarity| rarity.sort_order)
                .unwrap_or(i64::MAX)
        });
        ids
    }
}
