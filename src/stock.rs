//! Stock resolution.
//!
//! An item's stock is a cap on lifetime issuance. Remaining stock is the
//! cap minus everything already sitting in user inventories.

use crate::id::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Issued counts per item, one entry per user or inventory shard.
///
/// # Examples
///
/// ```rust
/// use gachaplan::{IssuedCounts, ItemId};
///
/// let mut issued = IssuedCounts::new();
/// issued.record("sword", 2.0);
/// issued.record("sword", 1.0);
/// issued.record("sword", f64::NAN); // ignored
/// assert_eq!(issued.total_for(&ItemId::from_str("sword")), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssuedCounts {
    counts: BTreeMap<ItemId, Vec<f64>>,
}

impl IssuedCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one inventory's count for an item.
    pub fn record(&mut self, item_id: impl Into<ItemId>, count: f64) {
        self.counts.entry(item_id.into()).or_default().push(count);
    }

    /// Sum of the usable contributions for an item.
    ///
    /// Non-finite and non-positive contributions are skipped. Fractional
    /// contributions are truncated.
    pub fn total_for(&self, item_id: &ItemId) -> u64 {
        self.counts
            .get(item_id)
            .map(|counts| {
                counts
                    .iter()
                    .filter(|count| count.is_finite() && **count > 0.0)
                    .map(|count| count.trunc() as u64)
                    .sum()
            })
            .unwrap_or(0)
    }
}

/// Normalize a configured stock cap.
///
/// Returns `None` (unlimited) when the cap is absent, non-finite or
/// negative. Fractional caps are floored.
pub fn normalize_stock_cap(configured: Option<f64>) -> Option<u64> {
    match configured {
        Some(cap) if cap.is_finite() && cap >= 0.0 => Some(cap.floor() as u64),
        _ => None,
    }
}

/// Remaining drawable stock for an item.
///
/// `None` means unlimited. Otherwise the result is the cap minus the
/// issued total, never below zero.
///
/// # Examples
///
/// ```rust
/// use gachaplan::{resolve_remaining_stock, IssuedCounts, ItemId};
///
/// let mut issued = IssuedCounts::new();
/// issued.record("a", 4.0);
/// let id = ItemId::from_str("a");
///
/// assert_eq!(resolve_remaining_stock(&id, Some(10.0), &issued), Some(6));
/// assert_eq!(resolve_remaining_stock(&id, Some(3.0), &issued), Some(0));
/// assert_eq!(resolve_remaining_stock(&id, None, &issued), None);
/// ```
pub fn resolve_remaining_stock(
    item_id: &ItemId,
    configured: Option<f64>,
    issued: &IssuedCounts,
) -> Option<u64> {
    let cap = normalize_stock_cap(configured)?;
    Some(cap.saturating_sub(issued.total_for(item_id)))
}
