//! Error and warning types for planning and execution.
//!
//! Nothing in this crate returns these through `Err` for expected domain
//! conditions. A plan or execution result carries them in-band:
//! `DrawError` values mean the result has zero pulls, `DrawWarning`
//! values mean the result still executed on a best-effort basis.

use crate::id::{ItemId, RarityId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal validation errors.
///
/// A plan or result carrying any of these never produces a draw.
///
/// # Examples
///
/// ```rust
/// use gachaplan::DrawError;
///
/// let err = DrawError::InvalidPoints(-5.0);
/// assert!(err.to_string().contains("-5"));
/// ```
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawError {
    /// The point budget was non-finite, zero or negative.
    #[error("Point budget must be a positive number, got {0}")]
    InvalidPoints(f64),

    /// The explicit pull count was non-finite or below one.
    #[error("Pull count must be a positive integer, got {0}")]
    InvalidPullCount(f64),

    /// Complete-set purchases happened but the catalog has no items, and
    /// nothing else could be bought.
    #[error("Complete-set purchase yields no pulls because the catalog has no items")]
    NoItemsForComplete,

    /// Neither a per-pull unit, a complete-set price nor a bundle is configured.
    #[error("No purchase settings are configured for this gacha")]
    NoPurchaseSettings,

    /// The budget or pull count asks for more pulls than one plan may hold.
    #[error("Plan would exceed the limit of {limit} pulls")]
    TooManyPulls { limit: u64 },

    /// Settings exist but the budget cannot buy a single pull.
    #[error("{points} points cannot buy any pull (cheapest option costs {cheapest})")]
    InsufficientPoints { points: f64, cheapest: f64 },
}

/// Non-terminal diagnostics.
///
/// Setting-normalization diagnostics describe dropped or defaulted input
/// entries. Execution diagnostics describe shortfalls the engine degraded
/// around.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawWarning {
    /// The per-pull unit was dropped.
    #[error("Per-pull setting ignored: {reason}")]
    PerPullDropped { reason: String },

    /// The complete-set price was dropped.
    #[error("Complete-set setting ignored: {reason}")]
    CompleteDropped { reason: String },

    /// A bundle entry was dropped.
    #[error("Bundle #{index} ignored: {reason}")]
    BundleDropped { index: usize, reason: String },

    /// A guarantee entry was dropped.
    #[error("Guarantee #{index} ignored: {reason}")]
    GuaranteeDropped { index: usize, reason: String },

    /// A guarantee quantity was present but invalid and fell back to one.
    #[error("Guarantee #{index} has an invalid quantity; using 1")]
    GuaranteeQuantityDefaulted { index: usize },

    /// Complete-set purchases were made against a catalog with no items.
    #[error("{executions} complete-set purchase(s) yield no items because the catalog is empty")]
    CompleteWithEmptyCatalog { executions: u64 },

    /// Points remain after every applicable purchase option was used.
    #[error("{remainder} point(s) remain unspent; no purchase option fits the remainder")]
    PointsUnspent { remainder: f64 },

    /// A guarantee could only allocate part of its quantity.
    #[error("Guarantee {guarantee_id} allocated {allocated} of {requested} draw(s)")]
    GuaranteeShortfall {
        guarantee_id: String,
        requested: u64,
        allocated: u64,
    },

    /// The guaranteed item exists in the catalog but has no stock left.
    #[error("Guaranteed item {item_id} is out of stock")]
    GuaranteeItemDepleted { item_id: ItemId },

    /// The guaranteed item is not in this gacha's catalog.
    #[error("Guaranteed item {item_id} is not in the catalog; drawing from rarity {rarity_id} instead")]
    GuaranteeItemMissing { item_id: ItemId, rarity_id: RarityId },

    /// The guaranteed rarity has catalog members but none are in stock.
    #[error("Every item of rarity {rarity_id} is out of stock")]
    GuaranteeRarityDepleted { rarity_id: RarityId },

    /// The guaranteed rarity has no catalog members at all.
    #[error("Rarity {rarity_id} has no items in the catalog")]
    GuaranteeRarityMissing { rarity_id: RarityId },

    /// Stock ran out before the planned number of draws was reached.
    #[error("Stock ran out: {produced} of {planned} planned draw(s) were made")]
    StockExhausted { planned: u64, produced: u64 },
}
