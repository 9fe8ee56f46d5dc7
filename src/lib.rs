//! # gachaplan - Deterministic Gacha Draw Planning and Execution
//!
//! An engine that turns a point budget (or an explicit pull count) and
//! user-authored purchase settings into a concrete set of drawn items:
//!
//! - **Greedy planning**: complete sets, then bundles, then per-pull units
//! - **Stock-aware pools**: depleted items leave the pool and their
//!   rarity's probability mass moves to another tier
//! - **Guarantees**: per-rarity or per-item, gated by pull thresholds
//! - **Deterministic**: every random number comes from the caller
//!
//! ## Pipeline
//!
//! ```text
//! [RawPurchaseSettings] → normalize → [DrawPlan] ─┐
//!                                                  ├→ [DrawEngine] → [ExecutionResult]
//! [GachaCatalog] + [IssuedCounts] → [GachaPool] ──┘
//! ```
//!
//! The engine performs no I/O and holds no state between calls. Expected
//! domain conditions never surface as `Err`: terminal problems are listed
//! in `errors` (and nothing is drawn), everything else in `warnings`.
//!
//! ## Example
//!
//! ```rust
//! use gachaplan::catalog::{CatalogItem, GachaCatalog, RarityDefinition, RarityTable};
//! use gachaplan::random::SequenceRandom;
//! use gachaplan::*;
//!
//! let mut rarities = RarityTable::new();
//! rarities.insert("SSR".into(), RarityDefinition::new("SSR", "SSR").with_rate(0.03).with_sort_order(0));
//! rarities.insert("R".into(), RarityDefinition::new("R", "Rare").with_sort_order(1));
//!
//! let catalog = GachaCatalog::new("spring")
//!     .with_rarity("SSR")
//!     .with_rarity("R")
//!     .with_item(CatalogItem::new("ssr-1", "Sakura", "SSR").with_stock(5.0))
//!     .with_item(CatalogItem::new("r-1", "Petal", "R"));
//! let pools = build_gacha_pools(&[catalog], &rarities, None, None);
//! let pool = &pools[&GachaId::from_str("spring")];
//!
//! let settings: RawPurchaseSettings = serde_json::from_str(r#"{
//!     "perPull": {"price": 100},
//!     "guarantees": [{"rarityId": "SSR", "threshold": 10}]
//! }"#).unwrap();
//!
//! let plan = calculate_draw_plan(1000.0, &settings, pool.items.len(), None);
//! assert_eq!(plan.total_pulls, 10);
//!
//! let mut rng = SequenceRandom::new(vec![0.5]);
//! let result = DrawEngine::new(pool, ExecutionOptions::default()).execute(plan, &mut rng);
//! assert_eq!(result.actual_total_pulls, 10);
//! assert_eq!(result.guaranteed_total(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`id`] - Item, rarity and gacha identifiers
//! - [`catalog`] - Catalog and rarity snapshots
//! - [`stock`] - Remaining stock resolution
//! - [`settings`] - Purchase setting normalization
//! - [`plan`] - Draw plan calculation
//! - [`pool`] - Pool building and rate redistribution
//! - [`selection`] - Weighted item selection
//! - [`engine`] - Plan execution
//! - [`outcome`] - Execution results
//! - [`options`] - Execution flags
//! - [`random`] - Random sources
//! - [`error`] - Errors and warnings

pub mod catalog;
pub mod engine;
pub mod error;
pub mod id;
pub mod options;
pub mod outcome;
pub mod plan;
pub mod pool;
pub mod random;
pub mod selection;
pub mod settings;
pub mod stock;

// Re-export main types for convenience
pub use engine::{execute_draw_plan, execute_pull_count, DrawEngine, StockLedger};
pub use error::{DrawError, DrawWarning};
pub use id::{GachaId, ItemId, RarityId};
pub use options::ExecutionOptions;
pub use outcome::{DrawInstance, DrawnItem, ExecutionResult};
pub use plan::{
    calculate_draw_plan, BundleApplication, DrawPlan, PerPullPurchase, MAX_TOTAL_PULLS,
};
pub use pool::{
    build_gacha_pool, build_gacha_pools, GachaPool, ItemDefinition, RarityGroup,
    RateRedistribution, RedistributionStrategy,
};
pub use random::RandomSource;
pub use settings::{
    normalize_purchase_settings, NormalizedPurchaseSettings, RawPurchaseSettings,
};
pub use stock::{resolve_remaining_stock, IssuedCounts};
