//! Draw execution engine.
//!
//! Executes a [`DrawPlan`] against a [`GachaPool`] in a fixed phase order:
//!
//! ```text
//! [complete sets] → [guarantees] → [weighted random] → [aggregation]
//! ```
//!
//! All per-call state lives in a [`StockLedger`] created for the call and
//! threaded through every phase. Nothing is shared between calls, and all
//! randomness comes from the caller's [`RandomSource`].

use crate::error::{DrawError, DrawWarning};
use crate::id::{ItemId, RarityId};
use crate::options::ExecutionOptions;
use crate::outcome::{aggregate_draws, DrawInstance, ExecutionResult};
use crate::plan::{DrawPlan, MAX_TOTAL_PULLS};
use crate::pool::{GachaPool, ItemDefinition};
use crate::random::RandomSource;
use crate::selection::select_weighted;
use crate::settings::{
    applicable_guarantees, normalize_purchase_settings, GuaranteeSetting, GuaranteeTarget,
    RawPurchaseSettings,
};
use std::collections::BTreeMap;

/// Remaining stock and recorded draws for one execution.
#[derive(Debug, Clone)]
pub struct StockLedger {
    remaining: BTreeMap<ItemId, Option<u64>>,
    draws: Vec<DrawInstance>,
    warnings: Vec<DrawWarning>,
}

impl StockLedger {
    /// Snapshot the pool's remaining stock.
    pub fn new(pool: &GachaPool) -> Self {
        Self {
            remaining: pool
                .items
                .iter()
                .map(|item| (item.item_id.clone(), item.remaining_stock))
                .collect(),
            draws: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Remaining stock for an item. `None` means unlimited.
    pub fn remaining(&self, item_id: &ItemId) -> Option<u64> {
        self.remaining.get(item_id).copied().flatten()
    }

    pub fn is_in_stock(&self, item_id: &ItemId) -> bool {
        self.remaining.get(item_id).copied() != Some(Some(0))
    }

    /// Record a draw and take one unit of stock, if the item is capped.
    pub fn issue(&mut self, item: &ItemDefinition, was_guaranteed: bool) {
        if let Some(Some(stock)) = self.remaining.get_mut(&item.item_id) {
            *stock = stock.saturating_sub(1);
        }
        self.draws.push(DrawInstance {
            item_id: item.item_id.clone(),
            rarity_id: item.rarity_id.clone(),
            was_guaranteed,
        });
    }

    /// Number of draws recorded so far.
    pub fn draw_count(&self) -> u64 {
        self.draws.len() as u64
    }

    pub fn draws(&self) -> &[DrawInstance] {
        &self.draws
    }

    fn warn(&mut self, warning: DrawWarning) {
        if !self.warnings.contains(&warning) {
            tracing::warn!(%warning, "draw execution degraded");
            self.warnings.push(warning);
        }
    }
}

/// Executes plans against one pool.
///
/// # Examples
///
/// ```rust
/// use gachaplan::catalog::{CatalogItem, GachaCatalog, RarityDefinition, RarityTable};
/// use gachaplan::random::ConstantRandom;
/// use gachaplan::*;
///
/// let mut rarities = RarityTable::new();
/// rarities.insert("R".into(), RarityDefinition::new("R", "Rare"));
/// let catalog = GachaCatalog::new("g")
///     .with_item(CatalogItem::new("a", "Apple", "R"))
///     .with_item(CatalogItem::new("b", "Berry", "R").with_stock(2.0));
/// let pool = build_gacha_pool(&catalog, &rarities, 2, &IssuedCounts::new());
///
/// let settings: RawPurchaseSettings =
///     serde_json::from_str(r#"{"perPull": {"price": 100}}"#).unwrap();
/// let plan = calculate_draw_plan(500.0, &settings, pool.items.len(), None);
///
/// let engine = DrawEngine::new(&pool, ExecutionOptions::default());
/// let result = engine.execute(plan, &mut ConstantRandom(0.9));
/// assert_eq!(result.actual_total_pulls, 5);
/// assert_eq!(result.total_count(), 5);
/// // "b" only had two units of stock
/// assert_eq!(result.item(&ItemId::from_str("b")).unwrap().count, 2);
/// ```
pub struct DrawEngine<'a> {
    pool: &'a GachaPool,
    options: ExecutionOptions,
}

impl<'a> DrawEngine<'a> {
    pub fn new(pool: &'a GachaPool, options: ExecutionOptions) -> Self {
        Self { pool, options }
    }

    pub fn options(&self) -> ExecutionOptions {
        self.options
    }

    /// Execute a plan.
    ///
    /// A plan with errors or no pulls returns immediately with no draws.
    pub fn execute<R>(&self, plan: DrawPlan, rng: &mut R) -> ExecutionResult
    where
        R: RandomSource + ?Sized,
    {
        if !plan.is_executable() {
            tracing::debug!(
                gacha = %self.pool.gacha_id,
                errors = plan.errors.len(),
                "plan not executable; no draws made"
            );
            return ExecutionResult::rejected(plan);
        }

        let mut ledger = StockLedger::new(self.pool);

        self.run_complete_phase(&plan, &mut ledger);
        let complete_draws = ledger.draw_count();

        let random_budget = self.run_guarantee_phase(&plan, &mut ledger, rng);
        let guarantee_draws = ledger.draw_count() - complete_draws;

        self.run_random_phase(random_budget, &mut ledger, rng);

        let produced = ledger.draw_count();
        if produced < plan.total_pulls {
            ledger.warn(DrawWarning::StockExhausted {
                planned: plan.total_pulls,
                produced,
            });
        }

        tracing::debug!(
            gacha = %self.pool.gacha_id,
            complete_draws,
            guarantee_draws,
            random_draws = produced - complete_draws - guarantee_draws,
            planned = plan.total_pulls,
            "executed draw plan"
        );

        let items = aggregate_draws(self.pool, ledger.draws());
        let mut warnings = plan.warnings.clone();
        warnings.append(&mut ledger.warnings);
        ExecutionResult {
            items,
            points_spent: plan.points_used,
            points_remainder: plan.points_remainder,
            actual_total_pulls: produced,
            complete_executions: plan.complete_executions,
            warnings,
            errors: plan.errors.clone(),
            plan,
        }
    }

    /// Execute an explicit number of pulls without point accounting.
    ///
    /// `pull_count` is floored and must be between one and
    /// [`MAX_TOTAL_PULLS`]. Guarantees from
    /// `settings` apply when their thresholds are met.
    pub fn execute_pulls<R>(
        &self,
        pull_count: f64,
        settings: Option<&RawPurchaseSettings>,
        rng: &mut R,
    ) -> ExecutionResult
    where
        R: RandomSource + ?Sized,
    {
        let (settings, diagnostics) = settings
            .map(normalize_purchase_settings)
            .unwrap_or_default();

        if !pull_count.is_finite() || pull_count.floor() < 1.0 {
            let plan = DrawPlan::rejected(DrawError::InvalidPullCount(pull_count), settings, diagnostics);
            return ExecutionResult::rejected(plan);
        }

        if pull_count.floor() > MAX_TOTAL_PULLS as f64 {
            let error = DrawError::TooManyPulls {
                limit: MAX_TOTAL_PULLS,
            };
            let plan = DrawPlan::rejected(error, settings, diagnostics);
            return ExecutionResult::rejected(plan);
        }

        let mut plan = DrawPlan::for_pull_count(pull_count.floor() as u64, settings);
        plan.warnings = diagnostics;
        self.execute(plan, rng)
    }

    fn run_complete_phase(&self, plan: &DrawPlan, ledger: &mut StockLedger) {
        for _ in 0..plan.complete_executions {
            for item in &self.pool.items {
                if ledger.is_in_stock(&item.item_id) || self.options.include_out_of_stock_in_complete {
                    ledger.issue(item, false);
                }
            }
        }
    }

    /// Returns the random-pull budget left after guarantees.
    fn run_guarantee_phase<R>(&self, plan: &DrawPlan, ledger: &mut StockLedger, rng: &mut R) -> u64
    where
        R: RandomSource + ?Sized,
    {
        let mut budget = plan.random_pulls;
        let guarantees = applicable_guarantees(
            &plan.settings.guarantees,
            plan.total_pulls,
            self.options.apply_lower_threshold_guarantees,
        );

        for guarantee in guarantees {
            let requested = guarantee.quantity.min(budget);
            let mut allocated = 0;
            for _ in 0..requested {
                if self.allocate_guarantee_unit(guarantee, ledger, rng) {
                    allocated += 1;
                }
            }
            budget -= allocated;
            if allocated < guarantee.quantity {
                ledger.warn(DrawWarning::GuaranteeShortfall {
                    guarantee_id: guarantee.id.clone(),
                    requested: guarantee.quantity,
                    allocated,
                });
            }
        }
        budget
    }

    fn allocate_guarantee_unit<R>(
        &self,
        guarantee: &GuaranteeSetting,
        ledger: &mut StockLedger,
        rng: &mut R,
    ) -> bool
    where
        R: RandomSource + ?Sized,
    {
        let GuaranteeTarget::Item { item_id } = &guarantee.target else {
            return self.allocate_from_rarity(&guarantee.rarity_id, ledger, rng);
        };

        match self.pool.item(item_id) {
            Some(item) if ledger.is_in_stock(item_id) => {
                ledger.issue(item, true);
                true
            }
            Some(item) if self.may_issue_depleted(item) => {
                ledger.issue(item, true);
                true
            }
            Some(_) => {
                ledger.warn(DrawWarning::GuaranteeItemDepleted {
                    item_id: item_id.clone(),
                });
                false
            }
            None => {
                ledger.warn(DrawWarning::GuaranteeItemMissing {
                    item_id: item_id.clone(),
                    rarity_id: guarantee.rarity_id.clone(),
                });
                self.allocate_from_rarity(&guarantee.rarity_id, ledger, rng)
            }
        }
    }

    fn allocate_from_rarity<R>(&self, rarity_id: &RarityId, ledger: &mut StockLedger, rng: &mut R) -> bool
    where
        R: RandomSource + ?Sized,
    {
        let members: Vec<&ItemDefinition> = self.pool.items_of_rarity(rarity_id).collect();
        if members.is_empty() {
            ledger.warn(DrawWarning::GuaranteeRarityMissing {
                rarity_id: rarity_id.clone(),
            });
            return false;
        }

        let in_stock: Vec<&ItemDefinition> = members
            .iter()
            .copied()
            .filter(|item| ledger.is_in_stock(&item.item_id))
            .collect();
        let candidates: Vec<&ItemDefinition> = if in_stock.is_empty() {
            members
                .into_iter()
                .filter(|item| self.may_issue_depleted(item))
                .collect()
        } else {
            in_stock
        };

        match select_weighted(&candidates, rng) {
            Some(item) => {
                ledger.issue(item, true);
                true
            }
            None => {
                ledger.warn(DrawWarning::GuaranteeRarityDepleted {
                    rarity_id: rarity_id.clone(),
                });
                false
            }
        }
    }

    /// A depleted item may be handed out by a guarantee only when the
    /// override is on and the item has a finite cap.
    fn may_issue_depleted(&self, item: &ItemDefinition) -> bool {
        self.options.allow_out_of_stock_guarantee_item && item.stock_cap.is_some()
    }

    fn run_random_phase<R>(&self, budget: u64, ledger: &mut StockLedger, rng: &mut R)
    where
        R: RandomSource + ?Sized,
    {
        for drawn in 0..budget {
            let candidates: Vec<&ItemDefinition> = self
                .pool
                .items
                .iter()
                .filter(|item| ledger.is_in_stock(&item.item_id))
                .collect();
            let Some(item) = select_weighted(&candidates, rng) else {
                tracing::debug!(drawn, budget, "random phase stopped: stock exhausted");
                break;
            };
            ledger.issue(item, false);
        }
    }
}

/// Execute a plan against a pool.
///
/// Shorthand for [`DrawEngine::execute`].
pub fn execute_draw_plan<R>(
    pool: &GachaPool,
    plan: DrawPlan,
    options: ExecutionOptions,
    rng: &mut R,
) -> ExecutionResult
where
    R: RandomSource + ?Sized,
{
    DrawEngine::new(pool, options).execute(plan, rng)
}

/// Execute an explicit pull count against a pool.
///
/// Shorthand for [`DrawEngine::execute_pulls`].
pub fn execute_pull_count<R>(
    pool: &GachaPool,
    pull_count: f64,
    settings: Option<&RawPurchaseSettings>,
    options: ExecutionOptions,
    rng: &mut R,
) -> ExecutionResult
where
    R: RandomSource + ?Sized,
{
    DrawEngine::new(pool, options).execute_pulls(pull_count, settings, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogItem, GachaCatalog, RarityDefinition, RarityTable};
    use crate::pool::build_gacha_pool;
    use crate::random::{ConstantRandom, SequenceRandom};
    use crate::settings::NormalizedPurchaseSettings;
    use crate::stock::IssuedCounts;

    fn rarities() -> RarityTable {
        let mut table = RarityTable::new();
        table.insert(
            "SSR".into(),
            RarityDefinition::new("SSR", "SSR").with_rate(0.1).with_sort_order(0),
        );
        table.insert("R".into(), RarityDefinition::new("R", "R").with_sort_order(1));
        table
    }

    fn pool_with(items: Vec<CatalogItem>) -> GachaPool {
        let mut catalog = GachaCatalog::new("g").with_rarity("SSR").with_rarity("R");
        catalog.items = items;
        build_gacha_pool(&catalog, &rarities(), 2, &IssuedCounts::new())
    }

    #[test]
    fn test_ledger_tracks_stock() {
        let pool = pool_with(vec![CatalogItem::new("a", "A", "R").with_stock(1.0)]);
        let mut ledger = StockLedger::new(&pool);
        let id = ItemId::from_str("a");
        assert!(ledger.is_in_stock(&id));
        ledger.issue(&pool.items[0], false);
        assert_eq!(ledger.remaining(&id), Some(0));
        assert!(!ledger.is_in_stock(&id));
        ledger.issue(&pool.items[0], true);
        assert_eq!(ledger.remaining(&id), Some(0));
        assert_eq!(ledger.draw_count(), 2);
    }

    #[test]
    fn test_rejected_plan_makes_no_draws() {
        let pool = pool_with(vec![CatalogItem::new("a", "A", "R")]);
        let plan = DrawPlan::rejected(
            DrawError::InvalidPoints(0.0),
            NormalizedPurchaseSettings::default(),
            Vec::new(),
        );
        let result = execute_draw_plan(&pool, plan, ExecutionOptions::default(), &mut ConstantRandom(0.5));
        assert_eq!(result.actual_total_pulls, 0);
        assert!(result.items.is_empty());
        assert_eq!(result.errors, vec![DrawError::InvalidPoints(0.0)]);
    }

    #[test]
    fn test_complete_phase_skips_depleted() {
        let pool = pool_with(vec![
            CatalogItem::new("a", "A", "SSR"),
            CatalogItem::new("b", "B", "R").with_stock(1.0),
        ]);
        let mut plan = DrawPlan::for_pull_count(0, NormalizedPurchaseSettings::default());
        plan.complete_executions = 2;
        plan.complete_pulls = 4;
        plan.total_pulls = 4;

        let result = execute_draw_plan(&pool, plan.clone(), ExecutionOptions::default(), &mut ConstantRandom(0.0));
        assert_eq!(result.actual_total_pulls, 3);
        assert!(result
            .warnings
            .contains(&DrawWarning::StockExhausted { planned: 4, produced: 3 }));

        let options = ExecutionOptions::new().include_out_of_stock_in_complete(true);
        let result = execute_draw_plan(&pool, plan, options, &mut ConstantRandom(0.0));
        assert_eq!(result.actual_total_pulls, 4);
    }

    #[test]
    fn test_random_phase_stops_when_stock_runs_out() {
        let pool = pool_with(vec![
            CatalogItem::new("a", "A", "SSR").with_stock(1.0),
            CatalogItem::new("b", "B", "R").with_stock(2.0),
        ]);
        let result = execute_pull_count(&pool, 10.0, None, ExecutionOptions::default(), &mut SequenceRandom::new(vec![0.3, 0.7]));
        assert_eq!(result.actual_total_pulls, 3);
        assert_eq!(result.total_count(), 3);
        assert!(result
            .warnings
            .contains(&DrawWarning::StockExhausted { planned: 10, produced: 3 }));
    }

    #[test]
    fn test_invalid_pull_counts() {
        let pool = pool_with(vec![CatalogItem::new("a", "A", "R")]);
        for count in [0.0, 0.5, -2.0, f64::NAN] {
            let result = execute_pull_count(&pool, count, None, ExecutionOptions::default(), &mut ConstantRandom(0.1));
            assert_eq!(result.actual_total_pulls, 0);
            assert_eq!(result.errors.len(), 1);
            assert!(!result.is_success());
        }
    }

    #[test]
    fn test_pull_count_above_limit_is_rejected() {
        let pool = pool_with(vec![CatalogItem::new("a", "A", "R")]);
        for count in [MAX_TOTAL_PULLS as f64 + 1.0, 1e30] {
            let result = execute_pull_count(&pool, count, None, ExecutionOptions::default(), &mut ConstantRandom(0.1));
            assert_eq!(result.actual_total_pulls, 0);
            assert!(result.items.is_empty());
            assert_eq!(
                result.errors,
                vec![DrawError::TooManyPulls {
                    limit: MAX_TOTAL_PULLS
                }]
            );
        }
    }

    #[test]
    fn test_fractional_pull_count_is_floored() {
        let pool = pool_with(vec![CatalogItem::new("a", "A", "R")]);
        let result = execute_pull_count(&pool, 3.9, None, ExecutionOptions::default(), &mut ConstantRandom(0.1));
        assert_eq!(result.actual_total_pulls, 3);
        assert_eq!(result.plan.total_pulls, 3);
    }
}
