//! Draw plan calculation.
//!
//! A plan turns a point budget into pulls with a deterministic greedy
//! allocation against the remaining balance:
//!
//! ```text
//! [complete sets] → [bundles, best efficiency first] → [per-pull units]
//! ```
//!
//! Bundles that are strictly worse than the per-pull rate never take part.
//! The allocation is greedy, not optimal across bundle combinations.

use crate::error::{DrawError, DrawWarning};
use crate::settings::{normalize_purchase_settings, NormalizedPurchaseSettings, RawPurchaseSettings};
use serde::{Deserialize, Serialize};

/// Tolerance for floating-point price arithmetic.
const POINT_EPSILON: f64 = 1e-9;

/// Largest number of pulls a single plan may hold.
///
/// Budgets that would buy more are rejected with
/// [`DrawError::TooManyPulls`] rather than executed.
pub const MAX_TOTAL_PULLS: u64 = 1_000_000;

/// How many times `price` fits into `budget`.
fn affordable_times(budget: f64, price: f64) -> u64 {
    if price <= 0.0 || budget < price - POINT_EPSILON {
        return 0;
    }
    ((budget + POINT_EPSILON) / price).floor() as u64
}

fn snap_to_zero(value: f64) -> f64 {
    if value.abs() < POINT_EPSILON {
        0.0
    } else {
        value
    }
}

/// One bundle's share of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleApplication {
    pub bundle_id: String,
    pub price: f64,
    pub pulls: u64,
    pub times: u64,
    pub total_pulls: u64,
    pub points_spent: f64,
}

/// The per-pull share of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerPullPurchase {
    pub times: u64,
    pub pulls: u64,
    pub total_pulls: u64,
    pub points_spent: f64,
}

/// A purchase plan for one gacha.
///
/// `total_pulls == complete_pulls + random_pulls` always holds for the
/// planned numbers. Execution may produce fewer draws when stock runs out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawPlan {
    pub complete_executions: u64,
    pub complete_pulls: u64,
    /// Pulls bought through bundles and per-pull units.
    pub random_pulls: u64,
    pub total_pulls: u64,
    pub points_used: f64,
    pub points_remainder: f64,
    pub bundle_applications: Vec<BundleApplication>,
    pub per_pull_purchase: Option<PerPullPurchase>,
    pub errors: Vec<DrawError>,
    pub warnings: Vec<DrawWarning>,
    pub settings: NormalizedPurchaseSettings,
}

impl DrawPlan {
    fn empty(settings: NormalizedPurchaseSettings, warnings: Vec<DrawWarning>) -> Self {
        Self {
            complete_executions: 0,
            complete_pulls: 0,
            random_pulls: 0,
            total_pulls: 0,
            points_used: 0.0,
            points_remainder: 0.0,
            bundle_applications: Vec::new(),
            per_pull_purchase: None,
            errors: Vec::new(),
            warnings,
            settings,
        }
    }

    /// A plan for an explicit number of pulls with no point accounting.
    ///
    /// The pulls are all random pulls; guarantees in `settings` still
    /// apply when their thresholds are met.
    pub fn for_pull_count(pulls: u64, settings: NormalizedPurchaseSettings) -> Self {
        let mut plan = Self::empty(settings, Vec::new());
        plan.random_pulls = pulls;
        plan.total_pulls = pulls;
        plan
    }

    /// A terminal plan carrying a single error.
    pub fn rejected(
        error: DrawError,
        settings: NormalizedPurchaseSettings,
        warnings: Vec<DrawWarning>,
    ) -> Self {
        let mut plan = Self::empty(settings, warnings);
        plan.errors.push(error);
        plan
    }

    /// Whether executing this plan would draw anything.
    pub fn is_executable(&self) -> bool {
        self.errors.is_empty() && self.total_pulls > 0
    }

    /// Pulls bought through bundles.
    pub fn bundle_pulls(&self) -> u64 {
        self.bundle_applications
            .iter()
            .fold(0, |sum: u64, b| sum.saturating_add(b.total_pulls))
    }
}

/// Compute a purchase plan for a point budget.
///
/// `total_item_types` is the number of items one complete execution
/// yields. `complete_override` caps the number of complete executions.
///
/// # Examples
///
/// ```rust
/// use gachaplan::{calculate_draw_plan, RawPurchaseSettings};
///
/// let settings: RawPurchaseSettings =
///     serde_json::from_str(r#"{"perPull": {"price": 100, "pulls": 1}}"#).unwrap();
///
/// let plan = calculate_draw_plan(1000.0, &settings, 0, None);
/// assert_eq!(plan.total_pulls, 10);
/// assert_eq!(plan.points_used, 1000.0);
/// assert_eq!(plan.points_remainder, 0.0);
/// ```
pub fn calculate_draw_plan(
    points: f64,
    settings: &RawPurchaseSettings,
    total_item_types: usize,
    complete_override: Option<u64>,
) -> DrawPlan {
    let (settings, diagnostics) = normalize_purchase_settings(settings);
    calculate_normalized_plan(points, settings, diagnostics, total_item_types, complete_override)
}

/// Compute a plan from settings that are already normalized.
///
/// `diagnostics` are carried into the plan's warnings.
pub fn calculate_normalized_plan(
    points: f64,
    settings: NormalizedPurchaseSettings,
    diagnostics: Vec<DrawWarning>,
    total_item_types: usize,
    complete_override: Option<u64>,
) -> DrawPlan {
    if !points.is_finite() || points <= 0.0 {
        tracing::debug!(points, "rejecting plan: invalid point budget");
        return DrawPlan::rejected(DrawError::InvalidPoints(points), settings, diagnostics);
    }

    let mut plan = DrawPlan::empty(settings, diagnostics);
    let mut remaining = points;

    // Phase 1: complete sets
    if let Some(complete) = plan.settings.complete.clone() {
        let mut executions = affordable_times(remaining, complete.price);
        if let Some(cap) = complete_override {
            executions = executions.min(cap);
        }
        if executions > 0 {
            remaining = snap_to_zero(remaining - executions as f64 * complete.price);
            plan.complete_executions = executions;
            let Some(pulls) = executions.checked_mul(total_item_types as u64) else {
                return too_many_pulls(points, plan);
            };
            plan.complete_pulls = pulls;
            if total_item_types == 0 {
                tracing::warn!(executions, "complete-set purchase against an empty catalog");
                plan.warnings
                    .push(DrawWarning::CompleteWithEmptyCatalog { executions });
            }
        }
    }

    // Phase 2: bundles at least as efficient as the per-pull rate
    let baseline = plan.settings.per_pull.as_ref().map(|p| p.efficiency());
    let mut bundle_applications = Vec::new();
    let bundles = plan.settings.bundles.clone();
    for bundle in &bundles {
        if baseline.is_some_and(|baseline| bundle.efficiency + POINT_EPSILON < baseline) {
            continue;
        }
        let times = affordable_times(remaining, bundle.price);
        if times == 0 {
            continue;
        }
        let Some(total_pulls) = times.checked_mul(bundle.pulls) else {
            return too_many_pulls(points, plan);
        };
        let spent = times as f64 * bundle.price;
        remaining = snap_to_zero(remaining - spent);
        bundle_applications.push(BundleApplication {
            bundle_id: bundle.id.clone(),
            price: bundle.price,
            pulls: bundle.pulls,
            times,
            total_pulls,
            points_spent: spent,
        });
    }
    plan.bundle_applications = bundle_applications;

    // Phase 3: per-pull units
    if let Some(per_pull) = plan.settings.per_pull.clone() {
        let times = affordable_times(remaining, per_pull.price);
        if times > 0 {
            let Some(total_pulls) = times.checked_mul(per_pull.pulls) else {
                return too_many_pulls(points, plan);
            };
            let spent = times as f64 * per_pull.price;
            remaining = snap_to_zero(remaining - spent);
            plan.per_pull_purchase = Some(PerPullPurchase {
                times,
                pulls: per_pull.pulls,
                total_pulls,
                points_spent: spent,
            });
        }
    }

    let per_pull_pulls = plan.per_pull_purchase.as_ref().map_or(0, |p| p.total_pulls);
    let random_pulls = plan
        .bundle_applications
        .iter()
        .try_fold(per_pull_pulls, |sum, b| sum.checked_add(b.total_pulls));
    let total_pulls = random_pulls.and_then(|random| random.checked_add(plan.complete_pulls));
    let (Some(random_pulls), Some(total_pulls)) = (random_pulls, total_pulls) else {
        return too_many_pulls(points, plan);
    };
    if total_pulls > MAX_TOTAL_PULLS {
        return too_many_pulls(points, plan);
    }
    plan.random_pulls = random_pulls;
    plan.total_pulls = total_pulls;

    if plan.total_pulls == 0 {
        let error = zero_pull_cause(points, &plan, total_item_types);
        tracing::debug!(%error, "rejecting plan: no pulls");
        let mut rejected = DrawPlan::rejected(error, plan.settings, plan.warnings);
        rejected.points_remainder = points;
        return rejected;
    }

    plan.points_remainder = remaining.max(0.0);
    plan.points_used = points - plan.points_remainder;
    if plan.points_remainder > 0.0 {
        plan.warnings.push(DrawWarning::PointsUnspent {
            remainder: plan.points_remainder,
        });
    }

    tracing::debug!(
        complete_executions = plan.complete_executions,
        complete_pulls = plan.complete_pulls,
        random_pulls = plan.random_pulls,
        remainder = plan.points_remainder,
        "calculated draw plan"
    );
    plan
}

fn too_many_pulls(points: f64, plan: DrawPlan) -> DrawPlan {
    let error = DrawError::TooManyPulls {
        limit: MAX_TOTAL_PULLS,
    };
    tracing::debug!(points, %error, "rejecting plan: budget buys too many pulls");
    let mut rejected = DrawPlan::rejected(error, plan.settings, plan.warnings);
    rejected.points_remainder = points;
    rejected
}

fn zero_pull_cause(points: f64, plan: &DrawPlan, total_item_types: usize) -> DrawError {
    if !plan.settings.has_purchase_options() {
        return DrawError::NoPurchaseSettings;
    }
    if plan.complete_executions > 0 && total_item_types == 0 {
        return DrawError::NoItemsForComplete;
    }
    DrawError::InsufficientPoints {
        points,
        cheapest: plan.settings.cheapest_price().unwrap_or(0.0),
    }
}
