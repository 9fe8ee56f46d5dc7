//! Purchase setting normalization.
//!
//! Purchase settings are authored by users in the surrounding application
//! and arrive as loosely typed JSON. Normalization validates every entry,
//! drops what is malformed with a diagnostic, and produces an order-stable
//! structure the plan calculator and the engine rely on:
//!
//! - bundles sorted by descending efficiency (pulls per point), ties by
//!   ascending price
//! - guarantees sorted by ascending threshold
//!
//! Normalization never fails.

use crate::error::DrawWarning;
use crate::id::{ItemId, RarityId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Coerce a loosely typed JSON number.
///
/// Numbers and numeric strings are accepted. Everything else is `None`.
fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn positive_number(value: Option<&Value>) -> Option<f64> {
    value.and_then(coerce_number).filter(|n| *n > 0.0)
}

fn positive_integer(value: Option<&Value>) -> Option<u64> {
    positive_number(value)
        .filter(|n| n.fract() == 0.0)
        .map(|n| n as u64)
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

// ============================================================================
// Raw (user-authored) settings
// ============================================================================

/// Per-pull purchase unit as authored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPerPull {
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub pulls: Option<Value>,
}

/// Complete-set purchase as authored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawComplete {
    #[serde(default)]
    pub price: Option<Value>,
}

/// Bundle as authored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBundle {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub pulls: Option<Value>,
}

/// Guarantee as authored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGuarantee {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub rarity_id: Option<String>,
    #[serde(default)]
    pub threshold: Option<Value>,
    #[serde(default)]
    pub quantity: Option<Value>,
    /// `"rarity"` (default) or `"item"`.
    #[serde(default)]
    pub target_type: Option<String>,
    #[serde(default)]
    pub item_id: Option<String>,
}

/// The purchase settings document for one gacha.
///
/// # Examples
///
/// ```rust
/// use gachaplan::RawPurchaseSettings;
///
/// let raw: RawPurchaseSettings = serde_json::from_str(r#"{
///     "perPull": {"price": 100},
///     "complate": {"price": "500"},
///     "bundles": [{"id": "ten", "price": 900, "pulls": 10}]
/// }"#).unwrap();
/// assert!(raw.per_pull.is_some());
/// assert!(raw.legacy_complete.is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPurchaseSettings {
    #[serde(default)]
    pub per_pull: Option<RawPerPull>,
    #[serde(default)]
    pub complete: Option<RawComplete>,
    /// Legacy misspelled key for `complete`.
    #[serde(default, rename = "complate", skip_serializing_if = "Option::is_none")]
    pub legacy_complete: Option<RawComplete>,
    #[serde(default)]
    pub bundles: Vec<RawBundle>,
    #[serde(default)]
    pub guarantees: Vec<RawGuarantee>,
}

impl RawPurchaseSettings {
    /// Fold the legacy `complate` key into `complete`.
    ///
    /// `complete` wins field by field; the legacy value only fills gaps.
    /// After this call `legacy_complete` is always `None`.
    pub fn merge_legacy_aliases(&mut self) {
        let Some(legacy) = self.legacy_complete.take() else {
            return;
        };
        let complete = self.complete.get_or_insert_with(RawComplete::default);
        if complete.price.is_none() {
            complete.price = legacy.price;
        }
    }
}

// ============================================================================
// Normalized settings
// ============================================================================

/// Validated per-pull purchase unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerPullSetting {
    pub price: f64,
    pub pulls: u64,
    /// Price of a single pull.
    pub unit_price: f64,
}

impl PerPullSetting {
    /// Pulls per point.
    pub fn efficiency(&self) -> f64 {
        self.pulls as f64 / self.price
    }
}

/// Validated complete-set purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSetting {
    pub price: f64,
}

/// Validated bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleSetting {
    pub id: String,
    pub price: f64,
    pub pulls: u64,
    /// Pulls per point.
    pub efficiency: f64,
}

/// What a guarantee promises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "targetType", rename_all = "camelCase")]
pub enum GuaranteeTarget {
    /// Any item of the guarantee's rarity.
    Rarity,
    /// One specific item.
    #[serde(rename_all = "camelCase")]
    Item { item_id: ItemId },
}

/// Validated guarantee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuaranteeSetting {
    pub id: String,
    pub rarity_id: RarityId,
    /// Minimum planned pulls for the guarantee to apply.
    pub threshold: u64,
    pub quantity: u64,
    pub target: GuaranteeTarget,
}

/// Purchase settings after validation and ordering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPurchaseSettings {
    pub per_pull: Option<PerPullSetting>,
    pub complete: Option<CompleteSetting>,
    /// Best efficiency first.
    pub bundles: Vec<BundleSetting>,
    /// Lowest threshold first.
    pub guarantees: Vec<GuaranteeSetting>,
}

impl NormalizedPurchaseSettings {
    /// Whether any way to buy pulls is configured.
    pub fn has_purchase_options(&self) -> bool {
        self.per_pull.is_some() || self.complete.is_some() || !self.bundles.is_empty()
    }

    /// The lowest price among all purchase options.
    pub fn cheapest_price(&self) -> Option<f64> {
        let per_pull = self.per_pull.as_ref().map(|p| p.price);
        let complete = self.complete.as_ref().map(|c| c.price);
        let bundles = self.bundles.iter().map(|b| b.price);
        per_pull
            .into_iter()
            .chain(complete)
            .chain(bundles)
            .fold(None, |min: Option<f64>, price| {
                Some(min.map_or(price, |m| m.min(price)))
            })
    }
}

/// Validate and order raw purchase settings.
///
/// Returns the normalized settings and one diagnostic per dropped or
/// defaulted entry.
///
/// # Examples
///
/// ```rust
/// use gachaplan::{normalize_purchase_settings, RawPurchaseSettings};
///
/// let raw: RawPurchaseSettings = serde_json::from_str(r#"{
///     "bundles": [
///         {"id": "small", "price": 300, "pulls": 3},
///         {"id": "big", "price": 900, "pulls": 10},
///         {"id": "broken", "price": 0, "pulls": 5}
///     ]
/// }"#).unwrap();
///
/// let (settings, diagnostics) = normalize_purchase_settings(&raw);
/// assert_eq!(settings.bundles[0].id, "big");
/// assert_eq!(settings.bundles[1].id, "small");
/// assert_eq!(diagnostics.len(), 1);
/// ```
pub fn normalize_purchase_settings(
    raw: &RawPurchaseSettings,
) -> (NormalizedPurchaseSettings, Vec<DrawWarning>) {
    let mut raw = raw.clone();
    raw.merge_legacy_aliases();

    let mut diagnostics = Vec::new();
    let per_pull = raw
        .per_pull
        .as_ref()
        .and_then(|p| normalize_per_pull(p, &mut diagnostics));
    let complete = raw
        .complete
        .as_ref()
        .and_then(|c| normalize_complete(c, &mut diagnostics));

    let mut bundles: Vec<BundleSetting> = raw
        .bundles
        .iter()
        .enumerate()
        .filter_map(|(index, bundle)| normalize_bundle(index, bundle, &mut diagnostics))
        .collect();
    bundles.sort_by(|a, b| {
        b.efficiency
            .total_cmp(&a.efficiency)
            .then(a.price.total_cmp(&b.price))
    });

    let mut guarantees: Vec<GuaranteeSetting> = raw
        .guarantees
        .iter()
        .enumerate()
        .filter_map(|(index, guarantee)| normalize_guarantee(index, guarantee, &mut diagnostics))
        .collect();
    guarantees.sort_by_key(|g| g.threshold);

    tracing::debug!(
        bundles = bundles.len(),
        guarantees = guarantees.len(),
        dropped = diagnostics.len(),
        "normalized purchase settings"
    );

    (
        NormalizedPurchaseSettings {
            per_pull,
            complete,
            bundles,
            guarantees,
        },
        diagnostics,
    )
}

fn normalize_per_pull(raw: &RawPerPull, diagnostics: &mut Vec<DrawWarning>) -> Option<PerPullSetting> {
    let Some(price) = positive_number(raw.price.as_ref()) else {
        diagnostics.push(DrawWarning::PerPullDropped {
            reason: "price must be greater than zero".into(),
        });
        return None;
    };
    let pulls = match raw.pulls.as_ref() {
        None | Some(Value::Null) => 1,
        Some(value) => match positive_number(Some(value)).map(f64::floor) {
            Some(pulls) if pulls >= 1.0 => pulls as u64,
            _ => {
                diagnostics.push(DrawWarning::PerPullDropped {
                    reason: "pulls must be greater than zero".into(),
                });
                return None;
            }
        },
    };
    Some(PerPullSetting {
        price,
        pulls,
        unit_price: price / pulls as f64,
    })
}

fn normalize_complete(raw: &RawComplete, diagnostics: &mut Vec<DrawWarning>) -> Option<CompleteSetting> {
    match positive_number(raw.price.as_ref()) {
        Some(price) => Some(CompleteSetting { price }),
        None => {
            diagnostics.push(DrawWarning::CompleteDropped {
                reason: "price must be greater than zero".into(),
            });
            None
        }
    }
}

fn normalize_bundle(
    index: usize,
    raw: &RawBundle,
    diagnostics: &mut Vec<DrawWarning>,
) -> Option<BundleSetting> {
    let price = positive_number(raw.price.as_ref());
    let pulls = positive_number(raw.pulls.as_ref())
        .map(f64::floor)
        .filter(|pulls| *pulls >= 1.0);
    let (Some(price), Some(pulls)) = (price, pulls) else {
        diagnostics.push(DrawWarning::BundleDropped {
            index,
            reason: "price and pulls must both be greater than zero".into(),
        });
        return None;
    };
    let pulls = pulls as u64;
    let id = non_blank(raw.id.as_ref())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("bundle-{}", index + 1));
    Some(BundleSetting {
        id,
        price,
        pulls,
        efficiency: pulls as f64 / price,
    })
}

fn normalize_guarantee(
    index: usize,
    raw: &RawGuarantee,
    diagnostics: &mut Vec<DrawWarning>,
) -> Option<GuaranteeSetting> {
    let Some(rarity_id) = non_blank(raw.rarity_id.as_ref()) else {
        diagnostics.push(DrawWarning::GuaranteeDropped {
            index,
            reason: "rarity id is missing".into(),
        });
        return None;
    };
    let Some(threshold) = positive_integer(raw.threshold.as_ref()) else {
        diagnostics.push(DrawWarning::GuaranteeDropped {
            index,
            reason: "threshold must be a positive integer".into(),
        });
        return None;
    };
    let quantity = match raw.quantity.as_ref() {
        None | Some(Value::Null) => 1,
        Some(value) => positive_integer(Some(value)).unwrap_or_else(|| {
            diagnostics.push(DrawWarning::GuaranteeQuantityDefaulted { index });
            1
        }),
    };
    let target = match raw.target_type.as_deref().map(str::trim) {
        Some("item") => match non_blank(raw.item_id.as_ref()) {
            Some(item_id) => GuaranteeTarget::Item {
                item_id: ItemId::from_str(item_id),
            },
            None => {
                diagnostics.push(DrawWarning::GuaranteeDropped {
                    index,
                    reason: "item guarantee has no item id".into(),
                });
                return None;
            }
        },
        _ => GuaranteeTarget::Rarity,
    };
    let id = non_blank(raw.id.as_ref())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("guarantee-{}", index + 1));

    Some(GuaranteeSetting {
        id,
        rarity_id: RarityId::from_str(rarity_id),
        threshold,
        quantity,
        target,
    })
}

/// Guarantees that apply for a given planned pull total.
///
/// A guarantee applies only when its threshold is met. With
/// `apply_lower = false`, only the guarantees sharing the highest met
/// threshold apply. Order follows `guarantees` (ascending threshold).
///
/// # Examples
///
/// ```rust
/// use gachaplan::settings::{applicable_guarantees, GuaranteeSetting, GuaranteeTarget};
/// use gachaplan::RarityId;
///
/// let g = |id: &str, threshold| GuaranteeSetting {
///     id: id.into(),
///     rarity_id: RarityId::from_str("SR"),
///     threshold,
///     quantity: 1,
///     target: GuaranteeTarget::Rarity,
/// };
/// let all = vec![g("a", 10), g("b", 30), g("c", 50)];
///
/// let hit = applicable_guarantees(&all, 40, true);
/// assert_eq!(hit.len(), 2);
///
/// let hit = applicable_guarantees(&all, 40, false);
/// assert_eq!(hit.len(), 1);
/// assert_eq!(hit[0].id, "b");
/// ```
pub fn applicable_guarantees(
    guarantees: &[GuaranteeSetting],
    total_pulls: u64,
    apply_lower: bool,
) -> Vec<&GuaranteeSetting> {
    let met = guarantees.iter().filter(|g| g.threshold <= total_pulls);
    if apply_lower {
        return met.collect();
    }
    let Some(highest) = met.clone().map(|g| g.threshold).max() else {
        return Vec::new();
    };
    met.filter(|g| g.threshold == highest).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawPurchaseSettings {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_per_pull_defaults_pulls_to_one() {
        let (settings, diagnostics) = normalize_purchase_settings(&raw(json!({
            "perPull": {"price": 120}
        })));
        let per_pull = settings.per_pull.unwrap();
        assert_eq!(per_pull.pulls, 1);
        assert_eq!(per_pull.unit_price, 120.0);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_per_pull_invalid_dropped() {
        let (settings, diagnostics) = normalize_purchase_settings(&raw(json!({
            "perPull": {"price": 100, "pulls": 0}
        })));
        assert!(settings.per_pull.is_none());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_legacy_complete_alias() {
        let (settings, _) = normalize_purchase_settings(&raw(json!({
            "complate": {"price": 500}
        })));
        assert_eq!(settings.complete, Some(CompleteSetting { price: 500.0 }));

        let (settings, _) = normalize_purchase_settings(&raw(json!({
            "complete": {"price": 400},
            "complate": {"price": 500}
        })));
        assert_eq!(settings.complete, Some(CompleteSetting { price: 400.0 }));
    }

    #[test]
    fn test_merge_clears_legacy_field() {
        let mut settings = raw(json!({"complate": {"price": 10}}));
        settings.merge_legacy_aliases();
        assert!(settings.legacy_complete.is_none());
        assert!(settings.complete.is_some());
    }

    #[test]
    fn test_bundle_order_ties_by_price() {
        let (settings, _) = normalize_purchase_settings(&raw(json!({
            "bundles": [
                {"id": "b", "price": 200, "pulls": 2},
                {"id": "a", "price": 100, "pulls": 1},
                {"id": "c", "price": 90, "pulls": 1}
            ]
        })));
        let ids: Vec<&str> = settings.bundles.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_bundle_default_id() {
        let (settings, _) = normalize_purchase_settings(&raw(json!({
            "bundles": [{"price": 100, "pulls": 1}]
        })));
        assert_eq!(settings.bundles[0].id, "bundle-1");
    }

    #[test]
    fn test_guarantee_validation() {
        let (settings, diagnostics) = normalize_purchase_settings(&raw(json!({
            "guarantees": [
                {"rarityId": "SSR", "threshold": 50},
                {"rarityId": "", "threshold": 10},
                {"rarityId": "SR", "threshold": 2.5},
                {"rarityId": "SR", "threshold": 10, "quantity": -1},
                {"rarityId": "UR", "threshold": 100, "targetType": "item"},
                {"rarityId": "UR", "threshold": 90, "targetType": "item", "itemId": "ur-1"}
            ]
        })));
        assert_eq!(settings.guarantees.len(), 3);
        assert_eq!(settings.guarantees[0].threshold, 10);
        assert_eq!(settings.guarantees[0].quantity, 1);
        assert_eq!(settings.guarantees[1].threshold, 50);
        assert_eq!(
            settings.guarantees[2].target,
            GuaranteeTarget::Item {
                item_id: ItemId::from_str("ur-1")
            }
        );
        assert_eq!(diagnostics.len(), 4);
        assert!(diagnostics.contains(&DrawWarning::GuaranteeQuantityDefaulted { index: 3 }));
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let (settings, diagnostics) = normalize_purchase_settings(&raw(json!({
            "perPull": {"price": "150", "pulls": "1"}
        })));
        assert_eq!(settings.per_pull.unwrap().price, 150.0);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_cheapest_price() {
        let (settings, _) = normalize_purchase_settings(&raw(json!({
            "perPull": {"price": 100},
            "complete": {"price": 80},
            "bundles": [{"price": 900, "pulls": 10}]
        })));
        assert_eq!(settings.cheapest_price(), Some(80.0));
        assert!(settings.has_purchase_options());
        assert_eq!(NormalizedPurchaseSettings::default().cheapest_price(), None);
    }

    #[test]
    fn test_applicable_guarantees_none_met() {
        let (settings, _) = normalize_purchase_settings(&raw(json!({
            "guarantees": [{"rarityId": "SSR", "threshold": 100}]
        })));
        assert!(applicable_guarantees(&settings.guarantees, 99, true).is_empty());
        assert!(applicable_guarantees(&settings.guarantees, 99, false).is_empty());
        assert_eq!(applicable_guarantees(&settings.guarantees, 100, false).len(), 1);
    }
}
