//! Stream event example: Limited stock, redistribution and guarantees
//!
//! This example demonstrates:
//! - Loading a catalog, rarities and options from JSON
//! - Subtracting already issued items from stock
//! - Rate redistribution when a whole rarity sells out
//! - An explicit pull count with an item guarantee

use gachaplan::catalog::{GachaCatalog, RarityTable};
use gachaplan::random::RngSource;
use gachaplan::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

const RARITIES: &str = r##"{
    "UR":  {"id": "UR",  "label": "Ultra",  "color": "#f5c400", "emitRate": 0.01, "sortOrder": 0},
    "SSR": {"id": "SSR", "label": "Super",  "color": "#c04dff", "emitRate": 0.04, "sortOrder": 1},
    "R":   {"id": "R",   "label": "Common", "sortOrder": 2, "autoAdjust": true}
}"##;

const CATALOG: &str = r##"{
    "gachaId": "anniversary-stream",
    "rarityOrder": ["UR", "SSR", "R"],
    "items": [
        {"itemId": "ur-signed-card", "name": "Signed Card", "rarityId": "UR", "stockCount": 2},
        {"itemId": "ssr-voice", "name": "Voice Clip", "rarityId": "SSR", "pickupTarget": true},
        {"itemId": "ssr-wallpaper", "name": "Wallpaper", "rarityId": "SSR"},
        {"itemId": "r-sticker", "name": "Sticker", "rarityId": "R"},
        {"itemId": "r-badge", "name": "Badge", "rarityId": "R", "stockCount": 40}
    ]
}"##;

const SETTINGS: &str = r##"{
    "guarantees": [
        {"id": "voice-at-30", "rarityId": "SSR", "threshold": 30, "targetType": "item", "itemId": "ssr-voice"},
        {"id": "ur-at-50", "rarityId": "UR", "threshold": 50}
    ]
}"##;

fn main() -> Result<(), serde_json::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let rarities: RarityTable = serde_json::from_str(RARITIES)?;
    let catalog: GachaCatalog = serde_json::from_str(CATALOG)?;
    let settings: RawPurchaseSettings = serde_json::from_str(SETTINGS)?;
    let options: ExecutionOptions = serde_json::from_str(r#"{"allowOutOfStockGuaranteeItem": true}"#)?;

    // Both signed cards were already given away on an earlier stream
    let mut issued = IssuedCounts::new();
    issued.record("ur-signed-card", 1.0);
    issued.record("ur-signed-card", 1.0);
    issued.record("r-badge", 12.0);

    let pools = build_gacha_pools(&[catalog], &rarities, None, Some(&issued));
    let pool = &pools[&GachaId::from_str("anniversary-stream")];

    println!("=== Pool ===");
    for item in &pool.items {
        let stock = match item.remaining_stock {
            Some(left) => format!("{} left", left),
            None => "unlimited".to_string(),
        };
        println!("  {:<12} {:<7} {:>8}  {}", item.name, item.rarity_label, item.probability_label, stock);
    }
    for redistribution in &pool.redistributions {
        println!(
            "Moved {:.2}% from {:?} to {} ({:?})",
            redistribution.total_missing_rate * 100.0,
            redistribution
                .source_rarity_ids
                .iter()
                .map(RarityId::as_str)
                .collect::<Vec<_>>(),
            redistribution.target_rarity_id,
            redistribution.strategy,
        );
    }

    println!("\n=== 50 pulls ===");
    let mut rng = RngSource::new(StdRng::seed_from_u64(7));
    let result = execute_pull_count(pool, 50.0, Some(&settings), options, &mut rng);

    for item in &result.items {
        println!(
            "  {:<12} x{:<3} guaranteed {}",
            item.name, item.count, item.guaranteed_count
        );
    }
    println!("Pulls made: {}", result.actual_total_pulls);
    for warning in &result.warnings {
        println!("Warning: {}", warning);
    }

    println!("\n{}", serde_json::to_string_pretty(&result.items)?);
    Ok(())
}
