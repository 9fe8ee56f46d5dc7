//! Basic example: Plan a point budget and draw from a small catalog
//!
//! This example demonstrates:
//! - Building a pool from a catalog and rarity table
//! - Turning a point budget into a draw plan
//! - Executing the plan with a seeded generator

use gachaplan::catalog::{CatalogItem, GachaCatalog, RarityDefinition, RarityTable};
use gachaplan::random::RngSource;
use gachaplan::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> Result<(), serde_json::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Rarity tiers; "R" has no rate and absorbs the rest
    let mut rarities = RarityTable::new();
    rarities.insert(
        "SSR".into(),
        RarityDefinition::new("SSR", "Super Rare")
            .with_rate(0.03)
            .with_sort_order(0),
    );
    rarities.insert(
        "SR".into(),
        RarityDefinition::new("SR", "Rare").with_rate(0.17).with_sort_order(1),
    );
    rarities.insert("R".into(), RarityDefinition::new("R", "Common").with_sort_order(2));

    let catalog = GachaCatalog::new("starter")
        .with_rarity("SSR")
        .with_rarity("SR")
        .with_rarity("R")
        .with_item(CatalogItem::new("ssr-1", "Golden Key", "SSR").pickup().with_stock(3.0))
        .with_item(CatalogItem::new("ssr-2", "Silver Crown", "SSR"))
        .with_item(CatalogItem::new("sr-1", "Old Map", "SR"))
        .with_item(CatalogItem::new("r-1", "Coin", "R"))
        .with_item(CatalogItem::new("r-2", "Pebble", "R"));

    println!("Building pool:");
    let pools = build_gacha_pools(&[catalog], &rarities, None, None);
    let pool = &pools[&GachaId::from_str("starter")];
    for item in &pool.items {
        println!("  {:<14} {:<11} {}", item.name, item.rarity_label, item.probability_label);
    }

    let settings: RawPurchaseSettings = serde_json::from_str(
        r#"{
            "perPull": {"price": 100},
            "bundles": [{"id": "ten-pack", "price": 900, "pulls": 10}],
            "guarantees": [{"rarityId": "SSR", "threshold": 10}]
        }"#,
    )?;

    println!("\nPlanning 2,350 points...");
    let plan = calculate_draw_plan(2350.0, &settings, pool.items.len(), None);
    for bundle in &plan.bundle_applications {
        println!("  {} x{} ({} pulls)", bundle.bundle_id, bundle.times, bundle.total_pulls);
    }
    if let Some(per_pull) = &plan.per_pull_purchase {
        println!("  single pull x{}", per_pull.times);
    }
    println!("  total pulls: {}", plan.total_pulls);
    println!("  points remaining: {}", plan.points_remainder);

    let mut rng = RngSource::new(StdRng::seed_from_u64(2024));
    let result = execute_draw_plan(pool, plan, ExecutionOptions::default(), &mut rng);

    println!("\n=== Draw Result ===");
    println!("Pulls made: {}", result.actual_total_pulls);
    for item in &result.items {
        let note = if item.guaranteed_count > 0 {
            format!(" ({} guaranteed)", item.guaranteed_count)
        } else {
            String::new()
        };
        println!("  {:<14} x{}{}", item.name, item.count, note);
    }
    for warning in &result.warnings {
        println!("Warning: {}", warning);
    }

    Ok(())
}
