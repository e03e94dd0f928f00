//! # carta-sim
//!
//! Runs a scripted cart session against a catalog file and prints every
//! resulting view as JSON.
//!
//! ## Usage
//! ```text
//! carta-sim [--config PATH] [--catalog PATH] [--tenant ID]
//!
//!   --config   engine config (default: platform config dir / carta.toml)
//!   --catalog  promotion catalog (default: fixtures/catalog.toml)
//!   --tenant   tenant to run as (default: demo)
//! ```

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use carta_core::cart::NewCartLine;
use carta_core::types::{CategoryId, ProductId, SalesChannel};
use carta_core::Money;
use carta_session::telemetry::init_tracing;
use carta_session::{
    CallContext, CartSessionEngine, CartSessionView, CreateSession, EngineConfig,
    InMemoryCatalog, InMemorySessionStore,
};
use tracing::info;

const DEFAULT_CATALOG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/catalog.toml");

struct Args {
    config: Option<PathBuf>,
    catalog: PathBuf,
    tenant: String,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        config: None,
        catalog: PathBuf::from(DEFAULT_CATALOG),
        tenant: "demo".to_string(),
    };

    let mut iter = std::env::args().skip(1);
    while let Some(flag) = iter.next() {
        let mut value = || iter.next().ok_or_else(|| format!("{} needs a value", flag));
        match flag.as_str() {
            "--config" => args.config = Some(PathBuf::from(value()?)),
            "--catalog" => args.catalog = PathBuf::from(value()?),
            "--tenant" => args.tenant = value()?,
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }

    Ok(args)
}

fn product(id: &str, name: &str, cents: i64, quantity: i64, categories: &[&str]) -> NewCartLine {
    NewCartLine {
        product_id: ProductId::new(id),
        product_code: Some(id.to_uppercase()),
        product_name: name.to_string(),
        unit_price: Money::from_cents(cents),
        quantity,
        category_ids: categories
            .iter()
            .map(|c| CategoryId::new(*c))
            .collect::<BTreeSet<_>>(),
    }
}

fn print_step(step: &str, view: &CartSessionView) -> Result<(), serde_json::Error> {
    println!("// {}", step);
    println!("{}", serde_json::to_string_pretty(view)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args = parse_args()?;
    let config = EngineConfig::load(args.config)?;
    let catalog = Arc::new(InMemoryCatalog::load(&args.catalog)?);
    info!(catalog = %args.catalog.display(), tenant = %args.tenant, "Starting carta-sim");

    let engine = CartSessionEngine::new(
        Arc::new(InMemorySessionStore::new()),
        catalog.clone(),
        &config,
    );
    let reaper = engine.start_reaper(&config.reaper);
    let ctx = CallContext::for_tenant(args.tenant.as_str());

    let created = engine
        .create_session(
            &ctx,
            CreateSession {
                sales_channel: Some(SalesChannel::new("web")),
                ..CreateSession::default()
            },
        )
        .await?;
    print_step("create_session", &created)?;
    let id = created.session_id;

    let steps = [
        ("add 2 × espresso", product("espresso", "Espresso", 350, 2, &["coffee"])),
        ("add 1 × espresso again", product("espresso", "Espresso", 350, 1, &["coffee"])),
        ("add 1 × croissant", product("croissant", "Croissant", 275, 1, &["bakery"])),
    ];
    for (label, line) in steps {
        if let Some(view) = engine.add_item(&ctx, &id, line).await? {
            print_step(label, &view)?;
        }
    }

    if let Some(view) = engine
        .apply_coupons(&ctx, &id, &[" save10 ".to_string(), "".to_string()])
        .await?
    {
        print_step("apply_coupons [\" save10 \", \"\"]", &view)?;
    }

    if let Some(view) = engine
        .add_item(&ctx, &id, product("grinder", "Hand Grinder", 8900, 1, &["gear"]))
        .await?
    {
        print_step("add 1 × grinder (unlocks Big Basket)", &view)?;

        if let Some(croissant) = view
            .items
            .iter()
            .find(|item| item.product_id.as_str() == "croissant")
        {
            if let Some(view) = engine
                .update_item_quantity(&ctx, &id, &croissant.line_id, 0)
                .await?
            {
                print_step("update croissant quantity to 0", &view)?;
            }
        }
    }

    if let Some(view) = engine.get_totals(&ctx, &id).await? {
        print_step("get_totals", &view)?;

        let tenant = created.tenant_id;
        for applied in &view.applied_promotions {
            let uses = catalog.record_redemption(&tenant, &applied.promotion_id)?;
            info!(promotion_id = %applied.promotion_id, uses, "Redeemed at checkout");
        }
    }

    if let Some(view) = engine.clear(&ctx, &id).await? {
        print_step("clear", &view)?;
    }

    if let Some(reaper) = reaper {
        reaper.shutdown().await;
    }

    Ok(())
}
