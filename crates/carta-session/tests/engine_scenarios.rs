//! End-to-end scenarios against the public engine API.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use carta_core::cart::NewCartLine;
use carta_core::promotion::{Discount, Promotion, PromotionRule, RuleCondition};
use carta_core::types::{CategoryId, LineId, ProductId, PromotionId, SessionId, TenantId};
use carta_core::{Money, Percentage};
use carta_session::config::ReaperSettings;
use carta_session::{
    CallContext, CancelSignal, CartSessionEngine, CatalogError, CatalogQuery,
    CreateSession, EngineConfig, EngineError, InMemoryCatalog, InMemorySessionStore,
    ManualClock, PricingStatus, PromotionCatalog, SessionKey, SessionStore,
};
use chrono::{DateTime, Utc};

// =============================================================================
// Fixtures
// =============================================================================

struct FailingCatalog;

#[async_trait]
impl PromotionCatalog for FailingCatalog {
    async fn candidate_promotions(
        &self,
        _query: &CatalogQuery,
    ) -> Result<Vec<Promotion>, CatalogError> {
        Err(CatalogError::Unavailable("connection refused".into()))
    }
}

struct SlowCatalog {
    delay: Duration,
}

#[async_trait]
impl PromotionCatalog for SlowCatalog {
    async fn candidate_promotions(
        &self,
        _query: &CatalogQuery,
    ) -> Result<Vec<Promotion>, CatalogError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
}

type Engine = CartSessionEngine<InMemorySessionStore>;

fn engine_with(catalog: Arc<dyn PromotionCatalog>) -> Engine {
    CartSessionEngine::new(
        Arc::new(InMemorySessionStore::new()),
        catalog,
        &EngineConfig::default(),
    )
}

fn line(product: &str, cents: i64, quantity: i64) -> NewCartLine {
    NewCartLine {
        product_id: ProductId::new(product),
        product_code: None,
        product_name: format!("Product {}", product),
        unit_price: Money::from_cents(cents),
        quantity,
        category_ids: BTreeSet::new(),
    }
}

fn promotion(id: &str, priority: i32, combinable: bool, percent: u32) -> Promotion {
    let now = Utc::now();
    Promotion {
        id: PromotionId::new(id),
        name: id.to_string(),
        valid_from: now - chrono::Duration::days(1),
        valid_to: now + chrono::Duration::days(1),
        min_order_amount: None,
        max_uses: None,
        coupon_code: None,
        priority,
        is_combinable: combinable,
        rules: vec![PromotionRule {
            condition: RuleCondition::default(),
            discount: Discount::Percentage {
                rate: Percentage::from_percent(percent),
            },
        }],
    }
}

async fn open(engine: &Engine, ctx: &CallContext) -> SessionId {
    engine
        .create_session(ctx, CreateSession::default())
        .await
        .unwrap()
        .session_id
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn empty_cart_has_zero_totals() {
    let engine = engine_with(Arc::new(InMemoryCatalog::new()));
    let ctx = CallContext::for_tenant("t1");
    let id = open(&engine, &ctx).await;

    let view = engine.get_totals(&ctx, &id).await.unwrap().unwrap();

    assert!(view.original_total.is_zero());
    assert!(view.total_discount_amount.is_zero());
    assert!(view.final_total.is_zero());
    assert!(view.applied_promotions.is_empty());
    assert_eq!(view.pricing, PricingStatus::EmptyCart);
}

#[tokio::test]
async fn single_line_totals() {
    let engine = engine_with(Arc::new(InMemoryCatalog::new()));
    let ctx = CallContext::for_tenant("t1");
    let id = open(&engine, &ctx).await;

    let view = engine
        .add_item(&ctx, &id, line("p1", 2550, 2))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(view.original_total.cents(), 5100);
    assert_eq!(view.final_total.cents(), 5100);
    assert_eq!(view.items[0].original_line_total.cents(), 5100);
    assert_eq!(view.pricing, PricingStatus::Evaluated);
}

#[tokio::test]
async fn repeated_add_aggregates_quantity() {
    let engine = engine_with(Arc::new(InMemoryCatalog::new()));
    let ctx = CallContext::for_tenant("t1");
    let id = open(&engine, &ctx).await;

    engine.add_item(&ctx, &id, line("p1", 1000, 1)).await.unwrap();
    let view = engine
        .add_item(&ctx, &id, line("p1", 1000, 2))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].quantity, 3);
    assert_eq!(view.final_total.cents(), 3000);
}

#[tokio::test]
async fn zero_quantity_removes_line() {
    let engine = engine_with(Arc::new(InMemoryCatalog::new()));
    let ctx = CallContext::for_tenant("t1");
    let id = open(&engine, &ctx).await;

    let added = engine
        .add_item(&ctx, &id, line("p1", 1000, 2))
        .await
        .unwrap()
        .unwrap();
    let line_id = added.items[0].line_id.clone();

    let view = engine
        .update_item_quantity(&ctx, &id, &line_id, 0)
        .await
        .unwrap()
        .unwrap();
    assert!(view.is_empty());
    assert!(view.final_total.is_zero());

    // removing it again is a no-op
    let view = engine
        .remove_item(&ctx, &id, &line_id)
        .await
        .unwrap()
        .unwrap();
    assert!(view.is_empty());
}

#[tokio::test]
async fn coupon_unlocks_promotion() {
    let catalog = InMemoryCatalog::new();
    let mut save10 = promotion("save10", 1, true, 10);
    save10.coupon_code = Some("SAVE10".to_string());
    catalog.upsert(TenantId::new("t1"), save10).unwrap();

    let engine = engine_with(Arc::new(catalog));
    let ctx = CallContext::for_tenant("t1");
    let id = open(&engine, &ctx).await;

    let view = engine
        .add_item(&ctx, &id, line("p1", 1000, 1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(view.final_total.cents(), 1000);

    let view = engine
        .apply_coupons(&ctx, &id, &[" save10 ".to_string(), "  ".to_string()])
        .await
        .unwrap()
        .unwrap();

    assert_eq!(view.final_total.cents(), 900);
    assert_eq!(view.total_discount_amount.cents(), 100);
    assert_eq!(view.applied_promotions.len(), 1);
    assert_eq!(view.applied_promotions[0].promotion_id.as_str(), "save10");
    assert_eq!(view.coupon_codes.len(), 1);
    assert_eq!(view.coupon_codes[0].as_str(), "SAVE10");
    assert_eq!(view.items[0].effective_discount, Percentage::from_percent(10));
}

#[tokio::test]
async fn catalog_failure_returns_undiscounted_totals() {
    let engine = engine_with(Arc::new(FailingCatalog));
    let ctx = CallContext::for_tenant("t1");
    let id = open(&engine, &ctx).await;

    let view = engine
        .add_item(&ctx, &id, line("p1", 1000, 3))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(view.pricing, PricingStatus::Degraded);
    assert_eq!(view.final_total.cents(), 3000);
    assert!(view.applied_promotions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn slow_catalog_times_out_into_degraded_totals() {
    let engine = engine_with(Arc::new(SlowCatalog {
        delay: Duration::from_secs(10),
    }));
    let ctx = CallContext::for_tenant("t1");
    let id = open(&engine, &ctx).await;

    let view = engine
        .add_item(&ctx, &id, line("p1", 1000, 1))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(view.pricing, PricingStatus::Degraded);
    assert_eq!(view.final_total.cents(), 1000);
}

// =============================================================================
// Properties
// =============================================================================

#[tokio::test]
async fn non_combinable_promotion_blocks_lower_priority() {
    let catalog = InMemoryCatalog::new();
    let tenant = TenantId::new("t1");
    catalog
        .upsert(tenant.clone(), promotion("a", 10, true, 10))
        .unwrap();
    catalog
        .upsert(tenant.clone(), promotion("b", 20, false, 20))
        .unwrap();

    let engine = engine_with(Arc::new(catalog));
    let ctx = CallContext::for_tenant("t1");
    let id = open(&engine, &ctx).await;

    let view = engine
        .add_item(&ctx, &id, line("p1", 1000, 1))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(view.applied_promotions.len(), 1);
    assert_eq!(view.applied_promotions[0].promotion_id.as_str(), "b");
    assert_eq!(view.final_total.cents(), 800);
}

#[tokio::test]
async fn get_totals_is_idempotent() {
    let catalog = InMemoryCatalog::new();
    let mut drinks = promotion("drinks", 1, true, 15);
    drinks.rules[0]
        .condition
        .category_ids
        .insert(CategoryId::new("drinks"));
    catalog.upsert(TenantId::new("t1"), drinks).unwrap();

    let engine = engine_with(Arc::new(catalog));
    let ctx = CallContext::for_tenant("t1");
    let id = open(&engine, &ctx).await;

    let mut cola = line("cola", 199, 4);
    cola.category_ids.insert(CategoryId::new("drinks"));
    engine.add_item(&ctx, &id, cola).await.unwrap();
    engine.add_item(&ctx, &id, line("chips", 249, 1)).await.unwrap();

    let first = engine.get_totals(&ctx, &id).await.unwrap().unwrap();
    let second = engine.get_session(&ctx, &id).await.unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(
        first.final_total,
        first.original_total - first.total_discount_amount
    );
    // 15% of 7.96 = 1.194 → 1.19
    assert_eq!(first.total_discount_amount.cents(), 119);
}

#[tokio::test]
async fn tenants_are_isolated() {
    let engine = engine_with(Arc::new(InMemoryCatalog::new()));
    let owner = CallContext::for_tenant("t1");
    let intruder = CallContext::for_tenant("t2");
    let id = open(&engine, &owner).await;
    engine
        .add_item(&owner, &id, line("p1", 1000, 1))
        .await
        .unwrap();

    assert!(engine.get_totals(&intruder, &id).await.unwrap().is_none());
    assert!(engine.clear(&intruder, &id).await.unwrap().is_none());
    assert!(engine
        .add_item(&intruder, &id, line("p2", 500, 1))
        .await
        .unwrap()
        .is_none());
    assert!(engine
        .get_totals(&CallContext::anonymous(), &id)
        .await
        .unwrap()
        .is_none());

    let view = engine.get_totals(&owner, &id).await.unwrap().unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.final_total.cents(), 1000);
}

#[tokio::test]
async fn clear_keeps_session_identity() {
    let engine = engine_with(Arc::new(InMemoryCatalog::new()));
    let ctx = CallContext::for_tenant("t1");
    let id = open(&engine, &ctx).await;
    engine.add_item(&ctx, &id, line("p1", 1000, 1)).await.unwrap();
    engine
        .apply_coupons(&ctx, &id, &["SAVE10".to_string()])
        .await
        .unwrap();

    let view = engine.clear(&ctx, &id).await.unwrap().unwrap();

    assert_eq!(view.session_id, id);
    assert!(view.is_empty());
    assert!(view.coupon_codes.is_empty());
    assert_eq!(view.pricing, PricingStatus::EmptyCart);
}

#[tokio::test]
async fn limits_are_enforced() {
    let mut config = EngineConfig::default();
    config.limits.max_lines = 1;
    config.limits.max_line_quantity = 5;
    let engine = CartSessionEngine::new(
        Arc::new(InMemorySessionStore::new()),
        Arc::new(InMemoryCatalog::new()),
        &config,
    );
    let ctx = CallContext::for_tenant("t1");
    let id = open(&engine, &ctx).await;

    engine.add_item(&ctx, &id, line("p1", 100, 4)).await.unwrap();

    let err = engine
        .add_item(&ctx, &id, line("p1", 100, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidMutation(_)));

    let err = engine
        .add_item(&ctx, &id, line("p2", 100, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidMutation(_)));

    let view = engine.get_totals(&ctx, &id).await.unwrap().unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].quantity, 4);
}

#[tokio::test]
async fn exhausted_promotion_stops_applying() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let tenant = TenantId::new("t1");
    let mut once = promotion("once", 1, true, 50);
    once.max_uses = Some(1);
    catalog.upsert(tenant.clone(), once).unwrap();

    let engine = engine_with(catalog.clone());
    let ctx = CallContext::for_tenant("t1");
    let id = open(&engine, &ctx).await;

    let view = engine
        .add_item(&ctx, &id, line("p1", 1000, 1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(view.final_total.cents(), 500);

    catalog
        .record_redemption(&tenant, &PromotionId::new("once"))
        .unwrap();

    let view = engine.get_totals(&ctx, &id).await.unwrap().unwrap();
    assert_eq!(view.final_total.cents(), 1000);
    assert!(view.applied_promotions.is_empty());
}

// =============================================================================
// Concurrency & Cancellation
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_lose_no_updates() {
    let engine = Arc::new(engine_with(Arc::new(InMemoryCatalog::new())));
    let ctx = CallContext::for_tenant("t1");
    let id = open(&engine, &ctx).await;

    let mut tasks = Vec::new();
    for _ in 0..100 {
        let engine = Arc::clone(&engine);
        let ctx = ctx.clone();
        let id = id.clone();
        tasks.push(tokio::spawn(async move {
            engine.add_item(&ctx, &id, line("p1", 100, 1)).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let view = engine.get_totals(&ctx, &id).await.unwrap().unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].quantity, 100);
    assert_eq!(view.final_total.cents(), 10_000);
}

#[tokio::test(start_paused = true)]
async fn cancelled_mutation_commits_nothing() {
    let engine = Arc::new(engine_with(Arc::new(SlowCatalog {
        delay: Duration::from_secs(1),
    })));
    let ctx = CallContext::for_tenant("t1");
    let id = open(&engine, &ctx).await;

    let token = CancelSignal::new();
    let cancellable = ctx.clone().with_cancellation(token.clone());

    let task = {
        let engine = Arc::clone(&engine);
        let id = id.clone();
        tokio::spawn(async move { engine.add_item(&cancellable, &id, line("p1", 100, 1)).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    token.cancel();

    let result = task.await.unwrap();
    assert_eq!(result.unwrap_err(), EngineError::Cancelled);

    let key = SessionKey::new(TenantId::new("t1"), id);
    let stored = engine.store().get(&key).await.unwrap();
    assert!(stored.is_empty());
}

#[tokio::test(start_paused = true)]
async fn reaper_evicts_idle_sessions() {
    let start: DateTime<Utc> = Utc::now();
    let clock = Arc::new(ManualClock::new(start));
    let engine = engine_with(Arc::new(InMemoryCatalog::new())).with_clock(clock.clone());
    let ctx = CallContext::for_tenant("t1");

    let idle = open(&engine, &ctx).await;
    let settings = ReaperSettings {
        enabled: true,
        idle_ttl_secs: 300,
        sweep_interval_secs: 30,
    };
    let reaper = engine.start_reaper(&settings).unwrap();

    clock.advance(chrono::Duration::minutes(10));
    let active = open(&engine, &ctx).await;

    tokio::time::sleep(Duration::from_secs(31)).await;

    assert!(engine.get_totals(&ctx, &idle).await.unwrap().is_none());
    assert!(engine.get_totals(&ctx, &active).await.unwrap().is_some());
    assert_eq!(engine.store().len().await, 1);

    reaper.shutdown().await;
}

#[tokio::test]
async fn disabled_reaper_is_not_started() {
    let engine = engine_with(Arc::new(InMemoryCatalog::new()));
    assert!(engine.start_reaper(&ReaperSettings::default()).is_none());
}

#[tokio::test]
async fn unknown_line_update_is_a_no_op() {
    let engine = engine_with(Arc::new(InMemoryCatalog::new()));
    let ctx = CallContext::for_tenant("t1");
    let id = open(&engine, &ctx).await;
    engine.add_item(&ctx, &id, line("p1", 1000, 1)).await.unwrap();

    let view = engine
        .update_item_quantity(&ctx, &id, &LineId::new("nope"), 7)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(view.items[0].quantity, 1);
}
