//! # Cart Session Engine
//!
//! The façade callers use. Every operation returns a view whose totals come
//! from a full recalculation against the cart as it is after the operation.
//!
//! ## Recalculation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Mutation (add / remove / update / coupons / clear)   │
//! │                                                                         │
//! │  1. Tenant from CallContext      none → "no session" (None)             │
//! │  2. Validate input               bad → InvalidMutation, store untouched │
//! │  3. store.lease(key)             same key waits here                    │
//! │  4. Apply mutation to a draft    limit hit → InvalidMutation            │
//! │  5. Price the draft                                                     │
//! │       empty cart ─────────────► EmptyCart, evaluator skipped            │
//! │       evaluator ok ───────────► Evaluated                               │
//! │       catalog down / timeout ─► warn!, Degraded (undiscounted)          │
//! │  6. lease.commit(draft)          only if steps 3-5 completed            │
//! │  7. Return CartSessionView                                              │
//! │                                                                         │
//! │  Steps 3-5 race the caller's cancellation signal. If it fires first,    │
//! │  the lease is dropped uncommitted and the caller gets Cancelled.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use carta_core::cart::{CartLimits, CartSession, NewCartLine, NewSession};
use carta_core::error::CoreResult;
use carta_core::types::{CurrencyCode, CustomerId, LineId, SalesChannel, SessionId};
use carta_core::validation;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::catalog::PromotionCatalog;
use crate::clock::{Clock, SystemClock};
use crate::config::{EngineConfig, ReaperSettings};
use crate::context::CallContext;
use crate::error::{EngineError, EngineResult};
use crate::pricing::PromotionEvaluator;
use crate::reaper::{ReaperHandle, SessionReaper};
use crate::store::{SessionKey, SessionLease, SessionStore};
use crate::view::{CartSessionView, PricingStatus};

/// Attributes of a new session. A missing currency falls back to the
/// configured default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateSession {
    pub customer_id: Option<CustomerId>,
    pub sales_channel: Option<SalesChannel>,
    pub currency: Option<String>,
}

/// Orchestrates the session store and the promotion evaluator.
pub struct CartSessionEngine<S: SessionStore> {
    store: Arc<S>,
    evaluator: PromotionEvaluator,
    clock: Arc<dyn Clock>,
    limits: CartLimits,
    default_currency: CurrencyCode,
}

impl<S: SessionStore> CartSessionEngine<S> {
    pub fn new(store: Arc<S>, catalog: Arc<dyn PromotionCatalog>, config: &EngineConfig) -> Self {
        CartSessionEngine {
            store,
            evaluator: PromotionEvaluator::new(catalog, config.engine.catalog_timeout()),
            clock: Arc::new(SystemClock),
            limits: config.limits,
            default_currency: config.engine.currency(),
        }
    }

    /// Replaces the wall clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Starts the idle-session reaper on this engine's store and clock.
    /// Returns `None` when the reaper is disabled.
    pub fn start_reaper(&self, settings: &ReaperSettings) -> Option<ReaperHandle> {
        if !settings.enabled {
            debug!("Session reaper disabled");
            return None;
        }
        Some(SessionReaper::spawn(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            settings,
        ))
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Opens an empty session for the caller's tenant.
    ///
    /// ## Errors
    /// - `InvalidTenant` if the context carries no tenant
    /// - `InvalidMutation` if the currency is malformed
    /// - `Cancelled` if the caller cancelled before the session was stored
    pub async fn create_session(
        &self,
        ctx: &CallContext,
        request: CreateSession,
    ) -> EngineResult<CartSessionView> {
        let tenant_id = ctx.tenant().cloned().ok_or(EngineError::InvalidTenant)?;

        let currency = match request.currency.as_deref() {
            Some(code) => {
                validation::validate_currency(code)?;
                CurrencyCode::new(code)
            }
            None => self.default_currency.clone(),
        };

        if ctx.cancellation().is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let session = CartSession::open(
            tenant_id,
            NewSession {
                customer_id: request.customer_id,
                sales_channel: request.sales_channel,
                currency,
            },
            self.clock.now(),
        );
        let view = CartSessionView::undiscounted(&session, PricingStatus::EmptyCart);
        let key = self.store.insert(session).await;

        info!(tenant_id = %key.tenant_id, session_id = %key.session_id, "Cart session created");
        Ok(view)
    }

    /// Adds a product, or bumps the quantity of its line.
    pub async fn add_item(
        &self,
        ctx: &CallContext,
        session_id: &SessionId,
        line: NewCartLine,
    ) -> EngineResult<Option<CartSessionView>> {
        validation::validate_new_line(&line, &self.limits)?;

        let limits = self.limits;
        self.run_mutation(ctx, session_id, "add_item", move |draft, now| {
            draft.add_item(line, &limits, now).map(|_| ())
        })
        .await
    }

    /// Removes a line. Removing an unknown line is a no-op.
    pub async fn remove_item(
        &self,
        ctx: &CallContext,
        session_id: &SessionId,
        line_id: &LineId,
    ) -> EngineResult<Option<CartSessionView>> {
        let line_id = line_id.clone();
        self.run_mutation(ctx, session_id, "remove_item", move |draft, now| {
            draft.remove_line(&line_id, now);
            Ok(())
        })
        .await
    }

    /// Sets a line's quantity; `quantity ≤ 0` removes the line.
    pub async fn update_item_quantity(
        &self,
        ctx: &CallContext,
        session_id: &SessionId,
        line_id: &LineId,
        quantity: i64,
    ) -> EngineResult<Option<CartSessionView>> {
        let line_id = line_id.clone();
        let limits = self.limits;
        self.run_mutation(ctx, session_id, "update_item_quantity", move |draft, now| {
            draft.set_quantity(&line_id, quantity, &limits, now).map(|_| ())
        })
        .await
    }

    /// Replaces the coupon set. Blank entries are dropped.
    pub async fn apply_coupons(
        &self,
        ctx: &CallContext,
        session_id: &SessionId,
        codes: &[String],
    ) -> EngineResult<Option<CartSessionView>> {
        validation::validate_coupon_codes(codes, &self.limits)?;

        let codes = codes.to_vec();
        self.run_mutation(ctx, session_id, "apply_coupons", move |draft, now| {
            draft.replace_coupons(&codes, now);
            Ok(())
        })
        .await
    }

    /// Removes all lines and coupons; identity and metadata are kept.
    pub async fn clear(
        &self,
        ctx: &CallContext,
        session_id: &SessionId,
    ) -> EngineResult<Option<CartSessionView>> {
        self.run_mutation(ctx, session_id, "clear", |draft, now| {
            draft.clear(now);
            Ok(())
        })
        .await
    }

    /// Recalculates totals without changing the session.
    pub async fn get_totals(
        &self,
        ctx: &CallContext,
        session_id: &SessionId,
    ) -> EngineResult<Option<CartSessionView>> {
        let Some(key) = self.key(ctx, session_id) else {
            return Ok(None);
        };
        let cancel = ctx.cancellation();
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let work = async {
            match self.store.get(&key).await {
                Some(session) => Some(self.price(&session, self.clock.now()).await),
                None => None,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EngineError::Cancelled),
            view = work => Ok(view),
        }
    }

    /// Same as [`get_totals`](Self::get_totals).
    pub async fn get_session(
        &self,
        ctx: &CallContext,
        session_id: &SessionId,
    ) -> EngineResult<Option<CartSessionView>> {
        self.get_totals(ctx, session_id).await
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    fn key(&self, ctx: &CallContext, session_id: &SessionId) -> Option<SessionKey> {
        ctx.tenant()
            .map(|tenant| SessionKey::new(tenant.clone(), session_id.clone()))
    }

    /// Lease, mutate a draft, price it, commit.
    async fn run_mutation<F>(
        &self,
        ctx: &CallContext,
        session_id: &SessionId,
        operation: &'static str,
        mutation: F,
    ) -> EngineResult<Option<CartSessionView>>
    where
        F: FnOnce(&mut CartSession, DateTime<Utc>) -> CoreResult<()> + Send,
    {
        let Some(key) = self.key(ctx, session_id) else {
            debug!(operation, "No tenant in context; session not found");
            return Ok(None);
        };
        let cancel = ctx.cancellation();
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        debug!(tenant_id = %key.tenant_id, session_id = %key.session_id, operation, "Mutating session");

        let prepared = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(tenant_id = %key.tenant_id, session_id = %key.session_id, operation, "Cancelled; nothing committed");
                return Err(EngineError::Cancelled);
            }
            prepared = self.prepare(&key, mutation) => prepared?,
        };

        Ok(prepared.map(|(lease, draft, view)| {
            lease.commit(draft);
            view
        }))
    }

    async fn prepare<F>(
        &self,
        key: &SessionKey,
        mutation: F,
    ) -> EngineResult<Option<(S::Lease, CartSession, CartSessionView)>>
    where
        F: FnOnce(&mut CartSession, DateTime<Utc>) -> CoreResult<()> + Send,
    {
        let Some(lease) = self.store.lease(key).await else {
            return Ok(None);
        };

        let now = self.clock.now();
        let mut draft = lease.session().clone();
        mutation(&mut draft, now)?;

        let view = self.price(&draft, now).await;
        Ok(Some((lease, draft, view)))
    }

    /// Builds the view for a session, falling back to undiscounted totals
    /// when the evaluator fails.
    async fn price(&self, session: &CartSession, now: DateTime<Utc>) -> CartSessionView {
        if session.is_empty() {
            return CartSessionView::undiscounted(session, PricingStatus::EmptyCart);
        }

        match self.evaluator.evaluate(session, now).await {
            Ok(result) => CartSessionView::compose(session, &result, PricingStatus::Evaluated),
            Err(err) => {
                warn!(
                    tenant_id = %session.tenant_id,
                    session_id = %session.id,
                    error = %err,
                    "Promotion evaluation unavailable; returning undiscounted totals"
                );
                CartSessionView::undiscounted(session, PricingStatus::Degraded)
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MockPromotionCatalog;
    use crate::clock::ManualClock;
    use crate::error::CatalogError;
    use crate::store::InMemorySessionStore;
    use carta_core::types::ProductId;
    use carta_core::Money;
    use std::collections::BTreeSet;

    fn line(product: &str, price_cents: i64, quantity: i64) -> NewCartLine {
        NewCartLine {
            product_id: ProductId::new(product),
            product_code: None,
            product_name: format!("Product {}", product),
            unit_price: Money::from_cents(price_cents),
            quantity,
            category_ids: BTreeSet::new(),
        }
    }

    fn engine(catalog: MockPromotionCatalog) -> CartSessionEngine<InMemorySessionStore> {
        CartSessionEngine::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(catalog),
            &EngineConfig::default(),
        )
        .with_clock(Arc::new(ManualClock::new(Utc::now())))
    }

    #[tokio::test]
    async fn test_empty_cart_skips_catalog() {
        let mut catalog = MockPromotionCatalog::new();
        catalog.expect_candidate_promotions().times(0);
        let engine = engine(catalog);
        let ctx = CallContext::for_tenant("t1");

        let created = engine
            .create_session(&ctx, CreateSession::default())
            .await
            .unwrap();
        let view = engine
            .get_totals(&ctx, &created.session_id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(view.pricing, PricingStatus::EmptyCart);
        assert!(view.final_total.is_zero());
        assert_eq!(view.currency.as_str(), "EUR");
    }

    #[tokio::test]
    async fn test_catalog_failure_degrades_without_error() {
        let mut catalog = MockPromotionCatalog::new();
        catalog
            .expect_candidate_promotions()
            .times(1)
            .returning(|_| Err(CatalogError::Unavailable("down".into())));
        let engine = engine(catalog);
        let ctx = CallContext::for_tenant("t1");

        let created = engine
            .create_session(&ctx, CreateSession::default())
            .await
            .unwrap();
        let view = engine
            .add_item(&ctx, &created.session_id, line("p1", 1000, 1))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(view.pricing, PricingStatus::Degraded);
        assert_eq!(view.final_total.cents(), 1000);
        assert!(view.applied_promotions.is_empty());

        // the mutation itself was committed
        let stored = engine.store().get(&SessionKey::new("t1".into(), created.session_id)).await;
        assert_eq!(stored.unwrap().total_quantity(), 1);
    }

    #[tokio::test]
    async fn test_create_requires_tenant() {
        let engine = engine(MockPromotionCatalog::new());
        let err = engine
            .create_session(&CallContext::anonymous(), CreateSession::default())
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::InvalidTenant);
        assert_eq!(engine.store().len().await, 0);
    }

    #[tokio::test]
    async fn test_blank_tenant_is_no_tenant() {
        let engine = engine(MockPromotionCatalog::new());
        let owner = CallContext::for_tenant("t1");
        let id = engine
            .create_session(&owner, CreateSession::default())
            .await
            .unwrap()
            .session_id;

        let blank = CallContext::for_tenant("  ");
        let err = engine
            .create_session(&blank, CreateSession::default())
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::InvalidTenant);
        assert!(engine.get_totals(&blank, &id).await.unwrap().is_none());
        assert!(engine.clear(&blank, &id).await.unwrap().is_none());
        assert_eq!(engine.store().len().await, 1);
    }

    #[tokio::test]
    async fn test_create_with_explicit_currency() {
        let engine = engine(MockPromotionCatalog::new());
        let ctx = CallContext::for_tenant("t1");

        let view = engine
            .create_session(
                &ctx,
                CreateSession {
                    currency: Some(" usd ".to_string()),
                    ..CreateSession::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(view.currency.as_str(), "USD");

        let err = engine
            .create_session(
                &ctx,
                CreateSession {
                    currency: Some("dollars".to_string()),
                    ..CreateSession::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidMutation(_)));
    }

    #[tokio::test]
    async fn test_invalid_mutation_leaves_store_untouched() {
        let mut catalog = MockPromotionCatalog::new();
        catalog
            .expect_candidate_promotions()
            .returning(|_| Ok(Vec::new()));
        let engine = engine(catalog);
        let ctx = CallContext::for_tenant("t1");
        let id = engine
            .create_session(&ctx, CreateSession::default())
            .await
            .unwrap()
            .session_id;

        let before = engine.get_totals(&ctx, &id).await.unwrap().unwrap();

        assert!(engine
            .add_item(&ctx, &id, line("p1", -100, 1))
            .await
            .is_err());
        assert!(engine
            .add_item(&ctx, &id, line("p1", 100, 0))
            .await
            .is_err());
        assert!(engine
            .apply_coupons(&ctx, &id, &["HAS SPACE".to_string()])
            .await
            .is_err());

        let after = engine.get_totals(&ctx, &id).await.unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_unknown_session_is_none() {
        let engine = engine(MockPromotionCatalog::new());
        let ctx = CallContext::for_tenant("t1");
        let missing = SessionId::new("missing");

        assert!(engine.get_totals(&ctx, &missing).await.unwrap().is_none());
        assert!(engine.clear(&ctx, &missing).await.unwrap().is_none());
        assert!(engine
            .add_item(&ctx, &missing, line("p1", 100, 1))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_pre_cancelled_call_commits_nothing() {
        let mut catalog = MockPromotionCatalog::new();
        catalog.expect_candidate_promotions().times(0);
        let engine = engine(catalog);
        let ctx = CallContext::for_tenant("t1");
        let id = engine
            .create_session(&ctx, CreateSession::default())
            .await
            .unwrap()
            .session_id;

        let cancelled = ctx.clone().with_cancellation({
            let token = crate::context::CancelSignal::new();
            token.cancel();
            token
        });

        let err = engine
            .add_item(&cancelled, &id, line("p1", 100, 1))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::Cancelled);

        let view = engine.get_totals(&ctx, &id).await.unwrap().unwrap();
        assert!(view.is_empty());
    }
}
