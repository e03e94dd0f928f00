//! # Pricing Facade
//!
//! Joins the promotion catalog and the pure evaluator.
//!
//! ```text
//!  CartSession ──► CatalogQuery ──► catalog (≤ timeout) ──► candidates
//!                                                               │
//!  CartSession ──► PricingInput ─────────────────────────► apply_promotions
//!                                                               │
//!                                              PromotionApplicationResult
//! ```

use std::sync::Arc;
use std::time::Duration;

use carta_core::cart::CartSession;
use carta_core::evaluator::{apply_promotions, PricingInput, PromotionApplicationResult};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::catalog::{CatalogQuery, PromotionCatalog};
use crate::error::EvaluationError;

/// Prices carts against a promotion catalog.
#[derive(Clone)]
pub struct PromotionEvaluator {
    catalog: Arc<dyn PromotionCatalog>,
    timeout: Duration,
}

impl PromotionEvaluator {
    pub fn new(catalog: Arc<dyn PromotionCatalog>, timeout: Duration) -> Self {
        PromotionEvaluator { catalog, timeout }
    }

    /// Fetches candidates for the session's tenant and applies them.
    ///
    /// ## Errors
    /// - `Catalog` if the catalog call fails
    /// - `Timeout` if it does not answer within the configured timeout
    pub async fn evaluate(
        &self,
        session: &CartSession,
        now: DateTime<Utc>,
    ) -> Result<PromotionApplicationResult, EvaluationError> {
        let query = CatalogQuery {
            tenant_id: session.tenant_id.clone(),
            customer_id: session.customer_id.clone(),
            sales_channel: session.sales_channel.clone(),
            now,
        };

        let candidates = tokio::time::timeout(
            self.timeout,
            self.catalog.candidate_promotions(&query),
        )
        .await
        .map_err(|_| EvaluationError::Timeout {
            ms: self.timeout.as_millis() as u64,
        })??;

        debug!(
            tenant_id = %session.tenant_id,
            session_id = %session.id,
            candidates = candidates.len(),
            "Evaluating promotions"
        );

        Ok(apply_promotions(
            &PricingInput::from_session(session, now),
            &candidates,
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
