//! # Promotion Catalog
//!
//! The read-only source of candidate promotions, plus an in-memory
//! implementation.
//!
//! ## Catalog Seam
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  PromotionEvaluator ──► PromotionCatalog::candidate_promotions(query)   │
//! │                              │                                          │
//! │             ┌────────────────┼───────────────────────┐                  │
//! │             ▼                ▼                       ▼                  │
//! │     InMemoryCatalog    remote service           MockPromotionCatalog    │
//! │     (this module)      (out of workspace)       (tests)                 │
//! │                                                                         │
//! │  Contract:                                                              │
//! │  • returns promotions of query.tenant_id only                           │
//! │  • may return too much (expired, coupon-gated); the evaluator filters   │
//! │  • must not return promotions whose max_uses is exhausted               │
//! │  • may be slow or fail; the caller bounds it with a timeout             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Catalog Document Format
//! ```toml
//! [[tenants]]
//! id = "demo"
//!
//! [[tenants.promotions]]
//! id = "save10"
//! name = "Save 10%"
//! valid_from = "2024-01-01T00:00:00Z"
//! valid_to = "2030-12-31T23:59:59Z"
//! coupon_code = "SAVE10"
//! priority = 10
//! is_combinable = true
//!
//! [[tenants.promotions.rules]]
//! discount = { type = "percentage", rate = 1000 }
//! ```

use async_trait::async_trait;
use carta_core::promotion::Promotion;
use carta_core::types::{CustomerId, PromotionId, SalesChannel, TenantId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::CatalogError;

// =============================================================================
// Catalog Trait
// =============================================================================

/// Parameters of one candidate lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub tenant_id: TenantId,
    pub customer_id: Option<CustomerId>,
    pub sales_channel: Option<SalesChannel>,
    pub now: DateTime<Utc>,
}

/// Read-only lookup of promotions that may apply to a cart.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PromotionCatalog: Send + Sync {
    async fn candidate_promotions(
        &self,
        query: &CatalogQuery,
    ) -> Result<Vec<Promotion>, CatalogError>;
}

// =============================================================================
// In-memory Catalog
// =============================================================================

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    tenants: Vec<TenantDocument>,
}

#[derive(Debug, Deserialize)]
struct TenantDocument {
    id: TenantId,
    #[serde(default)]
    promotions: Vec<Promotion>,
}

/// Promotions held in memory, per tenant, with redemption counts.
///
/// ## Redemptions
/// ```text
/// max_uses = 2
///
/// record_redemption ─► 1   candidate
/// record_redemption ─► 2   exhausted → no longer a candidate
/// ```
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    promotions: DashMap<TenantId, Vec<Promotion>>,
    redemptions: DashMap<(TenantId, PromotionId), u32>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from a TOML document (see module docs).
    pub fn from_toml_str(contents: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = toml::from_str(contents)?;
        let catalog = Self::new();

        for tenant in document.tenants {
            for promotion in tenant.promotions {
                catalog.upsert(tenant.id.clone(), promotion)?;
            }
        }

        info!(
            tenants = catalog.promotions.len(),
            "Loaded promotion catalog"
        );
        Ok(catalog)
    }

    /// Reads and parses a catalog file.
    pub fn load(path: &std::path::Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::InvalidDocument(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Inserts a promotion, replacing any with the same id for the tenant.
    pub fn upsert(&self, tenant_id: TenantId, promotion: Promotion) -> Result<(), CatalogError> {
        if promotion.valid_from > promotion.valid_to {
            return Err(CatalogError::InvalidDocument(format!(
                "promotion {} ends before it starts",
                promotion.id
            )));
        }

        let mut promotions = self.promotions.entry(tenant_id).or_default();
        match promotions.iter_mut().find(|p| p.id == promotion.id) {
            Some(existing) => *existing = promotion,
            None => promotions.push(promotion),
        }
        Ok(())
    }

    /// Counts one redemption of a promotion. Returns the new count.
    pub fn record_redemption(
        &self,
        tenant_id: &TenantId,
        promotion_id: &PromotionId,
    ) -> Result<u32, CatalogError> {
        let known = self
            .promotions
            .get(tenant_id)
            .is_some_and(|promotions| promotions.iter().any(|p| &p.id == promotion_id));
        if !known {
            return Err(CatalogError::UnknownPromotion {
                tenant_id: tenant_id.to_string(),
                promotion_id: promotion_id.to_string(),
            });
        }

        let mut count = self
            .redemptions
            .entry((tenant_id.clone(), promotion_id.clone()))
            .or_insert(0);
        *count = count.saturating_add(1);

        debug!(tenant_id = %tenant_id, promotion_id = %promotion_id, uses = *count, "Recorded redemption");
        Ok(*count)
    }

    /// Redemptions recorded so far.
    pub fn redemptions(&self, tenant_id: &TenantId, promotion_id: &PromotionId) -> u32 {
        self.redemptions
            .get(&(tenant_id.clone(), promotion_id.clone()))
            .map_or(0, |count| *count)
    }

    fn is_exhausted(&self, tenant_id: &TenantId, promotion: &Promotion) -> bool {
        promotion
            .max_uses
            .is_some_and(|max| self.redemptions(tenant_id, &promotion.id) >= max)
    }
}

#[async_trait]
impl PromotionCatalog for InMemoryCatalog {
    async fn candidate_promotions(
        &self,
        query: &CatalogQuery,
    ) -> Result<Vec<Promotion>, CatalogError> {
        let Some(promotions) = self.promotions.get(&query.tenant_id) else {
            return Ok(Vec::new());
        };

        let candidates: Vec<Promotion> = promotions
            .iter()
            .filter(|p| p.is_active_at(query.now))
            .filter(|p| !self.is_exhausted(&query.tenant_id, p))
            .cloned()
            .collect();

        debug!(
            tenant_id = %query.tenant_id,
            candidates = candidates.len(),
            "Catalog lookup"
        );
        Ok(candidates)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
