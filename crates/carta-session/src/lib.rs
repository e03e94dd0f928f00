//! # carta-session: Cart Session Engine for Carta
//!
//! This crate keeps live cart sessions per tenant and recomputes their
//! totals, through the promotion evaluator in `carta-core`, after every
//! mutation.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Session Engine Architecture                        │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 CartSessionEngine (engine.rs)                    │  │
//! │  │                                                                  │  │
//! │  │  create_session · add_item · remove_item · update_item_quantity  │  │
//! │  │  apply_coupons · clear · get_totals · get_session                │  │
//! │  └───────┬───────────────────────┬───────────────────────┬──────────┘  │
//! │          ▼                       ▼                       ▼             │
//! │  ┌────────────────┐  ┌────────────────────┐  ┌────────────────────┐    │
//! │  │ SessionStore   │  │ PromotionEvaluator │  │ Clock              │    │
//! │  │                │  │                    │  │                    │    │
//! │  │ per-key lease  │  │ catalog + timeout  │  │ SystemClock        │    │
//! │  │ DashMap shards │  │ → apply_promotions │  │ ManualClock        │    │
//! │  └───────▲────────┘  └─────────┬──────────┘  └────────────────────┘    │
//! │          │                     ▼                                       │
//! │  ┌───────┴────────┐  ┌────────────────────┐                            │
//! │  │ SessionReaper  │  │ PromotionCatalog   │                            │
//! │  │ idle TTL sweep │  │ InMemoryCatalog    │                            │
//! │  └────────────────┘  └────────────────────┘                            │
//! │                                                                         │
//! │  Every call carries a CallContext: tenant id + cancellation token.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`engine`] - `CartSessionEngine`, the recalculation pipeline
//! - [`store`] - `SessionStore` trait and the in-memory store
//! - [`catalog`] - `PromotionCatalog` trait and the in-memory catalog
//! - [`pricing`] - Catalog lookup + evaluator, under a timeout
//! - [`view`] - `CartSessionView` returned by every operation
//! - [`context`] - Tenant and cancellation per call
//! - [`clock`] - Injectable time source
//! - [`reaper`] - Idle-session eviction task
//! - [`config`] - `EngineConfig` (TOML + environment)
//! - [`telemetry`] - Tracing setup
//! - [`error`] - Engine error types
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use carta_session::{
//!     CallContext, CartSessionEngine, CreateSession, EngineConfig, InMemoryCatalog,
//!     InMemorySessionStore,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::load(None)?;
//! let engine = CartSessionEngine::new(
//!     Arc::new(InMemorySessionStore::new()),
//!     Arc::new(InMemoryCatalog::new()),
//!     &config,
//! );
//!
//! let ctx = CallContext::for_tenant("tenant-1");
//! let view = engine.create_session(&ctx, CreateSession::default()).await?;
//! assert!(view.final_total.is_zero());
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod clock;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod pricing;
pub mod reaper;
pub mod store;
pub mod telemetry;
pub mod view;

pub use catalog::{CatalogQuery, InMemoryCatalog, PromotionCatalog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use context::{CallContext, CancelSignal};
pub use engine::{CartSessionEngine, CreateSession};
pub use error::{CatalogError, ConfigError, EngineError, EngineResult, EvaluationError};
pub use pricing::PromotionEvaluator;
pub use reaper::{ReaperHandle, SessionReaper};
pub use store::{InMemorySessionStore, SessionKey, SessionLease, SessionStore};
pub use view::{CartLineView, CartSessionView, PricingStatus};
