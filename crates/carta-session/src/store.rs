//! # Cart Session Store
//!
//! Tenant-scoped registry of live cart sessions.
//!
//! ## Locking Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    InMemorySessionStore                                 │
//! │                                                                         │
//! │  DashMap<SessionKey, Slot>          (sharded, no global lock)           │
//! │     │                                                                   │
//! │     ├── (t1, s-001) ──► Arc<Mutex<Option<CartSession>>>                │
//! │     ├── (t1, s-002) ──► Arc<Mutex<Option<CartSession>>>                │
//! │     └── (t2, s-001) ──► Arc<Mutex<Option<CartSession>>>                │
//! │                                                                         │
//! │  lease(key):                                                            │
//! │    1. clone the slot Arc out of the map (shard lock released)          │
//! │    2. await the slot mutex  → same key queues, other keys don't        │
//! │    3. hand out the owned guard; commit() writes, drop() discards       │
//! │                                                                         │
//! │  evict_idle(cutoff):                                                    │
//! │    try_lock each slot; leased slots are skipped, idle ones are         │
//! │    emptied (None) and removed so a late lease sees "not found"         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The key carries the tenant, so a session is unreachable from any other
//! tenant: a cross-tenant lookup is indistinguishable from an unknown id.

use std::sync::Arc;

use async_trait::async_trait;
use carta_core::cart::CartSession;
use carta_core::types::{SessionId, TenantId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

// =============================================================================
// Session Key
// =============================================================================

/// Namespaced key: tenant id + session id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub tenant_id: TenantId,
    pub session_id: SessionId,
}

impl SessionKey {
    pub fn new(tenant_id: TenantId, session_id: SessionId) -> Self {
        SessionKey {
            tenant_id,
            session_id,
        }
    }

    /// Key of an existing session.
    pub fn of(session: &CartSession) -> Self {
        Self::new(session.tenant_id.clone(), session.id.clone())
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.session_id)
    }
}

// =============================================================================
// Store Traits
// =============================================================================

/// Exclusive hold on one session.
///
/// Other leases and mutations of the same key wait until this one is
/// committed or dropped. Dropping without [`commit`](Self::commit) leaves
/// the stored session untouched.
pub trait SessionLease: Send {
    /// Session as currently stored.
    fn session(&self) -> &CartSession;

    /// Replaces the stored session and releases the lease.
    fn commit(self, session: CartSession);
}

/// Storage for live cart sessions.
///
/// Absence is never an error: lookups on unknown keys return `None`.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    type Lease: SessionLease;

    /// Stores a new session and returns its key.
    async fn insert(&self, session: CartSession) -> SessionKey;

    /// Snapshot of a session.
    async fn get(&self, key: &SessionKey) -> Option<CartSession>;

    /// Waits for exclusive access to a session.
    async fn lease(&self, key: &SessionKey) -> Option<Self::Lease>;

    /// Removes sessions last updated before `cutoff`. Leased sessions are
    /// skipped. Returns the number removed.
    async fn evict_idle(&self, cutoff: DateTime<Utc>) -> usize;

    /// Number of stored sessions.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Applies `f` atomically and returns the updated session.
    async fn mutate<F>(&self, key: &SessionKey, f: F) -> Option<CartSession>
    where
        F: FnOnce(&mut CartSession) + Send,
    {
        let lease = self.lease(key).await?;
        let mut session = lease.session().clone();
        f(&mut session);
        lease.commit(session.clone());
        Some(session)
    }

    /// Removes all lines and coupon codes; identity and metadata are kept.
    async fn clear(&self, key: &SessionKey, now: DateTime<Utc>) -> Option<CartSession> {
        self.mutate(key, |session| session.clear(now)).await
    }
}

// =============================================================================
// In-memory Store
// =============================================================================

type Slot = Arc<Mutex<Option<CartSession>>>;

/// Process-local store backed by a sharded concurrent map.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<SessionKey, Slot>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &SessionKey) -> Option<Slot> {
        self.sessions.get(key).map(|entry| Arc::clone(entry.value()))
    }
}

/// Lease on an [`InMemorySessionStore`] slot.
pub struct InMemoryLease {
    guard: OwnedMutexGuard<Option<CartSession>>,
    snapshot: CartSession,
}

impl SessionLease for InMemoryLease {
    fn session(&self) -> &CartSession {
        &self.snapshot
    }

    fn commit(mut self, session: CartSession) {
        *self.guard = Some(session);
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    type Lease = InMemoryLease;

    async fn insert(&self, session: CartSession) -> SessionKey {
        let key = SessionKey::of(&session);
        self.sessions
            .insert(key.clone(), Arc::new(Mutex::new(Some(session))));
        key
    }

    async fn get(&self, key: &SessionKey) -> Option<CartSession> {
        let slot = self.slot(key)?;
        let guard = slot.lock().await;
        guard.clone()
    }

    async fn lease(&self, key: &SessionKey) -> Option<InMemoryLease> {
        let slot = self.slot(key)?;
        let guard = slot.lock_owned().await;
        // An evicted slot is emptied before removal.
        let snapshot = (*guard).clone()?;
        Some(InMemoryLease { guard, snapshot })
    }

    async fn evict_idle(&self, cutoff: DateTime<Utc>) -> usize {
        let mut evicted = 0;

        self.sessions.retain(|key, slot| {
            // A slot that is leased right now is not idle.
            let Ok(mut guard) = slot.try_lock() else {
                return true;
            };
            match guard.as_ref().map(|session| session.updated_at < cutoff) {
                Some(true) => {
                    debug!(session = %key, "Evicting idle session");
                    *guard = None;
                    evicted += 1;
                    false
                }
                Some(false) => true,
                None => false,
            }
        });

        evicted
    }

    async fn len(&self) -> usize {
        self.sessions.len()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use carta_core::cart::{CartLimits, NewCartLine, NewSession};
    use carta_core::types::ProductId;
    use carta_core::Money;
    use chrono::Duration;
    use std::collections::BTreeSet;

    fn session(tenant: &str, now: DateTime<Utc>) -> CartSession {
        CartSession::open(TenantId::new(tenant), NewSession::default(), now)
    }

    fn coffee(quantity: i64) -> NewCartLine {
        NewCartLine {
            product_id: ProductId::new("coffee"),
            product_code: None,
            product_name: "Coffee".to_string(),
            unit_price: Money::from_cents(300),
            quantity,
            category_ids: BTreeSet::new(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemorySessionStore::new();
        let key = store.insert(session("t1", Utc::now())).await;

        let found = store.get(&key).await.unwrap();
        assert_eq!(found.id, key.session_id);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_cross_tenant_lookup_is_not_found() {
        let store = InMemorySessionStore::new();
        let key = store.insert(session("t1", Utc::now())).await;

        let foreign = SessionKey::new(TenantId::new("t2"), key.session_id.clone());
        assert!(store.get(&foreign).await.is_none());
        assert!(store.lease(&foreign).await.is_none());
        assert!(store.mutate(&foreign, |s| s.clear(Utc::now())).await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_lease_discards_changes() {
        let store = InMemorySessionStore::new();
        let key = store.insert(session("t1", Utc::now())).await;

        {
            let lease = store.lease(&key).await.unwrap();
            let mut draft = lease.session().clone();
            draft
                .add_item(coffee(1), &CartLimits::default(), Utc::now())
                .unwrap();
            // dropped without commit
        }

        assert!(store.get(&key).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mutate_and_clear() {
        let store = InMemorySessionStore::new();
        let key = store.insert(session("t1", Utc::now())).await;

        let updated = store
            .mutate(&key, |s| {
                s.add_item(coffee(2), &CartLimits::default(), Utc::now())
                    .unwrap();
                s.replace_coupons(&["SAVE10"], Utc::now());
            })
            .await
            .unwrap();
        assert_eq!(updated.total_quantity(), 2);

        let cleared = store.clear(&key, Utc::now()).await.unwrap();
        assert!(cleared.is_empty());
        assert!(cleared.coupon_codes.is_empty());
        assert_eq!(cleared.id, key.session_id);
    }

    #[tokio::test]
    async fn test_same_key_mutations_are_serialized() {
        let store = Arc::new(InMemorySessionStore::new());
        let key = store.insert(session("t1", Utc::now())).await;

        let mut tasks = Vec::new();
        for _ in 0..50 {
            let store = Arc::clone(&store);
            let key = key.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .mutate(&key, |s| {
                        s.add_item(coffee(1), &CartLimits::default(), Utc::now())
                            .unwrap();
                    })
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.get(&key).await.unwrap().total_quantity(), 50);
    }

    #[tokio::test]
    async fn test_evict_idle_skips_fresh_and_leased() {
        let store = InMemorySessionStore::new();
        let now = Utc::now();

        let stale = store.insert(session("t1", now - Duration::hours(2))).await;
        let fresh = store.insert(session("t1", now)).await;
        let leased = store.insert(session("t2", now - Duration::hours(2))).await;

        let lease = store.lease(&leased).await.unwrap();
        let evicted = store.evict_idle(now - Duration::hours(1)).await;

        assert_eq!(evicted, 1);
        assert!(store.get(&stale).await.is_none());
        assert!(store.get(&fresh).await.is_some());
        drop(lease);
        assert!(store.get(&leased).await.is_some());
    }

    #[tokio::test]
    async fn test_lease_after_eviction_is_not_found() {
        let store = InMemorySessionStore::new();
        let now = Utc::now();
        let key = store.insert(session("t1", now - Duration::hours(2))).await;

        let slot = store.slot(&key).unwrap();
        store.evict_idle(now).await;

        assert!(slot.lock().await.is_none());
        assert!(store.lease(&key).await.is_none());
    }
}
