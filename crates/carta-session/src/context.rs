//! # Call Context
//!
//! Per-call inputs that are not part of an operation's arguments: the
//! resolved tenant and the caller's cancellation signal.
//!
//! ```text
//! ┌────────────────────┐      ┌───────────────────────────────────────┐
//! │ identity / API     │      │ CallContext                           │
//! │ layer              │─────►│   tenant: Option<TenantId>            │
//! │ (out of workspace) │      │   cancel: CancelSignal                │
//! └────────────────────┘      └───────────────────────────────────────┘
//! ```
//!
//! The tenant always comes from here, never from a request body.

use carta_core::TenantId;
use tokio::sync::watch;

// =============================================================================
// Cancellation
// =============================================================================

/// Cloneable cancellation signal.
///
/// All clones observe the same flag. Cancelling is sticky: once fired, every
/// current and future [`cancelled`](Self::cancelled) call completes at once.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        CancelSignal {
            tx: std::sync::Arc::new(tx),
        }
    }

    /// Fires the signal.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Completes once the signal has fired.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only errors after drop.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

// =============================================================================
// Call Context
// =============================================================================

/// Context every engine operation is called with.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    tenant: Option<TenantId>,
    cancel: CancelSignal,
}

impl CallContext {
    /// Context for a resolved tenant. A blank tenant id counts as no tenant.
    pub fn for_tenant(tenant: impl Into<TenantId>) -> Self {
        let tenant: TenantId = tenant.into();
        CallContext {
            tenant: (!tenant.as_str().trim().is_empty()).then_some(tenant),
            cancel: CancelSignal::new(),
        }
    }

    /// Context without a tenant. Creation fails and lookups find nothing.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Replaces the cancellation signal.
    pub fn with_cancellation(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn tenant(&self) -> Option<&TenantId> {
        self.tenant.as_ref()
    }

    pub fn cancellation(&self) -> &CancelSignal {
        &self.cancel
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
