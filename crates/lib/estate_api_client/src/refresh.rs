//! Single-flight session refresh.
//!
//! The first caller to need a refresh starts it; callers arriving while it is
//! pending await the same shared future and observe the same outcome. The
//! slot is cleared when the refresh settles, so a later caller starts anew.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use crate::error::RefreshFailure;

type PendingRefresh = Shared<BoxFuture<'static, Result<(), RefreshFailure>>>;

#[derive(Default)]
struct Slot {
    generation: u64,
    pending: Option<PendingRefresh>,
}

/// Coalesces concurrent refresh attempts into one in-flight request.
#[derive(Default)]
pub struct RefreshCoordinator {
    slot: Mutex<Slot>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a refresh is currently pending.
    pub fn in_flight(&self) -> bool {
        self.lock().pending.is_some()
    }

    /// Await the pending refresh, or start one with `start` if none is
    /// pending. `start` is not called when joining an existing refresh.
    pub async fn run<F, Fut>(&self, start: F) -> Result<(), RefreshFailure>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), RefreshFailure>> + Send + 'static,
    {
        let (generation, pending) = {
            let mut slot = self.lock();
            match &slot.pending {
                Some(pending) => (slot.generation, pending.clone()),
                None => {
                    slot.generation += 1;
                    let pending = start().boxed().shared();
                    slot.pending = Some(pending.clone());
                    (slot.generation, pending)
                }
            }
        };

        let outcome = pending.await;

        let mut slot = self.lock();
        if slot.generation == generation {
            slot.pending = None;
        }
        outcome
    }
}
