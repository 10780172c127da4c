use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Single-slot "walk this root again" request.
///
/// Raising is set-if-absent, so redundant raises before a consume collapse
/// into one pending request. A walk blocked on queue capacity waits on
/// [`raised`](RewalkSignal::raised) to abandon the traversal.
#[derive(Debug, Default)]
pub struct RewalkSignal {
    pending: AtomicBool,
    notify: Notify,
}

impl RewalkSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` only for the raise that filled the slot
    pub fn raise(&self) -> bool {
        let raised = self
            .pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if raised {
            self.notify.notify_waiters();
        }
        raised
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Clear the slot, returning whether a request was pending
    pub fn consume(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Resolves once a request is pending. Does not consume it.
    pub async fn raised(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a raise in between is not missed.
            notified.as_mut().enable();

            if self.is_pending() {
                return;
            }
            notified.await;
        }
    }
}
