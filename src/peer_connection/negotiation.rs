use std::future::Future;
use std::sync::{Arc, Mutex as SyncMutex};
use std::time::Duration;

use async_trait::async_trait;
use portable_atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;

/// NegotiationTimer is a cancelable one-shot timer. At most one expiry is
/// pending at a time.
#[derive(Default)]
pub(crate) struct NegotiationTimer {
    handle: SyncMutex<Option<JoinHandle<()>>>,
}

impl NegotiationTimer {
    /// arm runs `f` once `delay` elapsed. It is a no-op returning false when
    /// an expiry is already pending.
    pub(crate) fn arm<F>(&self, delay: Duration, f: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut handle = match self.handle.lock() {
            Ok(handle) => handle,
            Err(poisoned) => poisoned.into_inner(),
        };
        if handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
            return false;
        }

        *handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            f.await;
        }));
        true
    }

    /// cancel aborts the pending expiry, if any.
    pub(crate) fn cancel(&self) -> bool {
        let handle = match self.handle.lock() {
            Ok(mut handle) => handle.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match handle {
            Some(h) => {
                h.abort();
                true
            }
            None => false,
        }
    }

    /// disarm forgets the expiry that is currently running, so that it may
    /// arm the timer again.
    pub(crate) fn disarm(&self) {
        match self.handle.lock() {
            Ok(mut handle) => *handle = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        match self.handle.lock() {
            Ok(handle) => handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false),
            Err(_) => false,
        }
    }
}

/// NegotiationScheduler debounces "the next offer would differ" signals
/// into a single negotiationneeded event.
pub(crate) struct NegotiationScheduler {
    needed: AtomicBool,
    delay: Duration,
    timer: NegotiationTimer,
}

impl NegotiationScheduler {
    pub(crate) fn new(delay: Duration) -> Self {
        NegotiationScheduler {
            needed: AtomicBool::new(false),
            delay,
            timer: NegotiationTimer::default(),
        }
    }

    pub(crate) fn is_needed(&self) -> bool {
        self.needed.load(Ordering::SeqCst)
    }

    pub(crate) fn set_needed(&self) {
        self.needed.store(true, Ordering::SeqCst);
    }

    /// clear_needed resets the flag, as a new offer covers every change
    /// made so far.
    pub(crate) fn clear_needed(&self) {
        self.needed.store(false, Ordering::SeqCst);
    }

    fn take_needed(&self) -> bool {
        self.needed.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }

    pub(crate) fn cancel(&self) {
        if self.timer.cancel() {
            log::debug!("negotiation timer canceled");
        }
    }
}

/// NegotiationGate is the connection as seen by the scheduler.
#[async_trait]
pub(crate) trait NegotiationGate: Send + Sync + 'static {
    fn scheduler(&self) -> &NegotiationScheduler;

    fn is_closed(&self) -> bool;

    fn is_busy(&self) -> bool;

    fn is_stable(&self) -> bool;

    /// negotiation_needed emits the event.
    async fn negotiation_needed(&self);
}

fn can_negotiate<G: NegotiationGate + ?Sized>(gate: &G) -> bool {
    !gate.is_closed() && !gate.is_busy() && gate.is_stable()
}

/// arm starts the debounce window unless one is pending or the connection
/// cannot negotiate right now. The timer only holds a weak reference.
pub(crate) fn arm<G: NegotiationGate>(gate: &Arc<G>) -> bool {
    if !can_negotiate(gate.as_ref()) {
        return false;
    }

    let scheduler = gate.scheduler();
    let weak = Arc::downgrade(gate);
    scheduler.timer.arm(scheduler.delay, async move {
        let Some(gate) = weak.upgrade() else {
            return;
        };
        gate.scheduler().timer.disarm();

        // A busy connection retries on its next mutation; the flag stays.
        if !can_negotiate(gate.as_ref()) {
            log::debug!("negotiation timer expired while unable to negotiate");
            return;
        }
        if gate.scheduler().take_needed() {
            gate.negotiation_needed().await;
        }
    })
}

/// mark_needed records a change affecting the next offer and arms the timer.
pub(crate) fn mark_needed<G: NegotiationGate>(gate: &Arc<G>) {
    gate.scheduler().set_needed();
    arm(gate);
}

/// check_deferred arms the timer on the next tick if a change was recorded
/// while the connection could not negotiate.
pub(crate) fn check_deferred<G: NegotiationGate>(gate: &Arc<G>) {
    let weak = Arc::downgrade(gate);
    tokio::spawn(async move {
        tokio::task::yield_now().await;
        if let Some(gate) = weak.upgrade() {
            if gate.scheduler().is_needed() {
                arm(&gate);
            }
        }
    });
}
