//! Shared polling of entity collections.
//!
//! One timer task runs per subscribed scope, however many subscribers that
//! scope has. The task stops once the last subscriber leaves. Each tick
//! delivers the full ordered collection, stamped with the ticket drawn
//! when the fetch was issued. Fetch errors are logged and the tick is
//! skipped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use kanban_domain::{Entity, Scope};
use kanban_persistence::{EntityStore, StoreChange};
use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::sequencer::{Sequencer, Ticket};

/// One delivery: the complete contents of `scope`, in order.
#[derive(Debug, Clone)]
pub struct PollResult {
    pub scope: Scope,
    pub ticket: Ticket,
    pub entities: Vec<Entity>,
}

pub type OnUpdate = Arc<dyn Fn(&PollResult) + Send + Sync>;

type Subscribers = Arc<Mutex<HashMap<u64, OnUpdate>>>;

struct ScopeEntry {
    subscribers: Subscribers,
    stop: watch::Sender<bool>,
}

struct Shared {
    store: Arc<dyn EntityStore>,
    interval: Duration,
    scopes: Mutex<HashMap<Scope, ScopeEntry>>,
    next_id: AtomicU64,
}

/// Reference-counted per-scope poll timers over one store.
#[derive(Clone)]
pub struct PollScheduler {
    shared: Arc<Shared>,
}

impl PollScheduler {
    pub fn new(store: Arc<dyn EntityStore>, interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                interval,
                scopes: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        self.shared.interval
    }

    /// Start receiving `scope`. The first delivery is fetched immediately
    /// for this subscriber alone; later ones arrive on the shared timer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn subscribe(
        &self,
        scope: Scope,
        on_update: impl Fn(&PollResult) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let on_update: OnUpdate = Arc::new(on_update);

        let subscribers = {
            let mut scopes = self.shared.scopes.lock();
            let entry = scopes.entry(scope).or_insert_with(|| {
                let subscribers: Subscribers = Arc::new(Mutex::new(HashMap::new()));
                let (stop, stop_rx) = watch::channel(false);
                tokio::spawn(run_scope(
                    Arc::clone(&self.shared.store),
                    scope,
                    self.shared.interval,
                    Arc::clone(&subscribers),
                    stop_rx,
                ));
                tracing::debug!("Started poll timer for {}", scope);
                ScopeEntry { subscribers, stop }
            });
            entry.subscribers.lock().insert(id, Arc::clone(&on_update));
            Arc::clone(&entry.subscribers)
        };

        let store = Arc::clone(&self.shared.store);
        tokio::spawn(async move {
            if let Some(result) = fetch(store.as_ref(), scope).await {
                // Skip if the subscriber left while the fetch was running.
                let still_subscribed = subscribers.lock().get(&id).cloned();
                if let Some(on_update) = still_subscribed {
                    on_update(&result);
                }
            }
        });

        Subscription {
            shared: Arc::downgrade(&self.shared),
            scope,
            id,
            active: true,
        }
    }

    /// Subscribers currently registered for `scope`.
    pub fn subscriber_count(&self, scope: Scope) -> usize {
        self.shared
            .scopes
            .lock()
            .get(&scope)
            .map(|entry| entry.subscribers.lock().len())
            .unwrap_or(0)
    }

    /// Scopes with a running timer.
    pub fn active_scopes(&self) -> usize {
        self.shared.scopes.lock().len()
    }
}

impl Shared {
    fn remove(&self, scope: Scope, id: u64) {
        let mut scopes = self.scopes.lock();
        let Some(entry) = scopes.get(&scope) else {
            return;
        };
        let remaining = {
            let mut subscribers = entry.subscribers.lock();
            subscribers.remove(&id);
            subscribers.len()
        };
        if remaining == 0 {
            if let Some(entry) = scopes.remove(&scope) {
                // The task may already be gone.
                let _ = entry.stop.send(true);
                tracing::debug!("Stopped poll timer for {}", scope);
            }
        }
    }
}

/// Handle returned by [`PollScheduler::subscribe`]. Dropping it
/// unsubscribes.
pub struct Subscription {
    shared: Weak<Shared>,
    scope: Scope,
    id: u64,
    active: bool,
}

impl Subscription {
    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !std::mem::take(&mut self.active) {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            shared.remove(self.scope, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

async fn fetch(store: &dyn EntityStore, scope: Scope) -> Option<PollResult> {
    let ticket = Sequencer::global().issue();
    match store.fetch_ordered(scope).await {
        Ok(entities) => Some(PollResult {
            scope,
            ticket,
            entities,
        }),
        Err(err) => {
            tracing::warn!("Poll of {} failed: {}", scope, err);
            None
        }
    }
}

/// Resolves when the store reports a change to `scope`. Pends forever for
/// stores without a feed.
async fn next_change(changes: &mut Option<broadcast::Receiver<StoreChange>>, scope: Scope) {
    loop {
        let Some(rx) = changes.as_mut() else {
            return std::future::pending().await;
        };
        match rx.recv().await {
            Ok(change) if change.touches(&scope) => return,
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Change feed lagged by {} for {}", skipped, scope);
                return;
            }
            Err(RecvError::Closed) => *changes = None,
        }
    }
}

async fn run_scope(
    store: Arc<dyn EntityStore>,
    scope: Scope,
    interval: Duration,
    subscribers: Subscribers,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut changes = store.changes();

    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = ticker.tick() => {}
            _ = next_change(&mut changes, scope) => {
                tracing::debug!("Early poll of {} after store change", scope);
            }
        }
        if *stop.borrow() {
            break;
        }

        // Not raced against `stop`: a fetch in progress always completes.
        let Some(result) = fetch(store.as_ref(), scope).await else {
            continue;
        };
        let targets: Vec<OnUpdate> = subscribers.lock().values().cloned().collect();
        tracing::debug!(
            "Delivering {} entities of {} to {} subscriber(s)",
            result.entities.len(),
            scope,
            targets.len()
        );
        for on_update in targets {
            on_update(&result);
        }
    }
}
