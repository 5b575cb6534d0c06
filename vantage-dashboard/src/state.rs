//! Observable dashboard state.
//!
//! The current [`DashboardState`] lives in a `watch` channel. Every
//! transition is also pushed to registered listener callbacks, each of
//! which holds a [`Subscription`] token to detach itself.

use chrono::Utc;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;
use vantage_core::{DashboardSnapshot, FilterCriteria, Timestamp};

use crate::aggregate::Aggregator;

/// Default polling interval.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    /// Last successfully built snapshot. Survives failed refreshes.
    pub snapshot: Option<Arc<DashboardSnapshot>>,
    pub loading: bool,
    /// Message of the last failed refresh; cleared on success.
    pub error: Option<String>,
    pub last_updated: Option<Timestamp>,
    pub filter: FilterCriteria,
    pub auto_refresh: bool,
    pub refresh_interval: Duration,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            snapshot: None,
            loading: false,
            error: None,
            last_updated: None,
            filter: FilterCriteria::default(),
            auto_refresh: false,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

/// Result of one refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot replaced the previous one.
    Applied,
    /// The build failed; the previous snapshot was kept.
    Failed,
    /// Another build was already running.
    Skipped,
}

type Listener = Arc<dyn Fn(&DashboardState) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Handle for a registered listener.
///
/// Dropping the handle does not detach the listener; call
/// [`Subscription::unsubscribe`].
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Detach the listener. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).listeners.retain(|(id, _)| *id != self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let attached = lock(&registry).listeners.iter().any(|(id, _)| *id == self.id);
        attached
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

pub struct StateStore {
    state: watch::Sender<DashboardState>,
    registry: Arc<Mutex<Registry>>,
}

impl StateStore {
    pub fn new(initial: DashboardState) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state,
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    pub fn state(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    pub fn snapshot(&self) -> Option<Arc<DashboardSnapshot>> {
        self.state.borrow().snapshot.clone()
    }

    /// Read the current state without cloning it.
    pub fn with_state<R>(&self, f: impl FnOnce(&DashboardState) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Receiver that observes every transition.
    pub fn watch(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&DashboardState) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        registry.next_id += 1;
        let id = registry.next_id;
        registry.listeners.push((id, Arc::new(listener)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.registry).listeners.len()
    }

    /// Apply `f` to the state and notify every listener with the result.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut DashboardState),
    {
        let mut applied = None;
        self.state.send_modify(|state| {
            f(state);
            applied = Some(state.clone());
        });
        if let Some(state) = applied {
            self.notify(&state);
        }
    }

    /// Build a snapshot and apply the result.
    ///
    /// On failure the previous snapshot stays and `error` is set.
    pub async fn fetch(&self, aggregator: &Aggregator) -> RefreshOutcome {
        self.update(|state| state.loading = true);
        match aggregator.build_snapshot().await {
            Ok(snapshot) => {
                let degraded = snapshot.degraded_sections.len();
                self.update(|state| {
                    state.snapshot = Some(Arc::new(snapshot));
                    state.error = None;
                    state.last_updated = Some(Utc::now());
                    state.loading = false;
                });
                tracing::debug!(degraded, "dashboard snapshot applied");
                RefreshOutcome::Applied
            }
            Err(err) => {
                tracing::warn!(error = %err, "dashboard refresh failed, keeping previous snapshot");
                self.update(|state| {
                    state.error = Some(err.to_string());
                    state.loading = false;
                });
                RefreshOutcome::Failed
            }
        }
    }

    fn notify(&self, state: &DashboardState) {
        let listeners: Vec<Listener> = lock(&self.registry)
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(state);
        }
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(DashboardState::default())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
