//! Periodic refresh with a single-build guard.
//!
//! A [`RefreshGuard`] is shared between the timer and manual refreshes, so
//! at most one snapshot build runs at a time. Ticks that arrive while a
//! build is running are skipped, never queued.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Exclusion flag for snapshot builds.
#[derive(Debug, Clone, Default)]
pub struct RefreshGuard {
    busy: Arc<AtomicBool>,
}

impl RefreshGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard, or `None` if a build already holds it.
    pub fn try_acquire(&self) -> Option<RefreshPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RefreshPermit {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Held for the duration of one build; releases the guard on drop.
#[derive(Debug)]
pub struct RefreshPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for RefreshPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// What a single timer tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Started,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running { interval: Duration },
}

struct Timer {
    interval: Duration,
    handle: JoinHandle<()>,
}

/// Drives a refresh job on a fixed interval.
pub struct RefreshScheduler {
    guard: RefreshGuard,
    timer: Mutex<Option<Timer>>,
}

impl RefreshScheduler {
    pub fn new(guard: RefreshGuard) -> Self {
        Self {
            guard,
            timer: Mutex::new(None),
        }
    }

    pub fn guard(&self) -> &RefreshGuard {
        &self.guard
    }

    pub fn state(&self) -> SchedulerState {
        match lock(&self.timer).as_ref() {
            Some(timer) => SchedulerState::Running {
                interval: timer.interval,
            },
            None => SchedulerState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state(), SchedulerState::Running { .. })
    }

    /// Start ticking every `interval`, the first tick one interval from now.
    ///
    /// Returns `false` when already running with the same interval. A
    /// different interval replaces the running timer. Must be called from
    /// within a Tokio runtime.
    pub fn start<F, Fut>(&self, interval: Duration, job: F) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut timer = lock(&self.timer);
        if timer.as_ref().is_some_and(|t| t.interval == interval) {
            return false;
        }
        if let Some(previous) = timer.take() {
            previous.handle.abort();
        }
        let handle = tokio::spawn(run_timer(interval, self.guard.clone(), job));
        *timer = Some(Timer { interval, handle });
        tracing::info!(interval_ms = interval.as_millis() as u64, "refresh scheduler started");
        true
    }

    /// Cancel the timer. A build already running is left to finish.
    pub fn stop(&self) -> bool {
        match lock(&self.timer).take() {
            Some(timer) => {
                timer.handle.abort();
                tracing::info!("refresh scheduler stopped");
                true
            }
            None => false,
        }
    }

    /// Run `job` under the guard, or return `None` if a build is running.
    ///
    /// The job runs in its own task, so dropping the returned future does
    /// not cancel it.
    pub async fn run_exclusive<F, Fut, T>(&self, job: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self.guard.try_acquire()?;
        let build = job();
        let handle = tokio::spawn(async move {
            let output = build.await;
            drop(permit);
            output
        });
        match handle.await {
            Ok(output) => Some(output),
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => None,
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(timer) = lock(&self.timer).take() {
            timer.handle.abort();
        }
    }
}

/// Fire one tick: start `job` under the guard unless a build is running.
pub fn tick<F, Fut>(guard: &RefreshGuard, job: &F) -> TickOutcome
where
    F: Fn() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    match guard.try_acquire() {
        Some(permit) => {
            let build = job();
            tokio::spawn(async move {
                build.await;
                drop(permit);
            });
            TickOutcome::Started
        }
        None => {
            tracing::debug!("refresh tick skipped, previous build still running");
            TickOutcome::Skipped
        }
    }
}

async fn run_timer<F, Fut>(interval: Duration, guard: RefreshGuard, job: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        tick(&guard, &job);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_job(
        counter: &Arc<AtomicUsize>,
        work: Duration,
    ) -> impl Fn() -> std::pin::Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static
    {
        let counter = Arc::clone(counter);
        move || {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if !work.is_zero() {
                    tokio::time::sleep(work).await;
                }
            })
        }
    }

    #[test]
    fn test_guard_is_exclusive_until_permit_dropped() {
        let guard = RefreshGuard::new();
        let permit = guard.try_acquire().expect("first acquire");
        assert!(guard.is_busy());
        assert!(guard.try_acquire().is_none());
        drop(permit);
        assert!(!guard.is_busy());
        assert!(guard.try_acquire().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_interval() {
        let runs = Arc::new(AtomicUsize::new(0));
        let scheduler = RefreshScheduler::new(RefreshGuard::new());
        assert!(scheduler.start(Duration::from_secs(30), counting_job(&runs, Duration::ZERO)));

        tokio::time::sleep(Duration::from_millis(29_999)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_same_interval_is_noop() {
        let runs = Arc::new(AtomicUsize::new(0));
        let scheduler = RefreshScheduler::new(RefreshGuard::new());
        let interval = Duration::from_secs(10);
        assert!(scheduler.start(interval, counting_job(&runs, Duration::ZERO)));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(!scheduler.start(interval, counting_job(&runs, Duration::ZERO)));

        // The original timer keeps its phase: first tick at t=10s.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.state(), SchedulerState::Running { interval });
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_with_new_interval() {
        let runs = Arc::new(AtomicUsize::new(0));
        let scheduler = RefreshScheduler::new(RefreshGuard::new());
        scheduler.start(Duration::from_secs(10), counting_job(&runs, Duration::ZERO));
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(scheduler.start(Duration::from_secs(30), counting_job(&runs, Duration::ZERO)));
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_skipped_while_build_running() {
        let runs = Arc::new(AtomicUsize::new(0));
        let guard = RefreshGuard::new();
        let scheduler = RefreshScheduler::new(guard.clone());
        // Each build takes 25s on a 10s interval.
        scheduler.start(Duration::from_secs(10), counting_job(&runs, Duration::from_secs(25)));

        tokio::time::sleep(Duration::from_millis(10_001)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(guard.is_busy());

        // Ticks at 20s and 30s land while the first build is running.
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // Build finished at 35s; the tick at 40s starts the next one.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_lets_running_build_finish() {
        let finished = Arc::new(AtomicBool::new(false));
        let guard = RefreshGuard::new();
        let scheduler = RefreshScheduler::new(guard.clone());
        let done = Arc::clone(&finished);
        scheduler.start(Duration::from_secs(10), move || {
            let done = Arc::clone(&done);
            async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                done.store(true, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(10_001)).await;
        assert!(guard.is_busy());
        assert!(scheduler.stop());
        assert_eq!(scheduler.state(), SchedulerState::Stopped);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(finished.load(Ordering::SeqCst));
        assert!(!guard.is_busy());
        assert!(!scheduler.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_exclusive_skips_when_busy() {
        let scheduler = RefreshScheduler::new(RefreshGuard::new());
        let held = scheduler.guard().try_acquire().expect("acquire");
        assert_eq!(scheduler.run_exclusive(|| async { 1 }).await, None);
        drop(held);
        assert_eq!(scheduler.run_exclusive(|| async { 2 }).await, Some(2));
        assert!(!scheduler.guard().is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_outcome() {
        let runs = Arc::new(AtomicUsize::new(0));
        let guard = RefreshGuard::new();
        let job = counting_job(&runs, Duration::from_secs(1));
        assert_eq!(tick(&guard, &job), TickOutcome::Started);
        assert_eq!(tick(&guard, &job), TickOutcome::Skipped);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(tick(&guard, &job), TickOutcome::Started);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
