//! # State Timer
//!
//! The single pending state timeout of an instance.
//!
//! Arming spawns a task that sleeps and then posts a firing message tagged
//! with the state it was armed for and a generation number. Re-arming or
//! cancelling aborts the pending task and bumps the generation, so a
//! firing that was already in flight is recognised as stale by
//! [`StateTimer::accepts`] and dropped.

use std::time::Duration;
use tokio::task::JoinHandle;

/// The state timeout of one instance.
#[derive(Debug, Default)]
pub struct StateTimer {
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl StateTimer {
    /// Creates an idle timer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any pending timeout.
    ///
    /// After `after` elapses, `fire(generation)` runs on the runtime. The
    /// returned generation identifies this arming.
    pub fn arm<F, Fut>(&mut self, after: Duration, fire: F) -> u64
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let generation = self.generation;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            fire(generation).await;
        }));
        generation
    }

    /// Cancels the pending timeout, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.generation = self.generation.wrapping_add(1);
    }

    /// Marks the current arming as delivered.
    pub fn fired(&mut self) {
        self.pending = None;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Returns true if a firing with `generation` belongs to the current arming.
    #[must_use]
    pub fn accepts(&self, generation: u64) -> bool {
        self.pending.is_some() && self.generation == generation
    }

    /// Returns true if a timeout is pending.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for StateTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn fires_after_duration() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = StateTimer::new();
        let generation = timer.arm(Duration::from_secs(3), move |g| async move {
            let _ = tx.send(g);
        });

        assert!(timer.is_armed());
        let fired = rx.recv().await.unwrap();
        assert_eq!(fired, generation);
        assert!(timer.accepts(fired));
        timer.fired();
        assert!(!timer.accepts(fired));
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_supersedes_previous() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = StateTimer::new();

        let first_tx = tx.clone();
        let first = timer.arm(Duration::from_secs(1), move |g| async move {
            let _ = first_tx.send(g);
        });
        let second = timer.arm(Duration::from_secs(5), move |g| async move {
            let _ = tx.send(g);
        });

        assert_ne!(first, second);
        assert!(!timer.accepts(first));
        let fired = rx.recv().await.unwrap();
        assert_eq!(fired, second);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let (tx, mut rx) = mpsc::unbounded_channel::<u64>();
        let mut timer = StateTimer::new();
        timer.arm(Duration::from_secs(1), move |g| async move {
            let _ = tx.send(g);
        });
        timer.cancel();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
        assert!(!timer.is_armed());
    }
}
