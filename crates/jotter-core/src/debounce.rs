//! Collapsing bursts of triggers into one delayed value.
//!
//! Each [`Debouncer::trigger`] cancels the timer scheduled by the previous one,
//! so a value only settles once `delay` has passed without another trigger.
//! Used to run a search once the user stops typing.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Delay used when none is configured.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

pub struct Debouncer<T> {
    delay: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
    sender: mpsc::UnboundedSender<(u64, T)>,
    receiver: mpsc::UnboundedReceiver<(u64, T)>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            delay,
            generation: 0,
            pending: None,
            sender,
            receiver,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `value`, replacing whatever was scheduled before.
    ///
    /// Spawns a timer task, so this must be called from within a tokio
    /// runtime with the timer enabled.
    pub fn trigger(&mut self, value: T) {
        self.abort_pending();
        self.generation += 1;

        let generation = self.generation;
        let sender = self.sender.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver lives as long as the debouncer that aborts this task
            let _ = sender.send((generation, value));
        }));
    }

    /// Drop the scheduled value, if any. A value that already settled but was
    /// not yet taken is dropped too.
    pub fn cancel(&mut self) {
        self.abort_pending();
        while self.receiver.try_recv().is_ok() {}
    }

    /// Whether a triggered value has not been taken yet.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Wait for the latest triggered value to settle.
    ///
    /// Returns `None` right away when nothing is pending. Values superseded by
    /// a later trigger are never returned. Cancel-safe.
    pub async fn settled(&mut self) -> Option<T> {
        loop {
            if self.pending.is_none() {
                return None;
            }

            let (generation, value) = self.receiver.recv().await?;
            if generation == self.generation {
                self.pending = None;
                return Some(value);
            }
        }
    }

    fn abort_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
