// SPDX-License-Identifier: MIT OR Apache-2.0
//! Async auto-reset event.

use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::oneshot;

#[derive(Debug, Default)]
struct SignalState {
    waiters: VecDeque<oneshot::Sender<()>>,
    signaled: bool,
}

/// A signal releasing one waiter per [`set`](Self::set)
///
/// Setting the event with nobody waiting leaves it signaled, so the next
/// [`wait`](Self::wait) completes at once. Repeated sets without a waiter
/// coalesce into a single pending signal.
#[derive(Debug, Default)]
pub struct AsyncAutoResetEvent {
    state: Mutex<SignalState>,
}

impl AsyncAutoResetEvent {
    /// Create a new unsignaled event
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the event, consuming its signal
    pub async fn wait(&self) {
        let receiver = {
            let mut state = self.state.lock();
            if state.signaled {
                state.signaled = false;
                return;
            }
            let (sender, receiver) = oneshot::channel();
            state.waiters.push_back(sender);
            receiver
        };
        let mut pending = PendingWait {
            event: self,
            receiver: Some(receiver),
        };
        if let Some(receiver) = pending.receiver.as_mut() {
            // Only fails when the event is dropped, which releases the waiter too
            let _ = receiver.await;
        }
        pending.receiver = None;
    }

    /// Release the oldest waiter, or leave the event signaled
    pub fn set(&self) {
        let mut state = self.state.lock();
        while let Some(waiter) = state.waiters.pop_front() {
            // Waiters whose future was dropped are skipped
            if waiter.send(()).is_ok() {
                return;
            }
        }
        state.signaled = true;
    }

    /// Whether a signal is pending
    pub fn is_set(&self) -> bool {
        self.state.lock().signaled
    }

    /// Get the number of tasks currently waiting
    pub fn waiter_count(&self) -> usize {
        self.state.lock().waiters.len()
    }
}

/// A registered waiter whose future may be dropped before completing
struct PendingWait<'a> {
    event: &'a AsyncAutoResetEvent,
    receiver: Option<oneshot::Receiver<()>>,
}

impl Drop for PendingWait<'_> {
    fn drop(&mut self) {
        if let Some(mut receiver) = self.receiver.take() {
            receiver.close();
            // A signal delivered to a cancelled wait passes on to the next one
            if receiver.try_recv().is_ok() {
                self.event.set();
            }
        }
    }
}
