//! Completion timer
//!
//! A one-shot `tokio::time::sleep` task that posts
//! `Command::TrackFinished { generation }` to the scheduler when it expires.
//! Each arm bumps the generation, so a firing that raced with a re-arm or a
//! disarm is recognised as stale by the scheduler. The task only holds a weak
//! sender: it never keeps the scheduler alive, and it is aborted when the
//! timer is disarmed or dropped.

use super::scheduler::Command;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

pub struct CompletionTimer {
    tx: mpsc::WeakSender<Command>,
    generation: u64,
    task: Option<JoinHandle<()>>,
    deadline: Option<Instant>,
}

impl CompletionTimer {
    pub fn new(tx: mpsc::WeakSender<Command>) -> Self {
        Self {
            tx,
            generation: 0,
            task: None,
            deadline: None,
        }
    }

    /// Arm the timer to fire after `after`, replacing any armed timer
    ///
    /// Returns the generation the firing will carry.
    pub fn arm(&mut self, after: Duration) -> u64 {
        self.disarm();
        self.generation += 1;

        let generation = self.generation;
        let tx = self.tx.clone();
        let deadline = Instant::now() + after;
        self.deadline = Some(deadline);
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(tx) = tx.upgrade() {
                trace!(generation, "Completion timer fired");
                let _ = tx.send(Command::TrackFinished { generation }).await;
            }
        }));
        generation
    }

    /// Cancel the armed timer, if any
    pub fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.deadline = None;
    }

    /// Whether `generation` belongs to the currently armed timer
    pub fn is_current(&self, generation: u64) -> bool {
        self.task.is_some() && generation == self.generation
    }

    /// Acknowledge a current firing; the timer is no longer armed afterwards
    pub fn fired(&mut self) {
        self.task = None;
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.task.is_some()
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

impl Drop for CompletionTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}
