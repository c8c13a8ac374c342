//! A single posting loop as an explicit state machine.
//!
//! Phases: Idle → Waiting → Generating → Publishing → (Posted | RateLimited |
//! Failed) → Waiting. A rate-limited draft is kept and re-published after the
//! cooldown without generating new content; every other outcome waits a
//! random delay from the configured interval.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::Interval;
use crate::openai::Generator;
use crate::scheduler::{ContentSource, Draft, PublishError, Publisher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Waiting,
    Generating,
    Publishing,
    Posted,
    RateLimited,
    Failed,
}

/// How one iteration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Posted,
    /// Draft kept for a retry after the cooldown.
    RateLimited,
    /// Publishing failed; the draft is dropped.
    Failed,
    /// Generation failed; nothing was published.
    Skipped,
}

pub struct PostLoop {
    source: Box<dyn ContentSource>,
    generator: Arc<dyn Generator>,
    publisher: Arc<dyn Publisher>,
    interval: Interval,
    cooldown: Duration,
    rng: StdRng,
    phase: Phase,
    pending: Option<Draft>,
}

impl PostLoop {
    pub fn new(
        source: Box<dyn ContentSource>,
        generator: Arc<dyn Generator>,
        publisher: Arc<dyn Publisher>,
        interval: Interval,
        cooldown: Duration,
    ) -> Self {
        Self {
            source,
            generator,
            publisher,
            interval,
            cooldown,
            rng: StdRng::from_entropy(),
            phase: Phase::Idle,
            pending: None,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.source.kind()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pending(&self) -> Option<&Draft> {
        self.pending.as_ref()
    }

    /// Cooldown when a rate-limited draft is waiting, otherwise a uniform
    /// random delay within the interval.
    pub fn next_delay(&mut self) -> Duration {
        if self.pending.is_some() {
            return self.cooldown;
        }
        let min = self.interval.min.as_millis() as u64;
        let max = self.interval.max.as_millis() as u64;
        Duration::from_millis(self.rng.gen_range(min..=max))
    }

    /// Generate (unless retrying) and publish once.
    pub async fn run_iteration(&mut self) -> Outcome {
        let draft = match self.pending.take() {
            Some(draft) => {
                info!("Retrying rate-limited {} post", self.kind());
                draft
            }
            None => {
                self.phase = Phase::Generating;
                match self.source.draft(self.generator.as_ref()).await {
                    Some(draft) => draft,
                    None => {
                        self.phase = Phase::Failed;
                        return Outcome::Skipped;
                    }
                }
            }
        };

        self.phase = Phase::Publishing;
        match self.publisher.publish(&draft).await {
            Ok(()) => {
                info!("✅ {} post published: {}", self.kind(), draft.text);
                self.phase = Phase::Posted;
                Outcome::Posted
            }
            Err(PublishError::RateLimited) => {
                warn!(
                    "Rate limited posting {} post, retrying in {}s",
                    self.kind(),
                    self.cooldown.as_secs()
                );
                self.pending = Some(draft);
                self.phase = Phase::RateLimited;
                Outcome::RateLimited
            }
            Err(e) => {
                warn!("Error posting {} post: {e}", self.kind());
                self.phase = Phase::Failed;
                Outcome::Failed
            }
        }
    }

    /// Loop until cancelled. Cancellation is observed while waiting.
    pub async fn run(mut self, cancel: Arc<Notify>) {
        loop {
            let delay = self.next_delay();
            self.phase = Phase::Waiting;
            info!(
                "Scheduling {} post in {:.2} hours",
                self.kind(),
                delay.as_secs_f64() / 3600.0
            );

            tokio::select! {
                biased;

                _ = cancel.notified() => {
                    info!("{} loop cancelled", self.kind());
                    break;
                }
                _ = sleep(delay) => {}
            }

            self.run_iteration().await;
        }
    }

    pub fn spawn(self) -> LoopHandle {
        let cancel = Arc::new(Notify::new());
        let task = tokio::spawn(self.run(cancel.clone()));
        LoopHandle { cancel, task }
    }
}

/// Owner of a spawned loop. Dropping the handle cancels the loop.
pub struct LoopHandle {
    cancel: Arc<Notify>,
    task: JoinHandle<()>,
}

impl LoopHandle {
    pub fn cancel(&self) {
        self.cancel.notify_one();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        self.cancel.notify_one();
    }
}
