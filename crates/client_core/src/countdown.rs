use std::time::Duration;

use tokio::{
    task::JoinHandle,
    time::{self, Instant},
};
use tracing::debug;

/// Owned handle to the resend countdown task.
///
/// At most one task runs at a time: `start` aborts the previous one first.
/// Each start bumps a generation number that is passed to every tick, so a
/// tick sent by an aborted task can be recognised and dropped by the receiver.
#[derive(Debug, Default)]
pub struct CountdownTimer {
    task: Option<JoinHandle<()>>,
    generation: u64,
}

impl CountdownTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a task calling `on_tick` every `period`, first after one full
    /// period. The task exits on its own once `on_tick` returns `false`.
    pub fn start<F>(&mut self, period: Duration, mut on_tick: F) -> u64
    where
        F: FnMut(u64) -> bool + Send + 'static,
    {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;

        self.task = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if !on_tick(generation) {
                    break;
                }
            }
        }));
        debug!(generation, "countdown started");
        generation
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(generation = self.generation, "countdown cancelled");
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a tick carrying `generation` comes from the live task.
    pub fn is_current(&self, generation: u64) -> bool {
        self.task.is_some() && generation == self.generation
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
