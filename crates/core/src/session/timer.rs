//! Cancellable countdown timer.

use super::state::CountdownTick;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

/// A repeating timer task sending [`CountdownTick`]s every `period`.
///
/// The first tick fires one period after start. Dropping the handle
/// aborts the task, so no tick is sent after the owner lets go of it.
#[derive(Debug)]
pub struct CountdownTimer {
    task: JoinHandle<()>,
}

impl CountdownTimer {
    /// Spawns the timer on the current tokio runtime.
    pub fn start(period: Duration, epoch: u64, ticks: UnboundedSender<CountdownTick>) -> Self {
        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if ticks.send(CountdownTick { epoch }).is_err() {
                    break;
                }
            }
        });
        Self { task }
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test(start_paused = true)]
    async fn ticks_at_fixed_cadence() {
        let (tx, mut rx) = unbounded_channel();
        let started = Instant::now();
        let _timer = CountdownTimer::start(Duration::from_secs(1), 7, tx);

        for n in 1..=3u64 {
            let tick = rx.recv().await.unwrap();
            assert_eq!(tick, CountdownTick { epoch: 7 });
            let elapsed = started.elapsed();
            assert!(elapsed >= Duration::from_secs(n));
            assert!(elapsed < Duration::from_secs(n + 1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn drop_stops_ticks() {
        let (tx, mut rx) = unbounded_channel();
        let timer = CountdownTimer::start(Duration::from_secs(1), 1, tx);
        drop(timer);

        tokio::time::sleep(Duration::from_secs(5)).await;
        // The aborted task dropped its sender, so the channel is closed and empty.
        assert_eq!(rx.recv().await, None);
    }
}
