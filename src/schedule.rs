//! Periodic task infrastructure.
//!
//! The feed poller and the processing worker both run as a [`PeriodicTask`]
//! spawned with [`spawn_periodic`]. Each gets its own tokio task and ticker;
//! the returned [`TaskHandle`] stops it between cycles.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

#[derive(Debug)]
enum TaskMessage {
    Shutdown,
}

/// A unit of work repeated on a fixed interval.
pub trait PeriodicTask: Send + 'static {
    /// Time between the starts of two executions.
    fn interval(&self) -> Duration;

    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Run one cycle.
    fn execute(&mut self) -> impl Future<Output = ()> + Send;
}

/// Handle to a spawned periodic task.
#[derive(Debug)]
pub struct TaskHandle {
    sender: mpsc::Sender<TaskMessage>,
    join: JoinHandle<()>,
}

impl TaskHandle {
    /// Ask the task to stop and wait for its current cycle to finish.
    pub async fn shutdown(self) {
        let _ = self.sender.send(TaskMessage::Shutdown).await;
        let _ = self.join.await;
    }
}

/// Spawn `task`, executing it immediately and then once per interval.
///
/// Ticks missed while a cycle overruns are skipped rather than bunched up.
/// A shutdown request is only seen between cycles, so a running cycle
/// always completes.
///
/// # Arguments
///
/// * `task` - The task to run; moved into its own tokio task
///
/// # Returns
///
/// A [`TaskHandle`] whose [`TaskHandle::shutdown`] stops the loop and
/// waits for it to exit.
///
/// # Example
///
/// ```ignore
/// let poller = spawn_periodic(FeedPoller::new(store, fetcher, sources, interval));
/// tokio::signal::ctrl_c().await?;
/// poller.shutdown().await;
/// ```
pub fn spawn_periodic<T: PeriodicTask>(mut task: T) -> TaskHandle {
    let (sender, mut receiver) = mpsc::channel(1);

    let join = tokio::spawn(async move {
        let mut timer = tokio::time::interval(task.interval());
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(task = task.name(), interval = ?task.interval(), "Task started");

        loop {
            tokio::select! {
                biased;
                msg = receiver.recv() => {
                    match msg {
                        Some(TaskMessage::Shutdown) | None => {
                            info!(task = task.name(), "Task stopped");
                            break;
                        }
                    }
                }
                _ = timer.tick() => {
                    task.execute().await;
                }
            }
        }
    });

    TaskHandle { sender, join }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        runs: Arc<AtomicUsize>,
    }

    impl PeriodicTask for Counter {
        fn interval(&self) -> Duration {
            Duration::from_millis(20)
        }

        fn name(&self) -> &'static str {
            "counter"
        }

        async fn execute(&mut self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_runs_immediately_then_repeats() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = spawn_periodic(Counter {
            runs: Arc::clone(&runs),
        });

        tokio::time::sleep(Duration::from_millis(110)).await;
        handle.shutdown().await;
        assert!(runs.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_shutdown_stops_execution() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = spawn_periodic(Counter {
            runs: Arc::clone(&runs),
        });
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.shutdown().await;

        let after = runs.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), after);
    }
}
