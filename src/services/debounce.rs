//! Quiet-period debouncing for typed search input.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

/// Forwards only the last value pushed once `quiet` has elapsed without a
/// newer one. Intermediate values are dropped.
///
/// Dropping every [`Debouncer`] handle flushes the pending value (if any)
/// and closes the output.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawn the debouncing task. Must be called within a tokio runtime.
    pub fn spawn(quiet: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, mut input) = mpsc::unbounded_channel::<T>();
        let (output, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut pending: Option<T> = None;
            loop {
                let received = if pending.is_none() {
                    input.recv().await
                } else {
                    tokio::select! {
                        value = input.recv() => value,
                        _ = sleep(quiet) => {
                            if let Some(value) = pending.take() {
                                if output.send(value).is_err() {
                                    return;
                                }
                            }
                            continue;
                        }
                    }
                };
                match received {
                    Some(value) => pending = Some(value),
                    None => {
                        if let Some(value) = pending.take() {
                            let _ = output.send(value);
                        }
                        return;
                    }
                }
            }
        });

        (Self { tx }, rx)
    }

    /// Push a value, restarting the quiet period.
    pub fn push(&self, value: T) {
        // Err means the task has exited; nothing left to debounce.
        let _ = self.tx.send(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_only_last_value_after_quiet_period() {
        let (debouncer, mut rx) = Debouncer::spawn(Duration::from_millis(300));

        debouncer.push("s");
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.push("se");
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.push("sea");

        assert_eq!(rx.recv().await, Some("sea"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_each_emit() {
        let (debouncer, mut rx) = Debouncer::spawn(Duration::from_millis(300));

        debouncer.push(1);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(rx.recv().await, Some(1));

        debouncer.push(2);
        debouncer.push(3);
        assert_eq!(rx.recv().await, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_flushes_pending() {
        let (debouncer, mut rx) = Debouncer::spawn(Duration::from_secs(60));
        debouncer.push("last");
        drop(debouncer);
        assert_eq!(rx.recv().await, Some("last"));
        assert_eq!(rx.recv().await, None);
    }
}
