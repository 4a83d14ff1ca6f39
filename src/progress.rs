//! Progress notification while a long call is in flight.

use std::future::Future;
use std::time::Duration;

/// Interval between "typing" notifications; Telegram shows one for about five seconds
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(4);

/// Await `work` while calling `tick` every `interval` on a background task.
///
/// The first tick fires immediately. The ticking task is cancelled as soon as
/// `work` resolves, whatever its output.
pub async fn run_with_progress<W, T, Fut>(tick: T, interval: Duration, work: W) -> W::Output
where
    W: Future,
    T: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let notifier = tokio::spawn(async move {
        loop {
            tick().await;
            tokio::time::sleep(interval).await;
        }
    });

    let output = work.await;

    notifier.abort();
    let _ = notifier.await;
    output
}
