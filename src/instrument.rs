//! Wall-clock timing wrappers around units of work.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::client::StatlineClient;

/// Run `work` and return its result along with the elapsed wall-clock
/// time.
pub fn measure_sync_fn<T, F: FnOnce() -> T>(work: F) -> (T, Duration) {
    let start = Instant::now();
    let result = work();
    (result, start.elapsed())
}

/// Await `fut` and return its output along with the elapsed wall-clock
/// time. The clock stops when the future completes, not when it starts.
pub async fn measure_async_fut<T, F: Future<Output = T>>(fut: F) -> (T, Duration) {
    let start = Instant::now();
    let result = fut.await;
    (result, start.elapsed())
}

impl StatlineClient {
    /// Measure `work` and forward the elapsed milliseconds to
    /// [timing](StatlineClient::timing) under `key`. The work's result is
    /// returned unchanged; recording failures are dropped so the wrapper
    /// never alters the outcome of the wrapped call.
    pub fn time_callable<T, F: FnOnce() -> T>(&self, key: &str, sample_rate: f64, work: F) -> T {
        let (result, elapsed) = measure_sync_fn(work);
        let _ = self.timing(key, elapsed.as_millis() as u64, sample_rate);
        result
    }

    /// Async variant of [time_callable](StatlineClient::time_callable).
    /// The timing side effect fires once the wrapped future completes;
    /// unit futures work the same as value-returning ones.
    pub async fn time_future<T, F: Future<Output = T>>(&self, key: &str, sample_rate: f64, fut: F) -> T {
        let (result, elapsed) = measure_async_fut(fut).await;
        let _ = self.timing(key, elapsed.as_millis() as u64, sample_rate);
        result
    }
}
