use std::sync::atomic::{AtomicI64, Ordering};

type TimeSource = Box<dyn Fn() -> i64 + Send + Sync>;

/// 单调不减的毫秒时间戳
///
/// 系统时间回拨时沿用上一次的时间戳。
pub struct MonotonicClock {
    source: TimeSource,
    last: AtomicI64,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::with_source(|| chrono::Utc::now().timestamp_millis())
    }

    pub fn with_source<F>(source: F) -> Self
    where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        Self {
            source: Box::new(source),
            last: AtomicI64::new(i64::MIN),
        }
    }

    pub fn now_millis(&self) -> i64 {
        let now = (self.source)();
        let prev = self.last.fetch_max(now, Ordering::SeqCst);
        prev.max(now)
    }
}
