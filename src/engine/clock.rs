use chrono::Utc;

/// Wall-clock source for scheduled events and block timestamps.
///
/// Independent of the `delta_time` handed to `update`; the speed multiplier
/// never touches it.
pub trait Clock: Send {
    /// Milliseconds since the unix epoch.
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

#[cfg(test)]
pub use manual::ManualClock;
