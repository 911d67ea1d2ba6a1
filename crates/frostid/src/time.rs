use std::time::{SystemTime, UNIX_EPOCH};

/// A source of current time in whole milliseconds since the Unix epoch.
///
/// The engine reads time through this seam so clock skew can be simulated
/// in tests.
///
/// # Example
///
/// ```
/// use frostid::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> i64 {
///         1234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn current_millis(&self) -> i64;
}

/// The system wall clock.
///
/// The engine deliberately reads the adjustable wall clock rather than a
/// monotonic timer: NTP step corrections must be *observable* so the
/// bounded regression self-heal in the engine can run.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl TimeSource for WallClock {
    fn current_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before UNIX_EPOCH")
            .as_millis() as i64
    }
}
