use core::time::Duration;
use std::thread;

use parking_lot::Mutex;

use crate::{
    Error, FrostId, MAX_SEQUENCE, RandSource, Result, ThreadRandom, TimeSource, WallClock,
    id::ID_EPOCH_MS,
};

/// Largest clock regression, in milliseconds, the engine absorbs by
/// waiting. Routine NTP step corrections fall under this; anything larger
/// is an operator-visible anomaly and fails the call.
pub const MAX_BACKWARD_DRIFT_MS: i64 = 5;

/// Sentinel for "no id minted yet".
const UNSET: i64 = -1;

struct EngineState {
    sequence: i64,
    last_timestamp: i64,
}

/// The bit-packing engine: mints [`FrostId`]s for one fixed worker id.
///
/// All state lives behind a single exclusive lock; concurrent callers
/// serialize. Successive successful calls never return duplicate or
/// decreasing ids: `(last_timestamp, sequence)` only moves forward, and
/// the one permitted exception (a small backwards clock step) is healed by
/// waiting out the skew before minting, or failing the call if the clock
/// is still behind afterwards.
///
/// # Example
///
/// ```
/// use frostid::Snowflake;
///
/// let engine = Snowflake::new(3);
/// let a = engine.next_id().unwrap();
/// let b = engine.next_id().unwrap();
/// assert!(b > a);
/// assert_eq!(a.worker_id(), 3);
/// ```
pub struct Snowflake<T = WallClock, R = ThreadRandom> {
    worker_id: i64,
    state: Mutex<EngineState>,
    time: T,
    rand: R,
}

impl Snowflake {
    /// Creates an engine on the system wall clock and thread-local RNG.
    ///
    /// `worker_id` must be within `0..=MAX_WORKER_ID`; the facade validates
    /// this before construction.
    pub fn new(worker_id: i64) -> Self {
        Self::with_sources(worker_id, WallClock, ThreadRandom)
    }
}

impl<T, R> Snowflake<T, R>
where
    T: TimeSource,
    R: RandSource,
{
    /// Creates an engine with explicit time and randomness sources.
    pub fn with_sources(worker_id: i64, time: T, rand: R) -> Self {
        Self {
            worker_id,
            state: Mutex::new(EngineState {
                sequence: 0,
                last_timestamp: UNSET,
            }),
            time,
            rand,
        }
    }

    /// The worker id every minted id carries.
    pub fn worker_id(&self) -> i64 {
        self.worker_id
    }

    /// Mints the next id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockRegression`] when the wall clock is behind the
    /// last minted timestamp by more than [`MAX_BACKWARD_DRIFT_MS`], or is
    /// still behind it after the bounded self-heal wait. A failed call
    /// leaves the engine state untouched; the caller may retry later.
    pub fn next_id(&self) -> Result<FrostId> {
        let mut state = self.state.lock();

        let mut timestamp = self.time.current_millis();
        if timestamp < state.last_timestamp {
            timestamp = self.wait_out_regression(timestamp, state.last_timestamp)?;
        }

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & MAX_SEQUENCE;
            if state.sequence == 0 {
                // 4096 ids minted this millisecond; move to the next one.
                state.sequence = self.rand.sequence_seed();
                timestamp = self.until_next_millis(state.last_timestamp);
            }
        } else {
            state.sequence = self.rand.sequence_seed();
        }

        state.last_timestamp = timestamp;
        Ok(FrostId::from_parts(
            timestamp - ID_EPOCH_MS,
            self.worker_id,
            state.sequence,
        ))
    }

    /// Handles a clock observed behind `last`. Callers block through the
    /// wait; the engine lock stays held so no other call can slip in
    /// between the wait and the re-read.
    #[cold]
    #[inline(never)]
    fn wait_out_regression(&self, now: i64, last: i64) -> Result<i64> {
        let offset = last - now;
        if offset > MAX_BACKWARD_DRIFT_MS {
            return Err(Error::ClockRegression { offset_ms: offset });
        }
        // Wait out twice the observed skew, then look again.
        thread::sleep(Duration::from_millis((offset as u64) << 1));
        let timestamp = self.time.current_millis();
        if timestamp < last {
            return Err(Error::ClockRegression { offset_ms: offset });
        }
        Ok(timestamp)
    }

    /// Busy-polls the clock until it passes `last`.
    fn until_next_millis(&self, last: i64) -> i64 {
        let mut timestamp = self.time.current_millis();
        while timestamp <= last {
            thread::sleep(Duration::from_micros(100));
            timestamp = self.time.current_millis();
        }
        timestamp
    }
}
