use core::fmt;
use core::time::Duration;

use serde::{Deserialize, Serialize};

/// Custom epoch subtracted from wall-clock time before encoding:
/// Thursday, November 4, 2010 1:42:54.657 UTC.
///
/// Keeps the 42-bit timestamp field small enough to stay positive in an
/// `i64` for well over a century.
pub const ID_EPOCH: Duration = Duration::from_millis(1_288_834_974_657);

pub(crate) const ID_EPOCH_MS: i64 = ID_EPOCH.as_millis() as i64;

/// Bits reserved for the worker id.
pub const WORKER_ID_BITS: u32 = 10;

/// Bits reserved for the per-millisecond sequence.
pub const SEQUENCE_BITS: u32 = 12;

/// Largest worker id the layout can carry (1023).
pub const MAX_WORKER_ID: i64 = (1 << WORKER_ID_BITS) - 1;

/// Largest sequence value within one millisecond (4095).
pub const MAX_SEQUENCE: i64 = (1 << SEQUENCE_BITS) - 1;

pub(crate) const WORKER_ID_SHIFT: u32 = SEQUENCE_BITS;
pub(crate) const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS;

/// A packed 64-bit identifier.
///
/// Layout, high to low: 42-bit timestamp (milliseconds since [`ID_EPOCH`]),
/// 10-bit worker id, 12-bit sequence. Ids minted by one worker sort by
/// creation order; ids minted by different workers within the same
/// millisecond sort by worker id.
///
/// Serializes as the raw `i64`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct FrostId(i64);

impl FrostId {
    /// Packs the three components into an id.
    ///
    /// Components must already be in range; the engine guarantees this for
    /// everything it mints.
    pub const fn from_parts(timestamp: i64, worker_id: i64, sequence: i64) -> Self {
        debug_assert!(timestamp >= 0);
        debug_assert!(worker_id >= 0 && worker_id <= MAX_WORKER_ID);
        debug_assert!(sequence >= 0 && sequence <= MAX_SEQUENCE);
        Self((timestamp << TIMESTAMP_SHIFT) | (worker_id << WORKER_ID_SHIFT) | sequence)
    }

    /// Reinterprets a raw `i64` (e.g. one read back from storage).
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Milliseconds since [`ID_EPOCH`] at which this id was minted.
    pub const fn timestamp(self) -> i64 {
        self.0 >> TIMESTAMP_SHIFT
    }

    /// Milliseconds since the Unix epoch at which this id was minted.
    pub const fn unix_timestamp_millis(self) -> i64 {
        self.timestamp() + ID_EPOCH_MS
    }

    /// The worker id of the minting instance.
    pub const fn worker_id(self) -> i64 {
        (self.0 >> WORKER_ID_SHIFT) & MAX_WORKER_ID
    }

    /// The per-millisecond sequence component.
    pub const fn sequence(self) -> i64 {
        self.0 & MAX_SEQUENCE
    }

    /// The raw packed value.
    pub const fn to_raw(self) -> i64 {
        self.0
    }
}

impl fmt::Display for FrostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<FrostId> for i64 {
    fn from(id: FrostId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_all_components() {
        let id = FrostId::from_parts(123_456_789, 42, 7);
        assert_eq!(id.timestamp(), 123_456_789);
        assert_eq!(id.worker_id(), 42);
        assert_eq!(id.sequence(), 7);
    }

    #[test]
    fn round_trips_component_extremes() {
        for (ts, worker, seq) in [
            (0, 0, 0),
            (0, MAX_WORKER_ID, MAX_SEQUENCE),
            ((1 << 41) - 1, 1, MAX_SEQUENCE),
            (1, MAX_WORKER_ID, 0),
        ] {
            let id = FrostId::from_parts(ts, worker, seq);
            assert_eq!(id.timestamp(), ts);
            assert_eq!(id.worker_id(), worker);
            assert_eq!(id.sequence(), seq);
            assert_eq!(FrostId::from_raw(id.to_raw()), id);
        }
    }

    #[test]
    fn orders_by_timestamp_then_worker_then_sequence() {
        let a = FrostId::from_parts(10, 3, MAX_SEQUENCE);
        let b = FrostId::from_parts(11, 0, 0);
        let c = FrostId::from_parts(11, 1, 0);
        let d = FrostId::from_parts(11, 1, 1);
        assert!(a < b && b < c && c < d);
    }

    #[test]
    fn serializes_as_raw_integer() {
        let id = FrostId::from_parts(5, 1, 2);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, id.to_raw().to_string());
        let back: FrostId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
