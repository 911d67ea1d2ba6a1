//! Globally unique, roughly time-ordered 64-bit identifiers for fleets of
//! stateless service instances.
//!
//! Each id packs a millisecond timestamp, a per-instance worker id, and a
//! per-millisecond sequence into one `i64` (see [`FrostId`]). Worker ids are
//! acquired once at startup through a pluggable [`WorkerIdProvider`]: a
//! fixed environment variable, an ordinal parsed from the hostname, or a
//! sequential node handed out by an external coordination service. A
//! local on-disk fallback ([`WorkerIdHolder`]) lets an instance restart
//! while the coordination service is unreachable.
//!
//! [`IdGenerator`] ties the two halves together: resolve the worker id,
//! validate it, then mint ids from a single lock-guarded [`Snowflake`]
//! engine.

mod coord;
mod error;
mod generator;
mod id;
mod rand;
mod snowflake;
mod time;
mod worker;

pub use crate::coord::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::rand::*;
pub use crate::snowflake::*;
pub use crate::time::*;
pub use crate::worker::*;
