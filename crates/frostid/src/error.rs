use std::path::PathBuf;

use crate::coord::CoordError;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Unified error type for id generation and worker-identity acquisition.
///
/// The variants fall into four groups with different handling expectations:
/// configuration errors ([`Error::Config`], [`Error::WorkerIdOutOfRange`])
/// are fatal at startup; provider errors ([`Error::ProviderInit`],
/// [`Error::ProviderResolution`]) are absorbed by the holder's local-cache
/// fallback and only [`Error::WorkerIdUnavailable`] escapes it; clock and
/// ordering errors ([`Error::ClockRegression`], [`Error::NotInitialized`])
/// surface to the caller of the id-producing operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Startup-time misconfiguration; the process must not serve traffic.
    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    /// The wall clock moved backwards further than the engine tolerates, or
    /// was still behind after the bounded self-heal wait.
    #[error("clock moved backwards by {offset_ms} ms; refusing to mint ids")]
    ClockRegression { offset_ms: i64 },

    /// An id was requested before `init()` completed.
    #[error("id generator must be initialized before use")]
    NotInitialized,

    /// A resolved worker id does not fit the id layout.
    #[error("worker id {worker_id} outside permitted range 0..={max}")]
    WorkerIdOutOfRange { worker_id: i64, max: i64 },

    /// The provider failed and the local cache had nothing usable either.
    #[error(
        "worker id unavailable: provider failed and local cache {} is missing or unusable",
        path.display()
    )]
    WorkerIdUnavailable { path: PathBuf },

    /// Worker-identity provider initialization failed.
    #[error("worker id provider init failed: {0}")]
    ProviderInit(#[source] CoordError),

    /// The provider was asked for a worker id before a successful init.
    #[error("worker id provider has not resolved an id; init did not succeed")]
    ProviderResolution,
}
