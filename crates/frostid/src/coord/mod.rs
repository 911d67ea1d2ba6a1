//! Boundary to the external coordination service.
//!
//! The service is consumed through the [`Coordinator`] trait so the
//! worker-identity logic can be exercised against an in-memory tree in
//! tests. Production runs use [`ZkCoordinator`]. Nothing here implements
//! consensus: worker-id uniqueness rests entirely on the service's atomic
//! sequential-node creation.

#[cfg(test)]
pub(crate) mod memory;
mod zk;

pub use zk::*;

pub type CoordResult<T> = core::result::Result<T, CoordError>;

/// Errors surfaced by a coordination-service session.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CoordError {
    #[error("connect to coordination service failed: {reason}")]
    Connect { reason: String },

    #[error("node {path} does not exist")]
    NotFound { path: String },

    /// A conditional write observed a version other than the one read.
    #[error("conditional write to {path} lost against a concurrent update")]
    VersionConflict { path: String },

    #[error("node {path} is malformed: {reason}")]
    Malformed { path: String, reason: String },

    /// A registration node carries a timestamp from the future relative to
    /// this instance's clock; treated as a clock/consistency anomaly.
    #[error("node {path} carries timestamp {node_ms} ahead of local clock {now_ms}")]
    TimestampAhead {
        path: String,
        node_ms: i64,
        now_ms: i64,
    },

    #[error("coordination service request failed: {reason}")]
    Backend { reason: String },
}

/// Creation mode for coordination-service nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeMode {
    /// Survives the session; removed only by hand.
    Persistent,
    /// Reclaimed by the service when the creating session ends; the name
    /// gets a monotonically increasing suffix assigned atomically by the
    /// service.
    EphemeralSequential,
}

/// Version token returned by reads and consumed by conditional writes.
pub type NodeVersion = i32;

/// One session against the coordination service's hierarchical node tree.
///
/// All operations are synchronous; timeouts are the session's concern and
/// surface as errors. Nothing retries internally.
pub trait Coordinator: Send + Sync {
    fn exists(&self, path: &str) -> CoordResult<bool>;

    /// Creates a node and returns its final path; for
    /// [`NodeMode::EphemeralSequential`] that includes the assigned suffix.
    fn create(&self, path: &str, data: &[u8], mode: NodeMode) -> CoordResult<String>;

    /// Names (not paths) of the direct children of `path`.
    fn children(&self, path: &str) -> CoordResult<Vec<String>>;

    fn get(&self, path: &str) -> CoordResult<(Vec<u8>, NodeVersion)>;

    /// Conditional write: fails with [`CoordError::VersionConflict`] unless
    /// the node is still at `version`.
    fn set(&self, path: &str, data: &[u8], version: NodeVersion) -> CoordResult<()>;
}

/// Creates every segment of `path`, skipping the ones that already exist.
pub(crate) fn ensure_path(session: &dyn Coordinator, path: &str) -> CoordResult<()> {
    let mut current = String::with_capacity(path.len());
    // Once one ancestor turns out to be missing, every deeper segment is
    // missing too; stop probing and just create.
    let mut check_exists = true;
    for segment in path.trim_start_matches('/').split('/') {
        if segment.is_empty() {
            return Err(CoordError::Malformed {
                path: path.to_string(),
                reason: "empty path segment".to_string(),
            });
        }
        current.push('/');
        current.push_str(segment);
        if check_exists && session.exists(&current)? {
            continue;
        }
        check_exists = false;
        if let Err(err) = session.create(&current, &[], NodeMode::Persistent) {
            // Lost a creation race; the segment existing is all that
            // matters.
            if !session.exists(&current)? {
                return Err(err);
            }
        }
    }
    Ok(())
}
