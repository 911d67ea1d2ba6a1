use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;
use zookeeper::{Acl, CreateMode, WatchedEvent, Watcher, ZkError, ZooKeeper};

use super::{CoordError, CoordResult, Coordinator, NodeMode, NodeVersion};

/// Session watcher; state transitions only matter for diagnostics here,
/// since ids are resolved once at startup.
struct SessionWatcher;

impl Watcher for SessionWatcher {
    fn handle(&self, event: WatchedEvent) {
        debug!(?event, "zookeeper session event");
    }
}

/// A [`Coordinator`] backed by a ZooKeeper session.
///
/// The session must stay alive as long as the ephemeral registration node
/// is needed; dropping it lets the service reclaim the node. Identity is
/// resolved once at startup, so serializing requests behind a lock costs
/// nothing.
pub struct ZkCoordinator {
    session: Mutex<ZooKeeper>,
}

impl ZkCoordinator {
    /// Opens a session against `conn`, a comma-separated `host:port` list.
    pub fn connect(conn: &str, timeout: Duration) -> CoordResult<Self> {
        let session =
            ZooKeeper::connect(conn, timeout, SessionWatcher).map_err(|e| CoordError::Connect {
                reason: format!("{e:?}"),
            })?;
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl Coordinator for ZkCoordinator {
    fn exists(&self, path: &str) -> CoordResult<bool> {
        self.session
            .lock()
            .exists(path, false)
            .map(|stat| stat.is_some())
            .map_err(|e| map_zk_error(path, e))
    }

    fn create(&self, path: &str, data: &[u8], mode: NodeMode) -> CoordResult<String> {
        let mode = match mode {
            NodeMode::Persistent => CreateMode::Persistent,
            NodeMode::EphemeralSequential => CreateMode::EphemeralSequential,
        };
        self.session
            .lock()
            .create(path, data.to_vec(), Acl::open_unsafe().clone(), mode)
            .map_err(|e| map_zk_error(path, e))
    }

    fn children(&self, path: &str) -> CoordResult<Vec<String>> {
        self.session
            .lock()
            .get_children(path, false)
            .map_err(|e| map_zk_error(path, e))
    }

    fn get(&self, path: &str) -> CoordResult<(Vec<u8>, NodeVersion)> {
        self.session
            .lock()
            .get_data(path, false)
            .map(|(data, stat)| (data, stat.version))
            .map_err(|e| map_zk_error(path, e))
    }

    fn set(&self, path: &str, data: &[u8], version: NodeVersion) -> CoordResult<()> {
        self.session
            .lock()
            .set_data(path, data.to_vec(), Some(version))
            .map(|_| ())
            .map_err(|e| map_zk_error(path, e))
    }
}

fn map_zk_error(path: &str, err: ZkError) -> CoordError {
    match err {
        ZkError::NoNode => CoordError::NotFound {
            path: path.to_string(),
        },
        ZkError::BadVersion => CoordError::VersionConflict {
            path: path.to_string(),
        },
        other => CoordError::Backend {
            reason: format!("{other:?} at {path}"),
        },
    }
}
