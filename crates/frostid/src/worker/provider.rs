use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::coord::{
    CoordError, CoordResult, Coordinator, NodeMode, ZkCoordinator, ensure_path,
};
use crate::{Error, Result, TimeSource, WallClock};

/// Root under which every application keeps its worker registration nodes.
const ROOT_PATH_PREFIX: &str = "/frostid";

/// Session timeout handed to the coordination service. A request that
/// exceeds it surfaces as a provider error and triggers the holder's
/// local-cache fallback; nothing is retried here.
pub const COORDINATION_SESSION_TIMEOUT: Duration = Duration::from_secs(5);

/// Payload stored on a worker registration node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePayload {
    pub ip: String,
    pub port: String,
    pub timestamp: i64,
}

impl NodePayload {
    fn new(ip: &str, port: &str, timestamp: i64) -> Self {
        Self {
            ip: ip.to_string(),
            port: port.to_string(),
            timestamp,
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("payload is always serializable")
    }

    fn from_bytes(path: &str, bytes: &[u8]) -> CoordResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| CoordError::Malformed {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Worker identity from a fixed environment variable.
///
/// Meant for deployments where an operator assigns each instance its id by
/// hand; an absent or non-numeric variable is a configuration error.
#[derive(Debug)]
pub struct EnvProvider {
    var_name: String,
    worker_id: i64,
}

impl EnvProvider {
    /// Reads and parses `var_name` from the process environment.
    pub fn from_env(var_name: &str) -> Result<Self> {
        Self::parse(var_name, std::env::var(var_name).ok().as_deref())
    }

    pub(crate) fn parse(var_name: &str, value: Option<&str>) -> Result<Self> {
        let raw = value
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Config {
                reason: format!("environment variable {var_name} is not set"),
            })?;
        let worker_id = raw.trim().parse::<i64>().map_err(|_| Error::Config {
            reason: format!("environment variable {var_name} is not numeric: {raw:?}"),
        })?;
        Ok(Self {
            var_name: var_name.to_string(),
            worker_id,
        })
    }
}

/// Worker identity from the process hostname.
///
/// Requires a `<prefix>-<ordinal>` hostname and uses the ordinal as the
/// worker id. Ordinal-indexed deployment topologies (e.g. a StatefulSet)
/// give every replica that shape for free.
#[derive(Debug)]
pub struct HostnameProvider {
    hostname: String,
    worker_id: i64,
}

impl HostnameProvider {
    /// Reads the hostname from the operating system.
    pub fn from_os() -> Result<Self> {
        let name = hostname::get()
            .map_err(|e| Error::Config {
                reason: format!("hostname lookup failed: {e}"),
            })?
            .to_string_lossy()
            .into_owned();
        Self::from_name(&name)
    }

    /// Parses an explicit hostname.
    pub fn from_name(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::Config {
                reason: "hostname is empty".to_string(),
            });
        }
        let ordinal = name
            .rsplit_once('-')
            .filter(|(prefix, ordinal)| {
                !prefix.is_empty()
                    && !ordinal.is_empty()
                    && ordinal.bytes().all(|b| b.is_ascii_digit())
            })
            .map(|(_, ordinal)| ordinal)
            .ok_or_else(|| Error::Config {
                reason: format!(
                    "hostname {name:?} must end in a numeric ordinal, e.g. id-server-1"
                ),
            })?;
        let worker_id = ordinal.parse::<i64>().map_err(|_| Error::Config {
            reason: format!("hostname {name:?} carries an out-of-range ordinal"),
        })?;
        Ok(Self {
            hostname: name.to_string(),
            worker_id,
        })
    }
}

type Connector = Box<dyn Fn() -> CoordResult<Box<dyn Coordinator>> + Send + Sync>;

/// A live registration: the id plus the session that owns the ephemeral
/// node. Dropping the session would let the service reclaim the node, so
/// it is held for the life of the provider.
struct Registration {
    worker_id: i64,
    _session: Box<dyn Coordinator>,
}

/// Worker identity assigned by the coordination service.
///
/// Each `{ip}:{port}` pair registers an ephemeral sequential node under the
/// application root; the suffix the service assigns at creation *is* the
/// worker id. Uniqueness comes entirely from the service's atomic
/// sequential create: two instances racing on the same prefix are
/// guaranteed distinct suffixes.
pub struct CoordinationProvider {
    connector: Connector,
    registration: Option<Registration>,
}

impl CoordinationProvider {
    /// Provider backed by a ZooKeeper ensemble at `conn` (comma-separated
    /// `host:port` list). An empty connection string is a configuration
    /// error.
    pub fn zookeeper(conn: &str) -> Result<Self> {
        if conn.is_empty() {
            return Err(Error::Config {
                reason: "coordination service connection string is empty".to_string(),
            });
        }
        let conn = conn.to_string();
        Ok(Self::with_connector(move || {
            ZkCoordinator::connect(&conn, COORDINATION_SESSION_TIMEOUT)
                .map(|session| Box::new(session) as Box<dyn Coordinator>)
        }))
    }

    /// Provider over an arbitrary session source; the seam the tests use.
    pub fn with_connector<F>(connector: F) -> Self
    where
        F: Fn() -> CoordResult<Box<dyn Coordinator>> + Send + Sync + 'static,
    {
        Self {
            connector: Box::new(connector),
            registration: None,
        }
    }

    fn register(&self, ip: &str, port: &str, app_name: &str) -> CoordResult<Registration> {
        let session = (self.connector)()?;
        let root = format!("{ROOT_PATH_PREFIX}/{app_name}");
        ensure_path(session.as_ref(), &root)?;

        let node_name = format!("{ip}:{port}");
        let now = WallClock.current_millis();

        let worker_id = match find_registration(session.as_ref(), &root, &node_name)? {
            Some((path, worker_id)) => {
                refresh_payload(session.as_ref(), &path, ip, port, now)?;
                info!(worker_id, path = %path, "reusing worker registration node");
                worker_id
            }
            None => {
                let node_prefix = format!("{root}/{node_name}-");
                let payload = NodePayload::new(ip, port, now);
                let created =
                    session.create(&node_prefix, &payload.to_bytes(), NodeMode::EphemeralSequential)?;
                let worker_id = parse_sequence_suffix(&created, &node_prefix)?;
                info!(worker_id, path = %created, "created worker registration node");
                worker_id
            }
        };

        Ok(Registration {
            worker_id,
            _session: session,
        })
    }
}

/// Looks for an existing registration node whose name-prefix matches
/// `node_name`, returning its path and the worker id from its suffix.
fn find_registration(
    session: &dyn Coordinator,
    root: &str,
    node_name: &str,
) -> CoordResult<Option<(String, i64)>> {
    for child in session.children(root)? {
        let Some((prefix, suffix)) = child.rsplit_once('-') else {
            continue;
        };
        if prefix != node_name {
            continue;
        }
        let path = format!("{root}/{child}");
        let worker_id = suffix.parse::<i64>().map_err(|_| CoordError::Malformed {
            path: path.clone(),
            reason: "sequence suffix is not numeric".to_string(),
        })?;
        return Ok(Some((path, worker_id)));
    }
    Ok(None)
}

fn refresh_payload(
    session: &dyn Coordinator,
    path: &str,
    ip: &str,
    port: &str,
    now: i64,
) -> CoordResult<()> {
    let (data, version) = session.get(path)?;
    match NodePayload::from_bytes(path, &data) {
        Ok(payload) if payload.timestamp > now => Err(CoordError::TimestampAhead {
            path: path.to_string(),
            node_ms: payload.timestamp,
            now_ms: now,
        }),
        // A stale or unreadable payload is replaced wholesale; the version
        // token from the read keeps concurrent refreshes honest.
        Ok(_) | Err(_) => session.set(path, &NodePayload::new(ip, port, now).to_bytes(), version),
    }
}

fn parse_sequence_suffix(created: &str, node_prefix: &str) -> CoordResult<i64> {
    let suffix = created
        .strip_prefix(node_prefix)
        .ok_or_else(|| CoordError::Malformed {
            path: created.to_string(),
            reason: "created node does not carry the requested prefix".to_string(),
        })?;
    suffix.parse::<i64>().map_err(|_| CoordError::Malformed {
        path: created.to_string(),
        reason: "sequence suffix is not numeric".to_string(),
    })
}

/// The worker-identity source, chosen once at configuration-load time.
///
/// All variants share the same contract: `init` performs whatever external
/// work the variant needs (a no-op for the static ones), `worker_id`
/// returns the resolved id.
pub enum WorkerIdProvider {
    /// Fixed id from an environment variable.
    Env(EnvProvider),
    /// Ordinal parsed from the process hostname.
    Hostname(HostnameProvider),
    /// Id assigned by the external coordination service.
    Coordination(CoordinationProvider),
}

impl WorkerIdProvider {
    /// Prepares the provider for `worker_id` calls.
    ///
    /// For the coordination variant this opens a session, registers (or
    /// refreshes) this instance's node, and keeps the session alive. The
    /// call is synchronous and never retries; a timeout or conflict is the
    /// caller's to handle.
    pub fn init(&mut self, ip: &str, port: &str, app_name: &str) -> Result<()> {
        match self {
            Self::Env(_) | Self::Hostname(_) => Ok(()),
            Self::Coordination(provider) => {
                let registration = provider
                    .register(ip, port, app_name)
                    .map_err(Error::ProviderInit)?;
                provider.registration = Some(registration);
                Ok(())
            }
        }
    }

    /// Returns the resolved worker id.
    pub fn worker_id(&self) -> Result<i64> {
        match self {
            Self::Env(provider) => {
                info!(
                    var = %provider.var_name,
                    worker_id = provider.worker_id,
                    "worker id from environment"
                );
                Ok(provider.worker_id)
            }
            Self::Hostname(provider) => {
                info!(
                    hostname = %provider.hostname,
                    worker_id = provider.worker_id,
                    "worker id from hostname ordinal"
                );
                Ok(provider.worker_id)
            }
            Self::Coordination(provider) => provider
                .registration
                .as_ref()
                .map(|registration| registration.worker_id)
                .ok_or(Error::ProviderResolution),
        }
    }
}
