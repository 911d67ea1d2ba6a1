use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::{Error, Result, WorkerIdProvider};

/// Namespace directory under the system temp dir for cached worker ids.
const CACHE_NAMESPACE: &str = "frostid";
const CACHE_FILE_NAME: &str = "workerId.properties";

/// Resolves a worker id from the provider, keeping the last success on
/// local disk.
///
/// The provider is the best-effort source of truth; every id it hands out
/// is persisted to `<tempdir>/frostid/<app>/<port>/workerId.properties` so
/// a restart can keep operating on the last-known id while the provider is
/// unreachable. The cache can go stale if the instance's network identity
/// changes while the provider is down; that trade is deliberate.
pub struct WorkerIdHolder {
    ip: String,
    port: String,
    app_name: String,
    cache_path: PathBuf,
    provider: WorkerIdProvider,
}

impl WorkerIdHolder {
    pub fn new(ip: &str, port: &str, app_name: &str, provider: WorkerIdProvider) -> Self {
        let cache_path = std::env::temp_dir()
            .join(CACHE_NAMESPACE)
            .join(app_name)
            .join(port)
            .join(CACHE_FILE_NAME);
        Self::at_cache_path(ip, port, app_name, provider, cache_path)
    }

    fn at_cache_path(
        ip: &str,
        port: &str,
        app_name: &str,
        provider: WorkerIdProvider,
        cache_path: PathBuf,
    ) -> Self {
        Self {
            ip: ip.to_string(),
            port: port.to_string(),
            app_name: app_name.to_string(),
            cache_path,
            provider,
        }
    }

    /// Resolves this instance's worker id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerIdUnavailable`] only when the provider failed
    /// *and* the local cache is missing, empty, or unparseable.
    pub fn worker_id(&mut self) -> Result<i64> {
        if let Err(err) = self.provider.init(&self.ip, &self.port, &self.app_name) {
            warn!(error = %err, "worker id provider init failed, trying local cache");
            return self.read_cached();
        }
        match self.provider.worker_id() {
            Ok(worker_id) => {
                self.persist(worker_id);
                Ok(worker_id)
            }
            Err(err) => {
                warn!(error = %err, "worker id provider resolution failed, trying local cache");
                self.read_cached()
            }
        }
    }

    fn persist(&self, worker_id: i64) {
        match self.try_persist(worker_id) {
            Ok(()) => {
                info!(worker_id, path = %self.cache_path.display(), "saved worker id to local cache");
            }
            Err(err) => {
                // The id itself is good; a dead cache only costs the next
                // restart its fallback.
                warn!(
                    error = %err,
                    path = %self.cache_path.display(),
                    "failed to persist worker id to local cache"
                );
            }
        }
    }

    fn try_persist(&self, worker_id: i64) -> std::io::Result<()> {
        let dir = self
            .cache_path
            .parent()
            .expect("cache path always has a parent");
        fs::create_dir_all(dir)?;
        // Whole-file replace via rename so a crash mid-write never leaves a
        // truncated cache behind.
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(worker_id.to_string().as_bytes())?;
        tmp.persist(&self.cache_path).map_err(|e| e.error)?;
        Ok(())
    }

    fn read_cached(&self) -> Result<i64> {
        let unavailable = || Error::WorkerIdUnavailable {
            path: self.cache_path.clone(),
        };
        let contents = fs::read_to_string(&self.cache_path).map_err(|_| unavailable())?;
        let trimmed = contents.trim();
        if trimmed.is_empty() {
            return Err(unavailable());
        }
        let worker_id = trimmed.parse::<i64>().map_err(|_| unavailable())?;
        info!(worker_id, path = %self.cache_path.display(), "recovered worker id from local cache");
        Ok(worker_id)
    }

    /// Where this holder keeps its durable fallback.
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::memory::MemoryCoordinator;
    use crate::coord::{CoordError, Coordinator};
    use crate::CoordinationProvider;

    fn failing_provider() -> WorkerIdProvider {
        WorkerIdProvider::Coordination(CoordinationProvider::with_connector(|| {
            Err(CoordError::Connect {
                reason: "refused".to_string(),
            })
        }))
    }

    fn working_provider() -> WorkerIdProvider {
        let tree = MemoryCoordinator::new();
        WorkerIdProvider::Coordination(CoordinationProvider::with_connector(move || {
            Ok(Box::new(tree.clone()) as Box<dyn Coordinator>)
        }))
    }

    fn holder_in(dir: &Path, provider: WorkerIdProvider) -> WorkerIdHolder {
        WorkerIdHolder::at_cache_path(
            "10.0.0.1",
            "8074",
            "orders",
            provider,
            dir.join(CACHE_FILE_NAME),
        )
    }

    #[test]
    fn falls_back_to_the_cache_when_the_provider_is_down() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CACHE_FILE_NAME), "42").unwrap();

        let mut holder = holder_in(dir.path(), failing_provider());
        assert_eq!(holder.worker_id().unwrap(), 42);
    }

    #[test]
    fn provider_success_overwrites_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CACHE_FILE_NAME), "42").unwrap();

        let mut holder = holder_in(dir.path(), working_provider());
        assert_eq!(holder.worker_id().unwrap(), 0);
        let cached = fs::read_to_string(dir.path().join(CACHE_FILE_NAME)).unwrap();
        assert_eq!(cached, "0");

        // A later run with the provider down lives off the refreshed cache.
        let mut fallback = holder_in(dir.path(), failing_provider());
        assert_eq!(fallback.worker_id().unwrap(), 0);
    }

    #[test]
    fn fails_when_the_provider_is_down_and_the_cache_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut holder = holder_in(dir.path(), failing_provider());
        assert!(matches!(
            holder.worker_id(),
            Err(Error::WorkerIdUnavailable { .. })
        ));
    }

    #[test]
    fn fails_when_the_cache_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CACHE_FILE_NAME), "").unwrap();

        let mut holder = holder_in(dir.path(), failing_provider());
        assert!(matches!(
            holder.worker_id(),
            Err(Error::WorkerIdUnavailable { .. })
        ));
    }
}
