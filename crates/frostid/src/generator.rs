use tracing::info;

use crate::{Error, FrostId, MAX_WORKER_ID, Result, Snowflake, WorkerIdHolder, WorkerIdProvider};

/// Lifecycle wrapper around the engine: resolve a worker id once, then
/// mint ids for the life of the process.
///
/// Construct one at service startup, [`init`](Self::init) it before the
/// listener starts serving, and share it by reference; the engine is an
/// owned field, not a process-wide global. Every id-producing call fails
/// with [`Error::NotInitialized`] until `init` has completed.
pub struct IdGenerator {
    holder: WorkerIdHolder,
    engine: Option<Snowflake>,
}

impl IdGenerator {
    /// Builds a generator for the instance reachable at `ip:port`,
    /// registering under `app_name`, with `provider` as the worker-identity
    /// source.
    pub fn new(ip: &str, port: &str, app_name: &str, provider: WorkerIdProvider) -> Self {
        Self {
            holder: WorkerIdHolder::new(ip, port, app_name, provider),
            engine: None,
        }
    }

    /// Resolves the worker id and constructs the engine.
    ///
    /// Idempotent: once initialization has succeeded, later calls return
    /// without touching the provider again.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::WorkerIdUnavailable`] from the holder and
    /// returns [`Error::WorkerIdOutOfRange`] for an id the layout cannot
    /// carry. Both are startup failures; the caller should exit with a
    /// diagnostic rather than serve traffic.
    pub fn init(&mut self) -> Result<()> {
        if self.engine.is_some() {
            return Ok(());
        }
        let worker_id = self.holder.worker_id()?;
        if !(0..=MAX_WORKER_ID).contains(&worker_id) {
            return Err(Error::WorkerIdOutOfRange {
                worker_id,
                max: MAX_WORKER_ID,
            });
        }
        info!(worker_id, "id generator initialized");
        self.engine = Some(Snowflake::new(worker_id));
        Ok(())
    }

    /// Mints one id.
    pub fn get_id(&self) -> Result<FrostId> {
        self.engine
            .as_ref()
            .ok_or(Error::NotInitialized)?
            .next_id()
    }

    /// Mints `count.max(1)` ids by sequential [`get_id`](Self::get_id)
    /// calls. The first failure aborts the batch; partial results are
    /// discarded.
    pub fn get_ids(&self, count: usize) -> Result<Vec<FrostId>> {
        let count = count.max(1);
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            ids.push(self.get_id()?);
        }
        Ok(ids)
    }

    /// The resolved worker id, once initialized.
    pub fn worker_id(&self) -> Option<i64> {
        self.engine.as_ref().map(Snowflake::worker_id)
    }
}
