use crate::{Error, Result, StableIdAllocator};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Opaque identifier for a launched worker process, assigned by the
/// launcher (e.g. a cluster member id).
pub type WorkerId = String;

/// Startup parameters for a new worker process.
///
/// Carries the cluster name plus free-form launch properties; the launcher
/// decides how to turn these into process arguments.
#[derive(Clone, Debug, Default)]
pub struct LaunchConfig {
    cluster_name: String,
    properties: BTreeMap<String, String>,
}

impl LaunchConfig {
    /// Creates a config for joining `cluster_name`.
    pub fn new(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Adds a launch property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The cluster the worker should join.
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// All launch properties, in key order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// A handle to a launched worker process.
pub trait ProcessHandle {
    /// The opaque worker identifier assigned at launch.
    fn worker_id(&self) -> WorkerId;

    /// Stops the process.
    fn stop(&mut self) -> Result<()>;
}

/// The process-launcher seam: starts worker processes tagged with a role
/// name derived from an allocated [`StableId`](crate::StableId).
pub trait ProcessLauncher {
    /// Handle type for processes this launcher starts.
    type Handle: ProcessHandle;

    /// Launches a worker with the given role name and startup parameters.
    ///
    /// # Errors
    /// Returns [`Error::Launch`] if the process could not be started.
    fn launch(&self, role: &str, config: &LaunchConfig) -> Result<Self::Handle>;
}

/// Manages the lifecycle of dynamically started worker processes.
///
/// Owns a [`StableIdAllocator`] (pool width doubles as the worker cap) and
/// the table of running process handles. Starting a worker allocates a
/// stable ID, derives the odd/even role label, launches the process, and
/// registers the launcher-assigned worker id; stopping reverses the steps
/// and returns the ID to the pool for reuse.
///
/// # Example
///
/// ```
/// use shardfold::{
///     LaunchConfig, ProcessHandle, ProcessLauncher, Result, WorkerId, WorkerSupervisor,
/// };
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// struct FakeHandle(WorkerId);
/// impl ProcessHandle for FakeHandle {
///     fn worker_id(&self) -> WorkerId {
///         self.0.clone()
///     }
///     fn stop(&mut self) -> Result<()> {
///         Ok(())
///     }
/// }
///
/// #[derive(Default)]
/// struct FakeLauncher(AtomicU32);
/// impl ProcessLauncher for FakeLauncher {
///     type Handle = FakeHandle;
///     fn launch(&self, _role: &str, _config: &LaunchConfig) -> Result<FakeHandle> {
///         let n = self.0.fetch_add(1, Ordering::Relaxed);
///         Ok(FakeHandle(format!("member-{n}")))
///     }
/// }
///
/// let supervisor = WorkerSupervisor::new(FakeLauncher::default(), "DemoServer");
/// let config = LaunchConfig::new("demo-cluster");
///
/// let worker = supervisor.start_worker(&config).unwrap();
/// assert_eq!(supervisor.worker_count().unwrap(), 1);
/// supervisor.stop_worker(&worker).unwrap();
/// assert_eq!(supervisor.worker_count().unwrap(), 0);
/// ```
pub struct WorkerSupervisor<L: ProcessLauncher> {
    launcher: L,
    base_role: String,
    allocator: StableIdAllocator<WorkerId>,
    running: Mutex<HashMap<WorkerId, L::Handle>>,
}

impl<L: ProcessLauncher> WorkerSupervisor<L> {
    /// Creates a supervisor with the default worker cap
    /// ([`crate::DEFAULT_WIDTH`]).
    pub fn new(launcher: L, base_role: impl Into<String>) -> Self {
        Self::with_capacity(launcher, base_role, crate::DEFAULT_WIDTH)
    }

    /// Creates a supervisor capped at `capacity` concurrent workers.
    ///
    /// # Panics
    /// Panics if `capacity` is zero or greater than 64.
    pub fn with_capacity(launcher: L, base_role: impl Into<String>, capacity: u32) -> Self {
        Self {
            launcher,
            base_role: base_role.into(),
            allocator: StableIdAllocator::with_width(capacity),
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Starts a new worker and returns its launcher-assigned id.
    ///
    /// The allocated stable ID is rolled back if the launch fails, so a
    /// failed start never leaks pool capacity.
    ///
    /// # Errors
    /// Returns [`Error::PoolExhausted`] when the cap is reached (deny the
    /// request; capacity frees up when a worker stops) or [`Error::Launch`]
    /// if the process could not be started.
    pub fn start_worker(&self, config: &LaunchConfig) -> Result<WorkerId> {
        let id = self.allocator.allocate()?;
        let role = id.role_label(&self.base_role);

        let handle = match self.launcher.launch(&role, config) {
            Ok(handle) => handle,
            Err(err) => {
                self.allocator.release(id)?;
                return Err(err);
            }
        };

        let worker = handle.worker_id();
        self.allocator.associate(worker.clone(), id)?;
        self.running.lock()?.insert(worker.clone(), handle);

        #[cfg(feature = "tracing")]
        tracing::info!("started worker {worker} with role {role}");
        Ok(worker)
    }

    /// Stops `worker` and releases its stable ID for reuse.
    ///
    /// Stopping an unknown (or already stopped) worker is tolerated:
    /// a missing ID mapping is logged and ignored so stop is idempotent.
    pub fn stop_worker(&self, worker: &WorkerId) -> Result<()> {
        match self.allocator.lookup_and_release(worker) {
            Ok(_id) => {
                #[cfg(feature = "tracing")]
                tracing::info!("released stable id {_id} for worker {worker}");
            }
            Err(Error::HandleNotFound) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("no stable id associated with worker {worker}");
            }
            Err(err) => return Err(err),
        }

        if let Some(mut handle) = self.running.lock()?.remove(worker) {
            handle.stop()?;
        }
        Ok(())
    }

    /// Stops every running worker.
    pub fn stop_all(&self) -> Result<()> {
        for worker in self.running()? {
            self.stop_worker(&worker)?;
        }
        Ok(())
    }

    /// Ids of all currently running workers.
    pub fn running(&self) -> Result<Vec<WorkerId>> {
        Ok(self.running.lock()?.keys().cloned().collect())
    }

    /// Number of currently running workers.
    pub fn worker_count(&self) -> Result<usize> {
        Ok(self.running.lock()?.len())
    }

    /// Maximum number of concurrent workers.
    pub const fn capacity(&self) -> u32 {
        self.allocator.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Default)]
    struct LaunchLog {
        started: Mutex<Vec<(WorkerId, String)>>,
        stopped: Mutex<Vec<WorkerId>>,
        next: AtomicU32,
        fail_next: AtomicU32,
    }

    struct FakeHandle {
        worker: WorkerId,
        log: Arc<LaunchLog>,
    }

    impl ProcessHandle for FakeHandle {
        fn worker_id(&self) -> WorkerId {
            self.worker.clone()
        }

        fn stop(&mut self) -> Result<()> {
            self.log.stopped.lock().unwrap().push(self.worker.clone());
            Ok(())
        }
    }

    struct FakeLauncher {
        log: Arc<LaunchLog>,
    }

    impl ProcessLauncher for FakeLauncher {
        type Handle = FakeHandle;

        fn launch(&self, role: &str, _config: &LaunchConfig) -> Result<FakeHandle> {
            if self.log.fail_next.load(Ordering::Relaxed) > 0 {
                self.log.fail_next.fetch_sub(1, Ordering::Relaxed);
                return Err(Error::Launch {
                    reason: "induced failure".to_owned(),
                });
            }
            let worker = format!("member-{}", self.log.next.fetch_add(1, Ordering::Relaxed));
            self.log
                .started
                .lock()
                .unwrap()
                .push((worker.clone(), role.to_owned()));
            Ok(FakeHandle {
                worker,
                log: Arc::clone(&self.log),
            })
        }
    }

    fn supervisor(log: &Arc<LaunchLog>) -> WorkerSupervisor<FakeLauncher> {
        WorkerSupervisor::new(
            FakeLauncher {
                log: Arc::clone(log),
            },
            "DemoServer",
        )
    }

    #[test]
    fn roles_alternate_between_even_and_odd() {
        let log = Arc::new(LaunchLog::default());
        let supervisor = supervisor(&log);
        let config = LaunchConfig::new("demo-cluster");

        for _ in 0..4 {
            supervisor.start_worker(&config).unwrap();
        }

        let started = log.started.lock().unwrap();
        let roles: Vec<&str> = started.iter().map(|(_, role)| role.as_str()).collect();
        assert_eq!(
            roles,
            [
                "DemoServerEven",
                "DemoServerOdd",
                "DemoServerEven",
                "DemoServerOdd"
            ]
        );
    }

    #[test]
    fn start_is_denied_when_pool_is_exhausted() {
        let log = Arc::new(LaunchLog::default());
        let supervisor = supervisor(&log);
        let config = LaunchConfig::new("demo-cluster");

        for _ in 0..8 {
            supervisor.start_worker(&config).unwrap();
        }
        assert!(matches!(
            supervisor.start_worker(&config),
            Err(Error::PoolExhausted { .. })
        ));

        // stopping one frees capacity again
        let victim = supervisor.running().unwrap()[0].clone();
        supervisor.stop_worker(&victim).unwrap();
        assert!(supervisor.start_worker(&config).is_ok());
    }

    #[test]
    fn stop_releases_the_id_for_reuse() {
        let log = Arc::new(LaunchLog::default());
        let supervisor = supervisor(&log);
        let config = LaunchConfig::new("demo-cluster");

        let first = supervisor.start_worker(&config).unwrap();
        let _second = supervisor.start_worker(&config).unwrap();
        supervisor.stop_worker(&first).unwrap();

        // the freed even slot (id 0) is handed to the next start
        supervisor.start_worker(&config).unwrap();
        let started = log.started.lock().unwrap();
        assert_eq!(started.last().unwrap().1, "DemoServerEven");
        assert!(log.stopped.lock().unwrap().contains(&first));
    }

    #[test]
    fn stop_of_unknown_worker_is_tolerated() {
        let log = Arc::new(LaunchLog::default());
        let supervisor = supervisor(&log);
        supervisor.stop_worker(&"member-99".to_owned()).unwrap();
        assert_eq!(supervisor.worker_count().unwrap(), 0);
    }

    #[test]
    fn failed_launch_rolls_back_the_allocation() {
        let log = Arc::new(LaunchLog::default());
        log.fail_next.store(1, Ordering::Relaxed);
        let supervisor = supervisor(&log);
        let config = LaunchConfig::new("demo-cluster");

        assert!(matches!(
            supervisor.start_worker(&config),
            Err(Error::Launch { .. })
        ));
        assert_eq!(supervisor.worker_count().unwrap(), 0);

        // the rolled-back id 0 is reused by the next successful start
        supervisor.start_worker(&config).unwrap();
        let started = log.started.lock().unwrap();
        assert_eq!(started[0].1, "DemoServerEven");
    }

    #[test]
    fn stop_all_drains_every_worker() {
        let log = Arc::new(LaunchLog::default());
        let supervisor = supervisor(&log);
        let config = LaunchConfig::new("demo-cluster");

        for _ in 0..5 {
            supervisor.start_worker(&config).unwrap();
        }
        supervisor.stop_all().unwrap();

        assert_eq!(supervisor.worker_count().unwrap(), 0);
        assert_eq!(log.stopped.lock().unwrap().len(), 5);
    }

    #[test]
    fn launch_config_carries_properties_in_order() {
        let config = LaunchConfig::new("demo-cluster")
            .with_property("wka", "127.0.0.1")
            .with_property("ttl", "0");

        assert_eq!(config.cluster_name(), "demo-cluster");
        let properties: Vec<(&str, &str)> = config.properties().collect();
        assert_eq!(properties, [("ttl", "0"), ("wka", "127.0.0.1")]);
    }
}
