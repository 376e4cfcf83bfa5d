//! Mock FMUs for exercising `fmu-driver` without a real shared library.
//!
//! A [`MockFmu`] owns the shared state of one mock model: its configured [`MockBehavior`],
//! echo storage for variable values and a per-function call counter. The mock FMI functions
//! are plain `extern "C"` functions handed to the driver through [`MockLoader`], so the whole
//! C ABI path (function tables, callbacks, the variadic logger) is exercised in-process.

use std::{
    collections::{HashMap, HashSet},
    ffi::CString,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, OnceLock, PoisonError,
    },
};

use fmu_driver::{FmiVersion, FmuDescriptor, FmuKind, Status};

pub mod fmi1;
pub mod fmi2;
mod library;
mod logger;

pub use library::{MockLibrary, MockLoader};
pub use logger::{Record, RecordingLogger};

/// Model identifier of every mock; FMI 1.0 symbols are exported as `mock_fmi*`.
pub const MODEL_IDENTIFIER: &str = "mock";

/// How many discrete-state updates the mock needs before it reports convergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// Converged once `fmi2NewDiscreteStates`/`fmiEventUpdate` has been called this many times
    After(usize),
    Never,
}

/// Configurable behavior of a mock model.
#[derive(Debug, Clone)]
pub struct MockBehavior {
    /// Status returned by the named function instead of its normal result
    pub statuses: HashMap<&'static str, Status>,
    /// Standard function names the library does not export
    pub missing: HashSet<&'static str>,
    pub convergence: Convergence,
    /// Set `terminateSimulation` in every event update
    pub terminate_simulation: bool,
    /// Value reported for `fmi2Terminated`
    pub terminated: bool,
    /// Announced next time event
    pub next_event_time: Option<f64>,
    /// Return a null component from the instantiate function
    pub fail_instantiate: bool,
    /// Status of `fmi2GetFMUstate` and `fmi2DeSerializeFMUstate` after the state is allocated
    pub fmu_state_status: Status,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            statuses: HashMap::new(),
            missing: HashSet::new(),
            convergence: Convergence::After(1),
            terminate_simulation: false,
            terminated: false,
            next_event_time: None,
            fail_instantiate: false,
            fmu_state_status: Status::Ok,
        }
    }
}

/// Everything the mock functions share for one model
#[derive(Debug, Default)]
pub struct MockState {
    pub behavior: MockBehavior,
    calls: HashMap<&'static str, usize>,
    pub reals: HashMap<u32, f64>,
    pub integers: HashMap<u32, i32>,
    pub booleans: HashMap<u32, bool>,
    pub strings: HashMap<u32, CString>,
    pub time: f64,
    pub continuous_states: Vec<f64>,
    /// Components created and not yet freed
    pub live_instances: usize,
    /// FMU states handed out and not yet freed
    pub live_fmu_states: usize,
    /// Libraries handed to the driver by a [`MockLoader`]
    pub libraries_loaded: usize,
    /// Libraries the driver has dropped again
    pub libraries_closed: usize,
}

impl MockState {
    /// Count a call of `function` and return its overridden status, if any.
    pub(crate) fn record(&mut self, function: &'static str) -> Option<Status> {
        *self.calls.entry(function).or_default() += 1;
        self.behavior.statuses.get(function).copied()
    }

    pub fn call_count(&self, function: &str) -> usize {
        self.calls.get(function).copied().unwrap_or_default()
    }
}

type SharedState = Arc<Mutex<MockState>>;

fn registry() -> MutexGuard<'static, HashMap<String, SharedState>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, SharedState>>> = OnceLock::new();
    REGISTRY
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// State registered under `guid`, as passed to the instantiate function
pub(crate) fn lookup(guid: &str) -> Option<SharedState> {
    registry().get(guid).cloned()
}

pub(crate) fn lock(state: &SharedState) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One mock model with a unique GUID. Dropping it unregisters the GUID.
#[derive(Debug)]
pub struct MockFmu {
    guid: String,
    version: FmiVersion,
    kind: FmuKind,
    state: SharedState,
}

impl MockFmu {
    pub fn new(version: FmiVersion, kind: FmuKind) -> Self {
        static NEXT_ID: AtomicUsize = AtomicUsize::new(0);
        let guid = format!("{{mock-{}}}", NEXT_ID.fetch_add(1, Ordering::Relaxed));
        let state = SharedState::default();
        registry().insert(guid.clone(), state.clone());
        log::trace!("Registered mock FMU {guid} ({version} {kind})");
        Self {
            guid,
            version,
            kind,
            state,
        }
    }

    /// Same as [`Self::new`] with the behavior adjusted by `configure`.
    pub fn with_behavior(
        version: FmiVersion,
        kind: FmuKind,
        configure: impl FnOnce(&mut MockBehavior),
    ) -> Self {
        let fmu = Self::new(version, kind);
        configure(&mut fmu.state().behavior);
        fmu
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    /// Descriptor the driver can initialize this mock from
    pub fn descriptor(&self, instance_name: &str) -> FmuDescriptor {
        FmuDescriptor {
            library_path: format!("{MODEL_IDENTIFIER}.so").into(),
            instance_name: instance_name.to_owned(),
            model_identifier: MODEL_IDENTIFIER.to_owned(),
            guid: self.guid.clone(),
            resource_location: Some("file:///tmp/mock/".to_owned()),
            version: self.version,
            kind: self.kind,
        }
    }

    /// Loader serving this mock's function table
    pub fn loader(&self) -> MockLoader {
        MockLoader::new(self.version, self.state.clone())
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }

    pub fn call_count(&self, function: &str) -> usize {
        self.state().call_count(function)
    }
}

impl Drop for MockFmu {
    fn drop(&mut self) {
        registry().remove(&self.guid);
    }
}
