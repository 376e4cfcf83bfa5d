use std::{
    ffi::{CString, NulError},
    fmt, ops,
    os::raw::{c_uint, c_void},
    path::PathBuf,
    sync::Arc,
};

use crate::{LogLogger, Logger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FmiVersion {
    V1,
    V2,
}

impl fmt::Display for FmiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FmiVersion::V1 => f.write_str("1.0"),
            FmiVersion::V2 => f.write_str("2.0"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FmuKind {
    ModelExchange,
    CoSimulation,
}

impl fmt::Display for FmuKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FmuKind::ModelExchange => f.write_str("ModelExchange"),
            FmuKind::CoSimulation => f.write_str("CoSimulation"),
        }
    }
}

/// Identifies one FMU instance to load. Cloned into the handle and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct FmuDescriptor {
    /// Path of the shared library inside the unpacked FMU
    pub library_path: PathBuf,
    /// Name of this instance, also used as the block name in diagnostics
    pub instance_name: String,
    /// FMI 1.0 symbol prefix; informational for FMI 2.0
    pub model_identifier: String,
    pub guid: String,
    /// URI of the `resources` directory (FMI 2.0) or of the unpacked FMU root (FMI 1.0
    /// Co-Simulation `fmuLocation`)
    pub resource_location: Option<String>,
    pub version: FmiVersion,
    pub kind: FmuKind,
}

/// Descriptor strings in the form handed to the FMU's instantiate function
pub(crate) struct InstantiateStrings {
    pub instance_name: CString,
    pub guid: CString,
    /// Empty when the descriptor has no resource location
    pub resource_location: CString,
}

impl FmuDescriptor {
    /// Fails when any string passed to the FMU contains an interior NUL byte.
    pub(crate) fn instantiate_strings(&self) -> Result<InstantiateStrings, NulError> {
        Ok(InstantiateStrings {
            instance_name: CString::new(self.instance_name.as_str())?,
            guid: CString::new(self.guid.as_str())?,
            resource_location: CString::new(
                self.resource_location.as_deref().unwrap_or_default(),
            )?,
        })
    }
}

/// Optional FMU capabilities. Functions gated by a capability are mandatory when it is set and
/// optional otherwise.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
    /// `fmi2GetFMUstate`, `fmi2SetFMUstate`, `fmi2FreeFMUstate`
    pub const FMU_STATE: Capabilities = Capabilities(1 << 0);
    /// `fmi2SerializedFMUstateSize`, `fmi2SerializeFMUstate`, `fmi2DeSerializeFMUstate`
    pub const SERIALIZATION: Capabilities = Capabilities(1 << 1);
    /// `fmi2GetDirectionalDerivative`
    pub const DIRECTIONAL_DERIVATIVES: Capabilities = Capabilities(1 << 2);
    /// FMI 1.0 `fmiGetRealOutputDerivatives`
    pub const REAL_OUTPUT_DERIVATIVES: Capabilities = Capabilities(1 << 3);
    /// FMI 1.0 `fmiSetRealInputDerivatives`
    pub const REAL_INPUT_DERIVATIVES: Capabilities = Capabilities(1 << 4);

    pub const fn empty() -> Self {
        Capabilities(0)
    }

    pub const fn all() -> Self {
        Capabilities(0b1_1111)
    }

    pub const fn contains(self, other: Capabilities) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl ops::BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Capabilities(self.0 | rhs.0)
    }
}

impl ops::BitOrAssign for Capabilities {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// How FMI 2.0 symbol names are formed. FMI 1.0 always prefixes the model identifier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SymbolPrefix {
    /// Bare standard names, e.g. `fmi2DoStep`
    #[default]
    Standard,
    /// `<instanceName>_fmi2DoStep`, as exported by FMUs statically linked into one target
    InstanceName,
}

/// `allocateMemory` callback: `nobj` zero-initialized objects of `size` bytes
pub type AllocateMemory = unsafe extern "C" fn(nobj: usize, size: usize) -> *mut c_void;

/// `freeMemory` callback for memory obtained from [`AllocateMemory`]
pub type FreeMemory = unsafe extern "C" fn(obj: *mut c_void);

/// `stepFinished` callback of asynchronous Co-Simulation slaves. The first argument is the
/// component for FMI 1.0 and the component environment for FMI 2.0; the second is the raw
/// status of the finished step.
pub type StepFinished = unsafe extern "C" fn(c: *mut c_void, status: c_uint);

/// Memory and step-completion callbacks handed to the FMU at instantiation. The logger
/// callback is always the driver's own.
#[derive(Debug, Clone, Copy)]
pub struct HostCallbacks {
    pub allocate_memory: AllocateMemory,
    pub free_memory: FreeMemory,
    pub step_finished: Option<StepFinished>,
}

impl Default for HostCallbacks {
    fn default() -> Self {
        Self {
            allocate_memory: libc::calloc,
            free_memory: libc::free,
            step_finished: None,
        }
    }
}

/// Host-side configuration applied when a handle is created.
#[derive(Clone)]
pub struct DriverOptions {
    pub capabilities: Capabilities,
    /// Passed to the FMU's instantiate function
    pub visible: bool,
    /// Passed to the FMU's instantiate function
    pub logging_on: bool,
    pub symbol_prefix: SymbolPrefix,
    pub callbacks: HostCallbacks,
    pub logger: Arc<dyn Logger>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            capabilities: Capabilities::empty(),
            visible: false,
            logging_on: false,
            symbol_prefix: SymbolPrefix::Standard,
            callbacks: HostCallbacks::default(),
            logger: Arc::new(LogLogger),
        }
    }
}

impl DriverOptions {
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    #[must_use]
    pub fn with_callbacks(mut self, callbacks: HostCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }
}

impl fmt::Debug for DriverOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverOptions")
            .field("capabilities", &self.capabilities)
            .field("visible", &self.visible)
            .field("logging_on", &self.logging_on)
            .field("symbol_prefix", &self.symbol_prefix)
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}
