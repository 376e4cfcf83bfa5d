//! The `fmu-driver` crate implements the master side of the FMI Standard for FMI 1.0 and 2.0
//! FMUs (Functional Mock-up Units), see <http://www.fmi-standard.org/>.
//!
//! It loads an FMU's shared library, resolves the standard function table, owns the FMU
//! component through a typed handle, and translates every FMI status into a boolean result plus
//! a sticky error state.
//!
//! ## Examples
//!
//! ### Driving an FMI 2.0 Co-Simulation FMU
//!
//! ```rust,no_run
//! use fmu_driver::{archive::UnpackedFmu, fmi2, DriverOptions, FmiVersion, FmuKind};
//!
//! let fmu = UnpackedFmu::from_path("path/to/BouncingBall.fmu").unwrap();
//! let descriptor = fmu
//!     .descriptor(
//!         FmiVersion::V2,
//!         FmuKind::CoSimulation,
//!         "BouncingBall",
//!         "{1AE5E10D-9521-4DE3-80B9-D0EAAA7D5AF1}",
//!         "ball",
//!     )
//!     .unwrap();
//!
//! let mut instance = fmi2::InstanceCS::initialize(&descriptor, &DriverOptions::default()).unwrap();
//! assert!(instance.setup_experiment(None, 0.0, Some(1.0)));
//! assert!(instance.enter_initialization_mode());
//! assert!(instance.exit_initialization_mode());
//!
//! let mut time = 0.0;
//! while time < 1.0 && instance.do_step(time, 0.01, true) {
//!     time += 0.01;
//! }
//! assert!(fmi2::terminate(Some(instance)));
//! ```
//!
//! ### Event iteration on an FMI 1.0 Model Exchange FMU
//!
//! ```rust,no_run
//! use fmu_driver::{fmi1, DriverOptions, FmiVersion, FmuDescriptor, FmuKind};
//!
//! let descriptor = FmuDescriptor {
//!     library_path: "binaries/linux64/Dahlquist.so".into(),
//!     instance_name: "dq".to_owned(),
//!     model_identifier: "Dahlquist".to_owned(),
//!     guid: "{8c4e810f-3df3-4a00-8276-176fa3c9f000}".to_owned(),
//!     resource_location: None,
//!     version: FmiVersion::V1,
//!     kind: FmuKind::ModelExchange,
//! };
//!
//! let mut model = fmi1::InstanceME::initialize(&descriptor, &DriverOptions::default()).unwrap();
//! assert!(model.initialize_model(None));
//! model.set_iteration_converged(true, 0.0);
//! assert!(model.event_iteration("dq", 0.0));
//! assert!(model.terminate());
//! ```
#![doc = document_features::document_features!()]
#![deny(clippy::all)]

use std::path::PathBuf;

pub mod archive;
mod aux_tables;
mod descriptor;
mod event_iteration;
#[cfg(feature = "fmi1")]
pub mod fmi1;
#[cfg(feature = "fmi2")]
pub mod fmi2;
mod handle;
pub mod library;
pub mod logger;
pub mod resolver;
mod status;
pub mod traits;

pub use aux_tables::AuxTables;
pub use descriptor::{
    AllocateMemory, Capabilities, DriverOptions, FmiVersion, FmuDescriptor, FmuKind, FreeMemory,
    HostCallbacks, StepFinished, SymbolPrefix,
};
pub use event_iteration::MAX_EVENT_ITERATIONS;
pub use handle::LifecycleState;
pub use logger::{Diagnostic, LogLogger, Logger, Origin};
pub use status::Status;

/// An opaque key identifying a model variable; forwarded to the FMU untouched.
pub type ValueReference = u32;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("FMU Name '{name}' is too long.")]
    NameTooLong { name: String, max: usize },

    #[error("Unable to load dynamic library: '{}'. Load Library Error: '{source}'", path.display())]
    LibraryLoad {
        path: PathBuf,
        #[source]
        source: library::LoadError,
    },

    #[error("Unable to load function '{function}' for FMU '{instance}'.")]
    MissingFunction {
        function: &'static str,
        instance: String,
    },

    #[error("Function '{function}' is not provided by FMU '{instance}'.")]
    Unsupported {
        function: &'static str,
        instance: String,
    },

    #[error("Instantiation of FMU '{instance}' failed.")]
    Instantiation { instance: String },

    #[error("FMU '{instance}' is described as FMI {found_version} {found_kind}, expected FMI {expected_version} {expected_kind}")]
    InterfaceMismatch {
        instance: String,
        expected_version: FmiVersion,
        expected_kind: FmuKind,
        found_version: FmiVersion,
        found_kind: FmuKind,
    },

    #[error("Error in supplied FMU: An error occurred in function '{function}' for block '{instance}' during simulation.")]
    Status {
        function: &'static str,
        instance: String,
        status: Status,
    },

    #[error("Function '{function}' in block '{instance}' returned 'fmiPending' flag during simulation.")]
    Pending {
        function: &'static str,
        instance: String,
    },

    #[error("Error in supplied FMU: '{function}' at time {time} iterated over {iterations} times in block {context}.")]
    NonConvergence {
        function: &'static str,
        time: f64,
        iterations: usize,
        context: String,
    },

    #[error("String passed to the FMU contains an interior NUL byte")]
    InvalidString(#[from] std::ffi::NulError),

    #[error("Unsupported platform {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Path {0:?} cannot be expressed as a file URL")]
    InvalidPath(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

/// Tag for Model Exchange
#[derive(Debug)]
pub struct ME;

impl traits::InstanceTag for ME {
    const KIND: FmuKind = FmuKind::ModelExchange;
}

/// Tag for Co-Simulation
#[derive(Debug)]
pub struct CS;

impl traits::InstanceTag for CS {
    const KIND: FmuKind = FmuKind::CoSimulation;
}
