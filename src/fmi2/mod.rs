//! FMI 2.0 master interface

mod functions;
pub mod instance;

pub use fmu_driver_sys::fmi2 as binding;
pub use functions::LONGEST_FUNCTION_NAME;
pub use instance::{FmuState, Instance, InstanceCS, InstanceME};

use instance::Fmi2Tag;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct CallbackFunctions {
    pub logger: binding::fmi2CallbackLogger,
    pub allocate_memory: binding::fmi2CallbackAllocateMemory,
    pub free_memory: binding::fmi2CallbackFreeMemory,
    pub step_finished: binding::fmi2StepFinished,
    pub component_environment: binding::fmi2ComponentEnvironment,
}

impl Default for CallbackFunctions {
    fn default() -> Self {
        CallbackFunctions {
            logger: Some(fmu_driver_sys::logger::fmi2_callback_logger_handler as _),
            allocate_memory: Some(libc::calloc),
            free_memory: Some(libc::free),
            step_finished: None,
            component_environment: std::ptr::null_mut::<std::os::raw::c_void>(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum StatusKind {
    /// Can be called when `fmi2DoStep` returned `fmi2Pending`.
    DoStepStatus = binding::fmi2StatusKind_fmi2DoStepStatus,
    /// Can be called when `fmi2DoStep` returned `fmi2Pending`; delivers a description of the
    /// running computation.
    PendingStatus = binding::fmi2StatusKind_fmi2PendingStatus,
    /// End time of the last successfully completed communication step. Can be called after
    /// `fmi2DoStep` returned `fmi2Discard`.
    LastSuccessfulTime = binding::fmi2StatusKind_fmi2LastSuccessfulTime,
    /// Whether the slave wants to terminate the simulation. Can be called after `fmi2DoStep`
    /// returned `fmi2Discard`.
    Terminated = binding::fmi2StatusKind_fmi2Terminated,
}

/// Event information returned by `fmi2NewDiscreteStates`
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct EventInfo {
    pub new_discrete_states_needed: bool,
    pub terminate_simulation: bool,
    pub nominals_of_continuous_states_changed: bool,
    pub values_of_continuous_states_changed: bool,
    pub next_event_time: Option<f64>,
}

impl From<binding::fmi2EventInfo> for EventInfo {
    fn from(info: binding::fmi2EventInfo) -> Self {
        Self {
            new_discrete_states_needed: info.newDiscreteStatesNeeded != binding::fmi2False,
            terminate_simulation: info.terminateSimulation != binding::fmi2False,
            nominals_of_continuous_states_changed: info.nominalsOfContinuousStatesChanged
                != binding::fmi2False,
            values_of_continuous_states_changed: info.valuesOfContinuousStatesChanged
                != binding::fmi2False,
            next_event_time: (info.nextEventTimeDefined != binding::fmi2False)
                .then_some(info.nextEventTime),
        }
    }
}

/// Terminate `instance` if there is one. `None` counts as success.
pub fn terminate<Tag: Fmi2Tag>(instance: Option<Instance<Tag>>) -> bool {
    match instance {
        Some(instance) => instance.terminate(),
        None => true,
    }
}
