//! FMI 1.0 master interface
//!
//! FMI 1.0 has no `componentEnvironment`, so messages an FMU logs through its callback go to the
//! `log` facade with the instance name as target. Driver diagnostics still reach the injected
//! [`crate::Logger`].

mod functions;
pub mod instance;

pub use fmu_driver_sys::fmi1 as binding;
pub use functions::LONGEST_FUNCTION_NAME;
pub use instance::{Instance, InstanceCS, InstanceME};

use instance::Fmi1Tag;

use crate::HostCallbacks;

/// MIME type passed to `fmiInstantiateSlave` for a plain shared-library slave
pub const SHARED_LIBRARY_MIME_TYPE: &std::ffi::CStr = c"application/x-fmu-sharedlibrary";

pub(crate) fn me_callbacks(host: &HostCallbacks) -> binding::fmiMeCallbackFunctions {
    binding::fmiMeCallbackFunctions {
        logger: Some(fmu_driver_sys::logger::fmi1_callback_logger_handler as _),
        allocateMemory: Some(host.allocate_memory),
        freeMemory: Some(host.free_memory),
    }
}

pub(crate) fn cs_callbacks(host: &HostCallbacks) -> binding::fmiCsCallbackFunctions {
    binding::fmiCsCallbackFunctions {
        logger: Some(fmu_driver_sys::logger::fmi1_callback_logger_handler as _),
        allocateMemory: Some(host.allocate_memory),
        freeMemory: Some(host.free_memory),
        stepFinished: host.step_finished,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum StatusKind {
    DoStepStatus = binding::fmiStatusKind_fmiDoStepStatus,
    PendingStatus = binding::fmiStatusKind_fmiPendingStatus,
    LastSuccessfulTime = binding::fmiStatusKind_fmiLastSuccessfulTime,
}

/// Event information returned by `fmiInitialize` and `fmiEventUpdate`
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct EventInfo {
    pub iteration_converged: bool,
    pub state_value_references_changed: bool,
    pub state_values_changed: bool,
    pub terminate_simulation: bool,
    pub next_event_time: Option<f64>,
}

impl From<binding::fmiEventInfo> for EventInfo {
    fn from(info: binding::fmiEventInfo) -> Self {
        Self {
            iteration_converged: info.iterationConverged != binding::fmiFalse,
            state_value_references_changed: info.stateValueReferencesChanged
                != binding::fmiFalse,
            state_values_changed: info.stateValuesChanged != binding::fmiFalse,
            terminate_simulation: info.terminateSimulation != binding::fmiFalse,
            next_event_time: (info.upcomingTimeEvent != binding::fmiFalse)
                .then_some(info.nextEventTime),
        }
    }
}

/// Terminate `instance` if there is one. `None` counts as success.
pub fn terminate<Tag: Fmi1Tag>(instance: Option<Instance<Tag>>) -> bool {
    match instance {
        Some(instance) => instance.terminate(),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_info() {
        let info = binding::fmiEventInfo {
            upcomingTimeEvent: binding::fmiTrue,
            nextEventTime: 1.5,
            stateValuesChanged: binding::fmiTrue,
            ..Default::default()
        };
        let info = EventInfo::from(info);
        assert!(info.iteration_converged);
        assert!(info.state_values_changed);
        assert_eq!(info.next_event_time, Some(1.5));
        assert_eq!(EventInfo::from(binding::fmiEventInfo::default()).next_event_time, None);
    }
}
