//! Mock FMI 2.0 model exporting every standard function, Model Exchange and Co-Simulation.
#![allow(non_snake_case)]

use std::{
    collections::HashMap,
    ffi::CStr,
    os::raw::{c_char, c_void},
    ptr, slice,
};

use fmu_driver::Status;
use fmu_driver_sys::fmi2::*;

use crate::{lock, lookup, Convergence, MockState, SharedState};

struct Component {
    state: SharedState,
    /// Work memory obtained through the host's `allocateMemory`
    work: *mut c_void,
    free_memory: fmi2CallbackFreeMemory,
}

/// Size of the work memory each component requests from the host
const WORK_MEMORY_SIZE: usize = 64;

/// Snapshot behind an `fmi2FMUstate`
#[derive(Debug, Clone, Default)]
struct Snapshot {
    reals: HashMap<u32, f64>,
}

impl Snapshot {
    const ENTRY_SIZE: usize = 12;

    fn to_bytes(&self) -> Vec<u8> {
        let mut entries: Vec<_> = self.reals.iter().collect();
        entries.sort_by_key(|(vr, _)| **vr);
        entries
            .into_iter()
            .flat_map(|(vr, value)| {
                vr.to_le_bytes()
                    .into_iter()
                    .chain(value.to_le_bytes())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() % Self::ENTRY_SIZE != 0 {
            return None;
        }
        let reals = bytes
            .chunks_exact(Self::ENTRY_SIZE)
            .map(|chunk| {
                let (vr, value) = chunk.split_at(4);
                Some((
                    u32::from_le_bytes(vr.try_into().ok()?),
                    f64::from_le_bytes(value.try_into().ok()?),
                ))
            })
            .collect::<Option<_>>()?;
        Some(Self { reals })
    }
}

/// Count the call and run `body` unless the status of `function` is overridden.
unsafe fn call(
    c: fmi2Component,
    function: &'static str,
    body: impl FnOnce(&mut MockState) -> Status,
) -> fmi2Status {
    if c.is_null() {
        return Status::Error as fmi2Status;
    }
    let component = &*(c as *const Component);
    let mut state = lock(&component.state);
    let status = match state.record(function) {
        Some(status) => status,
        None => body(&mut state),
    };
    status as fmi2Status
}

unsafe fn values<'a, T>(ptr: *const T, len: usize) -> &'a [T] {
    if len == 0 {
        &[]
    } else {
        slice::from_raw_parts(ptr, len)
    }
}

unsafe fn values_mut<'a, T>(ptr: *mut T, len: usize) -> &'a mut [T] {
    if len == 0 {
        &mut []
    } else {
        slice::from_raw_parts_mut(ptr, len)
    }
}

unsafe extern "C" fn fmi2GetTypesPlatform() -> *const c_char {
    c"default".as_ptr()
}

unsafe extern "C" fn fmi2GetVersion() -> *const c_char {
    c"2.0".as_ptr()
}

unsafe extern "C" fn fmi2SetDebugLogging(
    c: fmi2Component,
    _logging_on: fmi2Boolean,
    _n_categories: usize,
    _categories: *const fmi2String,
) -> fmi2Status {
    call(c, "fmi2SetDebugLogging", |_| Status::Ok)
}

unsafe extern "C" fn fmi2Instantiate(
    instance_name: fmi2String,
    _fmu_type: fmi2Type,
    guid: fmi2String,
    _resource_location: fmi2String,
    functions: *const fmi2CallbackFunctions,
    _visible: fmi2Boolean,
    logging_on: fmi2Boolean,
) -> fmi2Component {
    let Some(state) = CStr::from_ptr(guid).to_str().ok().and_then(lookup) else {
        return ptr::null_mut();
    };
    {
        let mut state = lock(&state);
        state.record("fmi2Instantiate");
        if state.behavior.fail_instantiate {
            return ptr::null_mut();
        }
        state.live_instances += 1;
    }

    let name = CStr::from_ptr(instance_name).to_owned();
    let callbacks = *functions;
    if logging_on != fmi2False {
        if let Some(logger) = callbacks.logger {
            logger(
                callbacks.componentEnvironment,
                name.as_ptr(),
                fmi2Status_fmi2OK,
                c"logAll".as_ptr(),
                c"Instantiated %s".as_ptr(),
                name.as_ptr(),
            );
        }
    }

    let work = match callbacks.allocateMemory {
        Some(allocate) => allocate(1, WORK_MEMORY_SIZE),
        None => ptr::null_mut(),
    };
    Box::into_raw(Box::new(Component {
        state,
        work,
        free_memory: callbacks.freeMemory,
    })) as fmi2Component
}

unsafe extern "C" fn fmi2FreeInstance(c: fmi2Component) {
    if c.is_null() {
        return;
    }
    let component = Box::from_raw(c as *mut Component);
    if let (Some(free_memory), false) = (component.free_memory, component.work.is_null()) {
        free_memory(component.work);
    }
    let mut state = lock(&component.state);
    state.record("fmi2FreeInstance");
    state.live_instances = state.live_instances.saturating_sub(1);
}

unsafe extern "C" fn fmi2SetupExperiment(
    c: fmi2Component,
    _tolerance_defined: fmi2Boolean,
    _tolerance: fmi2Real,
    start_time: fmi2Real,
    _stop_time_defined: fmi2Boolean,
    _stop_time: fmi2Real,
) -> fmi2Status {
    call(c, "fmi2SetupExperiment", |state| {
        state.time = start_time;
        Status::Ok
    })
}

unsafe extern "C" fn fmi2EnterInitializationMode(c: fmi2Component) -> fmi2Status {
    call(c, "fmi2EnterInitializationMode", |_| Status::Ok)
}

unsafe extern "C" fn fmi2ExitInitializationMode(c: fmi2Component) -> fmi2Status {
    call(c, "fmi2ExitInitializationMode", |_| Status::Ok)
}

unsafe extern "C" fn fmi2Terminate(c: fmi2Component) -> fmi2Status {
    call(c, "fmi2Terminate", |_| Status::Ok)
}

unsafe extern "C" fn fmi2Reset(c: fmi2Component) -> fmi2Status {
    call(c, "fmi2Reset", |state| {
        state.reals.clear();
        state.integers.clear();
        state.booleans.clear();
        state.strings.clear();
        Status::Ok
    })
}

unsafe extern "C" fn fmi2GetReal(
    c: fmi2Component,
    vr: *const fmi2ValueReference,
    nvr: usize,
    value: *mut fmi2Real,
) -> fmi2Status {
    call(c, "fmi2GetReal", |state| {
        for (vr, value) in values(vr, nvr).iter().zip(values_mut(value, nvr)) {
            *value = state.reals.get(vr).copied().unwrap_or_default();
        }
        Status::Ok
    })
}

unsafe extern "C" fn fmi2GetInteger(
    c: fmi2Component,
    vr: *const fmi2ValueReference,
    nvr: usize,
    value: *mut fmi2Integer,
) -> fmi2Status {
    call(c, "fmi2GetInteger", |state| {
        for (vr, value) in values(vr, nvr).iter().zip(values_mut(value, nvr)) {
            *value = state.integers.get(vr).copied().unwrap_or_default();
        }
        Status::Ok
    })
}

unsafe extern "C" fn fmi2GetBoolean(
    c: fmi2Component,
    vr: *const fmi2ValueReference,
    nvr: usize,
    value: *mut fmi2Boolean,
) -> fmi2Status {
    call(c, "fmi2GetBoolean", |state| {
        for (vr, value) in values(vr, nvr).iter().zip(values_mut(value, nvr)) {
            *value = state.booleans.get(vr).copied().unwrap_or_default() as fmi2Boolean;
        }
        Status::Ok
    })
}

unsafe extern "C" fn fmi2GetString(
    c: fmi2Component,
    vr: *const fmi2ValueReference,
    nvr: usize,
    value: *mut fmi2String,
) -> fmi2Status {
    call(c, "fmi2GetString", |state| {
        for (vr, value) in values(vr, nvr).iter().zip(values_mut(value, nvr)) {
            *value = state
                .strings
                .get(vr)
                .map_or(c"".as_ptr(), |s| s.as_ptr());
        }
        Status::Ok
    })
}

unsafe extern "C" fn fmi2SetReal(
    c: fmi2Component,
    vr: *const fmi2ValueReference,
    nvr: usize,
    value: *const fmi2Real,
) -> fmi2Status {
    call(c, "fmi2SetReal", |state| {
        state
            .reals
            .extend(values(vr, nvr).iter().copied().zip(values(value, nvr).iter().copied()));
        Status::Ok
    })
}

unsafe extern "C" fn fmi2SetInteger(
    c: fmi2Component,
    vr: *const fmi2ValueReference,
    nvr: usize,
    value: *const fmi2Integer,
) -> fmi2Status {
    call(c, "fmi2SetInteger", |state| {
        state
            .integers
            .extend(values(vr, nvr).iter().copied().zip(values(value, nvr).iter().copied()));
        Status::Ok
    })
}

unsafe extern "C" fn fmi2SetBoolean(
    c: fmi2Component,
    vr: *const fmi2ValueReference,
    nvr: usize,
    value: *const fmi2Boolean,
) -> fmi2Status {
    call(c, "fmi2SetBoolean", |state| {
        state.booleans.extend(
            values(vr, nvr)
                .iter()
                .copied()
                .zip(values(value, nvr).iter().map(|v| *v != fmi2False)),
        );
        Status::Ok
    })
}

unsafe extern "C" fn fmi2SetString(
    c: fmi2Component,
    vr: *const fmi2ValueReference,
    nvr: usize,
    value: *const fmi2String,
) -> fmi2Status {
    call(c, "fmi2SetString", |state| {
        for (vr, value) in values(vr, nvr).iter().zip(values(value, nvr)) {
            state.strings.insert(*vr, CStr::from_ptr(*value).to_owned());
        }
        Status::Ok
    })
}

unsafe extern "C" fn fmi2GetFMUstate(c: fmi2Component, fmu_state: *mut fmi2FMUstate) -> fmi2Status {
    call(c, "fmi2GetFMUstate", |state| {
        let snapshot = Snapshot {
            reals: state.reals.clone(),
        };
        if (*fmu_state).is_null() {
            *fmu_state = Box::into_raw(Box::new(snapshot)) as fmi2FMUstate;
            state.live_fmu_states += 1;
        } else {
            *(*fmu_state as *mut Snapshot) = snapshot;
        }
        state.behavior.fmu_state_status
    })
}

unsafe extern "C" fn fmi2SetFMUstate(c: fmi2Component, fmu_state: fmi2FMUstate) -> fmi2Status {
    call(c, "fmi2SetFMUstate", |state| {
        if fmu_state.is_null() {
            return Status::Error;
        }
        state.reals = (*(fmu_state as *const Snapshot)).reals.clone();
        Status::Ok
    })
}

unsafe extern "C" fn fmi2FreeFMUstate(c: fmi2Component, fmu_state: *mut fmi2FMUstate) -> fmi2Status {
    call(c, "fmi2FreeFMUstate", |state| {
        if !(*fmu_state).is_null() {
            drop(Box::from_raw(*fmu_state as *mut Snapshot));
            *fmu_state = ptr::null_mut();
            state.live_fmu_states = state.live_fmu_states.saturating_sub(1);
        }
        Status::Ok
    })
}

unsafe extern "C" fn fmi2SerializedFMUstateSize(
    c: fmi2Component,
    fmu_state: fmi2FMUstate,
    size: *mut usize,
) -> fmi2Status {
    call(c, "fmi2SerializedFMUstateSize", |_| {
        let snapshot = &*(fmu_state as *const Snapshot);
        *size = snapshot.reals.len() * Snapshot::ENTRY_SIZE;
        Status::Ok
    })
}

unsafe extern "C" fn fmi2SerializeFMUstate(
    c: fmi2Component,
    fmu_state: fmi2FMUstate,
    serialized_state: *mut fmi2Byte,
    size: usize,
) -> fmi2Status {
    call(c, "fmi2SerializeFMUstate", |_| {
        let bytes = (*(fmu_state as *const Snapshot)).to_bytes();
        if bytes.len() != size {
            return Status::Error;
        }
        values_mut(serialized_state as *mut u8, size).copy_from_slice(&bytes);
        Status::Ok
    })
}

unsafe extern "C" fn fmi2DeSerializeFMUstate(
    c: fmi2Component,
    serialized_state: *const fmi2Byte,
    size: usize,
    fmu_state: *mut fmi2FMUstate,
) -> fmi2Status {
    call(c, "fmi2DeSerializeFMUstate", |state| {
        let Some(snapshot) = Snapshot::from_bytes(values(serialized_state as *const u8, size))
        else {
            return Status::Error;
        };
        *fmu_state = Box::into_raw(Box::new(snapshot)) as fmi2FMUstate;
        state.live_fmu_states += 1;
        state.behavior.fmu_state_status
    })
}

/// Every unknown is the sum of the known seeds.
unsafe extern "C" fn fmi2GetDirectionalDerivative(
    c: fmi2Component,
    _unknown_refs: *const fmi2ValueReference,
    n_unknown: usize,
    _known_refs: *const fmi2ValueReference,
    n_known: usize,
    dv_known: *const fmi2Real,
    dv_unknown: *mut fmi2Real,
) -> fmi2Status {
    call(c, "fmi2GetDirectionalDerivative", |_| {
        let sum: f64 = values(dv_known, n_known).iter().sum();
        values_mut(dv_unknown, n_unknown).fill(sum);
        Status::Ok
    })
}

unsafe extern "C" fn fmi2EnterEventMode(c: fmi2Component) -> fmi2Status {
    call(c, "fmi2EnterEventMode", |_| Status::Ok)
}

unsafe extern "C" fn fmi2NewDiscreteStates(
    c: fmi2Component,
    event_info: *mut fmi2EventInfo,
) -> fmi2Status {
    call(c, "fmi2NewDiscreteStates", |state| {
        let calls = state.call_count("fmi2NewDiscreteStates");
        let needed = match state.behavior.convergence {
            Convergence::After(n) => calls < n,
            Convergence::Never => true,
        };
        let info = &mut *event_info;
        info.newDiscreteStatesNeeded = needed as fmi2Boolean;
        info.terminateSimulation = state.behavior.terminate_simulation as fmi2Boolean;
        info.nominalsOfContinuousStatesChanged = fmi2False;
        info.valuesOfContinuousStatesChanged = fmi2False;
        info.nextEventTimeDefined = state.behavior.next_event_time.is_some() as fmi2Boolean;
        info.nextEventTime = state.behavior.next_event_time.unwrap_or_default();
        Status::Ok
    })
}

unsafe extern "C" fn fmi2EnterContinuousTimeMode(c: fmi2Component) -> fmi2Status {
    call(c, "fmi2EnterContinuousTimeMode", |_| Status::Ok)
}

unsafe extern "C" fn fmi2CompletedIntegratorStep(
    c: fmi2Component,
    _no_set_prior: fmi2Boolean,
    enter_event_mode: *mut fmi2Boolean,
    terminate_simulation: *mut fmi2Boolean,
) -> fmi2Status {
    call(c, "fmi2CompletedIntegratorStep", |state| {
        *enter_event_mode = state
            .behavior
            .next_event_time
            .is_some_and(|t| t <= state.time) as fmi2Boolean;
        *terminate_simulation = state.behavior.terminate_simulation as fmi2Boolean;
        Status::Ok
    })
}

unsafe extern "C" fn fmi2SetTime(c: fmi2Component, time: fmi2Real) -> fmi2Status {
    call(c, "fmi2SetTime", |state| {
        state.time = time;
        Status::Ok
    })
}

unsafe extern "C" fn fmi2SetContinuousStates(
    c: fmi2Component,
    x: *const fmi2Real,
    nx: usize,
) -> fmi2Status {
    call(c, "fmi2SetContinuousStates", |state| {
        state.continuous_states = values(x, nx).to_vec();
        Status::Ok
    })
}

/// `der(x) = -x`
unsafe extern "C" fn fmi2GetDerivatives(
    c: fmi2Component,
    derivatives: *mut fmi2Real,
    nx: usize,
) -> fmi2Status {
    call(c, "fmi2GetDerivatives", |state| {
        for (i, der) in values_mut(derivatives, nx).iter_mut().enumerate() {
            *der = -state.continuous_states.get(i).copied().unwrap_or_default();
        }
        Status::Ok
    })
}

unsafe extern "C" fn fmi2GetEventIndicators(
    c: fmi2Component,
    indicators: *mut fmi2Real,
    ni: usize,
) -> fmi2Status {
    call(c, "fmi2GetEventIndicators", |state| {
        values_mut(indicators, ni).fill(state.time);
        Status::Ok
    })
}

unsafe extern "C" fn fmi2GetContinuousStates(
    c: fmi2Component,
    x: *mut fmi2Real,
    nx: usize,
) -> fmi2Status {
    call(c, "fmi2GetContinuousStates", |state| {
        for (i, x) in values_mut(x, nx).iter_mut().enumerate() {
            *x = state.continuous_states.get(i).copied().unwrap_or_default();
        }
        Status::Ok
    })
}

unsafe extern "C" fn fmi2GetNominalsOfContinuousStates(
    c: fmi2Component,
    x_nominal: *mut fmi2Real,
    nx: usize,
) -> fmi2Status {
    call(c, "fmi2GetNominalsOfContinuousStates", |_| {
        values_mut(x_nominal, nx).fill(1.0);
        Status::Ok
    })
}

unsafe extern "C" fn fmi2SetRealInputDerivatives(
    c: fmi2Component,
    _vr: *const fmi2ValueReference,
    _nvr: usize,
    _order: *const fmi2Integer,
    _value: *const fmi2Real,
) -> fmi2Status {
    call(c, "fmi2SetRealInputDerivatives", |_| Status::Ok)
}

unsafe extern "C" fn fmi2GetRealOutputDerivatives(
    c: fmi2Component,
    _vr: *const fmi2ValueReference,
    nvr: usize,
    _order: *const fmi2Integer,
    value: *mut fmi2Real,
) -> fmi2Status {
    call(c, "fmi2GetRealOutputDerivatives", |_| {
        values_mut(value, nvr).fill(0.0);
        Status::Ok
    })
}

unsafe extern "C" fn fmi2DoStep(
    c: fmi2Component,
    current_communication_point: fmi2Real,
    communication_step_size: fmi2Real,
    _no_set_prior: fmi2Boolean,
) -> fmi2Status {
    call(c, "fmi2DoStep", |state| {
        state.time = current_communication_point + communication_step_size;
        Status::Ok
    })
}

unsafe extern "C" fn fmi2CancelStep(c: fmi2Component) -> fmi2Status {
    call(c, "fmi2CancelStep", |_| Status::Ok)
}

unsafe extern "C" fn fmi2GetStatus(
    c: fmi2Component,
    _kind: fmi2StatusKind,
    value: *mut fmi2Status,
) -> fmi2Status {
    call(c, "fmi2GetStatus", |_| {
        *value = fmi2Status_fmi2OK;
        Status::Ok
    })
}

unsafe extern "C" fn fmi2GetRealStatus(
    c: fmi2Component,
    kind: fmi2StatusKind,
    value: *mut fmi2Real,
) -> fmi2Status {
    call(c, "fmi2GetRealStatus", |state| {
        if kind != fmi2StatusKind_fmi2LastSuccessfulTime {
            return Status::Discard;
        }
        *value = state.time;
        Status::Ok
    })
}

unsafe extern "C" fn fmi2GetIntegerStatus(
    c: fmi2Component,
    _kind: fmi2StatusKind,
    _value: *mut fmi2Integer,
) -> fmi2Status {
    call(c, "fmi2GetIntegerStatus", |_| Status::Discard)
}

unsafe extern "C" fn fmi2GetBooleanStatus(
    c: fmi2Component,
    kind: fmi2StatusKind,
    value: *mut fmi2Boolean,
) -> fmi2Status {
    call(c, "fmi2GetBooleanStatus", |state| {
        if kind != fmi2StatusKind_fmi2Terminated {
            return Status::Discard;
        }
        *value = state.behavior.terminated as fmi2Boolean;
        Status::Ok
    })
}

unsafe extern "C" fn fmi2GetStringStatus(
    c: fmi2Component,
    _kind: fmi2StatusKind,
    value: *mut fmi2String,
) -> fmi2Status {
    call(c, "fmi2GetStringStatus", |_| {
        *value = c"idle".as_ptr();
        Status::Ok
    })
}

macro_rules! symbol_table {
    ($($function:ident),* $(,)?) => {
        vec![$((stringify!($function), $function as *const c_void)),*]
    };
}

/// Standard name and address of every mock FMI 2.0 function
pub fn symbols() -> Vec<(&'static str, *const c_void)> {
    symbol_table![
        fmi2GetTypesPlatform,
        fmi2GetVersion,
        fmi2SetDebugLogging,
        fmi2Instantiate,
        fmi2FreeInstance,
        fmi2SetupExperiment,
        fmi2EnterInitializationMode,
        fmi2ExitInitializationMode,
        fmi2Terminate,
        fmi2Reset,
        fmi2GetReal,
        fmi2GetInteger,
        fmi2GetBoolean,
        fmi2GetString,
        fmi2SetReal,
        fmi2SetInteger,
        fmi2SetBoolean,
        fmi2SetString,
        fmi2GetFMUstate,
        fmi2SetFMUstate,
        fmi2FreeFMUstate,
        fmi2SerializedFMUstateSize,
        fmi2SerializeFMUstate,
        fmi2DeSerializeFMUstate,
        fmi2GetDirectionalDerivative,
        fmi2EnterEventMode,
        fmi2NewDiscreteStates,
        fmi2EnterContinuousTimeMode,
        fmi2CompletedIntegratorStep,
        fmi2SetTime,
        fmi2SetContinuousStates,
        fmi2GetDerivatives,
        fmi2GetEventIndicators,
        fmi2GetContinuousStates,
        fmi2GetNominalsOfContinuousStates,
        fmi2SetRealInputDerivatives,
        fmi2GetRealOutputDerivatives,
        fmi2DoStep,
        fmi2CancelStep,
        fmi2GetStatus,
        fmi2GetRealStatus,
        fmi2GetIntegerStatus,
        fmi2GetBooleanStatus,
        fmi2GetStringStatus,
    ]
}
