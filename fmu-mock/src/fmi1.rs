//! Mock FMI 1.0 model. Exports both the Model Exchange and the Co-Simulation functions, which
//! the library serves as `mock_fmi*`.
#![allow(non_snake_case)]

use std::{
    ffi::CStr,
    os::raw::{c_char, c_void},
    ptr, slice,
};

use fmu_driver::Status;
use fmu_driver_sys::fmi1::*;

use crate::{lock, lookup, Convergence, MockState, SharedState};

struct Component {
    state: SharedState,
    /// Work memory obtained through the host's `allocateMemory`
    work: *mut c_void,
    free_memory: fmiCallbackFreeMemory,
}

/// Size of the work memory each component requests from the host
const WORK_MEMORY_SIZE: usize = 64;

/// Count the call and run `body` unless the status of `function` is overridden.
unsafe fn call(
    c: fmiComponent,
    function: &'static str,
    body: impl FnOnce(&mut MockState) -> Status,
) -> fmiStatus {
    if c.is_null() {
        return Status::Error as fmiStatus;
    }
    let component = &*(c as *const Component);
    let mut state = lock(&component.state);
    let status = match state.record(function) {
        Some(status) => status,
        None => body(&mut state),
    };
    status as fmiStatus
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

/// Register a new component for `guid` and greet through the logger callback.
unsafe fn instantiate(
    function: &'static str,
    instance_name: fmiString,
    guid: fmiString,
    logger: fmiCallbackLogger,
    allocate_memory: fmiCallbackAllocateMemory,
    free_memory: fmiCallbackFreeMemory,
    logging_on: fmiBoolean,
) -> fmiComponent {
    let Some(state) = CStr::from_ptr(guid).to_str().ok().and_then(lookup) else {
        return ptr::null_mut();
    };
    {
        let mut state = lock(&state);
        state.record(function);
        if state.behavior.fail_instantiate {
            return ptr::null_mut();
        }
        state.live_instances += 1;
    }

    if logging_on != fmiFalse {
        if let Some(logger) = logger {
            logger(
                ptr::null_mut(),
                instance_name,
                fmiStatus_fmiOK,
                c"log".as_ptr(),
                c"%s called".as_ptr(),
                c"instantiate".as_ptr(),
            );
        }
    }

    let work = match allocate_memory {
        Some(allocate) => allocate(1, WORK_MEMORY_SIZE),
        None => ptr::null_mut(),
    };
    Box::into_raw(Box::new(Component {
        state,
        work,
        free_memory,
    })) as fmiComponent
}

unsafe fn free(function: &'static str, c: fmiComponent) {
    if c.is_null() {
        return;
    }
    let component = Box::from_raw(c as *mut Component);
    if let (Some(free_memory), false) = (component.free_memory, component.work.is_null()) {
        free_memory(component.work);
    }
    let mut state = lock(&component.state);
    state.record(function);
    state.live_instances = state.live_instances.saturating_sub(1);
}

unsafe extern "C" fn fmiGetVersion() -> *const c_char {
    c"1.0".as_ptr()
}

unsafe extern "C" fn fmiSetDebugLogging(c: fmiComponent, _logging_on: fmiBoolean) -> fmiStatus {
    call(c, "fmiSetDebugLogging", |_| Status::Ok)
}

unsafe extern "C" fn fmiGetReal(
    c: fmiComponent,
    vr: *const fmiValueReference,
    nvr: usize,
    value: *mut fmiReal,
) -> fmiStatus {
    call(c, "fmiGetReal", |state| {
        for (vr, value) in values(vr, nvr).iter().zip(values_mut(value, nvr)) {
            *value = state.reals.get(vr).copied().unwrap_or_default();
        }
        Status::Ok
    })
}

unsafe extern "C" fn fmiGetInteger(
    c: fmiComponent,
    vr: *const fmiValueReference,
    nvr: usize,
    value: *mut fmiInteger,
) -> fmiStatus {
    call(c, "fmiGetInteger", |state| {
        for (vr, value) in values(vr, nvr).iter().zip(values_mut(value, nvr)) {
            *value = state.integers.get(vr).copied().unwrap_or_default();
        }
        Status::Ok
    })
}

unsafe extern "C" fn fmiGetBoolean(
    c: fmiComponent,
    vr: *const fmiValueReference,
    nvr: usize,
    value: *mut fmiBoolean,
) -> fmiStatus {
    call(c, "fmiGetBoolean", |state| {
        for (vr, value) in values(vr, nvr).iter().zip(values_mut(value, nvr)) {
            *value = state.booleans.get(vr).copied().unwrap_or_default() as fmiBoolean;
        }
        Status::Ok
    })
}

unsafe extern "C" fn fmiGetString(
    c: fmiComponent,
    vr: *const fmiValueReference,
    nvr: usize,
    value: *mut fmiString,
) -> fmiStatus {
    call(c, "fmiGetString", |state| {
        for (vr, value) in values(vr, nvr).iter().zip(values_mut(value, nvr)) {
            *value = state
                .strings
                .get(vr)
                .map_or(c"".as_ptr(), |s| s.as_ptr());
        }
        Status::Ok
    })
}

unsafe extern "C" fn fmiSetReal(
    c: fmiComponent,
    vr: *const fmiValueReference,
    nvr: usize,
    value: *const fmiReal,
) -> fmiStatus {
    call(c, "fmiSetReal", |state| {
        state
            .reals
            .extend(values(vr, nvr).iter().copied().zip(values(value, nvr).iter().copied()));
        Status::Ok
    })
}

unsafe extern "C" fn fmiSetInteger(
    c: fmiComponent,
    vr: *const fmiValueReference,
    nvr: usize,
    value: *const fmiInteger,
) -> fmiStatus {
    call(c, "fmiSetInteger", |state| {
        state
            .integers
            .extend(values(vr, nvr).iter().copied().zip(values(value, nvr).iter().copied()));
        Status::Ok
    })
}

unsafe extern "C" fn fmiSetBoolean(
    c: fmiComponent,
    vr: *const fmiValueReference,
    nvr: usize,
    value: *const fmiBoolean,
) -> fmiStatus {
    call(c, "fmiSetBoolean", |state| {
        state.booleans.extend(
            values(vr, nvr)
                .iter()
                .copied()
                .zip(values(value, nvr).iter().map(|v| *v != fmiFalse)),
        );
        Status::Ok
    })
}

unsafe extern "C" fn fmiSetString(
    c: fmiComponent,
    vr: *const fmiValueReference,
    nvr: usize,
    value: *const fmiString,
) -> fmiStatus {
    call(c, "fmiSetString", |state| {
        for (vr, value) in values(vr, nvr).iter().zip(values(value, nvr)) {
            state.strings.insert(*vr, CStr::from_ptr(*value).to_owned());
        }
        Status::Ok
    })
}

// Model Exchange

unsafe extern "C" fn fmiGetModelTypesPlatform() -> *const c_char {
    c"standard32".as_ptr()
}

unsafe extern "C" fn fmiInstantiateModel(
    instance_name: fmiString,
    guid: fmiString,
    functions: fmiMeCallbackFunctions,
    logging_on: fmiBoolean,
) -> fmiComponent {
    instantiate(
        "fmiInstantiateModel",
        instance_name,
        guid,
        functions.logger,
        functions.allocateMemory,
        functions.freeMemory,
        logging_on,
    )
}

unsafe extern "C" fn fmiFreeModelInstance(c: fmiComponent) {
    free("fmiFreeModelInstance", c);
}

unsafe extern "C" fn fmiSetTime(c: fmiComponent, time: fmiReal) -> fmiStatus {
    call(c, "fmiSetTime", |state| {
        state.time = time;
        Status::Ok
    })
}

unsafe extern "C" fn fmiSetContinuousStates(
    c: fmiComponent,
    x: *const fmiReal,
    nx: usize,
) -> fmiStatus {
    call(c, "fmiSetContinuousStates", |state| {
        state.continuous_states = values(x, nx).to_vec();
        Status::Ok
    })
}

unsafe extern "C" fn fmiCompletedIntegratorStep(
    c: fmiComponent,
    call_event_update: *mut fmiBoolean,
) -> fmiStatus {
    call(c, "fmiCompletedIntegratorStep", |_| {
        *call_event_update = fmiFalse;
        Status::Ok
    })
}

unsafe extern "C" fn fmiInitialize(
    c: fmiComponent,
    _tolerance_controlled: fmiBoolean,
    _relative_tolerance: fmiReal,
    event_info: *mut fmiEventInfo,
) -> fmiStatus {
    call(c, "fmiInitialize", |state| {
        *event_info = fmiEventInfo {
            upcomingTimeEvent: state.behavior.next_event_time.is_some() as fmiBoolean,
            nextEventTime: state.behavior.next_event_time.unwrap_or_default(),
            ..Default::default()
        };
        Status::Ok
    })
}

/// `der(x) = -x`
unsafe extern "C" fn fmiGetDerivatives(
    c: fmiComponent,
    derivatives: *mut fmiReal,
    nx: usize,
) -> fmiStatus {
    call(c, "fmiGetDerivatives", |state| {
        for (i, der) in values_mut(derivatives, nx).iter_mut().enumerate() {
            *der = -state.continuous_states.get(i).copied().unwrap_or_default();
        }
        Status::Ok
    })
}

unsafe extern "C" fn fmiGetEventIndicators(
    c: fmiComponent,
    indicators: *mut fmiReal,
    ni: usize,
) -> fmiStatus {
    call(c, "fmiGetEventIndicators", |state| {
        values_mut(indicators, ni).fill(state.time);
        Status::Ok
    })
}

unsafe extern "C" fn fmiEventUpdate(
    c: fmiComponent,
    _intermediate_results: fmiBoolean,
    event_info: *mut fmiEventInfo,
) -> fmiStatus {
    call(c, "fmiEventUpdate", |state| {
        let calls = state.call_count("fmiEventUpdate");
        let converged = match state.behavior.convergence {
            Convergence::After(n) => calls >= n,
            Convergence::Never => false,
        };
        *event_info = fmiEventInfo {
            iterationConverged: converged as fmiBoolean,
            stateValueReferencesChanged: fmiFalse,
            stateValuesChanged: fmiTrue,
            terminateSimulation: state.behavior.terminate_simulation as fmiBoolean,
            upcomingTimeEvent: state.behavior.next_event_time.is_some() as fmiBoolean,
            nextEventTime: state.behavior.next_event_time.unwrap_or_default(),
        };
        Status::Ok
    })
}

unsafe extern "C" fn fmiGetContinuousStates(
    c: fmiComponent,
    states: *mut fmiReal,
    nx: usize,
) -> fmiStatus {
    call(c, "fmiGetContinuousStates", |state| {
        for (i, x) in values_mut(states, nx).iter_mut().enumerate() {
            *x = state.continuous_states.get(i).copied().unwrap_or_default();
        }
        Status::Ok
    })
}

unsafe extern "C" fn fmiGetNominalContinuousStates(
    c: fmiComponent,
    x_nominal: *mut fmiReal,
    nx: usize,
) -> fmiStatus {
    call(c, "fmiGetNominalContinuousStates", |_| {
        values_mut(x_nominal, nx).fill(1.0);
        Status::Ok
    })
}

/// States are numbered from 1000 upwards
unsafe extern "C" fn fmiGetStateValueReferences(
    c: fmiComponent,
    vrx: *mut fmiValueReference,
    nx: usize,
) -> fmiStatus {
    call(c, "fmiGetStateValueReferences", |_| {
        for (vr, i) in values_mut(vrx, nx).iter_mut().zip(1000..) {
            *vr = i;
        }
        Status::Ok
    })
}

unsafe extern "C" fn fmiTerminate(c: fmiComponent) -> fmiStatus {
    call(c, "fmiTerminate", |_| Status::Ok)
}

// Co-Simulation

unsafe extern "C" fn fmiGetTypesPlatform() -> *const c_char {
    c"standard32".as_ptr()
}

#[allow(clippy::too_many_arguments)]
unsafe extern "C" fn fmiInstantiateSlave(
    instance_name: fmiString,
    guid: fmiString,
    _fmu_location: fmiString,
    _mime_type: fmiString,
    _timeout: fmiReal,
    _visible: fmiBoolean,
    _interactive: fmiBoolean,
    functions: fmiCsCallbackFunctions,
    logging_on: fmiBoolean,
) -> fmiComponent {
    instantiate(
        "fmiInstantiateSlave",
        instance_name,
        guid,
        functions.logger,
        functions.allocateMemory,
        functions.freeMemory,
        logging_on,
    )
}

unsafe extern "C" fn fmiInitializeSlave(
    c: fmiComponent,
    t_start: fmiReal,
    _stop_time_defined: fmiBoolean,
    _t_stop: fmiReal,
) -> fmiStatus {
    call(c, "fmiInitializeSlave", |state| {
        state.time = t_start;
        Status::Ok
    })
}

unsafe extern "C" fn fmiTerminateSlave(c: fmiComponent) -> fmiStatus {
    call(c, "fmiTerminateSlave", |_| Status::Ok)
}

unsafe extern "C" fn fmiResetSlave(c: fmiComponent) -> fmiStatus {
    call(c, "fmiResetSlave", |state| {
        state.reals.clear();
        state.time = 0.0;
        Status::Ok
    })
}

unsafe extern "C" fn fmiFreeSlaveInstance(c: fmiComponent) {
    free("fmiFreeSlaveInstance", c);
}

unsafe extern "C" fn fmiSetRealInputDerivatives(
    c: fmiComponent,
    _vr: *const fmiValueReference,
    _nvr: usize,
    _order: *const fmiInteger,
    _value: *const fmiReal,
) -> fmiStatus {
    call(c, "fmiSetRealInputDerivatives", |_| Status::Ok)
}

unsafe extern "C" fn fmiGetRealOutputDerivatives(
    c: fmiComponent,
    _vr: *const fmiValueReference,
    nvr: usize,
    _order: *const fmiInteger,
    value: *mut fmiReal,
) -> fmiStatus {
    call(c, "fmiGetRealOutputDerivatives", |_| {
        values_mut(value, nvr).fill(0.0);
        Status::Ok
    })
}

unsafe extern "C" fn fmiCancelStep(c: fmiComponent) -> fmiStatus {
    call(c, "fmiCancelStep", |_| Status::Ok)
}

unsafe extern "C" fn fmiDoStep(
    c: fmiComponent,
    current_communication_point: fmiReal,
    communication_step_size: fmiReal,
    _new_step: fmiBoolean,
) -> fmiStatus {
    call(c, "fmiDoStep", |state| {
        state.time = current_communication_point + communication_step_size;
        Status::Ok
    })
}

unsafe extern "C" fn fmiGetStatus(
    c: fmiComponent,
    _kind: fmiStatusKind,
    value: *mut fmiStatus,
) -> fmiStatus {
    call(c, "fmiGetStatus", |_| {
        *value = fmiStatus_fmiOK;
        Status::Ok
    })
}

unsafe extern "C" fn fmiGetRealStatus(
    c: fmiComponent,
    kind: fmiStatusKind,
    value: *mut fmiReal,
) -> fmiStatus {
    call(c, "fmiGetRealStatus", |state| {
        if kind != fmiStatusKind_fmiLastSuccessfulTime {
            return Status::Discard;
        }
        *value = state.time;
        Status::Ok
    })
}

unsafe extern "C" fn fmiGetIntegerStatus(
    c: fmiComponent,
    _kind: fmiStatusKind,
    _value: *mut fmiInteger,
) -> fmiStatus {
    call(c, "fmiGetIntegerStatus", |_| Status::Discard)
}

unsafe extern "C" fn fmiGetBooleanStatus(
    c: fmiComponent,
    _kind: fmiStatusKind,
    _value: *mut fmiBoolean,
) -> fmiStatus {
    call(c, "fmiGetBooleanStatus", |_| Status::Discard)
}

unsafe extern "C" fn fmiGetStringStatus(
    c: fmiComponent,
    _kind: fmiStatusKind,
    value: *mut fmiString,
) -> fmiStatus {
    call(c, "fmiGetStringStatus", |_| {
        *value = c"idle".as_ptr();
        Status::Ok
    })
}

macro_rules! symbol_table {
    ($($function:ident),* $(,)?) => {
        vec![$((stringify!($function), $function as *const c_void)),*]
    };
}

/// Standard (unprefixed) name and address of every mock FMI 1.0 function
pub fn symbols() -> Vec<(&'static str, *const c_void)> {
    symbol_table![
        fmiGetVersion,
        fmiSetDebugLogging,
        fmiGetReal,
        fmiGetInteger,
        fmiGetBoolean,
        fmiGetString,
        fmiSetReal,
        fmiSetInteger,
        fmiSetBoolean,
        fmiSetString,
        fmiGetModelTypesPlatform,
        fmiInstantiateModel,
        fmiFreeModelInstance,
        fmiSetTime,
        fmiSetContinuousStates,
        fmiCompletedIntegratorStep,
        fmiInitialize,
        fmiGetDerivatives,
        fmiGetEventIndicators,
        fmiEventUpdate,
        fmiGetContinuousStates,
        fmiGetNominalContinuousStates,
        fmiGetStateValueReferences,
        fmiTerminate,
        fmiGetTypesPlatform,
        fmiInstantiateSlave,
        fmiInitializeSlave,
        fmiTerminateSlave,
        fmiResetSlave,
        fmiFreeSlaveInstance,
        fmiSetRealInputDerivatives,
        fmiGetRealOutputDerivatives,
        fmiCancelStep,
        fmiDoStep,
        fmiGetStatus,
        fmiGetRealStatus,
        fmiGetIntegerStatus,
        fmiGetBooleanStatus,
        fmiGetStringStatus,
    ]
}
