use std::{ffi::CStr, ptr};

use crate::{resolver::fmi_call, LifecycleState, Status, ValueReference, CS};

use super::{binding, Instance};
use crate::fmi1::StatusKind;

impl Instance<CS> {
    /// The `fmiTypesPlatform` string the slave was compiled with
    pub fn get_types_platform(&self) -> Option<&str> {
        let f = self.functions.get_types_platform.function()?;
        let ptr = unsafe { f() };
        (!ptr.is_null())
            .then(|| unsafe { CStr::from_ptr(ptr) }.to_str().ok())
            .flatten()
    }

    /// Initialize the slave for a simulation starting at `t_start`. The model counts as
    /// initialized from here on, whatever the returned status.
    pub fn initialize_slave(&mut self, t_start: f64, t_stop: Option<f64>) -> bool {
        self.state.transition(LifecycleState::Initializing);
        let ok = fmi_call!(self.functions.initialize_slave(
            t_start,
            t_stop.is_some() as binding::fmiBoolean,
            t_stop.unwrap_or(0.0),
        ));
        self.state.model_initialized = true;
        self.state.transition(LifecycleState::Initialized);
        ok
    }

    /// Advance the slave by one communication step. Every step is a new step; the driver never
    /// repeats a rejected one.
    pub fn do_step(&mut self, current_communication_point: f64, communication_step_size: f64) -> bool {
        self.state.transition(LifecycleState::Stepping);
        fmi_call!(self.functions.do_step(
            current_communication_point,
            communication_step_size,
            binding::fmiTrue,
        ))
    }

    pub fn reset_slave(&mut self) -> bool {
        let ok = fmi_call!(self.functions.reset_slave());
        if ok {
            self.state.model_initialized = false;
            self.state.transition(LifecycleState::Instantiated);
        }
        ok
    }

    pub fn cancel_step(&mut self) -> bool {
        fmi_call!(self.functions.cancel_step())
    }

    /// # Panics
    /// If `vrs`, `orders` and `values` differ in length.
    pub fn set_real_input_derivatives(
        &mut self,
        vrs: &[ValueReference],
        orders: &[i32],
        values: &[f64],
    ) -> bool {
        assert_eq!(vrs.len(), orders.len());
        assert_eq!(vrs.len(), values.len());
        fmi_call!(self.functions.set_real_input_derivatives(
            vrs.as_ptr(),
            vrs.len(),
            orders.as_ptr(),
            values.as_ptr(),
        ))
    }

    /// # Panics
    /// If `vrs`, `orders` and `values` differ in length.
    pub fn get_real_output_derivatives(
        &mut self,
        vrs: &[ValueReference],
        orders: &[i32],
        values: &mut [f64],
    ) -> bool {
        assert_eq!(vrs.len(), orders.len());
        assert_eq!(vrs.len(), values.len());
        fmi_call!(self.functions.get_real_output_derivatives(
            vrs.as_ptr(),
            vrs.len(),
            orders.as_ptr(),
            values.as_mut_ptr(),
        ))
    }

    pub fn get_status(&mut self, kind: StatusKind) -> Option<Status> {
        let mut value = binding::fmiStatus_fmiOK;
        fmi_call!(self.functions.get_status(kind as binding::fmiStatusKind, &mut value))
            .then(|| Status::from_raw(value))
    }

    pub fn get_real_status(&mut self, kind: StatusKind) -> Option<f64> {
        let mut value = 0.0;
        fmi_call!(self.functions.get_real_status(kind as binding::fmiStatusKind, &mut value))
            .then_some(value)
    }

    pub fn get_integer_status(&mut self, kind: StatusKind) -> Option<i32> {
        let mut value = 0;
        fmi_call!(self.functions.get_integer_status(kind as binding::fmiStatusKind, &mut value))
            .then_some(value)
    }

    pub fn get_boolean_status(&mut self, kind: StatusKind) -> Option<bool> {
        let mut value = binding::fmiFalse;
        fmi_call!(self.functions.get_boolean_status(kind as binding::fmiStatusKind, &mut value))
            .then_some(value != binding::fmiFalse)
    }

    pub fn get_string_status(&mut self, kind: StatusKind) -> Option<String> {
        let mut value: binding::fmiString = ptr::null();
        if !fmi_call!(self.functions.get_string_status(kind as binding::fmiStatusKind, &mut value)) {
            return None;
        }
        Some(if value.is_null() {
            String::new()
        } else {
            unsafe { CStr::from_ptr(value) }.to_string_lossy().into_owned()
        })
    }

    /// End time of the last successfully completed communication step
    pub fn last_successful_time(&mut self) -> Option<f64> {
        self.get_real_status(StatusKind::LastSuccessfulTime)
    }
}
