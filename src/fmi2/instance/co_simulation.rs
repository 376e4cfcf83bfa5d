use std::{ffi::CStr, ptr};

use crate::{resolver::fmi_call, LifecycleState, Status, ValueReference, CS};

use super::{binding, Instance};
use crate::fmi2::StatusKind;

impl Instance<CS> {
    /// Advance the slave by one communication step.
    ///
    /// A step discarded by a slave that reports `fmi2Terminated` produces a termination
    /// diagnostic and a stop request. Any status other than `OK` or `Warning` returns `false`.
    pub fn do_step(
        &mut self,
        current_communication_point: f64,
        communication_step_size: f64,
        no_set_fmu_state_prior_to_current_point: bool,
    ) -> bool {
        self.state.transition(LifecycleState::Stepping);

        let component = self.component;
        let entry = self.functions.do_step;
        let outcome = entry.invoke(component, |f| {
            Status::from_raw(unsafe {
                f(
                    component,
                    current_communication_point,
                    communication_step_size,
                    no_set_fmu_state_prior_to_current_point as binding::fmi2Boolean,
                )
            })
        });

        if outcome == Some(Status::Discard) && self.discarded_by_termination() {
            let message = format!(
                "'fmi2Terminated' flag was set to true for FMU '{}' after 'fmi2DoStep' function \
                 returns 'fmi2Discard' at time {current_communication_point}.",
                self.state.instance_name()
            );
            self.state.report(Status::Ok, entry.name(), &message);
            self.state.request_stop();
        }

        self.state.translate(outcome, entry.name())
    }

    /// Query `fmi2Terminated` directly; its own status is irrelevant after a discarded step.
    fn discarded_by_termination(&mut self) -> bool {
        let Some(get_boolean_status) = self.functions.get_boolean_status.function() else {
            return false;
        };
        let mut terminated = binding::fmi2False;
        unsafe {
            get_boolean_status(
                self.component,
                binding::fmi2StatusKind_fmi2Terminated,
                &mut terminated,
            )
        };
        terminated != binding::fmi2False
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
        let mut value = binding::fmi2Status_fmi2OK;
        fmi_call!(self.functions.get_status(kind as binding::fmi2StatusKind, &mut value))
            .then(|| Status::from_raw(value))
    }

    pub fn get_real_status(&mut self, kind: StatusKind) -> Option<f64> {
        let mut value = 0.0;
        fmi_call!(self.functions.get_real_status(kind as binding::fmi2StatusKind, &mut value))
            .then_some(value)
    }

    pub fn get_integer_status(&mut self, kind: StatusKind) -> Option<i32> {
        let mut value = 0;
        fmi_call!(self.functions.get_integer_status(kind as binding::fmi2StatusKind, &mut value))
            .then_some(value)
    }

    pub fn get_boolean_status(&mut self, kind: StatusKind) -> Option<bool> {
        let mut value = binding::fmi2False;
        fmi_call!(self.functions.get_boolean_status(kind as binding::fmi2StatusKind, &mut value))
            .then_some(value != binding::fmi2False)
    }

    pub fn get_string_status(&mut self, kind: StatusKind) -> Option<String> {
        let mut value: binding::fmi2String = ptr::null();
        if !fmi_call!(self.functions.get_string_status(kind as binding::fmi2StatusKind, &mut value)) {
            return None;
        }
        Some(if value.is_null() {
            String::new()
        } else {
            unsafe { CStr::from_ptr(value) }.to_string_lossy().into_owned()
        })
    }

    /// Whether the slave wants to end the simulation
    pub fn terminated(&mut self) -> Option<bool> {
        self.get_boolean_status(StatusKind::Terminated)
    }

    /// End time of the last successfully completed communication step
    pub fn last_successful_time(&mut self) -> Option<f64> {
        self.get_real_status(StatusKind::LastSuccessfulTime)
    }
}
