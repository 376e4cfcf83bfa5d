use std::ffi::CStr;

use crate::{
    event_iteration::{self, DiscreteStateUpdate},
    handle::HandleState,
    resolver::fmi_call,
    LifecycleState, Status, ValueReference, ME,
};

use super::{binding, Instance};
use crate::fmi1::EventInfo;

impl Instance<ME> {
    /// The `fmiModelTypesPlatform` string the model was compiled with
    pub fn get_model_types_platform(&self) -> Option<&str> {
        let f = self.functions.get_model_types_platform.function()?;
        let ptr = unsafe { f() };
        (!ptr.is_null())
            .then(|| unsafe { CStr::from_ptr(ptr) }.to_str().ok())
            .flatten()
    }

    /// Initialize the model. The model counts as initialized from here on, whatever the
    /// returned status; the returned event info is kept on the instance.
    pub fn initialize_model(&mut self, relative_tolerance: Option<f64>) -> bool {
        self.state.transition(LifecycleState::Initializing);
        let mut event_info = self.event_info;
        let ok = fmi_call!(self.functions.initialize(
            relative_tolerance.is_some() as binding::fmiBoolean,
            relative_tolerance.unwrap_or(0.0),
            &mut event_info,
        ));
        self.event_info = event_info;
        self.state.model_initialized = true;
        self.state.transition(LifecycleState::Initialized);
        ok
    }

    /// Prepare the next [`Self::event_iteration`]. Right after initialization the iteration is
    /// forced; otherwise it only runs when a time event is due at or before `time`.
    pub fn set_iteration_converged(&mut self, fmu_is_initialized: bool, time: f64) {
        let call_event_update = fmu_is_initialized
            || (self.event_info.upcomingTimeEvent != binding::fmiFalse
                && self.event_info.nextEventTime <= time);
        self.event_info.iterationConverged = if call_event_update {
            binding::fmiFalse
        } else {
            binding::fmiTrue
        };
    }

    /// Call `fmiEventUpdate` until the FMU reports convergence, at most
    /// [`crate::MAX_EVENT_ITERATIONS`] times. `context` names the block in diagnostics.
    pub fn event_iteration(&mut self, context: &str, time: f64) -> bool {
        self.state.transition(LifecycleState::EventMode);
        event_iteration::iterate(self, context, time)
    }

    /// Whether the last event changed state values or state value references
    pub fn state_values_changed(&self) -> bool {
        self.event_info.stateValuesChanged != binding::fmiFalse
            || self.event_info.stateValueReferencesChanged != binding::fmiFalse
    }

    /// Time of the next time event, if the FMU announced one
    pub fn next_event_time(&self) -> Option<f64> {
        self.event_info().next_event_time
    }

    pub fn event_info(&self) -> EventInfo {
        self.event_info.into()
    }

    pub fn set_time(&mut self, time: f64) -> bool {
        self.state.transition(LifecycleState::ContinuousTimeMode);
        fmi_call!(self.functions.set_time(time))
    }

    /// Signal a completed integrator step; `call_event_update` receives the FMU's request.
    pub fn completed_integrator_step(&mut self, call_event_update: &mut bool) -> bool {
        let mut raw = binding::fmiFalse;
        let ok = fmi_call!(self.functions.completed_integrator_step(&mut raw));
        *call_event_update = raw != binding::fmiFalse;
        ok
    }

    pub fn set_continuous_states(&mut self, states: &[f64]) -> bool {
        fmi_call!(self.functions.set_continuous_states(states.as_ptr(), states.len()))
    }

    pub fn get_continuous_states(&mut self, states: &mut [f64]) -> bool {
        fmi_call!(self.functions.get_continuous_states(states.as_mut_ptr(), states.len()))
    }

    pub fn get_derivatives(&mut self, derivatives: &mut [f64]) -> bool {
        fmi_call!(self.functions.get_derivatives(derivatives.as_mut_ptr(), derivatives.len()))
    }

    pub fn get_event_indicators(&mut self, indicators: &mut [f64]) -> bool {
        fmi_call!(self.functions.get_event_indicators(indicators.as_mut_ptr(), indicators.len()))
    }

    pub fn get_nominal_continuous_states(&mut self, nominals: &mut [f64]) -> bool {
        fmi_call!(self
            .functions
            .get_nominal_continuous_states(nominals.as_mut_ptr(), nominals.len()))
    }

    pub fn get_state_value_references(&mut self, vrs: &mut [ValueReference]) -> bool {
        fmi_call!(self.functions.get_state_value_references(vrs.as_mut_ptr(), vrs.len()))
    }
}

impl DiscreteStateUpdate for Instance<ME> {
    const FUNCTION: &'static str = "fmiEventUpdate";

    fn iteration_needed(&self) -> bool {
        self.event_info.iterationConverged == binding::fmiFalse
    }

    fn update(&mut self) -> Option<Status> {
        let component = self.component;
        let mut event_info = self.event_info;
        let outcome = self.functions.event_update.invoke(component, |f| {
            Status::from_raw(unsafe { f(component, binding::fmiFalse, &mut event_info) })
        });
        self.event_info = event_info;
        outcome
    }

    fn terminate_requested(&self) -> bool {
        self.event_info.terminateSimulation != binding::fmiFalse
    }

    fn state(&mut self) -> &mut HandleState {
        &mut self.state
    }

    fn terminate_message(context: &str, time: f64) -> String {
        format!(
            "'TerminateSimulation' flag was set to true by FMU '{context}' during \
             'fmiEventUpdate'. Simulation will stop after the current time step at {time}."
        )
    }
}
