use crate::{
    event_iteration::{self, DiscreteStateUpdate},
    handle::HandleState,
    resolver::fmi_call,
    LifecycleState, Status, ME,
};

use super::{binding, Instance};
use crate::fmi2::EventInfo;

impl Instance<ME> {
    pub fn enter_event_mode(&mut self) -> bool {
        self.state.transition(LifecycleState::EventMode);
        fmi_call!(self.functions.enter_event_mode())
    }

    /// One `fmi2NewDiscreteStates` call; the returned event info is kept on the instance.
    pub fn new_discrete_states(&mut self) -> bool {
        let mut event_info = self.event_info;
        let ok = fmi_call!(self.functions.new_discrete_states(&mut event_info));
        self.event_info = event_info;
        ok
    }

    /// Iterate `fmi2NewDiscreteStates` until the FMU needs no further update, at most
    /// [`crate::MAX_EVENT_ITERATIONS`] times. `context` names the block in diagnostics.
    pub fn event_iteration(&mut self, context: &str, time: f64) -> bool {
        self.state.transition(LifecycleState::EventMode);
        event_iteration::iterate(self, context, time)
    }

    pub fn enter_continuous_time_mode(&mut self) -> bool {
        self.state.transition(LifecycleState::ContinuousTimeMode);
        fmi_call!(self.functions.enter_continuous_time_mode())
    }

    /// Signal a completed integrator step. `enter_event_mode` and `terminate_simulation` receive
    /// the FMU's requests.
    pub fn completed_integrator_step(
        &mut self,
        no_set_fmu_state_prior_to_current_point: bool,
        enter_event_mode: &mut bool,
        terminate_simulation: &mut bool,
    ) -> bool {
        let mut enter = binding::fmi2False;
        let mut terminate = binding::fmi2False;
        let ok = fmi_call!(self.functions.completed_integrator_step(
            no_set_fmu_state_prior_to_current_point as binding::fmi2Boolean,
            &mut enter,
            &mut terminate,
        ));
        *enter_event_mode = enter != binding::fmi2False;
        *terminate_simulation = terminate != binding::fmi2False;
        ok
    }

    pub fn set_time(&mut self, time: f64) -> bool {
        fmi_call!(self.functions.set_time(time))
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

    pub fn get_nominals_of_continuous_states(&mut self, nominals: &mut [f64]) -> bool {
        fmi_call!(self
            .functions
            .get_nominals_of_continuous_states(nominals.as_mut_ptr(), nominals.len()))
    }

    /// Event info from the last discrete-state update
    pub fn event_info(&self) -> EventInfo {
        self.event_info.into()
    }

    /// Time of the next time event, if the FMU announced one
    pub fn next_event_time(&self) -> Option<f64> {
        self.event_info().next_event_time
    }

    pub fn values_of_continuous_states_changed(&self) -> bool {
        self.event_info.valuesOfContinuousStatesChanged != binding::fmi2False
    }
}

impl DiscreteStateUpdate for Instance<ME> {
    const FUNCTION: &'static str = "fmi2NewDiscreteStates";

    fn prepare(&mut self) {
        self.event_info.newDiscreteStatesNeeded = binding::fmi2True;
        self.event_info.terminateSimulation = binding::fmi2False;
    }

    fn iteration_needed(&self) -> bool {
        self.event_info.newDiscreteStatesNeeded != binding::fmi2False
    }

    fn update(&mut self) -> Option<Status> {
        let component = self.component;
        let mut event_info = self.event_info;
        let outcome = self
            .functions
            .new_discrete_states
            .invoke(component, |f| Status::from_raw(unsafe { f(component, &mut event_info) }));
        self.event_info = event_info;
        outcome
    }

    fn terminate_requested(&self) -> bool {
        self.event_info.terminateSimulation != binding::fmi2False
    }

    fn state(&mut self) -> &mut HandleState {
        &mut self.state
    }
}
