//! Event iteration shared by FMI 1.0 (`fmiEventUpdate`) and FMI 2.0 (`fmi2NewDiscreteStates`).

use crate::{handle::HandleState, Error, Status};

/// Hard cap on discrete-state update calls in one event iteration.
pub const MAX_EVENT_ITERATIONS: usize = 10_000;

/// One FMI flavour of the discrete-state update at an event instant.
pub(crate) trait DiscreteStateUpdate {
    /// FMI name of the update function, used in diagnostics
    const FUNCTION: &'static str;

    /// Reset the event info before the first iteration.
    fn prepare(&mut self) {}

    /// Whether the FMU asked for another update.
    fn iteration_needed(&self) -> bool;

    /// Call the FMU once and store the event info it returns. `None` when the function is
    /// absent.
    fn update(&mut self) -> Option<Status>;

    /// The `terminateSimulation` flag of the last update
    fn terminate_requested(&self) -> bool;

    fn state(&mut self) -> &mut HandleState;

    /// Diagnostic reported when the FMU sets `terminateSimulation`
    fn terminate_message(context: &str, time: f64) -> String {
        format!(
            "'TerminateSimulation' flag was set to true by FMU '{context}' during event \
             iteration. Simulation will stop after the current time step at '{time}'."
        )
    }
}

/// Repeat the discrete-state update until the FMU no longer asks for one.
///
/// A failed update ends the iteration with `false`. A `terminateSimulation` request is reported
/// and forwarded to the host but does not end the iteration. After [`MAX_EVENT_ITERATIONS`]
/// updates without convergence a non-convergence error is reported and `false` returned.
pub(crate) fn iterate<U: DiscreteStateUpdate>(fmu: &mut U, context: &str, time: f64) -> bool {
    fmu.prepare();

    let mut ok = true;
    let mut iterations = 0;
    while fmu.iteration_needed() {
        let outcome = fmu.update();
        iterations += 1;

        ok = fmu.state().translate(outcome, U::FUNCTION);
        if !ok {
            return false;
        }

        if fmu.terminate_requested() {
            let message = U::terminate_message(context, time);
            let state = fmu.state();
            state.report(Status::Ok, U::FUNCTION, &message);
            state.request_stop();
        }

        if iterations >= MAX_EVENT_ITERATIONS && fmu.iteration_needed() {
            let error = Error::NonConvergence {
                function: U::FUNCTION,
                time,
                iterations,
                context: context.to_owned(),
            };
            fmu.state().fail(Status::Error, U::FUNCTION, error);
            return false;
        }
    }

    log::trace!("Event iteration at t={time} converged after {iterations} updates");
    ok
}
