//! Traits shared by the FMI 1.0 and FMI 2.0 handles

use crate::{AuxTables, FmuDescriptor, FmuKind, LifecycleState, Status};

/// Compile-time marker for the interface type of an instance.
pub trait InstanceTag {
    const KIND: FmuKind;
}

/// Observations common to every FMU handle, whatever its FMI version.
pub trait FmiInstance {
    /// The descriptor this handle was created from
    fn descriptor(&self) -> &FmuDescriptor;

    /// The instance name passed to the FMU
    fn name(&self) -> &str {
        &self.descriptor().instance_name
    }

    /// The worst status any FMU call has returned so far. `Error` and `Fatal` are sticky and
    /// control which FMU functions `terminate` still calls.
    fn error_status(&self) -> Status;

    /// The most recent failure, classified.
    fn last_error(&self) -> Option<&crate::Error>;

    /// Whether any diagnostic asked the host to stop the simulation.
    fn stop_requested(&self) -> bool;

    /// Whether the initialization call has been made.
    fn model_initialized(&self) -> bool;

    fn lifecycle(&self) -> LifecycleState;

    /// Host-side parameter offset and enum value tables.
    fn aux_tables(&self) -> &AuxTables;

    fn aux_tables_mut(&mut self) -> &mut AuxTables;
}
