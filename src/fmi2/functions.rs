//! Declarative FMI 2.0 function tables

use crate::{
    resolver::{function_table, longest_name},
    Capabilities,
};

use super::binding;

function_table! {
    /// Functions shared by Model Exchange and Co-Simulation
    pub struct CommonFunctions {
        get_types_platform: binding::fmi2GetTypesPlatformTYPE = "fmi2GetTypesPlatform",
        get_version: binding::fmi2GetVersionTYPE = "fmi2GetVersion",
        set_debug_logging: binding::fmi2SetDebugLoggingTYPE = "fmi2SetDebugLogging",
        instantiate: binding::fmi2InstantiateTYPE = "fmi2Instantiate",
        free_instance: binding::fmi2FreeInstanceTYPE = "fmi2FreeInstance",
        setup_experiment: binding::fmi2SetupExperimentTYPE = "fmi2SetupExperiment",
        enter_initialization_mode: binding::fmi2EnterInitializationModeTYPE = "fmi2EnterInitializationMode",
        exit_initialization_mode: binding::fmi2ExitInitializationModeTYPE = "fmi2ExitInitializationMode",
        terminate: binding::fmi2TerminateTYPE = "fmi2Terminate",
        reset: binding::fmi2ResetTYPE = "fmi2Reset",
        get_real: binding::fmi2GetRealTYPE = "fmi2GetReal",
        get_integer: binding::fmi2GetIntegerTYPE = "fmi2GetInteger",
        get_boolean: binding::fmi2GetBooleanTYPE = "fmi2GetBoolean",
        get_string: binding::fmi2GetStringTYPE = "fmi2GetString",
        set_real: binding::fmi2SetRealTYPE = "fmi2SetReal",
        set_integer: binding::fmi2SetIntegerTYPE = "fmi2SetInteger",
        set_boolean: binding::fmi2SetBooleanTYPE = "fmi2SetBoolean",
        set_string: binding::fmi2SetStringTYPE = "fmi2SetString",
        get_fmu_state: binding::fmi2GetFMUstateTYPE = "fmi2GetFMUstate" if Capabilities::FMU_STATE,
        set_fmu_state: binding::fmi2SetFMUstateTYPE = "fmi2SetFMUstate" if Capabilities::FMU_STATE,
        free_fmu_state: binding::fmi2FreeFMUstateTYPE = "fmi2FreeFMUstate" if Capabilities::FMU_STATE,
        serialized_fmu_state_size: binding::fmi2SerializedFMUstateSizeTYPE = "fmi2SerializedFMUstateSize" if Capabilities::SERIALIZATION,
        serialize_fmu_state: binding::fmi2SerializeFMUstateTYPE = "fmi2SerializeFMUstate" if Capabilities::SERIALIZATION,
        deserialize_fmu_state: binding::fmi2DeSerializeFMUstateTYPE = "fmi2DeSerializeFMUstate" if Capabilities::SERIALIZATION,
        get_directional_derivative: binding::fmi2GetDirectionalDerivativeTYPE = "fmi2GetDirectionalDerivative" if Capabilities::DIRECTIONAL_DERIVATIVES,
    }
}

function_table! {
    /// Co-Simulation functions
    pub struct CoSimulationFunctions {
        set_real_input_derivatives: binding::fmi2SetRealInputDerivativesTYPE = "fmi2SetRealInputDerivatives",
        get_real_output_derivatives: binding::fmi2GetRealOutputDerivativesTYPE = "fmi2GetRealOutputDerivatives",
        do_step: binding::fmi2DoStepTYPE = "fmi2DoStep",
        cancel_step: binding::fmi2CancelStepTYPE = "fmi2CancelStep",
        get_status: binding::fmi2GetStatusTYPE = "fmi2GetStatus",
        get_real_status: binding::fmi2GetRealStatusTYPE = "fmi2GetRealStatus",
        get_integer_status: binding::fmi2GetIntegerStatusTYPE = "fmi2GetIntegerStatus",
        get_boolean_status: binding::fmi2GetBooleanStatusTYPE = "fmi2GetBooleanStatus",
        get_string_status: binding::fmi2GetStringStatusTYPE = "fmi2GetStringStatus",
    }
}

function_table! {
    /// Model Exchange functions
    pub struct ModelExchangeFunctions {
        enter_event_mode: binding::fmi2EnterEventModeTYPE = "fmi2EnterEventMode",
        new_discrete_states: binding::fmi2NewDiscreteStatesTYPE = "fmi2NewDiscreteStates",
        enter_continuous_time_mode: binding::fmi2EnterContinuousTimeModeTYPE = "fmi2EnterContinuousTimeMode",
        completed_integrator_step: binding::fmi2CompletedIntegratorStepTYPE = "fmi2CompletedIntegratorStep",
        set_time: binding::fmi2SetTimeTYPE = "fmi2SetTime",
        set_continuous_states: binding::fmi2SetContinuousStatesTYPE = "fmi2SetContinuousStates",
        get_derivatives: binding::fmi2GetDerivativesTYPE = "fmi2GetDerivatives",
        get_event_indicators: binding::fmi2GetEventIndicatorsTYPE = "fmi2GetEventIndicators",
        get_continuous_states: binding::fmi2GetContinuousStatesTYPE = "fmi2GetContinuousStates",
        get_nominals_of_continuous_states: binding::fmi2GetNominalsOfContinuousStatesTYPE = "fmi2GetNominalsOfContinuousStates",
    }
}

/// Length of the longest FMI 2.0 function name, `fmi2GetNominalsOfContinuousStates`
pub const LONGEST_FUNCTION_NAME: usize = longest_name(&[
    CommonFunctions::NAMES,
    CoSimulationFunctions::NAMES,
    ModelExchangeFunctions::NAMES,
]);
