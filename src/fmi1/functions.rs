//! Declarative FMI 1.0 function tables. Every symbol is exported as `<modelIdentifier>_<name>`.

use crate::{
    resolver::{function_table, longest_name},
    Capabilities,
};

use super::binding;

function_table! {
    /// Functions shared by Model Exchange and Co-Simulation
    pub struct CommonFunctions {
        get_version: binding::fmiGetVersionTYPE = "fmiGetVersion",
        set_debug_logging: binding::fmiSetDebugLoggingTYPE = "fmiSetDebugLogging",
        get_real: binding::fmiGetRealTYPE = "fmiGetReal",
        get_integer: binding::fmiGetIntegerTYPE = "fmiGetInteger",
        get_boolean: binding::fmiGetBooleanTYPE = "fmiGetBoolean",
        get_string: binding::fmiGetStringTYPE = "fmiGetString",
        set_real: binding::fmiSetRealTYPE = "fmiSetReal",
        set_integer: binding::fmiSetIntegerTYPE = "fmiSetInteger",
        set_boolean: binding::fmiSetBooleanTYPE = "fmiSetBoolean",
        set_string: binding::fmiSetStringTYPE = "fmiSetString",
    }
}

function_table! {
    /// Co-Simulation (slave) functions
    pub struct CoSimulationFunctions {
        get_types_platform: binding::fmiGetTypesPlatformTYPE = "fmiGetTypesPlatform",
        instantiate_slave: binding::fmiInstantiateSlaveTYPE = "fmiInstantiateSlave",
        initialize_slave: binding::fmiInitializeSlaveTYPE = "fmiInitializeSlave",
        terminate_slave: binding::fmiTerminateSlaveTYPE = "fmiTerminateSlave",
        reset_slave: binding::fmiResetSlaveTYPE = "fmiResetSlave",
        free_slave_instance: binding::fmiFreeSlaveInstanceTYPE = "fmiFreeSlaveInstance",
        set_real_input_derivatives: binding::fmiSetRealInputDerivativesTYPE = "fmiSetRealInputDerivatives" if Capabilities::REAL_INPUT_DERIVATIVES,
        get_real_output_derivatives: binding::fmiGetRealOutputDerivativesTYPE = "fmiGetRealOutputDerivatives" if Capabilities::REAL_OUTPUT_DERIVATIVES,
        cancel_step: binding::fmiCancelStepTYPE = "fmiCancelStep",
        do_step: binding::fmiDoStepTYPE = "fmiDoStep",
        get_status: binding::fmiGetStatusTYPE = "fmiGetStatus",
        get_real_status: binding::fmiGetRealStatusTYPE = "fmiGetRealStatus",
        get_integer_status: binding::fmiGetIntegerStatusTYPE = "fmiGetIntegerStatus",
        get_boolean_status: binding::fmiGetBooleanStatusTYPE = "fmiGetBooleanStatus",
        get_string_status: binding::fmiGetStringStatusTYPE = "fmiGetStringStatus",
    }
}

function_table! {
    /// Model Exchange functions
    pub struct ModelExchangeFunctions {
        get_model_types_platform: binding::fmiGetModelTypesPlatformTYPE = "fmiGetModelTypesPlatform",
        instantiate_model: binding::fmiInstantiateModelTYPE = "fmiInstantiateModel",
        free_model_instance: binding::fmiFreeModelInstanceTYPE = "fmiFreeModelInstance",
        set_time: binding::fmiSetTimeTYPE = "fmiSetTime",
        set_continuous_states: binding::fmiSetContinuousStatesTYPE = "fmiSetContinuousStates",
        completed_integrator_step: binding::fmiCompletedIntegratorStepTYPE = "fmiCompletedIntegratorStep",
        initialize: binding::fmiInitializeTYPE = "fmiInitialize",
        get_derivatives: binding::fmiGetDerivativesTYPE = "fmiGetDerivatives",
        get_event_indicators: binding::fmiGetEventIndicatorsTYPE = "fmiGetEventIndicators",
        event_update: binding::fmiEventUpdateTYPE = "fmiEventUpdate",
        get_continuous_states: binding::fmiGetContinuousStatesTYPE = "fmiGetContinuousStates",
        get_nominal_continuous_states: binding::fmiGetNominalContinuousStatesTYPE = "fmiGetNominalContinuousStates",
        get_state_value_references: binding::fmiGetStateValueReferencesTYPE = "fmiGetStateValueReferences",
        terminate: binding::fmiTerminateTYPE = "fmiTerminate",
    }
}

/// Length of the longest FMI 1.0 function name, `fmiGetNominalContinuousStates`
pub const LONGEST_FUNCTION_NAME: usize = longest_name(&[
    CommonFunctions::NAMES,
    CoSimulationFunctions::NAMES,
    ModelExchangeFunctions::NAMES,
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_function_name() {
        assert_eq!(LONGEST_FUNCTION_NAME, "fmiGetNominalContinuousStates".len());
        assert_eq!(CoSimulationFunctions::NAMES.len(), 15);
        assert_eq!(ModelExchangeFunctions::NAMES.len(), 14);
    }
}
