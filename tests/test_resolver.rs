//! Symbol resolution: missing functions, stubs, prefixes and capabilities.

use std::sync::Arc;

use fmu_driver::{
    fmi2, traits::FmiInstance as _, Capabilities, DriverOptions, Error, FmiVersion, FmuKind,
    Status, SymbolPrefix,
};
use fmu_mock::{MockFmu, RecordingLogger};

#[test_log::test]
fn test_missing_mandatory_function_is_stubbed() {
    let fmu = MockFmu::with_behavior(FmiVersion::V2, FmuKind::CoSimulation, |behavior| {
        behavior.missing.insert("fmi2CancelStep");
    });
    let logger = Arc::new(RecordingLogger::default());
    let options = DriverOptions::default().with_logger(logger.clone());

    let mut instance =
        fmi2::InstanceCS::initialize_with(&fmu.descriptor("inst1"), &options, &fmu.loader())
            .unwrap();
    assert_eq!(instance.error_status(), Status::Warning);
    let records = logger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, Status::Warning);
    assert_eq!(records[0].category, "fmi2CancelStep");
    assert_eq!(
        records[0].message,
        "Unable to load function 'fmi2CancelStep' for FMU 'inst1'."
    );
    assert!(matches!(
        instance.last_error(),
        Some(Error::MissingFunction {
            function: "fmi2CancelStep",
            ..
        })
    ));

    // Other functions still work
    assert!(instance.do_step(0.0, 0.1, true));

    // The stub reports Fatal for a live component
    assert!(!instance.cancel_step());
    assert_eq!(instance.error_status(), Status::Fatal);
    assert!(matches!(
        instance.last_error(),
        Some(Error::Status {
            function: "fmi2CancelStep",
            status: Status::Fatal,
            ..
        })
    ));
    assert!(instance.stop_requested());
}

#[test_log::test]
fn test_missing_instantiate() {
    let fmu = MockFmu::with_behavior(FmiVersion::V2, FmuKind::ModelExchange, |behavior| {
        behavior.missing.insert("fmi2Instantiate");
    });
    let logger = Arc::new(RecordingLogger::default());
    let options = DriverOptions::default().with_logger(logger.clone());

    let result = fmi2::InstanceME::initialize_with(&fmu.descriptor("inst1"), &options, &fmu.loader());
    assert!(matches!(result, Err(Error::Instantiation { .. })));

    let records = logger.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].status, Status::Error);
    assert_eq!(
        records[1].message,
        "Error in supplied FMU: An error occurred in function 'fmi2Instantiate' for block \
         'inst1' during simulation."
    );
}

#[test_log::test]
fn test_failed_instantiation() {
    let fmu = MockFmu::with_behavior(FmiVersion::V2, FmuKind::CoSimulation, |behavior| {
        behavior.fail_instantiate = true;
    });
    let result = fmi2::InstanceCS::initialize_with(
        &fmu.descriptor("inst1"),
        &DriverOptions::default(),
        &fmu.loader(),
    );
    assert!(matches!(result, Err(Error::Instantiation { instance }) if instance == "inst1"));
    assert_eq!(fmu.call_count("fmi2Instantiate"), 1);
    assert_eq!(fmu.call_count("fmi2FreeInstance"), 0);
}

#[test_log::test]
fn test_instance_name_prefix() {
    let fmu = MockFmu::new(FmiVersion::V2, FmuKind::CoSimulation);
    let options = DriverOptions {
        symbol_prefix: SymbolPrefix::InstanceName,
        ..DriverOptions::default()
    };

    let loader = fmu.loader().with_prefix("inst1");
    let mut instance =
        fmi2::InstanceCS::initialize_with(&fmu.descriptor("inst1"), &options, &loader).unwrap();
    assert_eq!(instance.error_status(), Status::Ok);
    assert!(instance.do_step(0.0, 0.5, true));
    assert_eq!(instance.last_successful_time(), Some(0.5));

    // Bare names are not exported by a prefixed library
    let result = fmi2::InstanceCS::initialize_with(
        &fmu.descriptor("inst2"),
        &DriverOptions::default(),
        &loader,
    );
    assert!(matches!(result, Err(Error::Instantiation { .. })));
}

#[test_log::test]
fn test_capability_makes_function_mandatory() {
    let configure = |behavior: &mut fmu_mock::MockBehavior| {
        behavior.missing.insert("fmi2GetFMUstate");
    };

    let fmu = MockFmu::with_behavior(FmiVersion::V2, FmuKind::CoSimulation, configure);
    let logger = Arc::new(RecordingLogger::default());
    let options = DriverOptions::default()
        .with_logger(logger.clone())
        .with_capabilities(Capabilities::FMU_STATE);
    let instance =
        fmi2::InstanceCS::initialize_with(&fmu.descriptor("inst1"), &options, &fmu.loader())
            .unwrap();
    assert_eq!(instance.error_status(), Status::Warning);
    assert!(logger.contains("Unable to load function 'fmi2GetFMUstate' for FMU 'inst1'."));
    drop(instance);

    let fmu = MockFmu::with_behavior(FmiVersion::V2, FmuKind::CoSimulation, configure);
    let logger = Arc::new(RecordingLogger::default());
    let options = DriverOptions::default().with_logger(logger.clone());
    let mut instance =
        fmi2::InstanceCS::initialize_with(&fmu.descriptor("inst1"), &options, &fmu.loader())
            .unwrap();
    assert_eq!(instance.error_status(), Status::Ok);
    assert!(logger.records().is_empty());

    assert_eq!(instance.get_fmu_state(), None);
    assert!(matches!(instance.last_error(), Some(Error::Unsupported { .. })));
}

#[test_log::test]
fn test_interface_mismatch() {
    let fmu = MockFmu::new(FmiVersion::V2, FmuKind::ModelExchange);
    let loader = fmu.loader();
    let result = fmi2::InstanceCS::initialize_with(
        &fmu.descriptor("inst1"),
        &DriverOptions::default(),
        &loader,
    );
    assert!(matches!(
        result,
        Err(Error::InterfaceMismatch {
            expected_kind: FmuKind::CoSimulation,
            found_kind: FmuKind::ModelExchange,
            ..
        })
    ));
    assert_eq!(loader.load_count(), 0);
}
