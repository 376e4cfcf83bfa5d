//! Teardown rules of `terminate` and `Drop`, and load-time failures.

use std::sync::Arc;

use fmu_driver::{
    fmi1, fmi2, traits::FmiInstance as _, DriverOptions, Error, FmiVersion, FmuKind, Status,
};
use fmu_mock::{MockFmu, RecordingLogger};

fn initialized_cs(fmu: &MockFmu, logger: &Arc<RecordingLogger>) -> fmi2::InstanceCS {
    let options = DriverOptions::default().with_logger(logger.clone());
    let mut instance =
        fmi2::InstanceCS::initialize_with(&fmu.descriptor("inst1"), &options, &fmu.loader())
            .unwrap();
    assert!(instance.setup_experiment(None, 0.0, None));
    assert!(instance.enter_initialization_mode());
    assert!(instance.exit_initialization_mode());
    instance
}

#[test_log::test]
fn test_terminate_none() {
    assert!(fmi2::terminate::<fmu_driver::CS>(None));
    assert!(fmi2::terminate::<fmu_driver::ME>(None));
    assert!(fmi1::terminate::<fmu_driver::CS>(None));
    assert!(fmi1::terminate::<fmu_driver::ME>(None));
}

#[test_log::test]
fn test_terminate_after_fatal() {
    let fmu = MockFmu::with_behavior(FmiVersion::V2, FmuKind::CoSimulation, |behavior| {
        behavior.statuses.insert("fmi2DoStep", Status::Fatal);
    });
    let logger = Arc::new(RecordingLogger::default());
    let mut instance = initialized_cs(&fmu, &logger);
    instance.aux_tables_mut().create_param_offsets(2);

    assert!(!instance.do_step(0.0, 0.1, true));
    assert_eq!(instance.error_status(), Status::Fatal);

    assert!(instance.terminate());
    assert_eq!(fmu.call_count("fmi2Terminate"), 0);
    assert_eq!(fmu.call_count("fmi2FreeInstance"), 0);

    // The library is closed exactly once, including the drop that follows terminate
    let state = fmu.state();
    assert_eq!(state.libraries_loaded, 1);
    assert_eq!(state.libraries_closed, 1);
}

#[test_log::test]
fn test_fmi1_slave_terminate_after_fatal() {
    let fmu = MockFmu::with_behavior(FmiVersion::V1, FmuKind::CoSimulation, |behavior| {
        behavior.statuses.insert("fmiDoStep", Status::Fatal);
    });
    let mut slave = fmi1::InstanceCS::initialize_with(
        &fmu.descriptor("slave"),
        &DriverOptions::default(),
        &fmu.loader(),
    )
    .unwrap();
    assert!(slave.initialize_slave(0.0, None));
    slave.aux_tables_mut().create_enum_values(3);

    assert!(!slave.do_step(0.0, 0.1));
    assert_eq!(slave.error_status(), Status::Fatal);

    assert!(fmi1::terminate(Some(slave)));
    assert_eq!(fmu.call_count("fmiTerminateSlave"), 0);
    assert_eq!(fmu.call_count("fmiFreeSlaveInstance"), 0);
    assert_eq!(fmu.state().libraries_closed, 1);
}

#[test_log::test]
fn test_fmi1_model_terminate_after_fatal() {
    let fmu = MockFmu::with_behavior(FmiVersion::V1, FmuKind::ModelExchange, |behavior| {
        behavior.statuses.insert("fmiSetTime", Status::Fatal);
    });
    let mut model = fmi1::InstanceME::initialize_with(
        &fmu.descriptor("model"),
        &DriverOptions::default(),
        &fmu.loader(),
    )
    .unwrap();
    assert!(model.initialize_model(None));

    assert!(!model.set_time(0.1));
    assert_eq!(model.error_status(), Status::Fatal);

    drop(model);
    assert_eq!(fmu.call_count("fmiTerminate"), 0);
    assert_eq!(fmu.call_count("fmiFreeModelInstance"), 0);
    assert_eq!(fmu.state().libraries_closed, 1);
}

#[test_log::test]
fn test_terminate_after_error() {
    let fmu = MockFmu::with_behavior(FmiVersion::V2, FmuKind::CoSimulation, |behavior| {
        behavior.statuses.insert("fmi2SetReal", Status::Error);
    });
    let logger = Arc::new(RecordingLogger::default());
    let mut instance = initialized_cs(&fmu, &logger);

    assert!(!instance.set_real_value(1, 1.0));
    assert_eq!(instance.error_status(), Status::Error);

    assert!(instance.terminate());
    assert_eq!(fmu.call_count("fmi2Terminate"), 0);
    assert_eq!(fmu.call_count("fmi2FreeInstance"), 1);
    assert_eq!(fmu.state().live_instances, 0);
}

#[test_log::test]
fn test_terminate_reports_fmu_failure() {
    let fmu = MockFmu::with_behavior(FmiVersion::V2, FmuKind::CoSimulation, |behavior| {
        behavior.statuses.insert("fmi2Terminate", Status::Error);
    });
    let logger = Arc::new(RecordingLogger::default());
    let instance = initialized_cs(&fmu, &logger);

    assert!(!instance.terminate());
    assert_eq!(fmu.call_count("fmi2Terminate"), 1);
    assert_eq!(fmu.call_count("fmi2FreeInstance"), 1);
    assert!(logger.contains("function 'fmi2Terminate' for block 'inst1'"));
}

#[test_log::test]
fn test_terminate_before_initialization() {
    let fmu = MockFmu::new(FmiVersion::V2, FmuKind::ModelExchange);
    let instance = fmi2::InstanceME::initialize_with(
        &fmu.descriptor("inst1"),
        &DriverOptions::default(),
        &fmu.loader(),
    )
    .unwrap();

    assert!(instance.terminate());
    assert_eq!(fmu.call_count("fmi2Terminate"), 0);
    assert_eq!(fmu.call_count("fmi2FreeInstance"), 1);
}

#[test_log::test]
fn test_drop_releases_without_terminate() {
    let fmu = MockFmu::new(FmiVersion::V2, FmuKind::CoSimulation);
    let logger = Arc::new(RecordingLogger::default());
    let instance = initialized_cs(&fmu, &logger);
    assert_eq!(fmu.state().live_instances, 1);

    drop(instance);
    assert_eq!(fmu.call_count("fmi2Terminate"), 0);
    assert_eq!(fmu.call_count("fmi2FreeInstance"), 1);
    assert_eq!(fmu.state().live_instances, 0);
}

#[test_log::test]
fn test_aux_tables_released() {
    let fmu = MockFmu::new(FmiVersion::V1, FmuKind::CoSimulation);
    let mut slave = fmi1::InstanceCS::initialize_with(
        &fmu.descriptor("slave"),
        &DriverOptions::default(),
        &fmu.loader(),
    )
    .unwrap();

    slave.aux_tables_mut().create_param_offsets(3);
    assert!(slave.aux_tables_mut().set_param_offset(2, 40));
    assert_eq!(slave.aux_tables().param_offset(2), Some(40));
    slave.aux_tables_mut().create_enum_values(1);
    assert!(slave.aux_tables_mut().set_enum_value(0, 7));
    assert!(!slave.aux_tables().is_empty());

    assert!(slave.terminate());
    assert_eq!(fmu.call_count("fmiFreeSlaveInstance"), 1);
}

#[test_log::test]
fn test_name_too_long() {
    let fmu = MockFmu::new(FmiVersion::V2, FmuKind::CoSimulation);
    let logger = Arc::new(RecordingLogger::default());
    let options = DriverOptions::default().with_logger(logger.clone());
    let loader = fmu.loader();

    let name = "a".repeat(300);
    let result = fmi2::InstanceCS::initialize_with(&fmu.descriptor(&name), &options, &loader);
    assert!(matches!(result, Err(Error::NameTooLong { .. })));
    assert_eq!(loader.load_count(), 0);

    let records = logger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, Status::Fatal);
    assert_eq!(records[0].message, format!("FMU Name '{name}' is too long."));

    // The longest name that still fits
    let max = 256 - fmi2::LONGEST_FUNCTION_NAME - 2;
    let instance =
        fmi2::InstanceCS::initialize_with(&fmu.descriptor(&"b".repeat(max)), &options, &loader);
    assert!(instance.is_ok());
    assert_eq!(loader.load_count(), 1);
}

#[test_log::test]
fn test_library_load_failure() {
    let fmu = MockFmu::new(FmiVersion::V1, FmuKind::ModelExchange);
    let logger = Arc::new(RecordingLogger::default());
    let options = DriverOptions::default().with_logger(logger.clone());
    let loader = fmu.loader().failing("file not found");

    let result = fmi1::InstanceME::initialize_with(&fmu.descriptor("model"), &options, &loader);
    assert!(matches!(result, Err(Error::LibraryLoad { .. })));
    assert_eq!(loader.load_count(), 1);
    assert_eq!(
        logger.messages(),
        ["Unable to load dynamic library: 'mock.so'. Load Library Error: 'file not found'"]
    );
    assert_eq!(logger.records()[0].status, Status::Fatal);
}

#[test_log::test]
fn test_nul_in_guid() {
    let fmu = MockFmu::new(FmiVersion::V2, FmuKind::ModelExchange);
    let logger = Arc::new(RecordingLogger::default());
    let options = DriverOptions::default().with_logger(logger.clone());
    let loader = fmu.loader();

    let mut descriptor = fmu.descriptor("model");
    descriptor.guid.push_str("\0tail");
    let result = fmi2::InstanceME::initialize_with(&descriptor, &options, &loader);
    assert!(matches!(result, Err(Error::InvalidString(_))));
    assert_eq!(loader.load_count(), 0);

    let records = logger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, Status::Fatal);

    let fmu1 = MockFmu::new(FmiVersion::V1, FmuKind::CoSimulation);
    let loader1 = fmu1.loader();
    let result = fmi1::InstanceCS::initialize_with(
        &fmu1.descriptor("slave\0"),
        &DriverOptions::default(),
        &loader1,
    );
    assert!(matches!(result, Err(Error::InvalidString(_))));
    assert_eq!(loader1.load_count(), 0);
}
