//! Test the FMI1.0 instance API against the in-process mock FMU.

use std::{
    os::raw::c_void,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use fmu_driver::{
    fmi1::{self, StatusKind},
    traits::FmiInstance as _,
    DriverOptions, FmiVersion, FmuKind, HostCallbacks, LifecycleState, Status,
};
use fmu_mock::{MockFmu, RecordingLogger};

#[test_log::test]
fn test_instance_cs() {
    let fmu = MockFmu::new(FmiVersion::V1, FmuKind::CoSimulation);
    let logger = Arc::new(RecordingLogger::default());
    let options = DriverOptions {
        logging_on: true,
        ..DriverOptions::default()
    }
    .with_logger(logger.clone());

    let mut slave =
        fmi1::InstanceCS::initialize_with(&fmu.descriptor("slave"), &options, &fmu.loader())
            .unwrap();
    assert_eq!(slave.get_version(), Some("1.0"));
    assert_eq!(slave.get_types_platform(), Some("standard32"));
    assert_eq!(fmu.call_count("fmiInstantiateSlave"), 1);

    assert!(slave.set_debug_logging(false));
    assert!(slave.initialize_slave(0.0, Some(1.0)));
    assert!(slave.model_initialized());

    assert!(slave.set_real_value(3, 9.81));
    assert_eq!(slave.get_real_value(3), Some(9.81));
    assert!(slave.set_boolean_value(4, true));
    assert_eq!(slave.get_boolean_value(4), Some(true));
    assert!(slave.set_string_value(5, "fmi1"));
    assert_eq!(slave.get_string_value(5).as_deref(), Some("fmi1"));

    assert!(slave.do_step(0.0, 0.1));
    assert_eq!(slave.lifecycle(), LifecycleState::Stepping);
    assert_eq!(slave.last_successful_time(), Some(0.1));
    assert_eq!(slave.get_status(StatusKind::DoStepStatus), Some(Status::Ok));
    assert_eq!(
        slave.get_string_status(StatusKind::PendingStatus),
        Some("idle".to_owned())
    );
    assert!(slave.cancel_step());

    // FMU log output goes to the `log` facade, not the injected logger
    assert!(logger.records().is_empty());

    assert!(fmi1::terminate(Some(slave)));
    assert_eq!(fmu.call_count("fmiTerminateSlave"), 1);
    assert_eq!(fmu.call_count("fmiFreeSlaveInstance"), 1);
    assert_eq!(fmu.state().live_instances, 0);
}

#[test_log::test]
fn test_reset_slave() {
    let fmu = MockFmu::new(FmiVersion::V1, FmuKind::CoSimulation);
    let mut slave = fmi1::InstanceCS::initialize_with(
        &fmu.descriptor("slave"),
        &DriverOptions::default(),
        &fmu.loader(),
    )
    .unwrap();

    assert!(slave.initialize_slave(0.0, None));
    assert!(slave.reset_slave());
    assert!(!slave.model_initialized());
    assert_eq!(slave.lifecycle(), LifecycleState::Instantiated);

    // Not initialized any more, so terminate only frees
    assert!(slave.terminate());
    assert_eq!(fmu.call_count("fmiTerminateSlave"), 0);
    assert_eq!(fmu.call_count("fmiFreeSlaveInstance"), 1);
}

#[test_log::test]
fn test_optional_slave_derivatives() {
    let fmu = MockFmu::with_behavior(FmiVersion::V1, FmuKind::CoSimulation, |behavior| {
        behavior.missing.insert("fmiGetRealOutputDerivatives");
    });
    let logger = Arc::new(RecordingLogger::default());
    let options = DriverOptions::default().with_logger(logger.clone());
    let mut slave =
        fmi1::InstanceCS::initialize_with(&fmu.descriptor("slave"), &options, &fmu.loader())
            .unwrap();
    assert_eq!(slave.error_status(), Status::Ok);

    assert!(slave.set_real_input_derivatives(&[1], &[1], &[0.5]));
    let mut values = [1.0];
    assert!(!slave.get_real_output_derivatives(&[1], &[1], &mut values));
    assert!(logger.contains("'fmiGetRealOutputDerivatives' is not provided"));
}

#[test_log::test]
fn test_instance_me() {
    let fmu = MockFmu::with_behavior(FmiVersion::V1, FmuKind::ModelExchange, |behavior| {
        behavior.next_event_time = Some(2.0);
    });
    let mut model = fmi1::InstanceME::initialize_with(
        &fmu.descriptor("model"),
        &DriverOptions::default(),
        &fmu.loader(),
    )
    .unwrap();
    assert_eq!(model.get_version(), Some("1.0"));
    assert_eq!(model.get_model_types_platform(), Some("standard32"));

    assert!(model.initialize_model(Some(1e-4)));
    assert!(model.model_initialized());
    assert_eq!(model.next_event_time(), Some(2.0));

    // Forced right after initialization
    model.set_iteration_converged(true, 0.0);
    assert!(model.event_iteration("model", 0.0));
    assert_eq!(fmu.call_count("fmiEventUpdate"), 1);
    assert!(model.state_values_changed());
    assert!(model.event_info().iteration_converged);

    // No time event due yet
    model.set_iteration_converged(false, 1.0);
    assert!(model.event_iteration("model", 1.0));
    assert_eq!(fmu.call_count("fmiEventUpdate"), 1);

    // Time event due
    model.set_iteration_converged(false, 2.0);
    assert!(model.event_iteration("model", 2.0));
    assert_eq!(fmu.call_count("fmiEventUpdate"), 2);

    assert!(model.set_time(2.0));
    assert_eq!(model.lifecycle(), LifecycleState::ContinuousTimeMode);
    assert!(model.set_continuous_states(&[4.0]));
    let mut derivatives = [0.0];
    assert!(model.get_derivatives(&mut derivatives));
    assert_eq!(derivatives, [-4.0]);

    let mut states = [0.0];
    assert!(model.get_continuous_states(&mut states));
    assert_eq!(states, [4.0]);

    let mut nominals = [0.0];
    assert!(model.get_nominal_continuous_states(&mut nominals));
    assert_eq!(nominals, [1.0]);

    let mut indicators = [0.0; 2];
    assert!(model.get_event_indicators(&mut indicators));
    assert_eq!(indicators, [2.0, 2.0]);

    let mut vrs = [0; 2];
    assert!(model.get_state_value_references(&mut vrs));
    assert_eq!(vrs, [1000, 1001]);

    let mut call_event_update = true;
    assert!(model.completed_integrator_step(&mut call_event_update));
    assert!(!call_event_update);

    assert!(model.set_integer(&[1, 2], &[10, 20]));
    let mut integers = [0; 2];
    assert!(model.get_integer(&[1, 2], &mut integers));
    assert_eq!(integers, [10, 20]);

    assert!(model.terminate());
    assert_eq!(fmu.call_count("fmiTerminate"), 1);
    assert_eq!(fmu.call_count("fmiFreeModelInstance"), 1);
}

#[test_log::test]
fn test_symbols_use_model_identifier() {
    let fmu = MockFmu::new(FmiVersion::V1, FmuKind::ModelExchange);
    let mut descriptor = fmu.descriptor("model");
    descriptor.model_identifier = "other".to_owned();
    let logger = Arc::new(RecordingLogger::default());
    let options = DriverOptions::default().with_logger(logger.clone());

    // Nothing resolves under the wrong prefix, so instantiation hits the stub
    let result = fmi1::InstanceME::initialize_with(&descriptor, &options, &fmu.loader());
    assert!(matches!(
        result,
        Err(fmu_driver::Error::Instantiation { .. })
    ));
    assert!(logger.contains("Unable to load function 'fmiInstantiateModel' for FMU 'model'."));
    assert_eq!(fmu.call_count("fmiInstantiateModel"), 0);
}

#[test_log::test]
fn test_host_callbacks() {
    static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
    static FREED: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn allocate(nobj: usize, size: usize) -> *mut c_void {
        ALLOCATED.fetch_add(1, Ordering::SeqCst);
        libc::calloc(nobj, size)
    }

    unsafe extern "C" fn free(obj: *mut c_void) {
        FREED.fetch_add(1, Ordering::SeqCst);
        libc::free(obj)
    }

    let options = DriverOptions::default().with_callbacks(HostCallbacks {
        allocate_memory: allocate,
        free_memory: free,
        step_finished: None,
    });

    let fmu = MockFmu::new(FmiVersion::V1, FmuKind::CoSimulation);
    let slave =
        fmi1::InstanceCS::initialize_with(&fmu.descriptor("slave"), &options, &fmu.loader())
            .unwrap();
    assert!(slave.terminate());

    let fmu = MockFmu::new(FmiVersion::V1, FmuKind::ModelExchange);
    let model =
        fmi1::InstanceME::initialize_with(&fmu.descriptor("model"), &options, &fmu.loader())
            .unwrap();
    assert_eq!(ALLOCATED.load(Ordering::SeqCst), 2);
    assert_eq!(FREED.load(Ordering::SeqCst), 1);
    assert!(model.terminate());

    assert_eq!(FREED.load(Ordering::SeqCst), 2);
}
