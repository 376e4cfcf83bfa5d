//! Test the FMI2.0 instance API against the in-process mock FMU.

use std::{
    os::raw::c_void,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use fmu_driver::{
    fmi2::{self, Instance},
    traits::FmiInstance as _,
    Capabilities, DriverOptions, Error, FmiVersion, FmuKind, HostCallbacks, LifecycleState, Origin,
    Status, CS, ME,
};
use fmu_mock::{MockFmu, RecordingLogger};

fn options(logger: &Arc<RecordingLogger>) -> DriverOptions {
    DriverOptions {
        logging_on: true,
        ..DriverOptions::default()
    }
    .with_logger(logger.clone())
}

#[test_log::test]
fn test_instance_me() {
    let fmu = MockFmu::with_behavior(FmiVersion::V2, FmuKind::ModelExchange, |behavior| {
        behavior.next_event_time = Some(0.5);
    });
    let logger = Arc::new(RecordingLogger::default());

    let mut instance1 =
        Instance::<ME>::initialize_with(&fmu.descriptor("inst1"), &options(&logger), &fmu.loader())
            .unwrap();
    assert_eq!(instance1.get_version(), Some("2.0"));
    assert_eq!(instance1.get_types_platform(), Some("default"));
    assert_eq!(instance1.lifecycle(), LifecycleState::Instantiated);

    assert!(instance1.set_debug_logging(true, &["logAll"]));
    assert!(instance1.setup_experiment(Some(1.0e-6_f64), 0.0, None));
    assert!(instance1.enter_initialization_mode());
    assert!(instance1.exit_initialization_mode());
    assert!(instance1.model_initialized());

    assert!(instance1.event_iteration("inst1", 0.0));
    assert_eq!(fmu.call_count("fmi2NewDiscreteStates"), 1);
    assert_eq!(instance1.next_event_time(), Some(0.5));
    assert!(!instance1.values_of_continuous_states_changed());

    assert!(instance1.enter_continuous_time_mode());
    assert_eq!(instance1.lifecycle(), LifecycleState::ContinuousTimeMode);
    assert!(instance1.set_time(0.25));
    assert!(instance1.set_continuous_states(&[1.0, 2.0]));

    let mut derivatives = [0.0; 2];
    assert!(instance1.get_derivatives(&mut derivatives));
    assert_eq!(derivatives, [-1.0, -2.0]);

    let mut states = [0.0; 2];
    assert!(instance1.get_continuous_states(&mut states));
    assert_eq!(states, [1.0, 2.0]);

    let mut nominals = [0.0; 2];
    assert!(instance1.get_nominals_of_continuous_states(&mut nominals));
    assert_eq!(nominals, [1.0, 1.0]);

    let mut indicators = [0.0; 1];
    assert!(instance1.get_event_indicators(&mut indicators));
    assert_eq!(indicators, [0.25]);

    let (mut enter_event_mode, mut terminate_simulation) = (true, true);
    assert!(instance1.completed_integrator_step(
        true,
        &mut enter_event_mode,
        &mut terminate_simulation
    ));
    assert!(!enter_event_mode);
    assert!(!terminate_simulation);

    assert!(instance1.enter_event_mode());
    assert!(instance1.reset());
    assert!(!instance1.model_initialized());

    assert!(fmi2::terminate(Some(instance1)));
    assert_eq!(fmu.call_count("fmi2FreeInstance"), 1);
    assert_eq!(fmu.state().live_instances, 0);
}

#[test_log::test]
fn test_instance_cs() {
    let fmu = MockFmu::new(FmiVersion::V2, FmuKind::CoSimulation);
    let logger = Arc::new(RecordingLogger::default());

    let mut instance1 =
        Instance::<CS>::initialize_with(&fmu.descriptor("inst1"), &options(&logger), &fmu.loader())
            .unwrap();
    assert_eq!(instance1.get_version(), Some("2.0"));

    assert!(instance1.setup_experiment(Some(1.0e-6_f64), 0.0, None));
    assert!(instance1.enter_initialization_mode());
    assert!(instance1.set_real(&[0], &[2.0f64]));
    assert!(instance1.exit_initialization_mode());

    let mut x = [0.0];
    assert!(instance1.get_real(&[0], &mut x));
    assert_eq!(x, [2.0]);

    assert!(instance1.do_step(0.0, 0.125, false));
    assert_eq!(instance1.lifecycle(), LifecycleState::Stepping);
    assert_eq!(instance1.last_successful_time(), Some(0.125));
    assert_eq!(instance1.terminated(), Some(false));
    assert_eq!(
        instance1.get_status(fmi2::StatusKind::DoStepStatus),
        Some(Status::Ok)
    );
    assert_eq!(
        instance1.get_string_status(fmi2::StatusKind::PendingStatus),
        Some("idle".to_owned())
    );
    assert!(instance1.cancel_step());

    let mut derivatives = [1.0; 2];
    assert!(instance1.set_real_input_derivatives(&[0, 1], &[1, 1], &[0.5, 0.5]));
    assert!(instance1.get_real_output_derivatives(&[0, 1], &[1, 1], &mut derivatives));
    assert_eq!(derivatives, [0.0, 0.0]);

    // Discard is not an error, but the query fails
    assert_eq!(instance1.get_integer_status(fmi2::StatusKind::DoStepStatus), None);
    assert_eq!(instance1.error_status(), Status::Discard);
    assert!(!instance1.stop_requested());

    assert!(instance1.terminate());
    assert_eq!(fmu.call_count("fmi2Terminate"), 1);
    assert_eq!(fmu.call_count("fmi2FreeInstance"), 1);
}

#[test_log::test]
fn test_fmu_log_messages_reach_logger() {
    let fmu = MockFmu::new(FmiVersion::V2, FmuKind::CoSimulation);
    let logger = Arc::new(RecordingLogger::default());

    let instance =
        Instance::<CS>::initialize_with(&fmu.descriptor("inst1"), &options(&logger), &fmu.loader())
            .unwrap();

    let records = logger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].instance_name, "inst1");
    assert_eq!(records[0].status, Status::Ok);
    assert_eq!(records[0].category, "logAll");
    assert_eq!(records[0].message, "Instantiated inst1");
    assert_eq!(records[0].origin, Origin::Fmu);
    drop(instance);
}

#[test_log::test]
fn test_discarded_step_with_terminated_slave() {
    let fmu = MockFmu::with_behavior(FmiVersion::V2, FmuKind::CoSimulation, |behavior| {
        behavior.statuses.insert("fmi2DoStep", Status::Discard);
        behavior.terminated = true;
    });
    let logger = Arc::new(RecordingLogger::default());
    let options = DriverOptions::default().with_logger(logger.clone());

    let mut instance =
        fmi2::InstanceCS::initialize_with(&fmu.descriptor("inst1"), &options, &fmu.loader())
            .unwrap();
    assert!(instance.setup_experiment(None, 0.0, Some(1.0)));
    assert!(instance.enter_initialization_mode());
    assert!(instance.exit_initialization_mode());

    assert!(!instance.do_step(0.0, 0.01, true));
    assert_eq!(fmu.call_count("fmi2GetBooleanStatus"), 1);
    assert_eq!(
        logger.messages(),
        ["'fmi2Terminated' flag was set to true for FMU 'inst1' after 'fmi2DoStep' function \
          returns 'fmi2Discard' at time 0."]
    );
    assert!(instance.stop_requested());
    assert_eq!(logger.stop_count(), 1);
    assert_eq!(instance.error_status(), Status::Discard);

    // Discard is not sticky enough to skip the FMU's terminate
    assert!(instance.terminate());
    assert_eq!(fmu.call_count("fmi2Terminate"), 1);
}

#[test_log::test]
fn test_discarded_step_without_termination() {
    let fmu = MockFmu::with_behavior(FmiVersion::V2, FmuKind::CoSimulation, |behavior| {
        behavior.statuses.insert("fmi2DoStep", Status::Discard);
    });
    let logger = Arc::new(RecordingLogger::default());
    let options = DriverOptions::default().with_logger(logger.clone());

    let mut instance =
        fmi2::InstanceCS::initialize_with(&fmu.descriptor("inst1"), &options, &fmu.loader())
            .unwrap();
    assert!(!instance.do_step(0.0, 0.01, true));
    assert!(logger.records().is_empty());
    assert!(!instance.stop_requested());
}

#[test_log::test]
fn test_pending_step_is_an_error() {
    let fmu = MockFmu::with_behavior(FmiVersion::V2, FmuKind::CoSimulation, |behavior| {
        behavior.statuses.insert("fmi2DoStep", Status::Pending);
    });
    let logger = Arc::new(RecordingLogger::default());
    let options = DriverOptions::default().with_logger(logger.clone());

    let mut instance =
        fmi2::InstanceCS::initialize_with(&fmu.descriptor("inst1"), &options, &fmu.loader())
            .unwrap();
    assert!(!instance.do_step(0.0, 0.01, true));

    let records = logger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, Status::Error);
    assert_eq!(records[0].category, "fmi2DoStep");
    assert_eq!(
        records[0].message,
        "Function 'fmi2DoStep' in block 'inst1' returned 'fmiPending' flag during simulation."
    );
    assert!(matches!(instance.last_error(), Some(Error::Pending { .. })));
    assert!(instance.stop_requested());
    assert_eq!(logger.stop_count(), 1);
}

#[test_log::test]
fn test_value_round_trip() {
    let fmu = MockFmu::new(FmiVersion::V2, FmuKind::CoSimulation);
    let mut instance = fmi2::InstanceCS::initialize_with(
        &fmu.descriptor("values"),
        &DriverOptions::default(),
        &fmu.loader(),
    )
    .unwrap();

    assert!(instance.set_real(&[1, 2, 3], &[0.5, -1.5, 1e10]));
    let mut reals = [0.0; 3];
    assert!(instance.get_real(&[1, 2, 3], &mut reals));
    assert_eq!(reals, [0.5, -1.5, 1e10]);

    assert!(instance.set_integer_value(7, -42));
    assert_eq!(instance.get_integer_value(7), Some(-42));

    assert!(instance.set_boolean(&[4, 5], &[true, false]));
    let mut booleans = [false, true];
    assert!(instance.get_boolean(&[4, 5], &mut booleans));
    assert_eq!(booleans, [true, false]);
    assert_eq!(instance.get_boolean_value(4), Some(true));

    assert!(instance.set_string(&[9, 10], &["hello", ""]));
    let mut strings = vec![String::new(); 2];
    assert!(instance.get_string(&[9, 10], &mut strings));
    assert_eq!(strings, ["hello", ""]);
    assert_eq!(instance.get_string_value(9).as_deref(), Some("hello"));

    // Empty slices are forwarded as zero-length calls
    assert!(instance.set_real(&[], &[]));

    assert_eq!(instance.error_status(), Status::Ok);
}

#[test_log::test]
fn test_string_with_nul_is_refused() {
    let fmu = MockFmu::new(FmiVersion::V2, FmuKind::CoSimulation);
    let mut instance = fmi2::InstanceCS::initialize_with(
        &fmu.descriptor("values"),
        &DriverOptions::default(),
        &fmu.loader(),
    )
    .unwrap();

    assert!(!instance.set_string_value(1, "a\0b"));
    assert_eq!(fmu.call_count("fmi2SetString"), 0);
    assert!(matches!(instance.last_error(), Some(Error::InvalidString(_))));
    assert_eq!(instance.error_status(), Status::Ok);
}

#[test_log::test]
fn test_failing_getter() {
    let fmu = MockFmu::with_behavior(FmiVersion::V2, FmuKind::CoSimulation, |behavior| {
        behavior.statuses.insert("fmi2GetReal", Status::Error);
    });
    let logger = Arc::new(RecordingLogger::default());
    let options = DriverOptions::default().with_logger(logger.clone());
    let mut instance =
        fmi2::InstanceCS::initialize_with(&fmu.descriptor("blk"), &options, &fmu.loader())
            .unwrap();

    assert_eq!(instance.get_real_value(0), None);
    assert_eq!(instance.error_status(), Status::Error);
    assert!(logger.contains(
        "Error in supplied FMU: An error occurred in function 'fmi2GetReal' for block 'blk' \
         during simulation."
    ));
    assert_eq!(logger.stop_count(), 1);
}

#[test_log::test]
fn test_fmu_state() {
    let fmu = MockFmu::new(FmiVersion::V2, FmuKind::CoSimulation);
    let options =
        DriverOptions::default().with_capabilities(Capabilities::FMU_STATE | Capabilities::SERIALIZATION);
    let mut instance =
        fmi2::InstanceCS::initialize_with(&fmu.descriptor("state"), &options, &fmu.loader())
            .unwrap();
    assert_eq!(instance.error_status(), Status::Ok);

    assert!(instance.set_real_value(1, 1.0));
    let saved = instance.get_fmu_state().unwrap();

    assert!(instance.set_real_value(1, 2.0));
    assert!(instance.set_fmu_state(&saved));
    assert_eq!(instance.get_real_value(1), Some(1.0));

    assert!(instance.set_real_value(1, 3.0));
    assert!(instance.update_fmu_state(&saved));
    assert_eq!(fmu.state().live_fmu_states, 1);

    let bytes = instance.serialize_fmu_state(&saved).unwrap();
    assert_eq!(bytes.len(), 12);
    let restored = instance.deserialize_fmu_state(&bytes).unwrap();
    assert_ne!(restored, saved);
    assert_eq!(fmu.state().live_fmu_states, 2);

    assert!(instance.set_real_value(1, 4.0));
    assert!(instance.set_fmu_state(&restored));
    assert_eq!(instance.get_real_value(1), Some(3.0));

    assert!(instance.free_fmu_state(saved));
    assert!(!instance.set_fmu_state(&saved));
    assert_eq!(fmu.state().live_fmu_states, 1);

    // Remaining saved states are freed with the instance
    assert!(instance.terminate());
    assert_eq!(fmu.state().live_fmu_states, 0);
}

#[test_log::test]
fn test_failed_fmu_state_is_freed() {
    let fmu = MockFmu::new(FmiVersion::V2, FmuKind::CoSimulation);
    let options =
        DriverOptions::default().with_capabilities(Capabilities::FMU_STATE | Capabilities::SERIALIZATION);
    let mut instance =
        fmi2::InstanceCS::initialize_with(&fmu.descriptor("state"), &options, &fmu.loader())
            .unwrap();

    let saved = instance.get_fmu_state().unwrap();
    let bytes = instance.serialize_fmu_state(&saved).unwrap();
    assert!(instance.free_fmu_state(saved));
    assert_eq!(fmu.state().live_fmu_states, 0);
    assert_eq!(fmu.call_count("fmi2FreeFMUstate"), 1);

    fmu.state().behavior.fmu_state_status = Status::Discard;

    assert!(instance.get_fmu_state().is_none());
    assert_eq!(fmu.state().live_fmu_states, 0);
    assert_eq!(fmu.call_count("fmi2FreeFMUstate"), 2);

    assert!(instance.deserialize_fmu_state(&bytes).is_none());
    assert_eq!(fmu.state().live_fmu_states, 0);
    assert_eq!(fmu.call_count("fmi2FreeFMUstate"), 3);
}

#[test_log::test]
fn test_directional_derivative() {
    let fmu = MockFmu::new(FmiVersion::V2, FmuKind::ModelExchange);
    let options = DriverOptions::default().with_capabilities(Capabilities::DIRECTIONAL_DERIVATIVES);
    let mut instance =
        fmi2::InstanceME::initialize_with(&fmu.descriptor("jac"), &options, &fmu.loader())
            .unwrap();

    let mut dv_unknown = [0.0; 2];
    assert!(instance.get_directional_derivative(&[10, 11], &[1, 2], &[1.0, 0.5], &mut dv_unknown));
    assert_eq!(dv_unknown, [1.5, 1.5]);
}

#[test_log::test]
fn test_absent_optional_function() {
    let fmu = MockFmu::with_behavior(FmiVersion::V2, FmuKind::ModelExchange, |behavior| {
        behavior.missing.insert("fmi2GetDirectionalDerivative");
    });
    let logger = Arc::new(RecordingLogger::default());
    let options = DriverOptions::default().with_logger(logger.clone());
    let mut instance =
        fmi2::InstanceME::initialize_with(&fmu.descriptor("jac"), &options, &fmu.loader())
            .unwrap();
    assert!(logger.records().is_empty());

    let mut dv_unknown = [0.0; 1];
    assert!(!instance.get_directional_derivative(&[10], &[1], &[1.0], &mut dv_unknown));
    assert!(matches!(
        instance.last_error(),
        Some(Error::Unsupported {
            function: "fmi2GetDirectionalDerivative",
            ..
        })
    ));
    assert_eq!(instance.error_status(), Status::Ok);
    assert_eq!(logger.records().len(), 1);
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

    let fmu = MockFmu::new(FmiVersion::V2, FmuKind::CoSimulation);
    let options = DriverOptions::default().with_callbacks(HostCallbacks {
        allocate_memory: allocate,
        free_memory: free,
        step_finished: None,
    });

    let instance =
        fmi2::InstanceCS::initialize_with(&fmu.descriptor("inst1"), &options, &fmu.loader())
            .unwrap();
    assert_eq!(ALLOCATED.load(Ordering::SeqCst), 1);
    assert_eq!(FREED.load(Ordering::SeqCst), 0);

    assert!(instance.terminate());
    assert_eq!(FREED.load(Ordering::SeqCst), 1);
}
