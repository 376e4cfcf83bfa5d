//! State shared by every FMU handle: lifecycle, sticky error status, diagnostics and the loaded
//! library.

use std::sync::Arc;

use crate::{
    descriptor::InstantiateStrings,
    library::{LibraryLoader, SymbolSource},
    resolver, AuxTables, Diagnostic, DriverOptions, Error, FmiVersion, FmuDescriptor, FmuKind,
    Logger, Origin, Status,
};

/// Lifecycle of an FMU handle. Tracked for observation; the FMU rejects out-of-order calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Loaded,
    Instantiated,
    Initializing,
    Initialized,
    /// Co-Simulation stepping
    Stepping,
    /// Model Exchange event handling
    EventMode,
    /// Model Exchange continuous-time integration
    ContinuousTimeMode,
    Terminated,
}

pub(crate) struct HandleState {
    descriptor: FmuDescriptor,
    logger: Arc<dyn Logger>,
    error_status: Status,
    last_error: Option<Error>,
    stop_requested: bool,
    lifecycle: LifecycleState,
    pub model_initialized: bool,
    pub aux: AuxTables,
    library: Option<Box<dyn SymbolSource>>,
}

impl HandleState {
    pub fn new(descriptor: &FmuDescriptor, logger: Arc<dyn Logger>) -> Self {
        Self {
            descriptor: descriptor.clone(),
            logger,
            error_status: Status::Ok,
            last_error: None,
            stop_requested: false,
            lifecycle: LifecycleState::Created,
            model_initialized: false,
            aux: AuxTables::default(),
            library: None,
        }
    }

    /// Validate the descriptor and open its library.
    ///
    /// Failures are reported as `Fatal` diagnostics and returned; nothing is loaded when the
    /// instance name is too long or a descriptor string contains a NUL byte.
    pub fn load(
        descriptor: &FmuDescriptor,
        options: &DriverOptions,
        loader: &dyn LibraryLoader,
        version: FmiVersion,
        kind: FmuKind,
        longest_function_name: usize,
    ) -> Result<(Self, Box<dyn SymbolSource>, InstantiateStrings), Error> {
        let mut state = Self::new(descriptor, options.logger.clone());

        if descriptor.version != version || descriptor.kind != kind {
            return Err(state.reject(Error::InterfaceMismatch {
                instance: descriptor.instance_name.clone(),
                expected_version: version,
                expected_kind: kind,
                found_version: descriptor.version,
                found_kind: descriptor.kind,
            }));
        }

        if !resolver::instance_name_fits(&descriptor.instance_name, longest_function_name) {
            return Err(state.reject(Error::NameTooLong {
                name: descriptor.instance_name.clone(),
                max: resolver::MAX_SYMBOL_NAME_LEN - longest_function_name - 2,
            }));
        }

        let strings = match descriptor.instantiate_strings() {
            Ok(strings) => strings,
            Err(err) => return Err(state.reject(Error::from(err))),
        };

        let library = match loader.load(&descriptor.library_path) {
            Ok(library) => library,
            Err(source) => {
                return Err(state.reject(Error::LibraryLoad {
                    path: descriptor.library_path.clone(),
                    source,
                }));
            }
        };

        state.transition(LifecycleState::Loaded);
        Ok((state, library, strings))
    }

    /// Report a load-time failure as `Fatal` and hand the error back to the caller.
    fn reject(&mut self, error: Error) -> Error {
        self.error_status = Status::Fatal;
        self.report(Status::Fatal, "initialize", &error.to_string());
        error
    }

    pub fn attach_library(&mut self, library: Box<dyn SymbolSource>) {
        self.library = Some(library);
    }

    pub fn descriptor(&self) -> &FmuDescriptor {
        &self.descriptor
    }

    pub fn instance_name(&self) -> &str {
        &self.descriptor.instance_name
    }

    pub fn error_status(&self) -> Status {
        self.error_status
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn transition(&mut self, next: LifecycleState) {
        if self.lifecycle != next {
            log::debug!(
                "{}: {:?} -> {:?}",
                self.descriptor.instance_name,
                self.lifecycle,
                next
            );
            self.lifecycle = next;
        }
    }

    /// Send a driver diagnostic to the injected logger.
    pub fn report(&self, status: Status, category: &str, message: &str) {
        self.logger.log(&Diagnostic {
            instance_name: &self.descriptor.instance_name,
            status,
            category,
            message,
            origin: Origin::Driver,
        });
    }

    pub fn request_stop(&mut self) {
        self.stop_requested = true;
        self.logger.request_stop();
    }

    /// Report `error`, ask the host to stop and remember it as the last error. The sticky
    /// status is left to the caller.
    pub fn fail(&mut self, status: Status, category: &str, error: Error) {
        self.report(status, category, &error.to_string());
        self.request_stop();
        self.last_error = Some(error);
    }

    /// Translate the status of `function` into success, recording anything worse than `Ok`.
    ///
    /// `Ok` and `Warning` succeed. `Discard` fails silently; callers handle it per function.
    /// `Error`, `Fatal` and `Pending` produce a diagnostic and a stop request. `Pending` is a
    /// protocol violation and is reported with `Error` severity.
    pub fn check_status(&mut self, status: Status, function: &'static str) -> bool {
        self.error_status = self.error_status.worst(status);
        match status {
            Status::Ok | Status::Warning => true,
            Status::Discard => false,
            Status::Error | Status::Fatal => {
                let error = Error::Status {
                    function,
                    instance: self.descriptor.instance_name.clone(),
                    status,
                };
                self.fail(status, function, error);
                false
            }
            Status::Pending => {
                let error = Error::Pending {
                    function,
                    instance: self.descriptor.instance_name.clone(),
                };
                self.fail(Status::Error, function, error);
                false
            }
        }
    }

    /// [`Self::check_status`] for an entry invocation; `None` means the optional function is
    /// absent.
    pub fn translate(&mut self, outcome: Option<Status>, function: &'static str) -> bool {
        match outcome {
            Some(status) => self.check_status(status, function),
            None => {
                let error = Error::Unsupported {
                    function,
                    instance: self.descriptor.instance_name.clone(),
                };
                self.refuse(function, error)
            }
        }
    }

    /// A call that never reached the FMU. Reported and remembered, but the sticky status is
    /// unchanged.
    pub fn refuse(&mut self, function: &'static str, error: Error) -> bool {
        self.report(Status::Error, function, &error.to_string());
        self.last_error = Some(error);
        false
    }

    /// A mandatory function is missing from the library.
    pub fn missing_function(&mut self, function: &'static str) {
        self.error_status = self.error_status.worst(Status::Warning);
        let error = Error::MissingFunction {
            function,
            instance: self.descriptor.instance_name.clone(),
        };
        self.report(Status::Warning, function, &error.to_string());
        self.last_error = Some(error);
    }

    /// Release everything host-side: auxiliary tables and the library.
    pub fn release(&mut self) {
        self.aux.release();
        if let Some(library) = self.library.take() {
            log::trace!("Unloading library of {}", self.descriptor.instance_name);
            drop(library);
        }
        self.transition(LifecycleState::Terminated);
    }
}

impl std::fmt::Debug for HandleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleState")
            .field("instance_name", &self.descriptor.instance_name)
            .field("error_status", &self.error_status)
            .field("lifecycle", &self.lifecycle)
            .field("model_initialized", &self.model_initialized)
            .field("stop_requested", &self.stop_requested)
            .finish_non_exhaustive()
    }
}

/// Implements [`crate::traits::FmiInstance`] for a handle type with a `state: HandleState` field.
macro_rules! impl_fmi_instance {
    ($ty:ty $(, $bound:path)?) => {
        impl$(<Tag: $bound>)? $crate::traits::FmiInstance for $ty {
            fn descriptor(&self) -> &$crate::FmuDescriptor {
                self.state.descriptor()
            }

            fn error_status(&self) -> $crate::Status {
                self.state.error_status()
            }

            fn last_error(&self) -> Option<&$crate::Error> {
                self.state.last_error()
            }

            fn stop_requested(&self) -> bool {
                self.state.stop_requested()
            }

            fn model_initialized(&self) -> bool {
                self.state.model_initialized
            }

            fn lifecycle(&self) -> $crate::LifecycleState {
                self.state.lifecycle()
            }

            fn aux_tables(&self) -> &$crate::AuxTables {
                &self.state.aux
            }

            fn aux_tables_mut(&mut self) -> &mut $crate::AuxTables {
                &mut self.state.aux
            }
        }
    };
}
pub(crate) use impl_fmi_instance;

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Collect {
        messages: Mutex<Vec<(Status, String)>>,
        stops: Mutex<usize>,
    }

    impl Logger for Collect {
        fn log(&self, diagnostic: &Diagnostic<'_>) {
            self.messages
                .lock()
                .unwrap()
                .push((diagnostic.status, diagnostic.message.to_owned()));
        }

        fn request_stop(&self) {
            *self.stops.lock().unwrap() += 1;
        }
    }

    fn state(logger: Arc<Collect>) -> HandleState {
        let descriptor = FmuDescriptor {
            library_path: "libblock.so".into(),
            instance_name: "block".to_owned(),
            model_identifier: "block".to_owned(),
            guid: "{guid}".to_owned(),
            resource_location: None,
            version: FmiVersion::V2,
            kind: FmuKind::CoSimulation,
        };
        HandleState::new(&descriptor, logger)
    }

    #[test]
    fn test_check_status() {
        let logger = Arc::new(Collect::default());
        let mut state = state(logger.clone());

        assert!(state.check_status(Status::Ok, "fmi2DoStep"));
        assert!(state.check_status(Status::Warning, "fmi2DoStep"));
        assert_eq!(state.error_status(), Status::Warning);
        assert!(logger.messages.lock().unwrap().is_empty());

        assert!(!state.check_status(Status::Discard, "fmi2DoStep"));
        assert!(!state.stop_requested());

        assert!(!state.check_status(Status::Error, "fmi2SetReal"));
        assert_eq!(state.error_status(), Status::Error);
        assert!(state.stop_requested());
        assert!(matches!(
            state.last_error(),
            Some(Error::Status {
                function: "fmi2SetReal",
                ..
            })
        ));

        // Sticky: a later OK does not clear it
        assert!(state.check_status(Status::Ok, "fmi2GetReal"));
        assert_eq!(state.error_status(), Status::Error);

        let messages = logger.messages.lock().unwrap();
        assert_eq!(
            messages.as_slice(),
            &[(
                Status::Error,
                "Error in supplied FMU: An error occurred in function 'fmi2SetReal' for block \
                 'block' during simulation."
                    .to_owned()
            )]
        );
        assert_eq!(*logger.stops.lock().unwrap(), 1);
    }

    #[test]
    fn test_pending_is_protocol_violation() {
        let logger = Arc::new(Collect::default());
        let mut state = state(logger.clone());

        assert!(!state.check_status(Status::Pending, "fmi2DoStep"));
        assert_eq!(state.error_status(), Status::Pending);
        assert!(matches!(state.last_error(), Some(Error::Pending { .. })));
        assert_eq!(
            logger.messages.lock().unwrap().as_slice(),
            &[(
                Status::Error,
                "Function 'fmi2DoStep' in block 'block' returned 'fmiPending' flag during \
                 simulation."
                    .to_owned()
            )]
        );
        assert!(state.stop_requested());
    }

    #[test]
    fn test_release_clears_host_side() {
        let mut state = state(Arc::default());
        state.aux.create_param_offsets(4);
        state.aux.create_enum_values(2);
        state.model_initialized = true;

        state.release();
        assert!(state.aux.is_empty());
        assert_eq!(state.lifecycle(), LifecycleState::Terminated);
    }

    #[test]
    fn test_unsupported() {
        let logger = Arc::new(Collect::default());
        let mut state = state(logger);

        assert!(!state.translate(None, "fmi2GetDirectionalDerivative"));
        assert_eq!(state.error_status(), Status::Ok);
        assert!(matches!(state.last_error(), Some(Error::Unsupported { .. })));
    }

    #[test]
    fn test_fatal_overrides_error() {
        let logger = Arc::new(Collect::default());
        let mut state = state(logger);

        assert!(!state.check_status(Status::Fatal, "fmi2DoStep"));
        assert!(!state.check_status(Status::Error, "fmi2DoStep"));
        assert_eq!(state.error_status(), Status::Fatal);
    }
}
