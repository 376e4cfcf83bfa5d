//! Diagnostics sink injected by the host.
//!
//! Every handle reports through a [`Logger`]: driver-side diagnostics (status translation,
//! missing functions, load failures) and, for FMI 2.0, the messages the FMU itself emits through
//! its `logger` callback.

use std::{os::raw::c_void, sync::Arc};

use fmu_driver_sys::logger::{FmuMessage, LogDispatch};

use crate::Status;

/// Where a [`Diagnostic`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Produced by the driver while translating a call
    Driver,
    /// Emitted by the FMU through its logger callback
    Fmu,
}

#[derive(Debug, Clone, Copy)]
pub struct Diagnostic<'a> {
    pub instance_name: &'a str,
    pub status: Status,
    /// The FMI function name for driver diagnostics, or the FMU's log category
    pub category: &'a str,
    pub message: &'a str,
    pub origin: Origin,
}

/// Host hook receiving diagnostics and stop requests.
pub trait Logger: Send + Sync {
    fn log(&self, diagnostic: &Diagnostic<'_>);

    /// Called when a diagnostic requires the host to stop the simulation after the current step.
    fn request_stop(&self) {}
}

/// Forwards diagnostics to the `log` facade, using the instance name as target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogLogger;

impl Logger for LogLogger {
    fn log(&self, diagnostic: &Diagnostic<'_>) {
        let module = match diagnostic.origin {
            Origin::Driver => module_path!(),
            Origin::Fmu => "logger",
        };
        log::logger().log(
            &log::Record::builder()
                .args(format_args!("[{}] {}", diagnostic.category, diagnostic.message))
                .level(diagnostic.status.into())
                .module_path(Some(module))
                .target(diagnostic.instance_name)
                .build(),
        );
    }

    fn request_stop(&self) {
        log::debug!("Simulation stop requested");
    }
}

/// Owns the `componentEnvironment` target handed to FMI 2.0 components.
///
/// Both boxes keep stable addresses while the handle moves around.
pub(crate) struct LoggerBridge {
    dispatch: Box<LogDispatch>,
    _logger: Box<Arc<dyn Logger>>,
}

unsafe fn dispatch_to_logger(context: *const c_void, message: &FmuMessage<'_>) {
    let logger = &*(context as *const Arc<dyn Logger>);
    logger.log(&Diagnostic {
        instance_name: message.instance_name,
        status: Status::from_raw(message.status),
        category: message.category,
        message: message.message,
        origin: Origin::Fmu,
    });
}

impl LoggerBridge {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        let logger = Box::new(logger);
        let dispatch = Box::new(LogDispatch {
            context: &*logger as *const Arc<dyn Logger> as *const c_void,
            dispatch: dispatch_to_logger,
        });
        Self {
            dispatch,
            _logger: logger,
        }
    }

    /// The pointer to pass as `componentEnvironment`
    pub fn environment(&self) -> *mut c_void {
        &*self.dispatch as *const LogDispatch as *mut c_void
    }
}

impl std::fmt::Debug for LoggerBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerBridge")
            .field("environment", &self.environment())
            .finish()
    }
}
