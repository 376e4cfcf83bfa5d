//! Rust side of the variadic FMI `logger` callback.
//!
//! `logger.c` formats the printf-style message into a local buffer and calls back into
//! [`fmu_driver_sys_fmi1_log`] or [`fmu_driver_sys_fmi2_log`].

use std::{
    ffi::CStr,
    os::raw::{c_char, c_uint, c_void},
};

/// A message received from an FMU, after formatting.
#[derive(Debug, Clone, Copy)]
pub struct FmuMessage<'a> {
    pub instance_name: &'a str,
    /// Raw FMI status code (identical numbering in 1.0 and 2.0)
    pub status: c_uint,
    pub category: &'a str,
    pub message: &'a str,
}

/// Target of the FMI 2.0 `componentEnvironment` pointer.
///
/// The importer owns this value and must keep it at a stable address for the lifetime of the
/// component.
#[repr(C)]
pub struct LogDispatch {
    pub context: *const c_void,
    pub dispatch: unsafe fn(context: *const c_void, message: &FmuMessage<'_>),
}

unsafe fn str_or<'a>(ptr: *const c_char, default: &'a str) -> &'a str {
    if ptr.is_null() {
        default
    } else {
        CStr::from_ptr(ptr).to_str().unwrap_or(default)
    }
}

fn level(status: c_uint) -> log::Level {
    match status {
        0 => log::Level::Info,
        1 => log::Level::Warn,
        2 => log::Level::Trace,
        3 | 4 => log::Level::Error,
        _ => log::Level::Info,
    }
}

fn forward_to_log(message: &FmuMessage<'_>) {
    log::logger().log(
        &log::Record::builder()
            .args(format_args!("[{}] {}", message.category, message.message))
            .level(level(message.status))
            .module_path(Some("logger"))
            .target(message.instance_name)
            .build(),
    );
}

/// This function gets called from logger.c for FMI 1.0 components.
#[no_mangle]
extern "C" fn fmu_driver_sys_fmi1_log(
    _component: *mut c_void,
    instance_name: *const c_char,
    status: c_uint,
    category: *const c_char,
    message: *const c_char,
) {
    let message = unsafe {
        FmuMessage {
            instance_name: str_or(instance_name, "NULL"),
            status,
            category: str_or(category, "NULL"),
            message: str_or(message, "NULL"),
        }
    };
    forward_to_log(&message);
}

/// This function gets called from logger.c for FMI 2.0 components.
///
/// A null environment falls back to the `log` facade.
#[no_mangle]
extern "C" fn fmu_driver_sys_fmi2_log(
    component_environment: *mut c_void,
    instance_name: *const c_char,
    status: c_uint,
    category: *const c_char,
    message: *const c_char,
) {
    let message = unsafe {
        FmuMessage {
            instance_name: str_or(instance_name, "NULL"),
            status,
            category: str_or(category, "NULL"),
            message: str_or(message, "NULL"),
        }
    };

    if component_environment.is_null() {
        forward_to_log(&message);
    } else {
        let dispatch = unsafe { &*(component_environment as *const LogDispatch) };
        unsafe { (dispatch.dispatch)(dispatch.context, &message) };
    }
}

extern "C" {
    /// Implemented in logger.c
    /// Note: This can be re-implemented in pure Rust once the `c_variadics` feature stabilizes.
    #[cfg(feature = "fmi1")]
    pub fn fmi1_callback_logger_handler(
        c: crate::fmi1::fmiComponent,
        instanceName: crate::fmi1::fmiString,
        status: crate::fmi1::fmiStatus,
        category: crate::fmi1::fmiString,
        message: crate::fmi1::fmiString,
        ...
    );

    /// Implemented in logger.c
    #[cfg(feature = "fmi2")]
    pub fn fmi2_callback_logger_handler(
        componentEnvironment: crate::fmi2::fmi2ComponentEnvironment,
        instanceName: crate::fmi2::fmi2String,
        status: crate::fmi2::fmi2Status,
        category: crate::fmi2::fmi2String,
        message: crate::fmi2::fmi2String,
        ...
    );
}
