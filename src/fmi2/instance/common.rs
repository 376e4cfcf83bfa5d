use std::{
    ffi::{CStr, CString},
    ptr,
};

use crate::{
    resolver::{fmi_call, numeric_accessors},
    Error, LifecycleState, ValueReference,
};

use super::{binding, Fmi2Tag, Instance};

impl<Tag: Fmi2Tag> Instance<Tag> {
    /// The `fmi2TypesPlatform` string the library was compiled with
    pub fn get_types_platform(&self) -> Option<&str> {
        let f = self.common.get_types_platform.function()?;
        let ptr = unsafe { f() };
        (!ptr.is_null())
            .then(|| unsafe { CStr::from_ptr(ptr) }.to_str().ok())
            .flatten()
    }

    /// The FMI-standard version string
    pub fn get_version(&self) -> Option<&str> {
        let f = self.common.get_version.function()?;
        let ptr = unsafe { f() };
        (!ptr.is_null())
            .then(|| unsafe { CStr::from_ptr(ptr) }.to_str().ok())
            .flatten()
    }

    pub fn set_debug_logging(&mut self, logging_on: bool, categories: &[&str]) -> bool {
        let categories = match categories
            .iter()
            .map(|c| CString::new(*c))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(categories) => categories,
            Err(err) => {
                let function = self.common.set_debug_logging.name();
                return self.state.refuse(function, Error::from(err));
            }
        };
        let category_ptrs: Vec<_> = categories.iter().map(|c| c.as_ptr()).collect();

        fmi_call!(self.common.set_debug_logging(
            logging_on as binding::fmi2Boolean,
            category_ptrs.len(),
            category_ptrs.as_ptr(),
        ))
    }

    pub fn setup_experiment(
        &mut self,
        tolerance: Option<f64>,
        start_time: f64,
        stop_time: Option<f64>,
    ) -> bool {
        fmi_call!(self.common.setup_experiment(
            tolerance.is_some() as binding::fmi2Boolean,
            tolerance.unwrap_or(0.0),
            start_time,
            stop_time.is_some() as binding::fmi2Boolean,
            stop_time.unwrap_or(0.0),
        ))
    }

    pub fn enter_initialization_mode(&mut self) -> bool {
        self.state.transition(LifecycleState::Initializing);
        fmi_call!(self.common.enter_initialization_mode())
    }

    /// Leave initialization mode. The model counts as initialized from here on, whatever the
    /// returned status.
    pub fn exit_initialization_mode(&mut self) -> bool {
        let ok = fmi_call!(self.common.exit_initialization_mode());
        self.state.model_initialized = true;
        self.state.transition(LifecycleState::Initialized);
        ok
    }

    /// Reset the FMU to the state directly after instantiation.
    pub fn reset(&mut self) -> bool {
        let ok = fmi_call!(self.common.reset());
        if ok {
            self.state.model_initialized = false;
            self.state.transition(LifecycleState::Instantiated);
        }
        ok
    }

    numeric_accessors!(real, f64);
    numeric_accessors!(integer, i32);

    /// # Panics
    /// If `vrs` and `values` differ in length.
    pub fn set_boolean(&mut self, vrs: &[ValueReference], values: &[bool]) -> bool {
        assert_eq!(vrs.len(), values.len());
        let values: Vec<binding::fmi2Boolean> = values
            .iter()
            .map(|&v| v as binding::fmi2Boolean)
            .collect();
        fmi_call!(self.common.set_boolean(vrs.as_ptr(), vrs.len(), values.as_ptr()))
    }

    /// # Panics
    /// If `vrs` and `values` differ in length.
    pub fn get_boolean(&mut self, vrs: &[ValueReference], values: &mut [bool]) -> bool {
        assert_eq!(vrs.len(), values.len());
        let mut raw: Vec<binding::fmi2Boolean> = vec![binding::fmi2False; vrs.len()];
        let ok = fmi_call!(self.common.get_boolean(vrs.as_ptr(), vrs.len(), raw.as_mut_ptr()));
        if ok {
            for (value, raw) in values.iter_mut().zip(&raw) {
                *value = *raw != binding::fmi2False;
            }
        }
        ok
    }

    pub fn set_boolean_value(&mut self, vr: ValueReference, value: bool) -> bool {
        self.set_boolean(&[vr], &[value])
    }

    pub fn get_boolean_value(&mut self, vr: ValueReference) -> Option<bool> {
        let mut value = [false];
        self.get_boolean(&[vr], &mut value).then_some(value[0])
    }

    /// Strings containing NUL bytes are refused without calling the FMU.
    ///
    /// # Panics
    /// If `vrs` and `values` differ in length.
    pub fn set_string(&mut self, vrs: &[ValueReference], values: &[&str]) -> bool {
        assert_eq!(vrs.len(), values.len());
        let values = match values
            .iter()
            .map(|s| CString::new(*s))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(values) => values,
            Err(err) => {
                let function = self.common.set_string.name();
                return self.state.refuse(function, Error::from(err));
            }
        };
        let ptrs: Vec<binding::fmi2String> = values.iter().map(|s| s.as_ptr()).collect();

        fmi_call!(self.common.set_string(vrs.as_ptr(), vrs.len(), ptrs.as_ptr()))
    }

    /// The strings are copied out of FMU-owned memory.
    ///
    /// # Panics
    /// If `vrs` and `values` differ in length.
    pub fn get_string(&mut self, vrs: &[ValueReference], values: &mut [String]) -> bool {
        assert_eq!(vrs.len(), values.len());
        let mut ptrs: Vec<binding::fmi2String> = vec![ptr::null(); vrs.len()];
        let ok = fmi_call!(self.common.get_string(vrs.as_ptr(), vrs.len(), ptrs.as_mut_ptr()));
        if ok {
            for (value, ptr) in values.iter_mut().zip(&ptrs) {
                *value = if ptr.is_null() {
                    String::new()
                } else {
                    unsafe { CStr::from_ptr(*ptr) }
                        .to_string_lossy()
                        .into_owned()
                };
            }
        }
        ok
    }

    pub fn set_string_value(&mut self, vr: ValueReference, value: &str) -> bool {
        self.set_string(&[vr], &[value])
    }

    pub fn get_string_value(&mut self, vr: ValueReference) -> Option<String> {
        let mut value = [String::new()];
        self.get_string(&[vr], &mut value)
            .then(|| std::mem::take(&mut value[0]))
    }

    /// Directional derivative `dv_unknown = J * dv_known` of the unknowns `unknown_vrs` with
    /// respect to the knowns `known_vrs`.
    ///
    /// # Panics
    /// If the known or unknown references and values differ in length.
    pub fn get_directional_derivative(
        &mut self,
        unknown_vrs: &[ValueReference],
        known_vrs: &[ValueReference],
        dv_known: &[f64],
        dv_unknown: &mut [f64],
    ) -> bool {
        assert_eq!(unknown_vrs.len(), dv_unknown.len());
        assert_eq!(known_vrs.len(), dv_known.len());
        fmi_call!(self.common.get_directional_derivative(
            unknown_vrs.as_ptr(),
            unknown_vrs.len(),
            known_vrs.as_ptr(),
            known_vrs.len(),
            dv_known.as_ptr(),
            dv_unknown.as_mut_ptr(),
        ))
    }
}
