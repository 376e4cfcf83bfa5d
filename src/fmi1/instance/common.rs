use std::{
    ffi::{CStr, CString},
    ptr,
};

use crate::{
    resolver::{fmi_call, numeric_accessors},
    Error, ValueReference,
};

use super::{binding, Fmi1Tag, Instance};

impl<Tag: Fmi1Tag> Instance<Tag> {
    /// The FMI-standard version string, `"1.0"`
    pub fn get_version(&self) -> Option<&str> {
        let f = self.common.get_version.function()?;
        let ptr = unsafe { f() };
        (!ptr.is_null())
            .then(|| unsafe { CStr::from_ptr(ptr) }.to_str().ok())
            .flatten()
    }

    pub fn set_debug_logging(&mut self, logging_on: bool) -> bool {
        fmi_call!(self
            .common
            .set_debug_logging(logging_on as binding::fmiBoolean))
    }

    numeric_accessors!(real, f64);
    numeric_accessors!(integer, i32);

    /// # Panics
    /// If `vrs` and `values` differ in length.
    pub fn set_boolean(&mut self, vrs: &[ValueReference], values: &[bool]) -> bool {
        assert_eq!(vrs.len(), values.len());
        let values: Vec<binding::fmiBoolean> =
            values.iter().map(|&v| v as binding::fmiBoolean).collect();
        fmi_call!(self.common.set_boolean(vrs.as_ptr(), vrs.len(), values.as_ptr()))
    }

    /// # Panics
    /// If `vrs` and `values` differ in length.
    pub fn get_boolean(&mut self, vrs: &[ValueReference], values: &mut [bool]) -> bool {
        assert_eq!(vrs.len(), values.len());
        let mut raw: Vec<binding::fmiBoolean> = vec![binding::fmiFalse; vrs.len()];
        let ok = fmi_call!(self.common.get_boolean(vrs.as_ptr(), vrs.len(), raw.as_mut_ptr()));
        if ok {
            for (value, raw) in values.iter_mut().zip(&raw) {
                *value = *raw != binding::fmiFalse;
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
        let ptrs: Vec<binding::fmiString> = values.iter().map(|s| s.as_ptr()).collect();

        fmi_call!(self.common.set_string(vrs.as_ptr(), vrs.len(), ptrs.as_ptr()))
    }

    /// # Panics
    /// If `vrs` and `values` differ in length.
    pub fn get_string(&mut self, vrs: &[ValueReference], values: &mut [String]) -> bool {
        assert_eq!(vrs.len(), values.len());
        let mut ptrs: Vec<binding::fmiString> = vec![ptr::null(); vrs.len()];
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
}
