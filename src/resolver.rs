//! Dynamic symbol resolution.
//!
//! Each FMI function is described by one row of a declarative table (see `function_table!`).
//! Resolution never fails: a missing mandatory function is replaced by a stub that reports
//! `Error`/`Fatal` when called, and a missing optional function is left [`Slot::Absent`].

use std::os::raw::c_void;

use crate::{handle::HandleState, library::SymbolSource, Capabilities, Status};

/// Upper bound on the length of a symbol name, including the instance prefix.
pub const MAX_SYMBOL_NAME_LEN: usize = 256;

/// What a function table holds for one FMI function.
#[derive(Debug, Clone, Copy)]
pub enum Slot<F> {
    Resolved(F),
    /// Mandatory but missing; calls go to [`missing_function_stub`]
    Stub,
    /// Optional and missing
    Absent,
}

/// One resolved FMI function together with its standard name.
#[derive(Debug, Clone, Copy)]
pub struct Entry<F> {
    name: &'static str,
    slot: Slot<F>,
}

impl<F: Copy> Entry<F> {
    /// The standard (unprefixed) FMI name
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn slot(&self) -> Slot<F> {
        self.slot
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.slot, Slot::Resolved(_))
    }

    /// The function pointer, if the library exports it
    pub fn function(&self) -> Option<F> {
        match self.slot {
            Slot::Resolved(f) => Some(f),
            Slot::Stub | Slot::Absent => None,
        }
    }

    /// Call the resolved function, or the stub standing in for it. `None` when the function is
    /// optional and absent.
    pub(crate) fn invoke(
        &self,
        component: *mut c_void,
        call: impl FnOnce(F) -> Status,
    ) -> Option<Status> {
        match self.slot {
            Slot::Resolved(f) => Some(call(f)),
            Slot::Stub => Some(missing_function_stub(component)),
            Slot::Absent => None,
        }
    }
}

/// Stand-in for a mandatory function the library does not export. A non-null component means
/// the instance exists and a call reached a function that failed to load, which is `Fatal`.
pub fn missing_function_stub(component: *mut c_void) -> Status {
    if component.is_null() {
        Status::Error
    } else {
        Status::Fatal
    }
}

/// Length of the longest name across `tables`
pub const fn longest_name(tables: &[&[&str]]) -> usize {
    let mut longest = 0;
    let mut t = 0;
    while t < tables.len() {
        let mut n = 0;
        while n < tables[t].len() {
            if tables[t][n].len() > longest {
                longest = tables[t][n].len();
            }
            n += 1;
        }
        t += 1;
    }
    longest
}

/// Whether an instance name leaves room for `<name>_<longest function name>` within
/// [`MAX_SYMBOL_NAME_LEN`].
pub fn instance_name_fits(name: &str, longest_function_name: usize) -> bool {
    name.len() + longest_function_name + 1 < MAX_SYMBOL_NAME_LEN
}

/// `<prefix>_<function>`, or the bare function name without prefix
pub fn symbol_name(prefix: Option<&str>, function: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}_{function}"),
        None => function.to_owned(),
    }
}

/// Whether a row gated by `gate` may be missing without a diagnostic.
pub(crate) fn optional(capabilities: Capabilities, gate: &[Capabilities]) -> bool {
    gate.iter().any(|cap| !capabilities.contains(*cap))
}

/// Resolves the rows of function tables against one library, reporting missing mandatory
/// functions on the handle being built.
pub struct Resolver<'a> {
    library: &'a dyn SymbolSource,
    prefix: Option<&'a str>,
    state: &'a mut HandleState,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(
        library: &'a dyn SymbolSource,
        prefix: Option<&'a str>,
        state: &'a mut HandleState,
    ) -> Self {
        Self {
            library,
            prefix,
            state,
        }
    }

    pub(crate) fn resolve<F: Copy>(&mut self, function: &'static str, optional: bool) -> Entry<F> {
        let name = symbol_name(self.prefix, function);
        let slot = match self.library.symbol(&name) {
            Some(address) => {
                debug_assert_eq!(
                    std::mem::size_of::<F>(),
                    std::mem::size_of::<*const c_void>()
                );
                log::trace!("Resolved {name} at {address:?}");
                // SAFETY: `F` is the `unsafe extern "C" fn` type declared for this symbol.
                Slot::Resolved(unsafe { std::mem::transmute_copy::<*const c_void, F>(&address) })
            }
            None if optional => {
                log::trace!("Optional function {name} not exported");
                Slot::Absent
            }
            None => {
                self.state.missing_function(function);
                Slot::Stub
            }
        };
        Entry {
            name: function,
            slot,
        }
    }
}

/// Declares a table of FMI functions, one `field: Type = "fmiName"` row per function. A row
/// followed by `if CAPABILITY` is only mandatory when that capability is enabled.
macro_rules! function_table {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $field:ident: $ty:ty = $symbol:literal $(if $cap:expr)?,
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        $vis struct $name {
            $( pub $field: $crate::resolver::Entry<$ty>, )*
        }

        impl $name {
            /// Standard names of the functions in this table
            pub const NAMES: &'static [&'static str] = &[$($symbol),*];

            pub(crate) fn resolve(
                resolver: &mut $crate::resolver::Resolver<'_>,
                capabilities: $crate::Capabilities,
            ) -> Self {
                Self {
                    $(
                        $field: resolver.resolve(
                            $symbol,
                            $crate::resolver::optional(capabilities, &[$($cap)?]),
                        ),
                    )*
                }
            }
        }
    };
}
pub(crate) use function_table;

/// Invoke a function-table entry on `self.component` and translate its status.
///
/// `fmi_call!(self.common.terminate())` expands to the call, the stub or the unsupported
/// report, followed by `self.state.translate(..)`.
macro_rules! fmi_call {
    ($self:ident . $table:ident . $field:ident ( $($arg:expr),* $(,)? )) => {{
        let component = $self.component;
        let entry = $self.$table.$field;
        let outcome = entry.invoke(component, |f| {
            $crate::Status::from_raw(unsafe { f(component $(, $arg)*) })
        });
        $self.state.translate(outcome, entry.name())
    }};
}
pub(crate) use fmi_call;

/// Getters and setters for a numeric variable type, plus their single-value forms. Expects
/// `set_<name>`/`get_<name>` rows in `self.common`.
macro_rules! numeric_accessors {
    ($name:ident, $ty:ty) => {
        paste::paste! {
            /// Set the values of the variables `vrs`.
            ///
            /// # Panics
            /// If `vrs` and `values` differ in length.
            pub fn [<set_ $name>](
                &mut self,
                vrs: &[$crate::ValueReference],
                values: &[$ty],
            ) -> bool {
                assert_eq!(vrs.len(), values.len());
                $crate::resolver::fmi_call!(
                    self.common.[<set_ $name>](vrs.as_ptr(), vrs.len(), values.as_ptr())
                )
            }

            /// Get the values of the variables `vrs`.
            ///
            /// # Panics
            /// If `vrs` and `values` differ in length.
            pub fn [<get_ $name>](
                &mut self,
                vrs: &[$crate::ValueReference],
                values: &mut [$ty],
            ) -> bool {
                assert_eq!(vrs.len(), values.len());
                $crate::resolver::fmi_call!(
                    self.common.[<get_ $name>](vrs.as_ptr(), vrs.len(), values.as_mut_ptr())
                )
            }

            pub fn [<set_ $name _value>](&mut self, vr: $crate::ValueReference, value: $ty) -> bool {
                self.[<set_ $name>](&[vr], &[value])
            }

            pub fn [<get_ $name _value>](&mut self, vr: $crate::ValueReference) -> Option<$ty> {
                let mut value: [$ty; 1] = Default::default();
                self.[<get_ $name>](&[vr], &mut value).then_some(value[0])
            }
        }
    };
}
pub(crate) use numeric_accessors;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_status() {
        let mut component = 0u8;
        assert_eq!(
            missing_function_stub(&mut component as *mut u8 as *mut c_void),
            Status::Fatal
        );
        assert_eq!(missing_function_stub(std::ptr::null_mut()), Status::Error);
    }

    #[test]
    fn test_symbol_names() {
        assert_eq!(symbol_name(None, "fmi2DoStep"), "fmi2DoStep");
        assert_eq!(
            symbol_name(Some("BouncingBall"), "fmiDoStep"),
            "BouncingBall_fmiDoStep"
        );
    }

    #[test]
    fn test_longest_name() {
        const A: &[&str] = &["fmi2DoStep", "fmi2GetNominalsOfContinuousStates"];
        const B: &[&str] = &["fmi2Reset"];
        const LONGEST: usize = longest_name(&[A, B]);
        assert_eq!(LONGEST, 33);
    }

    #[test]
    fn test_instance_name_fits() {
        let longest = 33;
        let max = MAX_SYMBOL_NAME_LEN - longest - 2;
        assert!(instance_name_fits(&"a".repeat(max), longest));
        assert!(!instance_name_fits(&"a".repeat(max + 1), longest));
    }

    #[test]
    fn test_optional_rows() {
        let caps = Capabilities::FMU_STATE;
        assert!(!optional(caps, &[]));
        assert!(!optional(caps, &[Capabilities::FMU_STATE]));
        assert!(optional(caps, &[Capabilities::SERIALIZATION]));
    }
}
