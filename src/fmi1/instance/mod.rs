//! FMI 1.0 instance interface

use std::{ffi::CStr, marker::PhantomData, ptr};

use crate::{
    handle::{impl_fmi_instance, HandleState},
    library::{LibraryLoader, SharedLibraryLoader},
    resolver::{Entry, Resolver, Slot},
    traits::InstanceTag,
    Capabilities, DriverOptions, Error, FmiVersion, FmuDescriptor, LifecycleState, Status, CS,
    ME,
};

use super::{
    binding,
    functions::{
        CoSimulationFunctions, CommonFunctions, ModelExchangeFunctions, LONGEST_FUNCTION_NAME,
    },
    SHARED_LIBRARY_MIME_TYPE,
};

mod co_simulation;
mod common;
mod model_exchange;

pub type InstanceME = Instance<ME>;
pub type InstanceCS = Instance<CS>;

/// Interface type of an FMI 1.0 instance. Model Exchange and Co-Simulation differ in their
/// instantiate, terminate and free functions.
pub trait Fmi1Tag: InstanceTag {
    /// Functions specific to this interface type
    type Functions: Copy + std::fmt::Debug;

    #[doc(hidden)]
    fn resolve(resolver: &mut Resolver<'_>, capabilities: Capabilities) -> Self::Functions;

    #[doc(hidden)]
    fn instantiate_name(functions: &Self::Functions) -> &'static str;

    /// Call the instantiate function; null when it failed or is missing.
    #[doc(hidden)]
    fn instantiate(
        functions: &Self::Functions,
        instance_name: &CStr,
        guid: &CStr,
        fmu_location: &CStr,
        options: &DriverOptions,
    ) -> binding::fmiComponent;

    #[doc(hidden)]
    fn terminate_entry(functions: &Self::Functions) -> Entry<binding::fmiTerminateTYPE>;

    #[doc(hidden)]
    fn free_instance_entry(functions: &Self::Functions)
        -> Entry<binding::fmiFreeModelInstanceTYPE>;
}

impl Fmi1Tag for CS {
    type Functions = CoSimulationFunctions;

    fn resolve(resolver: &mut Resolver<'_>, capabilities: Capabilities) -> Self::Functions {
        CoSimulationFunctions::resolve(resolver, capabilities)
    }

    fn instantiate_name(functions: &Self::Functions) -> &'static str {
        functions.instantiate_slave.name()
    }

    fn instantiate(
        functions: &Self::Functions,
        instance_name: &CStr,
        guid: &CStr,
        fmu_location: &CStr,
        options: &DriverOptions,
    ) -> binding::fmiComponent {
        let Some(instantiate_slave) = functions.instantiate_slave.function() else {
            return ptr::null_mut();
        };
        unsafe {
            instantiate_slave(
                instance_name.as_ptr(),
                guid.as_ptr(),
                fmu_location.as_ptr(),
                SHARED_LIBRARY_MIME_TYPE.as_ptr(),
                0.0,
                options.visible as binding::fmiBoolean,
                binding::fmiFalse,
                super::cs_callbacks(&options.callbacks),
                options.logging_on as binding::fmiBoolean,
            )
        }
    }

    fn terminate_entry(functions: &Self::Functions) -> Entry<binding::fmiTerminateTYPE> {
        functions.terminate_slave
    }

    fn free_instance_entry(
        functions: &Self::Functions,
    ) -> Entry<binding::fmiFreeModelInstanceTYPE> {
        functions.free_slave_instance
    }
}

impl Fmi1Tag for ME {
    type Functions = ModelExchangeFunctions;

    fn resolve(resolver: &mut Resolver<'_>, capabilities: Capabilities) -> Self::Functions {
        ModelExchangeFunctions::resolve(resolver, capabilities)
    }

    fn instantiate_name(functions: &Self::Functions) -> &'static str {
        functions.instantiate_model.name()
    }

    fn instantiate(
        functions: &Self::Functions,
        instance_name: &CStr,
        guid: &CStr,
        _fmu_location: &CStr,
        options: &DriverOptions,
    ) -> binding::fmiComponent {
        match functions.instantiate_model.slot() {
            Slot::Resolved(instantiate_model) => unsafe {
                instantiate_model(
                    instance_name.as_ptr(),
                    guid.as_ptr(),
                    super::me_callbacks(&options.callbacks),
                    options.logging_on as binding::fmiBoolean,
                )
            },
            Slot::Stub | Slot::Absent => ptr::null_mut(),
        }
    }

    fn terminate_entry(functions: &Self::Functions) -> Entry<binding::fmiTerminateTYPE> {
        functions.terminate
    }

    fn free_instance_entry(
        functions: &Self::Functions,
    ) -> Entry<binding::fmiFreeModelInstanceTYPE> {
        functions.free_model_instance
    }
}

pub struct Instance<Tag: Fmi1Tag> {
    /// Descriptor, sticky status, lifecycle and the loaded library
    state: HandleState,
    common: CommonFunctions,
    functions: Tag::Functions,
    /// Pointer to the raw FMI 1.0 instance
    component: binding::fmiComponent,
    /// Last event info returned by `fmiInitialize` or `fmiEventUpdate`
    event_info: binding::fmiEventInfo,
    released: bool,
    _tag: PhantomData<Tag>,
}

impl_fmi_instance!(Instance<Tag>, Fmi1Tag);

impl<Tag: Fmi1Tag> Instance<Tag> {
    /// Load the shared library named by `descriptor`, resolve its `<modelIdentifier>_fmi*`
    /// functions and instantiate it.
    pub fn initialize(descriptor: &FmuDescriptor, options: &DriverOptions) -> Result<Self, Error> {
        Self::initialize_with(descriptor, options, &SharedLibraryLoader)
    }

    /// [`Self::initialize`] with a custom library loader.
    pub fn initialize_with(
        descriptor: &FmuDescriptor,
        options: &DriverOptions,
        loader: &dyn LibraryLoader,
    ) -> Result<Self, Error> {
        let (mut state, library, strings) = HandleState::load(
            descriptor,
            options,
            loader,
            FmiVersion::V1,
            Tag::KIND,
            LONGEST_FUNCTION_NAME,
        )?;

        let (common, functions) = {
            let prefix = Some(descriptor.model_identifier.as_str());
            let mut resolver = Resolver::new(library.as_ref(), prefix, &mut state);
            (
                CommonFunctions::resolve(&mut resolver, options.capabilities),
                Tag::resolve(&mut resolver, options.capabilities),
            )
        };
        state.attach_library(library);

        let component = Tag::instantiate(
            &functions,
            &strings.instance_name,
            &strings.guid,
            &strings.resource_location,
            options,
        );
        if component.is_null() {
            state.check_status(Status::Error, Tag::instantiate_name(&functions));
            return Err(Error::Instantiation {
                instance: descriptor.instance_name.clone(),
            });
        }
        log::trace!("Created FMI1.0 {} component {component:?}", Tag::KIND);
        state.transition(LifecycleState::Instantiated);

        Ok(Self {
            state,
            common,
            functions,
            component,
            event_info: binding::fmiEventInfo::default(),
            released: false,
            _tag: PhantomData,
        })
    }

    /// Terminate the FMU and release the instance, the library and all host-side state.
    ///
    /// The FMU's terminate function is only called when the model was initialized and no
    /// `Error` or `Fatal` status has been seen. After `Fatal` the instance is not freed either.
    /// Returns the translation of the terminate call, or `true` when it was not called.
    pub fn terminate(mut self) -> bool {
        let mut ok = true;
        if !self.state.error_status().is_error() && self.state.model_initialized {
            let component = self.component;
            let entry = Tag::terminate_entry(&self.functions);
            let outcome =
                entry.invoke(component, |f| Status::from_raw(unsafe { f(component) }));
            ok = self.state.translate(outcome, entry.name());
        }
        self.release();
        ok
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let component = self.component;
        if self.state.error_status() == Status::Fatal {
            log::trace!("Not freeing component {component:?} after a fatal error");
        } else if let Some(free_instance) = Tag::free_instance_entry(&self.functions).function() {
            log::trace!("Freeing component {component:?}");
            unsafe { free_instance(component) };
        }
        self.component = ptr::null_mut();
        self.state.release();
    }

    /// Raw component pointer, null once released
    pub fn component(&self) -> binding::fmiComponent {
        self.component
    }
}

impl<Tag: Fmi1Tag> Drop for Instance<Tag> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<Tag: Fmi1Tag> std::fmt::Debug for Instance<Tag> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Instance {} {{FMI1.0 {}, {:?}, {:?}}}",
            self.state.instance_name(),
            Tag::KIND,
            self.state.lifecycle(),
            self.component,
        )
    }
}
