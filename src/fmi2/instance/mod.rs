//! FMI 2.0 instance interface

use std::{marker::PhantomData, ptr};

use crate::{
    handle::{impl_fmi_instance, HandleState},
    library::{LibraryLoader, SharedLibraryLoader},
    logger::LoggerBridge,
    resolver::{fmi_call, Resolver, Slot},
    traits::InstanceTag,
    Capabilities, DriverOptions, Error, FmiVersion, FmuDescriptor, LifecycleState, Status,
    SymbolPrefix, CS, ME,
};

use super::{
    binding,
    functions::{
        CoSimulationFunctions, CommonFunctions, ModelExchangeFunctions, LONGEST_FUNCTION_NAME,
    },
    CallbackFunctions,
};

mod co_simulation;
mod common;
mod model_exchange;

pub type InstanceME = Instance<ME>;
pub type InstanceCS = Instance<CS>;

/// Index of a state saved with [`Instance::get_fmu_state`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FmuState(usize);

/// Interface type of an FMI 2.0 instance, selecting its function table.
pub trait Fmi2Tag: InstanceTag {
    const FMU_TYPE: binding::fmi2Type;

    /// Functions specific to this interface type
    type Functions: Copy + std::fmt::Debug;

    #[doc(hidden)]
    fn resolve(resolver: &mut Resolver<'_>, capabilities: Capabilities) -> Self::Functions;
}

impl Fmi2Tag for CS {
    const FMU_TYPE: binding::fmi2Type = binding::fmi2Type_fmi2CoSimulation;
    type Functions = CoSimulationFunctions;

    fn resolve(resolver: &mut Resolver<'_>, capabilities: Capabilities) -> Self::Functions {
        CoSimulationFunctions::resolve(resolver, capabilities)
    }
}

impl Fmi2Tag for ME {
    const FMU_TYPE: binding::fmi2Type = binding::fmi2Type_fmi2ModelExchange;
    type Functions = ModelExchangeFunctions;

    fn resolve(resolver: &mut Resolver<'_>, capabilities: Capabilities) -> Self::Functions {
        ModelExchangeFunctions::resolve(resolver, capabilities)
    }
}

pub struct Instance<Tag: Fmi2Tag> {
    /// Descriptor, sticky status, lifecycle and the loaded library
    state: HandleState,
    common: CommonFunctions,
    functions: Tag::Functions,
    /// Pointer to the raw FMI 2.0 instance
    component: binding::fmi2Component,
    /// Referenced by the FMU until the instance is freed
    #[allow(dead_code)]
    callbacks: Box<CallbackFunctions>,
    /// Target of `callbacks.component_environment`
    #[allow(dead_code)]
    logger_bridge: LoggerBridge,
    /// Allocated FMU states
    saved_states: Vec<Option<binding::fmi2FMUstate>>,
    /// Last event info returned by `fmi2NewDiscreteStates`
    event_info: binding::fmi2EventInfo,
    released: bool,
    _tag: PhantomData<Tag>,
}

impl_fmi_instance!(Instance<Tag>, Fmi2Tag);

impl<Tag: Fmi2Tag> Instance<Tag> {
    /// Load the shared library named by `descriptor`, resolve its functions and instantiate it.
    pub fn initialize(descriptor: &FmuDescriptor, options: &DriverOptions) -> Result<Self, Error> {
        Self::initialize_with(descriptor, options, &SharedLibraryLoader)
    }

    /// [`Self::initialize`] with a custom library loader.
    ///
    /// Fails without loading anything when the instance name is too long to form symbol names.
    /// Missing mandatory functions only produce warnings here; calling them later fails.
    pub fn initialize_with(
        descriptor: &FmuDescriptor,
        options: &DriverOptions,
        loader: &dyn LibraryLoader,
    ) -> Result<Self, Error> {
        let (mut state, library, strings) = HandleState::load(
            descriptor,
            options,
            loader,
            FmiVersion::V2,
            Tag::KIND,
            LONGEST_FUNCTION_NAME,
        )?;

        let prefix = match options.symbol_prefix {
            SymbolPrefix::Standard => None,
            SymbolPrefix::InstanceName => Some(descriptor.instance_name.as_str()),
        };
        let (common, functions) = {
            let mut resolver = Resolver::new(library.as_ref(), prefix, &mut state);
            (
                CommonFunctions::resolve(&mut resolver, options.capabilities),
                Tag::resolve(&mut resolver, options.capabilities),
            )
        };
        state.attach_library(library);

        let logger_bridge = LoggerBridge::new(options.logger.clone());
        let callbacks = Box::new(CallbackFunctions {
            allocate_memory: Some(options.callbacks.allocate_memory),
            free_memory: Some(options.callbacks.free_memory),
            step_finished: options.callbacks.step_finished,
            component_environment: logger_bridge.environment(),
            ..Default::default()
        });

        let component = match common.instantiate.slot() {
            Slot::Resolved(instantiate) => unsafe {
                let callback_functions = &*callbacks as *const CallbackFunctions;
                instantiate(
                    strings.instance_name.as_ptr(),
                    Tag::FMU_TYPE,
                    strings.guid.as_ptr(),
                    strings.resource_location.as_ptr(),
                    callback_functions as _,
                    options.visible as binding::fmi2Boolean,
                    options.logging_on as binding::fmi2Boolean,
                )
            },
            Slot::Stub | Slot::Absent => ptr::null_mut(),
        };
        if component.is_null() {
            state.check_status(Status::Error, common.instantiate.name());
            return Err(Error::Instantiation {
                instance: descriptor.instance_name.clone(),
            });
        }
        log::trace!("Created FMI2.0 {} component {component:?}", Tag::KIND);
        state.transition(LifecycleState::Instantiated);

        Ok(Self {
            state,
            common,
            functions,
            component,
            callbacks,
            logger_bridge,
            saved_states: Vec::new(),
            event_info: binding::fmi2EventInfo::default(),
            released: false,
            _tag: PhantomData,
        })
    }

    /// Terminate the FMU and release the instance, the library and all host-side state.
    ///
    /// `fmi2Terminate` is only called when the model was initialized and no `Error` or `Fatal`
    /// status has been seen. After `Fatal`, `fmi2FreeInstance` is skipped as well. Returns the
    /// translation of `fmi2Terminate`, or `true` when it was not called.
    pub fn terminate(mut self) -> bool {
        let mut ok = true;
        if !self.state.error_status().is_error() && self.state.model_initialized {
            ok = fmi_call!(self.common.terminate());
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
        } else {
            if let Some(free_fmu_state) = self.common.free_fmu_state.function() {
                for mut fmu_state in self.saved_states.drain(..).flatten() {
                    unsafe { free_fmu_state(component, &mut fmu_state) };
                }
            }
            if let Some(free_instance) = self.common.free_instance.function() {
                log::trace!("Freeing component {component:?}");
                unsafe { free_instance(component) };
            }
        }
        self.component = ptr::null_mut();
        self.state.release();
    }

    /// Save the current FMU state.
    pub fn get_fmu_state(&mut self) -> Option<FmuState> {
        let mut fmu_state: binding::fmi2FMUstate = ptr::null_mut();
        if !fmi_call!(self.common.get_fmu_state(&mut fmu_state)) {
            self.discard_fmu_state(fmu_state);
            return None;
        }

        if fmu_state.is_null() {
            log::error!("FMU returned a null state");
            self.state.check_status(Status::Error, self.common.get_fmu_state.name());
            None
        } else {
            self.saved_states.push(Some(fmu_state));
            Some(FmuState(self.saved_states.len() - 1))
        }
    }

    /// Overwrite a saved state with the current FMU state.
    pub fn update_fmu_state(&mut self, fmu_state: &FmuState) -> bool {
        let Some(mut saved) = self.saved_state(fmu_state) else {
            return false;
        };
        let ok = fmi_call!(self.common.get_fmu_state(&mut saved));
        self.saved_states[fmu_state.0] = Some(saved);
        ok
    }

    /// Restore a saved state.
    pub fn set_fmu_state(&mut self, fmu_state: &FmuState) -> bool {
        match self.saved_state(fmu_state) {
            Some(saved) => fmi_call!(self.common.set_fmu_state(saved)),
            None => false,
        }
    }

    /// Release a saved state.
    pub fn free_fmu_state(&mut self, fmu_state: FmuState) -> bool {
        let Some(mut saved) = self.saved_state(&fmu_state) else {
            return false;
        };
        self.saved_states[fmu_state.0] = None;
        fmi_call!(self.common.free_fmu_state(&mut saved))
    }

    /// Serialize a saved state into a byte vector.
    pub fn serialize_fmu_state(&mut self, fmu_state: &FmuState) -> Option<Vec<u8>> {
        let saved = self.saved_state(fmu_state)?;

        let mut size = 0;
        if !fmi_call!(self.common.serialized_fmu_state_size(saved, &mut size)) {
            return None;
        }

        let mut buffer: Vec<u8> = vec![0; size];
        fmi_call!(self.common.serialize_fmu_state(saved, buffer.as_mut_ptr() as _, size))
            .then_some(buffer)
    }

    /// Deserialize a state previously produced by [`Self::serialize_fmu_state`] and keep it as
    /// a new saved state.
    pub fn deserialize_fmu_state(&mut self, buffer: &[u8]) -> Option<FmuState> {
        let mut fmu_state: binding::fmi2FMUstate = ptr::null_mut();
        if !fmi_call!(self.common.deserialize_fmu_state(
            buffer.as_ptr() as _,
            buffer.len(),
            &mut fmu_state
        )) {
            self.discard_fmu_state(fmu_state);
            return None;
        }

        if fmu_state.is_null() {
            log::error!("FMU returned a null state");
            self.state
                .check_status(Status::Error, self.common.deserialize_fmu_state.name());
            None
        } else {
            self.saved_states.push(Some(fmu_state));
            Some(FmuState(self.saved_states.len() - 1))
        }
    }

    /// Free a state the FMU allocated for a call that then failed. Nothing is called into the
    /// FMU after `Fatal`.
    fn discard_fmu_state(&mut self, mut fmu_state: binding::fmi2FMUstate) {
        if fmu_state.is_null() || self.state.error_status() == Status::Fatal {
            return;
        }
        if let Some(free_fmu_state) = self.common.free_fmu_state.function() {
            log::trace!("Freeing state {fmu_state:?} of a failed call");
            unsafe { free_fmu_state(self.component, &mut fmu_state) };
        }
    }

    fn saved_state(&self, fmu_state: &FmuState) -> Option<binding::fmi2FMUstate> {
        let saved = self.saved_states.get(fmu_state.0).copied().flatten();
        if saved.is_none() {
            log::error!("{fmu_state:?} is not a saved state of {}", self.state.instance_name());
        }
        saved
    }

    /// Raw component pointer, null once released
    pub fn component(&self) -> binding::fmi2Component {
        self.component
    }
}

impl<Tag: Fmi2Tag> Drop for Instance<Tag> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<Tag: Fmi2Tag> std::fmt::Debug for Instance<Tag> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Instance {} {{{}, {:?}, {:?}}}",
            self.state.instance_name(),
            Tag::KIND,
            self.state.lifecycle(),
            self.component,
        )
    }
}
