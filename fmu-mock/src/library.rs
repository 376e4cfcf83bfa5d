use std::{
    collections::HashMap,
    os::raw::c_void,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use fmu_driver::{
    library::{LibraryLoader, LoadError, SymbolSource},
    FmiVersion,
};

use crate::{lock, SharedState, MODEL_IDENTIFIER};

/// Serves the mock function table of one [`crate::MockFmu`] and counts how often it was asked
/// to load.
#[derive(Debug, Clone)]
pub struct MockLoader {
    version: FmiVersion,
    state: SharedState,
    loads: Arc<AtomicUsize>,
    error: Option<String>,
    prefix: Option<String>,
}

impl MockLoader {
    pub(crate) fn new(version: FmiVersion, state: SharedState) -> Self {
        Self {
            version,
            state,
            loads: Arc::default(),
            error: None,
            prefix: None,
        }
    }

    /// Every load fails with `message`.
    pub fn failing(mut self, message: &str) -> Self {
        self.error = Some(message.to_owned());
        self
    }

    /// Export the FMI 2.0 functions as `<prefix>_fmi2*` instead of their bare names.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_owned());
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl LibraryLoader for MockLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn SymbolSource>, LoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.error {
            return Err(message.clone().into());
        }

        log::trace!("Loading mock library for {path:?}");
        lock(&self.state).libraries_loaded += 1;
        let (symbols, prefix) = match self.version {
            FmiVersion::V1 => (crate::fmi1::symbols(), Some(MODEL_IDENTIFIER.to_owned())),
            FmiVersion::V2 => (crate::fmi2::symbols(), self.prefix.clone()),
        };
        Ok(Box::new(MockLibrary {
            symbols: symbols.into_iter().collect(),
            prefix,
            state: self.state.clone(),
        }))
    }
}

/// The exported symbols of a mock model.
#[derive(Debug)]
pub struct MockLibrary {
    symbols: HashMap<&'static str, *const c_void>,
    prefix: Option<String>,
    state: SharedState,
}

impl SymbolSource for MockLibrary {
    fn symbol(&self, name: &str) -> Option<*const c_void> {
        let function = match &self.prefix {
            Some(prefix) => name.strip_prefix(prefix.as_str())?.strip_prefix('_')?,
            None => name,
        };
        if lock(&self.state).behavior.missing.contains(function) {
            return None;
        }
        self.symbols.get(function).copied()
    }
}

impl Drop for MockLibrary {
    fn drop(&mut self) {
        lock(&self.state).libraries_closed += 1;
    }
}
