//! Access to the FMU's shared library.
//!
//! The driver only needs raw symbol addresses, so the library is hidden behind
//! [`SymbolSource`]. [`SharedLibraryLoader`] opens real shared objects with `libloading`; tests
//! substitute in-process function tables.

use std::{
    os::raw::c_void,
    path::{Path, PathBuf},
};

/// Error reported by a [`LibraryLoader`]
pub type LoadError = Box<dyn std::error::Error + Send + Sync>;

/// A loaded library that can be queried for exported symbols.
///
/// Dropping the source closes the library; every function pointer obtained from it becomes
/// invalid.
pub trait SymbolSource {
    /// Address of the exported symbol `name`, or `None` when it is not exported.
    fn symbol(&self, name: &str) -> Option<*const c_void>;
}

/// Opens the library named by an [`crate::FmuDescriptor`].
pub trait LibraryLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn SymbolSource>, LoadError>;
}

/// Loads shared objects (`.so`, `.dylib`, `.dll`) from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct SharedLibraryLoader;

impl LibraryLoader for SharedLibraryLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn SymbolSource>, LoadError> {
        log::trace!("Loading shared library {path:?}");
        let library = unsafe { libloading::Library::new(path) }?;
        Ok(Box::new(SharedLibrary {
            library,
            path: path.to_owned(),
        }))
    }
}

#[derive(Debug)]
pub struct SharedLibrary {
    library: libloading::Library,
    path: PathBuf,
}

impl SymbolSource for SharedLibrary {
    fn symbol(&self, name: &str) -> Option<*const c_void> {
        let symbol = unsafe { self.library.get::<*const c_void>(name.as_bytes()) }.ok()?;
        let address = *symbol;
        (!address.is_null()).then_some(address)
    }
}

impl Drop for SharedLibrary {
    fn drop(&mut self) {
        log::trace!("Closing shared library {:?}", self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library() {
        let err = SharedLibraryLoader
            .load(Path::new("/nonexistent/libmissing.so"))
            .err()
            .expect("loading a missing library must fail");
        assert!(!err.to_string().is_empty());
    }
}
