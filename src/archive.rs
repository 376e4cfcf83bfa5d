//! Unpacking `.fmu` archives and locating their contents.

use std::{
    io::{Read, Seek},
    path::{Path, PathBuf},
};

use crate::{Error, FmiVersion, FmuDescriptor, FmuKind};

/// An FMU archive extracted into a temporary directory, removed on drop.
#[derive(Debug)]
pub struct UnpackedFmu {
    dir: tempfile::TempDir,
}

impl UnpackedFmu {
    /// Extract the `.fmu` file at `path`
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = std::fs::File::open(path.as_ref())?;
        log::debug!("Opening FMU file {:?}", path.as_ref());
        Self::new(file)
    }

    /// Extract an FMU archive read from `reader`
    pub fn new<R: Read + Seek>(reader: R) -> Result<Self, Error> {
        let mut archive = zip::ZipArchive::new(reader)?;
        let dir = tempfile::Builder::new().prefix("fmu-driver").tempdir()?;
        log::debug!("Extracting into {dir:?}");
        archive.extract(&dir)?;

        for fname in archive.file_names() {
            log::trace!("  - {}", fname);
        }

        Ok(Self { dir })
    }

    /// Root of the extracted archive
    #[inline]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of the shared library for `model_identifier` on this platform
    pub fn shared_lib_path(&self, model_identifier: &str) -> Result<PathBuf, Error> {
        Ok(self.path().join(shared_lib_path(model_identifier)?))
    }

    /// `file://` URI of the `resources` directory, as passed to `fmi2Instantiate`
    pub fn resource_url(&self) -> Result<url::Url, Error> {
        let resources = self.path().join("resources");
        url::Url::from_directory_path(&resources).map_err(|_| Error::InvalidPath(resources))
    }

    /// `file://` URI of the archive root, as passed to `fmiInstantiateSlave`
    pub fn location_url(&self) -> Result<url::Url, Error> {
        url::Url::from_directory_path(self.path())
            .map_err(|_| Error::InvalidPath(self.path().to_owned()))
    }

    /// Build the descriptor of one instance of this FMU.
    pub fn descriptor(
        &self,
        version: FmiVersion,
        kind: FmuKind,
        model_identifier: &str,
        guid: &str,
        instance_name: &str,
    ) -> Result<FmuDescriptor, Error> {
        let resource_location = match (version, kind) {
            (FmiVersion::V1, FmuKind::CoSimulation) => Some(self.location_url()?),
            (FmiVersion::V1, FmuKind::ModelExchange) => None,
            (FmiVersion::V2, _) => Some(self.resource_url()?),
        };

        Ok(FmuDescriptor {
            library_path: self.shared_lib_path(model_identifier)?,
            instance_name: instance_name.to_owned(),
            model_identifier: model_identifier.to_owned(),
            guid: guid.to_owned(),
            resource_location: resource_location.map(String::from),
            version,
            kind,
        })
    }
}

/// Platform folder below `binaries/` for the running target
pub fn platform_folder() -> Result<&'static str, Error> {
    match (std::env::consts::OS, std::env::consts::ARCH) {
        ("windows", "x86_64") => Ok("win64"),
        ("windows", "x86") => Ok("win32"),
        ("linux", "x86_64") => Ok("linux64"),
        ("linux", "x86") => Ok("linux32"),
        ("macos", "x86_64") => Ok("darwin64"),
        ("macos", "x86") => Ok("darwin32"),
        (os, arch) => Err(Error::UnsupportedPlatform {
            os: os.to_owned(),
            arch: arch.to_owned(),
        }),
    }
}

/// Path of the shared library relative to the archive root
pub fn shared_lib_path(model_identifier: &str) -> Result<PathBuf, Error> {
    let fname = format!("{model_identifier}{}", std::env::consts::DLL_SUFFIX);
    Ok(PathBuf::from("binaries")
        .join(platform_folder()?)
        .join(fname))
}
