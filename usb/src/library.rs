use crate::config::BackendConfig;
use libloading::Library;
use log::{debug, info};
use usb_backend_types::UsbError;

/// Tries each configured library name in turn, returning the first one the loader accepts.
pub(crate) fn load(config: &BackendConfig) -> Result<Library, UsbError> {
    let mut failures = Vec::new();

    for name in &config.library_names {
        // SAFETY: Loading runs the library's initialisers, OpenUSB doesn't do anything unusual in
        // there.
        match unsafe { Library::new(name) } {
            Ok(library) => {
                info!("Loaded OpenUSB library from {}", name);
                return Ok(library);
            }
            Err(error) => {
                debug!("Unable to load {}: {}", name, error);
                failures.push(format!("{}: {}", name, error));
            }
        }
    }

    if failures.is_empty() {
        return Err(UsbError::LibraryNotFound(String::from(
            "No library names configured",
        )));
    }
    Err(UsbError::LibraryNotFound(failures.join("; ")))
}
