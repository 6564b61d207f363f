use crate::ffi::InitFlag;
use std::env;

/// Set this to a library name or full path to try it before the platform defaults.
pub const LIBRARY_ENV: &str = "OPENUSB_LIBRARY";

cfg_if::cfg_if! {
    if #[cfg(target_os = "windows")] {
        const LIBRARY_NAMES: &[&str] = &["openusb.dll", "libopenusb-0.dll"];
    } else if #[cfg(target_os = "macos")] {
        const LIBRARY_NAMES: &[&str] = &["libopenusb.dylib", "libopenusb.0.dylib"];
    } else {
        const LIBRARY_NAMES: &[&str] = &["libopenusb.so.0", "libopenusb.so"];
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendConfig {
    /// Names (or paths) handed to the dynamic loader, in the order they're tried.
    pub library_names: Vec<String>,

    /// Passed straight through to openusb_init.
    pub init_flags: u32,

    /// Policy the library applies when claiming an interface.
    pub claim_flag: InitFlag,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            library_names: LIBRARY_NAMES.iter().map(|name| name.to_string()).collect(),
            init_flags: 0,
            claim_flag: InitFlag::Default,
        }
    }
}

impl BackendConfig {
    /// The defaults, with `OPENUSB_LIBRARY` (if set) tried first.
    pub fn from_env() -> Self {
        Self::default().with_override(env::var(LIBRARY_ENV).ok())
    }

    /// Only ever try this one library.
    pub fn with_library(mut self, name: impl Into<String>) -> Self {
        self.library_names = vec![name.into()];
        self
    }

    fn with_override(mut self, library: Option<String>) -> Self {
        if let Some(library) = library {
            let library = library.trim();
            if !library.is_empty() {
                self.library_names.insert(0, library.to_string());
            }
        }
        self
    }
}
