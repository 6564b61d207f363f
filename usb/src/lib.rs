pub use usb_backend_types;
pub mod ffi;

mod backend;
mod config;
mod context;
mod descriptors;
mod enumeration;
mod error;
mod library;
mod session;
mod transfer;

#[cfg(test)]
mod mock;

pub use backend::{get_backend, get_backend_with, release_backend, OpenUsbBackend};
pub use config::{BackendConfig, LIBRARY_ENV};
