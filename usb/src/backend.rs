use crate::config::BackendConfig;
use crate::context::Context;
use crate::ffi::NativeApi;
use crate::library;
use anyhow::{Context as _, Result};
use lazy_static::lazy_static;
use log::{debug, error, info};
use std::sync::{Arc, Mutex};
use usb_backend_types::{
    ConfigurationDescriptor, ControlOutcome, ControlPayload, ControlSetup, DeviceDescriptor,
    DeviceHandle, DeviceId, DeviceIterator, EndpointDescriptor, InterfaceDescriptor, Timeout,
    UsbBackend, UsbResult,
};

lazy_static! {
    static ref SHARED_RUNTIME: Mutex<Option<Arc<Runtime>>> = Mutex::new(None);
}

/// Everything needed to talk to OpenUSB: the function table, and the session created with it.
///
/// Fields drop in order, so the context is always finalised before the library goes away.
pub(crate) struct Runtime {
    pub(crate) context: Context,
    pub(crate) api: NativeApi,
    pub(crate) config: BackendConfig,
}

impl Runtime {
    pub(crate) fn new(api: NativeApi, config: BackendConfig) -> UsbResult<Self> {
        let context = Context::init(&api, config.init_flags)?;
        Ok(Self {
            context,
            api,
            config,
        })
    }

    fn acquire(config: &BackendConfig) -> Result<Self> {
        let library = library::load(config).context("Unable to locate the OpenUSB library")?;
        let api = NativeApi::from_library(library).context("Unable to bind the OpenUSB API")?;
        let runtime = Runtime::new(api, config.clone()).context("Unable to start OpenUSB")?;
        Ok(runtime)
    }
}

/// A USB backend which drives devices through OpenUSB.
///
/// Clones share the same session, which is finalised when the last clone (and the shared slot,
/// if it came from there) lets go of it.
#[derive(Clone)]
pub struct OpenUsbBackend {
    runtime: Arc<Runtime>,
}

impl OpenUsbBackend {
    /// Creates a backend with its own session around an already resolved function table,
    /// bypassing library discovery and the shared session entirely.
    pub fn with_api(api: NativeApi, config: BackendConfig) -> UsbResult<Self> {
        Ok(Self {
            runtime: Arc::new(Runtime::new(api, config)?),
        })
    }

    /// True if this backend is using a library that was loaded from disk.
    pub fn is_loaded(&self) -> bool {
        self.runtime.api.is_loaded()
    }
}

/// Returns the OpenUSB backend if the library can be found and initialised, otherwise `None`.
///
/// The library named by `OPENUSB_LIBRARY` is tried before the platform defaults.
pub fn get_backend() -> Option<OpenUsbBackend> {
    get_backend_with(&BackendConfig::from_env())
}

/// As `get_backend`, but with an explicit configuration. The configuration only matters for the
/// call that actually creates the shared session, later calls reuse whatever exists.
pub fn get_backend_with(config: &BackendConfig) -> Option<OpenUsbBackend> {
    shared(&SHARED_RUNTIME, || Runtime::acquire(config))
}

/// Drops the shared session. It's finalised once every backend handed out from it is gone, and
/// the next `get_backend` call will start a new one.
pub fn release_backend() {
    match SHARED_RUNTIME.lock() {
        Ok(mut slot) => {
            if slot.take().is_some() {
                debug!("Released shared OpenUSB session");
            }
        }
        Err(error) => error!("Unable to release OpenUSB session: {}", error),
    }
}

fn shared<F>(slot: &Mutex<Option<Arc<Runtime>>>, acquire: F) -> Option<OpenUsbBackend>
where
    F: FnOnce() -> Result<Runtime>,
{
    let mut slot = match slot.lock() {
        Ok(slot) => slot,
        Err(error) => {
            error!("OpenUSB session lock poisoned: {}", error);
            return None;
        }
    };

    if let Some(runtime) = slot.as_ref() {
        return Some(OpenUsbBackend {
            runtime: runtime.clone(),
        });
    }

    match acquire() {
        Ok(runtime) => {
            info!("OpenUSB backend ready");
            let runtime = Arc::new(runtime);
            slot.replace(runtime.clone());
            Some(OpenUsbBackend { runtime })
        }
        Err(error) => {
            error!("OpenUSB backend unavailable: {:#}", error);
            None
        }
    }
}

impl UsbBackend for OpenUsbBackend {
    fn enumerate_devices(&self) -> UsbResult<DeviceIterator<'_>> {
        Ok(Box::new(self.runtime.enumerate_devices()?))
    }

    fn get_device_descriptor(&self, device: DeviceId) -> UsbResult<DeviceDescriptor> {
        self.runtime.get_device_descriptor(device)
    }

    fn get_configuration_descriptor(
        &self,
        device: DeviceId,
        config: u8,
    ) -> UsbResult<ConfigurationDescriptor> {
        self.runtime.get_configuration_descriptor(device, config)
    }

    fn get_interface_descriptor(
        &self,
        device: DeviceId,
        interface: u8,
        alt_setting: u8,
        config: u8,
    ) -> UsbResult<InterfaceDescriptor> {
        self.runtime
            .get_interface_descriptor(device, interface, alt_setting, config)
    }

    fn get_endpoint_descriptor(
        &self,
        device: DeviceId,
        endpoint: u8,
        interface: u8,
        alt_setting: u8,
        config: u8,
    ) -> UsbResult<EndpointDescriptor> {
        self.runtime
            .get_endpoint_descriptor(device, endpoint, interface, alt_setting, config)
    }

    fn open_device(&self, device: DeviceId) -> UsbResult<DeviceHandle> {
        self.runtime.open_device(device)
    }

    fn close_device(&self, handle: DeviceHandle) {
        self.runtime.close_device(handle)
    }

    fn set_configuration(&self, handle: DeviceHandle, config_value: u8) -> UsbResult<()> {
        self.runtime.set_configuration(handle, config_value)
    }

    fn get_configuration(&self, handle: DeviceHandle) -> UsbResult<u8> {
        self.runtime.get_configuration(handle)
    }

    fn set_interface_altsetting(
        &self,
        handle: DeviceHandle,
        interface: u8,
        alt_setting: u8,
    ) -> UsbResult<()> {
        self.runtime
            .set_interface_altsetting(handle, interface, alt_setting)
    }

    fn claim_interface(&self, handle: DeviceHandle, interface: u8) -> UsbResult<()> {
        self.runtime.claim_interface(handle, interface)
    }

    fn release_interface(&self, handle: DeviceHandle, interface: u8) -> UsbResult<()> {
        self.runtime.release_interface(handle, interface)
    }

    fn reset_device(&self, handle: DeviceHandle) -> UsbResult<()> {
        self.runtime.reset_device(handle)
    }

    fn bulk_write(
        &self,
        handle: DeviceHandle,
        endpoint: u8,
        interface: u8,
        data: &[u8],
        timeout: Timeout,
    ) -> UsbResult<usize> {
        self.runtime
            .bulk_write(handle, endpoint, interface, data, timeout)
    }

    fn bulk_read(
        &self,
        handle: DeviceHandle,
        endpoint: u8,
        interface: u8,
        size: usize,
        timeout: Timeout,
    ) -> UsbResult<Vec<u8>> {
        self.runtime
            .bulk_read(handle, endpoint, interface, size, timeout)
    }

    fn intr_write(
        &self,
        handle: DeviceHandle,
        endpoint: u8,
        interface: u8,
        data: &[u8],
        timeout: Timeout,
    ) -> UsbResult<usize> {
        self.runtime
            .intr_write(handle, endpoint, interface, data, timeout)
    }

    fn intr_read(
        &self,
        handle: DeviceHandle,
        endpoint: u8,
        interface: u8,
        size: usize,
        timeout: Timeout,
    ) -> UsbResult<Vec<u8>> {
        self.runtime
            .intr_read(handle, endpoint, interface, size, timeout)
    }

    fn ctrl_transfer(
        &self,
        handle: DeviceHandle,
        setup: ControlSetup,
        payload: ControlPayload<'_>,
        timeout: Timeout,
    ) -> UsbResult<ControlOutcome> {
        self.runtime.ctrl_transfer(handle, setup, payload, timeout)
    }
}
