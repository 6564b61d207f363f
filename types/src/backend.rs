use crate::descriptors::{
    ConfigurationDescriptor, DeviceDescriptor, EndpointDescriptor, InterfaceDescriptor,
};
use crate::error::{UsbError, UsbResult};
use crate::ids::{DeviceHandle, DeviceId};
use crate::transfer::{ControlOutcome, ControlPayload, ControlSetup, Timeout, TransferType};

pub type DeviceIterator<'a> = Box<dyn Iterator<Item = UsbResult<DeviceId>> + 'a>;

// The capabilities every backend provides to the rest of the USB stack. Backends are
// interchangeable, so a selector can hold a Box<dyn UsbBackend> and not care which native
// library is sitting underneath.
//
// All calls are synchronous and block the calling thread until the native library returns.
pub trait UsbBackend: Send + Sync {
    /// Lists every device on every bus. Each call takes a fresh snapshot from the library.
    fn enumerate_devices(&self) -> UsbResult<DeviceIterator<'_>>;

    fn get_device_descriptor(&self, device: DeviceId) -> UsbResult<DeviceDescriptor>;
    fn get_configuration_descriptor(
        &self,
        device: DeviceId,
        config: u8,
    ) -> UsbResult<ConfigurationDescriptor>;
    fn get_interface_descriptor(
        &self,
        device: DeviceId,
        interface: u8,
        alt_setting: u8,
        config: u8,
    ) -> UsbResult<InterfaceDescriptor>;
    fn get_endpoint_descriptor(
        &self,
        device: DeviceId,
        endpoint: u8,
        interface: u8,
        alt_setting: u8,
        config: u8,
    ) -> UsbResult<EndpointDescriptor>;

    fn open_device(&self, device: DeviceId) -> UsbResult<DeviceHandle>;

    /// Best effort, failures are not reported. Must only be called once per handle.
    fn close_device(&self, handle: DeviceHandle);

    fn set_configuration(&self, handle: DeviceHandle, config_value: u8) -> UsbResult<()>;
    fn get_configuration(&self, handle: DeviceHandle) -> UsbResult<u8>;
    fn set_interface_altsetting(
        &self,
        handle: DeviceHandle,
        interface: u8,
        alt_setting: u8,
    ) -> UsbResult<()>;
    fn claim_interface(&self, handle: DeviceHandle, interface: u8) -> UsbResult<()>;
    fn release_interface(&self, handle: DeviceHandle, interface: u8) -> UsbResult<()>;
    fn reset_device(&self, handle: DeviceHandle) -> UsbResult<()>;

    /// Returns how many bytes were written. Less than `data.len()` is a short transfer, not an
    /// error.
    fn bulk_write(
        &self,
        handle: DeviceHandle,
        endpoint: u8,
        interface: u8,
        data: &[u8],
        timeout: Timeout,
    ) -> UsbResult<usize>;

    /// Returns at most `size` bytes.
    fn bulk_read(
        &self,
        handle: DeviceHandle,
        endpoint: u8,
        interface: u8,
        size: usize,
        timeout: Timeout,
    ) -> UsbResult<Vec<u8>>;

    fn intr_write(
        &self,
        handle: DeviceHandle,
        endpoint: u8,
        interface: u8,
        data: &[u8],
        timeout: Timeout,
    ) -> UsbResult<usize>;

    fn intr_read(
        &self,
        handle: DeviceHandle,
        endpoint: u8,
        interface: u8,
        size: usize,
        timeout: Timeout,
    ) -> UsbResult<Vec<u8>>;

    fn iso_write(
        &self,
        _handle: DeviceHandle,
        _endpoint: u8,
        _interface: u8,
        _data: &[u8],
        _timeout: Timeout,
    ) -> UsbResult<usize> {
        Err(UsbError::Unsupported(TransferType::Isochronous))
    }

    fn iso_read(
        &self,
        _handle: DeviceHandle,
        _endpoint: u8,
        _interface: u8,
        _size: usize,
        _timeout: Timeout,
    ) -> UsbResult<Vec<u8>> {
        Err(UsbError::Unsupported(TransferType::Isochronous))
    }

    /// Runs a control transfer on the default pipe. The direction bit in `setup.request_type`
    /// decides what happens: Out sends `ControlPayload::Write` and returns the accepted count,
    /// In reads up to `ControlPayload::Read(length)` bytes.
    fn ctrl_transfer(
        &self,
        handle: DeviceHandle,
        setup: ControlSetup,
        payload: ControlPayload<'_>,
        timeout: Timeout,
    ) -> UsbResult<ControlOutcome>;
}
