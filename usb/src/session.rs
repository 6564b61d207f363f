use crate::backend::Runtime;
use crate::ffi::RawDevHandle;
use log::{debug, trace, warn};
use std::ffi::c_int;
use usb_backend_types::{DeviceHandle, DeviceId, UsbError, UsbResult};

impl Runtime {
    fn configure(&self, result: i32) -> UsbResult<()> {
        self.api.check(result).map_err(UsbError::Configuration)
    }

    pub(crate) fn open_device(&self, device: DeviceId) -> UsbResult<DeviceHandle> {
        trace!("openusb_open_device({})", device);

        let mut handle: RawDevHandle = 0;
        let result = unsafe {
            (self.api.open_device)(self.context.handle(), device.as_raw(), 0, &mut handle)
        };
        self.api.check(result).map_err(UsbError::Open)?;

        debug!("Opened device {} as handle {:#x}", device, handle);
        Ok(DeviceHandle::from_raw(handle))
    }

    pub(crate) fn close_device(&self, handle: DeviceHandle) {
        trace!("openusb_close_device({})", handle);

        let result = unsafe { (self.api.close_device)(handle.as_raw()) };
        if let Err(error) = self.api.check(result) {
            // Nothing useful can be done with a handle that won't close, so just note it.
            warn!("Unable to close device handle {}: {}", handle, error);
        }
    }

    pub(crate) fn set_configuration(
        &self,
        handle: DeviceHandle,
        config_value: u8,
    ) -> UsbResult<()> {
        trace!("openusb_set_configuration({}, {})", handle, config_value);
        self.configure(unsafe { (self.api.set_configuration)(handle.as_raw(), config_value) })
    }

    pub(crate) fn get_configuration(&self, handle: DeviceHandle) -> UsbResult<u8> {
        trace!("openusb_get_configuration({})", handle);

        let mut config: u8 = 0;
        let result = unsafe { (self.api.get_configuration)(handle.as_raw(), &mut config) };
        self.configure(result)?;
        Ok(config)
    }

    pub(crate) fn set_interface_altsetting(
        &self,
        handle: DeviceHandle,
        interface: u8,
        alt_setting: u8,
    ) -> UsbResult<()> {
        trace!("openusb_set_altsetting({}, {}, {})", handle, interface, alt_setting);
        self.configure(unsafe {
            (self.api.set_altsetting)(handle.as_raw(), interface, alt_setting)
        })
    }

    pub(crate) fn claim_interface(&self, handle: DeviceHandle, interface: u8) -> UsbResult<()> {
        let flag = self.config.claim_flag;
        trace!("openusb_claim_interface({}, {}, {})", handle, interface, flag);
        self.configure(unsafe {
            (self.api.claim_interface)(handle.as_raw(), interface, flag as c_int)
        })
    }

    pub(crate) fn release_interface(&self, handle: DeviceHandle, interface: u8) -> UsbResult<()> {
        trace!("openusb_release_interface({}, {})", handle, interface);
        self.configure(unsafe { (self.api.release_interface)(handle.as_raw(), interface) })
    }

    pub(crate) fn reset_device(&self, handle: DeviceHandle) -> UsbResult<()> {
        debug!("Resetting device handle {}", handle);
        self.configure(unsafe { (self.api.reset)(handle.as_raw()) })
    }
}
