use crate::backend::Runtime;
use log::trace;
use std::ptr;
use usb_backend_types::{
    ConfigurationDescriptor, DeviceDescriptor, DeviceId, EndpointDescriptor, InterfaceDescriptor,
    UsbError, UsbResult,
};

// All of these pass a null buffer, which tells OpenUSB to go and fetch the descriptor itself
// rather than parse one we already hold. Nothing is cached, every call asks the library again.
impl Runtime {
    pub(crate) fn get_device_descriptor(&self, device: DeviceId) -> UsbResult<DeviceDescriptor> {
        trace!("openusb_parse_device_desc({})", device);

        let mut descriptor = DeviceDescriptor::default();
        let result = unsafe {
            (self.api.parse_device_desc)(
                self.context.handle(),
                device.as_raw(),
                ptr::null_mut(),
                0,
                &mut descriptor,
            )
        };
        self.api
            .check_value(result, descriptor)
            .map_err(UsbError::Parse)
    }

    pub(crate) fn get_configuration_descriptor(
        &self,
        device: DeviceId,
        config: u8,
    ) -> UsbResult<ConfigurationDescriptor> {
        trace!("openusb_parse_config_desc({}, config={})", device, config);

        let mut descriptor = ConfigurationDescriptor::default();
        let result = unsafe {
            (self.api.parse_config_desc)(
                self.context.handle(),
                device.as_raw(),
                ptr::null_mut(),
                0,
                config,
                &mut descriptor,
            )
        };
        self.api
            .check_value(result, descriptor)
            .map_err(UsbError::Parse)
    }

    pub(crate) fn get_interface_descriptor(
        &self,
        device: DeviceId,
        interface: u8,
        alt_setting: u8,
        config: u8,
    ) -> UsbResult<InterfaceDescriptor> {
        trace!(
            "openusb_parse_interface_desc({}, config={}, interface={}, alt={})",
            device,
            config,
            interface,
            alt_setting
        );

        let mut descriptor = InterfaceDescriptor::default();
        let result = unsafe {
            (self.api.parse_interface_desc)(
                self.context.handle(),
                device.as_raw(),
                ptr::null_mut(),
                0,
                config,
                interface,
                alt_setting,
                &mut descriptor,
            )
        };
        self.api
            .check_value(result, descriptor)
            .map_err(UsbError::Parse)
    }

    pub(crate) fn get_endpoint_descriptor(
        &self,
        device: DeviceId,
        endpoint: u8,
        interface: u8,
        alt_setting: u8,
        config: u8,
    ) -> UsbResult<EndpointDescriptor> {
        trace!(
            "openusb_parse_endpoint_desc({}, config={}, interface={}, alt={}, endpoint={})",
            device,
            config,
            interface,
            alt_setting,
            endpoint
        );

        let mut descriptor = EndpointDescriptor::default();
        let result = unsafe {
            (self.api.parse_endpoint_desc)(
                self.context.handle(),
                device.as_raw(),
                ptr::null_mut(),
                0,
                config,
                interface,
                alt_setting,
                endpoint,
                &mut descriptor,
            )
        };
        self.api
            .check_value(result, descriptor)
            .map_err(UsbError::Parse)
    }
}
