// These records are shared with native libraries, which fill them in directly, so the field
// order and widths here *are* the ABI. Don't reorder, don't change widths, and don't add fields.
use crate::error::UsbError;
use crate::transfer::{Direction, TransferType};
use byteorder::{ByteOrder, LittleEndian};

pub const DESCRIPTOR_TYPE_DEVICE: u8 = 0x01;
pub const DESCRIPTOR_TYPE_CONFIGURATION: u8 = 0x02;
pub const DESCRIPTOR_TYPE_STRING: u8 = 0x03;
pub const DESCRIPTOR_TYPE_INTERFACE: u8 = 0x04;
pub const DESCRIPTOR_TYPE_ENDPOINT: u8 = 0x05;

// Lengths of the standard wire forms
pub const DEVICE_DESCRIPTOR_LENGTH: usize = 18;
pub const CONFIGURATION_DESCRIPTOR_LENGTH: usize = 9;
pub const INTERFACE_DESCRIPTOR_LENGTH: usize = 9;
pub const ENDPOINT_DESCRIPTOR_LENGTH: usize = 7;
pub const AUDIO_ENDPOINT_DESCRIPTOR_LENGTH: usize = 9;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub usb_version: u16,
    pub device_class: u8,
    pub device_subclass: u8,
    pub device_protocol: u8,
    pub max_packet_size0: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub device_version: u16,
    pub manufacturer_index: u8,
    pub product_index: u8,
    pub serial_number_index: u8,
    pub num_configurations: u8,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigurationDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub total_length: u16,
    pub num_interfaces: u8,
    pub configuration_value: u8,
    pub configuration_index: u8,
    pub attributes: u8,
    pub max_power: u8,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub interface_number: u8,
    pub alternate_setting: u8,
    pub num_endpoints: u8,
    pub interface_class: u8,
    pub interface_subclass: u8,
    pub interface_protocol: u8,
    pub interface_index: u8,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub endpoint_address: u8,
    pub attributes: u8,
    pub max_packet_size: u16,
    pub interval: u8,
    pub refresh: u8,
    pub synch_address: u8,
}

fn check_header(
    data: &[u8],
    minimum: usize,
    expected_type: u8,
    name: &str,
) -> Result<(), UsbError> {
    if data.len() < minimum {
        return Err(UsbError::MalformedDescriptor(format!(
            "{} descriptor needs {} bytes, got {}",
            name,
            minimum,
            data.len()
        )));
    }

    if (data[0] as usize) < minimum {
        return Err(UsbError::MalformedDescriptor(format!(
            "{} descriptor reports a length of {}, expected at least {}",
            name, data[0], minimum
        )));
    }

    if data[1] != expected_type {
        return Err(UsbError::MalformedDescriptor(format!(
            "Expected {} descriptor type {:#04x}, got {:#04x}",
            name, expected_type, data[1]
        )));
    }
    Ok(())
}

impl DeviceDescriptor {
    /// Decodes a device descriptor as it appears on the wire.
    pub fn from_bytes(data: &[u8]) -> Result<Self, UsbError> {
        check_header(data, DEVICE_DESCRIPTOR_LENGTH, DESCRIPTOR_TYPE_DEVICE, "Device")?;

        Ok(Self {
            length: data[0],
            descriptor_type: data[1],
            usb_version: LittleEndian::read_u16(&data[2..4]),
            device_class: data[4],
            device_subclass: data[5],
            device_protocol: data[6],
            max_packet_size0: data[7],
            vendor_id: LittleEndian::read_u16(&data[8..10]),
            product_id: LittleEndian::read_u16(&data[10..12]),
            device_version: LittleEndian::read_u16(&data[12..14]),
            manufacturer_index: data[14],
            product_index: data[15],
            serial_number_index: data[16],
            num_configurations: data[17],
        })
    }
}

impl ConfigurationDescriptor {
    pub fn from_bytes(data: &[u8]) -> Result<Self, UsbError> {
        check_header(
            data,
            CONFIGURATION_DESCRIPTOR_LENGTH,
            DESCRIPTOR_TYPE_CONFIGURATION,
            "Configuration",
        )?;

        Ok(Self {
            length: data[0],
            descriptor_type: data[1],
            total_length: LittleEndian::read_u16(&data[2..4]),
            num_interfaces: data[4],
            configuration_value: data[5],
            configuration_index: data[6],
            attributes: data[7],
            max_power: data[8],
        })
    }

    pub fn self_powered(&self) -> bool {
        self.attributes & 0x40 != 0
    }

    pub fn remote_wakeup(&self) -> bool {
        self.attributes & 0x20 != 0
    }
}

impl InterfaceDescriptor {
    pub fn from_bytes(data: &[u8]) -> Result<Self, UsbError> {
        check_header(
            data,
            INTERFACE_DESCRIPTOR_LENGTH,
            DESCRIPTOR_TYPE_INTERFACE,
            "Interface",
        )?;

        Ok(Self {
            length: data[0],
            descriptor_type: data[1],
            interface_number: data[2],
            alternate_setting: data[3],
            num_endpoints: data[4],
            interface_class: data[5],
            interface_subclass: data[6],
            interface_protocol: data[7],
            interface_index: data[8],
        })
    }
}

impl EndpointDescriptor {
    /// Decodes an endpoint descriptor. bRefresh and bSynchAddress only exist on the 9 byte audio
    /// variant, and are left at zero otherwise.
    pub fn from_bytes(data: &[u8]) -> Result<Self, UsbError> {
        check_header(
            data,
            ENDPOINT_DESCRIPTOR_LENGTH,
            DESCRIPTOR_TYPE_ENDPOINT,
            "Endpoint",
        )?;

        let extended = data[0] as usize >= AUDIO_ENDPOINT_DESCRIPTOR_LENGTH
            && data.len() >= AUDIO_ENDPOINT_DESCRIPTOR_LENGTH;

        Ok(Self {
            length: data[0],
            descriptor_type: data[1],
            endpoint_address: data[2],
            attributes: data[3],
            max_packet_size: LittleEndian::read_u16(&data[4..6]),
            interval: data[6],
            refresh: if extended { data[7] } else { 0 },
            synch_address: if extended { data[8] } else { 0 },
        })
    }

    pub fn number(&self) -> u8 {
        self.endpoint_address & 0x0f
    }

    pub fn direction(&self) -> Direction {
        Direction::from_bits(self.endpoint_address)
    }

    pub fn transfer_type(&self) -> TransferType {
        TransferType::from_attributes(self.attributes)
    }
}
