use std::time::Duration;
use strum::{Display, EnumIter};

// Bit 7 of bmRequestType / bEndpointAddress
const DIRECTION_MASK: u8 = 0x80;
const TRANSFER_TYPE_MASK: u8 = 0x03;

#[derive(Copy, Clone, Debug, Display, EnumIter, PartialEq, Eq)]
pub enum Direction {
    /// Host to device
    Out,
    /// Device to host
    In,
}

impl Direction {
    /// Reads the direction bit out of a control request's bmRequestType, or an endpoint address.
    pub fn from_bits(bits: u8) -> Self {
        if bits & DIRECTION_MASK == 0 {
            Direction::Out
        } else {
            Direction::In
        }
    }
}

#[derive(Copy, Clone, Debug, Display, EnumIter, PartialEq, Eq)]
pub enum TransferType {
    Control = 0x00,
    Isochronous = 0x01,
    Bulk = 0x02,
    Interrupt = 0x03,
}

impl TransferType {
    /// Reads the transfer type out of an endpoint's bmAttributes.
    pub fn from_attributes(attributes: u8) -> Self {
        match attributes & TRANSFER_TYPE_MASK {
            0x00 => TransferType::Control,
            0x01 => TransferType::Isochronous,
            0x02 => TransferType::Bulk,
            _ => TransferType::Interrupt,
        }
    }
}

/// A transfer timeout in the native library's unit (milliseconds).
///
/// The value is handed to the library untouched, so `Timeout::NONE` keeps whatever meaning the
/// library gives a zero timeout (wait forever).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timeout(u32);

impl Timeout {
    pub const NONE: Timeout = Timeout(0);

    pub const fn from_millis(millis: u32) -> Self {
        Self(millis)
    }

    pub const fn as_millis(&self) -> u32 {
        self.0
    }

    pub const fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        if duration.is_zero() {
            return Timeout::NONE;
        }

        // A tiny, but non-zero, duration must not turn into 'no timeout'.
        let millis = duration.as_millis().clamp(1, u32::MAX as u128);
        Timeout(millis as u32)
    }
}

/// The setup stage of a control transfer, wLength is taken from the payload.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ControlSetup {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
}

impl ControlSetup {
    pub fn new(request_type: u8, request: u8, value: u16, index: u16) -> Self {
        Self {
            request_type,
            request,
            value,
            index,
        }
    }

    pub fn direction(&self) -> Direction {
        Direction::from_bits(self.request_type)
    }
}

/// The data stage of a control transfer. Writes borrow the caller's buffer for the length of
/// the call, reads only say how much to ask for (wLength).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ControlPayload<'a> {
    Write(&'a [u8]),
    Read(u16),
}

impl ControlPayload<'_> {
    pub fn direction(&self) -> Direction {
        match self {
            ControlPayload::Write(_) => Direction::Out,
            ControlPayload::Read(_) => Direction::In,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlOutcome {
    /// Number of bytes the device accepted
    Written(usize),
    /// Bytes returned by the device, never longer than the requested wLength
    Read(Vec<u8>),
}
