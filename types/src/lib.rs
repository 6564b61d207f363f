pub mod backend;
pub mod descriptors;
pub mod error;
pub mod ids;
pub mod transfer;

pub use backend::{DeviceIterator, UsbBackend};
pub use descriptors::{
    ConfigurationDescriptor, DeviceDescriptor, EndpointDescriptor, InterfaceDescriptor,
};
pub use error::{NativeError, UsbError, UsbResult};
pub use ids::{BusId, DeviceHandle, DeviceId};
pub use transfer::{ControlOutcome, ControlPayload, ControlSetup, Direction, Timeout, TransferType};
