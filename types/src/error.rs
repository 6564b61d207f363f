use crate::transfer::TransferType;

pub type UsbResult<T> = Result<T, UsbError>;

/// A failure reported by the native library: the raw status, and the library's own description
/// of it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (status {status})")]
pub struct NativeError {
    pub status: i32,
    pub message: String,
}

impl NativeError {
    pub fn new(status: i32, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UsbError {
    #[error("USB library could not be found: {0}")]
    LibraryNotFound(String),

    #[error("Unable to initialise USB library: {0}")]
    Init(NativeError),

    #[error("Unable to enumerate devices: {0}")]
    Enumeration(NativeError),

    #[error("Unable to parse descriptor: {0}")]
    Parse(NativeError),

    #[error("Unable to open device: {0}")]
    Open(NativeError),

    #[error("Unable to configure device: {0}")]
    Configuration(NativeError),

    #[error("Transfer failed: {0}")]
    Transfer(NativeError),

    #[error("{0} transfers are not supported by this backend")]
    Unsupported(TransferType),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Malformed descriptor: {0}")]
    MalformedDescriptor(String),
}

impl UsbError {
    /// The native error behind this failure, if the library reported one.
    pub fn native(&self) -> Option<&NativeError> {
        match self {
            UsbError::Init(error)
            | UsbError::Enumeration(error)
            | UsbError::Parse(error)
            | UsbError::Open(error)
            | UsbError::Configuration(error)
            | UsbError::Transfer(error) => Some(error),
            _ => None,
        }
    }
}
