// Identifiers handed out by a native USB library. These are opaque, a backend wraps whatever
// value the library returned and hands it straight back on the next call. Nothing outside a
// backend should ever need to build one.
use std::fmt::{Display, Formatter};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BusId(u64);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(u64);

/// An open session on a device, valid from `open_device` until `close_device`.
///
/// Using a handle after it has been closed is a caller error, backends do not track it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceHandle(u64);

macro_rules! native_id {
    ($name:ident) => {
        impl $name {
            /// Wraps a value issued by the native library.
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn as_raw(&self) -> u64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }
    };
}

native_id!(BusId);
native_id!(DeviceId);
native_id!(DeviceHandle);
