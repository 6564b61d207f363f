// Raw bindings to the OpenUSB C API. Everything in here is a 1:1 mirror of openusb.h, struct
// layouts and function signatures must match the library exactly, so resist the urge to tidy
// anything up. Interpreting results is left to the rest of the crate.
use anyhow::{Context, Result};
use libloading::{Library, Symbol};
use std::ffi::{c_char, c_int, c_void};
use strum::{Display, EnumIter};
use usb_backend_types::{
    ConfigurationDescriptor, DeviceDescriptor, EndpointDescriptor, InterfaceDescriptor,
};

pub type RawHandle = u64;
pub type RawBusId = u64;
pub type RawDevId = u64;
pub type RawDevHandle = u64;

// Status codes from openusb.h, anything non-zero is a failure.
pub mod status {
    pub const SUCCESS: i32 = 0;
    pub const PLATFORM_FAILURE: i32 = -1;
    pub const NO_RESOURCES: i32 = -2;
    pub const NOT_SUPPORTED: i32 = -4;
    pub const BUSY: i32 = -7;
    pub const BADARG: i32 = -8;
    pub const NOACCESS: i32 = -9;
    pub const PARSE_ERROR: i32 = -10;
    pub const UNKNOWN_DEVICE: i32 = -11;
    pub const INVALID_HANDLE: i32 = -12;
    pub const NULL_LIST: i32 = -14;
    pub const IO_STALL: i32 = -50;
    pub const IO_TIMEOUT: i32 = -62;
    pub const IO_CANCELED: i32 = -63;
}

/// openusb_init_flag_t, used when claiming an interface.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Display, EnumIter, PartialEq, Eq)]
pub enum InitFlag {
    #[default]
    Default = 0,
    FailFast = 1,
    Reversible = 2,
    NonReversible = 3,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestResult {
    pub status: i32,
    pub transferred_bytes: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CtrlSetup {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
}

#[repr(C)]
#[derive(Debug)]
pub struct CtrlRequest {
    pub setup: CtrlSetup,
    pub payload: *mut u8,
    pub length: u32,
    pub timeout: u32,
    pub flags: u32,
    pub result: RequestResult,
    pub next: *mut c_void,
}

#[repr(C)]
#[derive(Debug)]
pub struct IntrRequest {
    pub interval: u16,
    pub payload: *mut u8,
    pub length: u32,
    pub timeout: u32,
    pub flags: u32,
    pub result: RequestResult,
    pub next: *mut c_void,
}

#[repr(C)]
#[derive(Debug)]
pub struct BulkRequest {
    pub payload: *mut u8,
    pub length: u32,
    pub timeout: u32,
    pub flags: u32,
    pub result: RequestResult,
    pub next: *mut c_void,
}

#[repr(C)]
#[derive(Debug)]
pub struct IsocPacket {
    pub payload: *mut u8,
    pub length: u32,
}

#[repr(C)]
#[derive(Debug)]
pub struct IsocPackets {
    pub num_packets: u32,
    pub packets: *mut IsocPacket,
}

// Declared for completeness, isochronous transfers are not implemented.
#[repr(C)]
#[derive(Debug)]
pub struct IsocRequest {
    pub start_frame: u32,
    pub flags: u32,
    pub pkts: IsocPackets,
    pub isoc_results: *mut RequestResult,
    pub isoc_status: i32,
    pub next: *mut c_void,
}

// The library looks at the whole request, so every field (including the reserved 'next' link)
// must start out zeroed, the same as a memset would leave it.
macro_rules! zeroed_request {
    ($($request:ident),*) => {
        $(
            impl Default for $request {
                fn default() -> Self {
                    // SAFETY: Every field is an integer, a raw pointer, or a struct of those, so
                    // the all-zero pattern is valid (and leaves the pointers null).
                    unsafe { std::mem::zeroed() }
                }
            }
        )*
    };
}

zeroed_request!(CtrlRequest, IntrRequest, BulkRequest, IsocRequest);

// Define the Types of the various methods..
pub type Init = unsafe extern "C" fn(u32, *mut RawHandle) -> i32;
pub type Fini = unsafe extern "C" fn(RawHandle);

pub type GetBusIdList = unsafe extern "C" fn(RawHandle, *mut *mut RawBusId, *mut u32) -> i32;
pub type FreeBusIdList = unsafe extern "C" fn(*mut RawBusId);
pub type GetDevIdsByBus =
    unsafe extern "C" fn(RawHandle, RawBusId, *mut *mut RawDevId, *mut u32) -> i32;
pub type FreeDevIdList = unsafe extern "C" fn(*mut RawDevId);

pub type OpenDevice = unsafe extern "C" fn(RawHandle, RawDevId, u32, *mut RawDevHandle) -> i32;
pub type CloseDevice = unsafe extern "C" fn(RawDevHandle) -> i32;
pub type SetConfiguration = unsafe extern "C" fn(RawDevHandle, u8) -> i32;
pub type GetConfiguration = unsafe extern "C" fn(RawDevHandle, *mut u8) -> i32;
pub type ClaimInterface = unsafe extern "C" fn(RawDevHandle, u8, c_int) -> i32;
pub type ReleaseInterface = unsafe extern "C" fn(RawDevHandle, u8) -> i32;
pub type SetAltSetting = unsafe extern "C" fn(RawDevHandle, u8, u8) -> i32;
pub type Reset = unsafe extern "C" fn(RawDevHandle) -> i32;

// (handle, devid, buffer, buflen, [cfgidx, [ifcidx, alt, [eptidx]]], out)
pub type ParseDeviceDesc =
    unsafe extern "C" fn(RawHandle, RawDevId, *mut u8, u16, *mut DeviceDescriptor) -> i32;
pub type ParseConfigDesc = unsafe extern "C" fn(
    RawHandle,
    RawDevId,
    *mut u8,
    u16,
    u8,
    *mut ConfigurationDescriptor,
) -> i32;
pub type ParseInterfaceDesc = unsafe extern "C" fn(
    RawHandle,
    RawDevId,
    *mut u8,
    u16,
    u8,
    u8,
    u8,
    *mut InterfaceDescriptor,
) -> i32;
pub type ParseEndpointDesc = unsafe extern "C" fn(
    RawHandle,
    RawDevId,
    *mut u8,
    u16,
    u8,
    u8,
    u8,
    u8,
    *mut EndpointDescriptor,
) -> i32;

pub type StrError = unsafe extern "C" fn(i32) -> *const c_char;

// (dev, ifc, ept, request)
pub type CtrlXfer = unsafe extern "C" fn(RawDevHandle, u8, u8, *mut CtrlRequest) -> i32;
pub type IntrXfer = unsafe extern "C" fn(RawDevHandle, u8, u8, *mut IntrRequest) -> i32;
pub type BulkXfer = unsafe extern "C" fn(RawDevHandle, u8, u8, *mut BulkRequest) -> i32;
pub type IsocXfer = unsafe extern "C" fn(RawDevHandle, u8, u8, *mut IsocRequest) -> i32;

/// The resolved OpenUSB function table.
///
/// When loaded from a shared library the library is held here too, so the pointers stay valid
/// for as long as this table exists.
pub struct NativeApi {
    pub(crate) init: Init,
    pub(crate) fini: Fini,

    // Enumeration
    pub(crate) get_busid_list: GetBusIdList,
    pub(crate) free_busid_list: FreeBusIdList,
    pub(crate) get_devids_by_bus: GetDevIdsByBus,
    pub(crate) free_devid_list: FreeDevIdList,

    // Session handling
    pub(crate) open_device: OpenDevice,
    pub(crate) close_device: CloseDevice,
    pub(crate) set_configuration: SetConfiguration,
    pub(crate) get_configuration: GetConfiguration,
    pub(crate) claim_interface: ClaimInterface,
    pub(crate) release_interface: ReleaseInterface,
    pub(crate) set_altsetting: SetAltSetting,
    pub(crate) reset: Reset,

    // Descriptors
    pub(crate) parse_device_desc: ParseDeviceDesc,
    pub(crate) parse_config_desc: ParseConfigDesc,
    pub(crate) parse_interface_desc: ParseInterfaceDesc,
    pub(crate) parse_endpoint_desc: ParseEndpointDesc,

    pub(crate) strerror: StrError,

    // Transfers
    pub(crate) ctrl_xfer: CtrlXfer,
    pub(crate) intr_xfer: IntrXfer,
    pub(crate) bulk_xfer: BulkXfer,
    #[allow(dead_code)]
    pub(crate) isoc_xfer: IsocXfer,

    pub(crate) library: Option<Library>,
}

fn symbol<T: Copy>(library: &Library, name: &str) -> Result<T> {
    let symbol: Symbol<T> = unsafe { library.get(name.as_bytes()) }
        .with_context(|| format!("Unable to find {} in the OpenUSB library", name))?;
    Ok(*symbol)
}

impl NativeApi {
    pub fn from_library(library: Library) -> Result<Self> {
        Ok(Self {
            init: symbol(&library, "openusb_init")?,
            fini: symbol(&library, "openusb_fini")?,

            get_busid_list: symbol(&library, "openusb_get_busid_list")?,
            free_busid_list: symbol(&library, "openusb_free_busid_list")?,
            get_devids_by_bus: symbol(&library, "openusb_get_devids_by_bus")?,
            free_devid_list: symbol(&library, "openusb_free_devid_list")?,

            open_device: symbol(&library, "openusb_open_device")?,
            close_device: symbol(&library, "openusb_close_device")?,
            set_configuration: symbol(&library, "openusb_set_configuration")?,
            get_configuration: symbol(&library, "openusb_get_configuration")?,
            claim_interface: symbol(&library, "openusb_claim_interface")?,
            release_interface: symbol(&library, "openusb_release_interface")?,
            set_altsetting: symbol(&library, "openusb_set_altsetting")?,
            reset: symbol(&library, "openusb_reset")?,

            parse_device_desc: symbol(&library, "openusb_parse_device_desc")?,
            parse_config_desc: symbol(&library, "openusb_parse_config_desc")?,
            parse_interface_desc: symbol(&library, "openusb_parse_interface_desc")?,
            parse_endpoint_desc: symbol(&library, "openusb_parse_endpoint_desc")?,

            strerror: symbol(&library, "openusb_strerror")?,

            ctrl_xfer: symbol(&library, "openusb_ctrl_xfer")?,
            intr_xfer: symbol(&library, "openusb_intr_xfer")?,
            bulk_xfer: symbol(&library, "openusb_bulk_xfer")?,
            isoc_xfer: symbol(&library, "openusb_isoc_xfer")?,

            library: Some(library),
        })
    }

    /// True when the table came from a loaded shared library rather than being assembled by hand.
    pub fn is_loaded(&self) -> bool {
        self.library.is_some()
    }
}
