// A stand in for libopenusb, so the crate can be exercised without hardware or the library
// installed. State is per thread, and the test harness gives every test its own thread, so tests
// can't see each other's devices.
use crate::backend::OpenUsbBackend;
use crate::config::BackendConfig;
use crate::ffi::{
    status, BulkRequest, CtrlRequest, CtrlSetup, IntrRequest, IsocRequest, NativeApi, RawBusId,
    RawDevHandle, RawDevId, RawHandle, RequestResult,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{c_char, c_int};
use std::ptr;
use usb_backend_types::descriptors::{
    DESCRIPTOR_TYPE_CONFIGURATION, DESCRIPTOR_TYPE_DEVICE, DESCRIPTOR_TYPE_ENDPOINT,
    DESCRIPTOR_TYPE_INTERFACE,
};
use usb_backend_types::{
    ConfigurationDescriptor, DeviceDescriptor, EndpointDescriptor, InterfaceDescriptor,
    TransferType,
};

pub const CONTEXT_HANDLE: RawHandle = 0x0c0f_fee0;
pub const VENDOR_ID: u16 = 0x1220;

const HANDLE_BASE: RawDevHandle = 0xd000;

#[derive(Clone, Debug, Default)]
pub struct ListCounts {
    pub bus_allocated: usize,
    pub bus_freed: usize,
    pub device_allocated: usize,
    pub device_freed: usize,
    pub bad_frees: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ListKind {
    Bus,
    Device,
}

#[derive(Clone, Debug)]
pub struct SeenTransfer {
    pub transfer_type: TransferType,
    pub handle: RawDevHandle,
    pub interface: u8,
    pub endpoint: u8,
    pub length: u32,
    pub timeout: u32,

    /// Whether flags, result and the next link all arrived cleared.
    pub zeroed: bool,
}

#[derive(Default)]
pub struct MockState {
    // Context
    pub init_status: i32,
    pub init_calls: usize,
    pub init_flags: Option<u32>,
    pub fini_calls: Vec<RawHandle>,

    // Enumeration
    pub buses: Vec<(RawBusId, Vec<RawDevId>)>,
    pub bus_list_status: i32,
    pub failing_bus: Option<RawBusId>,
    pub lists: ListCounts,
    pub live_lists: HashMap<usize, (ListKind, usize)>,

    // Descriptors
    pub parse_calls: usize,
    pub last_parse: Option<(RawDevId, Vec<u8>)>,

    // Sessions
    pub opened: Vec<(RawDevId, RawDevHandle)>,
    pub closed: Vec<RawDevHandle>,
    pub close_status: i32,
    pub config_status: i32,
    pub configuration: u8,
    pub claimed: Vec<(u8, i32)>,
    pub alt_settings: Vec<(u8, u8)>,
    pub released: Vec<u8>,
    pub resets: usize,

    // Transfers
    pub transfer_status: i32,
    pub result_status: i32,
    pub short_by: u32,
    pub loopback: Vec<u8>,
    pub control_response: Vec<u8>,
    pub control_written: Vec<u8>,
    pub last_setup: Option<CtrlSetup>,
    pub last_transfer: Option<SeenTransfer>,
}

impl MockState {
    pub fn add_bus(&mut self, bus: RawBusId, devices: &[RawDevId]) {
        self.buses.push((bus, devices.to_vec()));
    }

    fn knows(&self, device: RawDevId) -> bool {
        self.buses
            .iter()
            .any(|(_, devices)| devices.contains(&device))
    }

    fn allocate(&mut self, kind: ListKind, items: &[u64]) -> *mut u64 {
        let list: Box<[u64]> = items.to_vec().into_boxed_slice();
        let length = list.len();
        let pointer = Box::into_raw(list) as *mut u64;

        self.live_lists.insert(pointer as usize, (kind, length));
        match kind {
            ListKind::Bus => self.lists.bus_allocated += 1,
            ListKind::Device => self.lists.device_allocated += 1,
        }
        pointer
    }

    fn free(&mut self, kind: ListKind, pointer: *mut u64) {
        match self.live_lists.remove(&(pointer as usize)) {
            Some((live_kind, length)) if live_kind == kind => {
                drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(pointer, length)) });
                match kind {
                    ListKind::Bus => self.lists.bus_freed += 1,
                    ListKind::Device => self.lists.device_freed += 1,
                }
            }
            Some(entry) => {
                // Handed to the wrong free call, put it back so it's still reported as live.
                self.live_lists.insert(pointer as usize, entry);
                self.lists.bad_frees += 1;
            }
            None => self.lists.bad_frees += 1,
        }
    }
}

thread_local! {
    static STATE: RefCell<MockState> = RefCell::new(MockState::default());
}

pub fn reset() {
    STATE.with(|state| *state.borrow_mut() = MockState::default());
}

pub fn with_state<R>(f: impl FnOnce(&mut MockState) -> R) -> R {
    STATE.with(|state| f(&mut state.borrow_mut()))
}

pub fn api() -> NativeApi {
    NativeApi {
        init: mock_init,
        fini: mock_fini,
        get_busid_list: mock_get_busid_list,
        free_busid_list: mock_free_busid_list,
        get_devids_by_bus: mock_get_devids_by_bus,
        free_devid_list: mock_free_devid_list,
        open_device: mock_open_device,
        close_device: mock_close_device,
        set_configuration: mock_set_configuration,
        get_configuration: mock_get_configuration,
        claim_interface: mock_claim_interface,
        release_interface: mock_release_interface,
        set_altsetting: mock_set_altsetting,
        reset: mock_reset,
        parse_device_desc: mock_parse_device_desc,
        parse_config_desc: mock_parse_config_desc,
        parse_interface_desc: mock_parse_interface_desc,
        parse_endpoint_desc: mock_parse_endpoint_desc,
        strerror: mock_strerror,
        ctrl_xfer: mock_ctrl_xfer,
        intr_xfer: mock_intr_xfer,
        bulk_xfer: mock_bulk_xfer,
        isoc_xfer: mock_isoc_xfer,
        library: None,
    }
}

/// A fresh backend over a clean mock with default settings.
pub fn backend() -> OpenUsbBackend {
    backend_with(BackendConfig::default())
}

pub fn backend_with(config: BackendConfig) -> OpenUsbBackend {
    reset();
    OpenUsbBackend::with_api(api(), config).expect("Mock backend failed to start")
}

unsafe extern "C" fn mock_init(flags: u32, handle: *mut RawHandle) -> i32 {
    with_state(|state| {
        state.init_calls += 1;
        state.init_flags = Some(flags);
        if state.init_status != status::SUCCESS {
            return state.init_status;
        }
        *handle = CONTEXT_HANDLE;
        status::SUCCESS
    })
}

unsafe extern "C" fn mock_fini(handle: RawHandle) {
    with_state(|state| state.fini_calls.push(handle));
}

unsafe extern "C" fn mock_get_busid_list(
    _handle: RawHandle,
    list: *mut *mut RawBusId,
    count: *mut u32,
) -> i32 {
    with_state(|state| {
        if state.bus_list_status != status::SUCCESS {
            return state.bus_list_status;
        }
        if state.buses.is_empty() {
            return status::NULL_LIST;
        }

        let buses: Vec<RawBusId> = state.buses.iter().map(|(bus, _)| *bus).collect();
        *list = state.allocate(ListKind::Bus, &buses);
        *count = buses.len() as u32;
        status::SUCCESS
    })
}

unsafe extern "C" fn mock_free_busid_list(list: *mut RawBusId) {
    with_state(|state| state.free(ListKind::Bus, list));
}

unsafe extern "C" fn mock_get_devids_by_bus(
    _handle: RawHandle,
    bus: RawBusId,
    list: *mut *mut RawDevId,
    count: *mut u32,
) -> i32 {
    with_state(|state| {
        if state.failing_bus == Some(bus) {
            return status::PLATFORM_FAILURE;
        }

        let Some((_, devices)) = state.buses.iter().find(|(id, _)| *id == bus) else {
            return status::BADARG;
        };
        if devices.is_empty() {
            return status::NULL_LIST;
        }

        let devices = devices.clone();
        *list = state.allocate(ListKind::Device, &devices);
        *count = devices.len() as u32;
        status::SUCCESS
    })
}

unsafe extern "C" fn mock_free_devid_list(list: *mut RawDevId) {
    with_state(|state| state.free(ListKind::Device, list));
}

unsafe extern "C" fn mock_open_device(
    _handle: RawHandle,
    device: RawDevId,
    _flags: u32,
    out: *mut RawDevHandle,
) -> i32 {
    with_state(|state| {
        if !state.knows(device) {
            return status::UNKNOWN_DEVICE;
        }

        let handle = HANDLE_BASE + state.opened.len() as RawDevHandle;
        state.opened.push((device, handle));
        *out = handle;
        status::SUCCESS
    })
}

unsafe extern "C" fn mock_close_device(handle: RawDevHandle) -> i32 {
    with_state(|state| {
        state.closed.push(handle);
        state.close_status
    })
}

unsafe extern "C" fn mock_set_configuration(_handle: RawDevHandle, config: u8) -> i32 {
    with_state(|state| {
        if state.config_status != status::SUCCESS {
            return state.config_status;
        }
        state.configuration = config;
        status::SUCCESS
    })
}

unsafe extern "C" fn mock_get_configuration(_handle: RawDevHandle, config: *mut u8) -> i32 {
    with_state(|state| {
        if state.config_status != status::SUCCESS {
            return state.config_status;
        }
        *config = state.configuration;
        status::SUCCESS
    })
}

unsafe extern "C" fn mock_claim_interface(
    _handle: RawDevHandle,
    interface: u8,
    flags: c_int,
) -> i32 {
    with_state(|state| {
        if state.config_status != status::SUCCESS {
            return state.config_status;
        }
        state.claimed.push((interface, flags));
        status::SUCCESS
    })
}

unsafe extern "C" fn mock_release_interface(_handle: RawDevHandle, interface: u8) -> i32 {
    with_state(|state| {
        if state.config_status != status::SUCCESS {
            return state.config_status;
        }
        state.released.push(interface);
        status::SUCCESS
    })
}

unsafe extern "C" fn mock_set_altsetting(_handle: RawDevHandle, interface: u8, alt: u8) -> i32 {
    with_state(|state| {
        if state.config_status != status::SUCCESS {
            return state.config_status;
        }
        state.alt_settings.push((interface, alt));
        status::SUCCESS
    })
}

unsafe extern "C" fn mock_reset(_handle: RawDevHandle) -> i32 {
    with_state(|state| {
        if state.config_status != status::SUCCESS {
            return state.config_status;
        }
        state.resets += 1;
        status::SUCCESS
    })
}

fn parse(device: RawDevId, indices: &[u8]) -> i32 {
    with_state(|state| {
        state.parse_calls += 1;
        if !state.knows(device) {
            return status::UNKNOWN_DEVICE;
        }
        state.last_parse = Some((device, indices.to_vec()));
        status::SUCCESS
    })
}

unsafe extern "C" fn mock_parse_device_desc(
    _handle: RawHandle,
    device: RawDevId,
    _buffer: *mut u8,
    _length: u16,
    out: *mut DeviceDescriptor,
) -> i32 {
    let result = parse(device, &[]);
    if result == status::SUCCESS {
        *out = DeviceDescriptor {
            length: 18,
            descriptor_type: DESCRIPTOR_TYPE_DEVICE,
            usb_version: 0x0200,
            max_packet_size0: 64,
            vendor_id: VENDOR_ID,
            product_id: device as u16,
            device_version: 0x0100,
            num_configurations: 1,
            ..DeviceDescriptor::default()
        };
    }
    result
}

unsafe extern "C" fn mock_parse_config_desc(
    _handle: RawHandle,
    device: RawDevId,
    _buffer: *mut u8,
    _length: u16,
    config: u8,
    out: *mut ConfigurationDescriptor,
) -> i32 {
    let result = parse(device, &[config]);
    if result == status::SUCCESS {
        *out = ConfigurationDescriptor {
            length: 9,
            descriptor_type: DESCRIPTOR_TYPE_CONFIGURATION,
            total_length: 32,
            num_interfaces: 1,
            configuration_value: config + 1,
            attributes: 0x80,
            max_power: 50,
            ..ConfigurationDescriptor::default()
        };
    }
    result
}

unsafe extern "C" fn mock_parse_interface_desc(
    _handle: RawHandle,
    device: RawDevId,
    _buffer: *mut u8,
    _length: u16,
    config: u8,
    interface: u8,
    alt: u8,
    out: *mut InterfaceDescriptor,
) -> i32 {
    let result = parse(device, &[config, interface, alt]);
    if result == status::SUCCESS {
        *out = InterfaceDescriptor {
            length: 9,
            descriptor_type: DESCRIPTOR_TYPE_INTERFACE,
            interface_number: interface,
            alternate_setting: alt,
            num_endpoints: 2,
            interface_class: 0xff,
            ..InterfaceDescriptor::default()
        };
    }
    result
}

unsafe extern "C" fn mock_parse_endpoint_desc(
    _handle: RawHandle,
    device: RawDevId,
    _buffer: *mut u8,
    _length: u16,
    config: u8,
    interface: u8,
    alt: u8,
    endpoint: u8,
    out: *mut EndpointDescriptor,
) -> i32 {
    let result = parse(device, &[config, interface, alt, endpoint]);
    if result == status::SUCCESS {
        *out = EndpointDescriptor {
            length: 7,
            descriptor_type: DESCRIPTOR_TYPE_ENDPOINT,
            endpoint_address: 0x80 | endpoint,
            attributes: 0x02,
            max_packet_size: 512,
            ..EndpointDescriptor::default()
        };
    }
    result
}

unsafe extern "C" fn mock_strerror(code: i32) -> *const c_char {
    let message = match code {
        status::SUCCESS => c"Success",
        status::PLATFORM_FAILURE => c"Platform failure",
        status::NO_RESOURCES => c"No resources",
        status::NOT_SUPPORTED => c"Not supported",
        status::BUSY => c"Resource busy",
        status::BADARG => c"Invalid argument",
        status::NOACCESS => c"Access denied",
        status::PARSE_ERROR => c"Parse error",
        status::UNKNOWN_DEVICE => c"Unknown device",
        status::INVALID_HANDLE => c"Invalid handle",
        status::NULL_LIST => c"Empty list",
        status::IO_STALL => c"I/O stall",
        status::IO_TIMEOUT => c"I/O timeout",
        status::IO_CANCELED => c"I/O canceled",
        _ => return ptr::null(),
    };
    message.as_ptr()
}

struct Exchange {
    transfer_type: TransferType,
    handle: RawDevHandle,
    interface: u8,
    endpoint: u8,
    payload: *mut u8,
    length: u32,
    timeout: u32,
    zeroed: bool,
    reading: bool,
}

/// Runs one fake transfer. Writes land in the loopback buffer (or the control log), reads are
/// served from it. Returns the call status, and fills `result` the way the library would.
unsafe fn exchange(request: Exchange, result: &mut RequestResult) -> i32 {
    with_state(|state| {
        state.last_transfer = Some(SeenTransfer {
            transfer_type: request.transfer_type,
            handle: request.handle,
            interface: request.interface,
            endpoint: request.endpoint,
            length: request.length,
            timeout: request.timeout,
            zeroed: request.zeroed,
        });

        if state.transfer_status != status::SUCCESS {
            return state.transfer_status;
        }
        if state.result_status != status::SUCCESS {
            result.status = state.result_status;
            result.transferred_bytes = 0;
            return status::SUCCESS;
        }

        let control = request.transfer_type == TransferType::Control;
        let length = request.length as usize;

        let moved = if request.reading {
            let source = if control {
                &state.control_response
            } else {
                &state.loopback
            };
            let moved = length.min(source.len()).saturating_sub(state.short_by as usize);
            ptr::copy_nonoverlapping(source.as_ptr(), request.payload, moved);
            moved
        } else {
            let moved = length.saturating_sub(state.short_by as usize);
            let written = std::slice::from_raw_parts(request.payload, moved).to_vec();
            if control {
                state.control_written = written;
            } else {
                state.loopback = written;
            }
            moved
        };

        result.status = status::SUCCESS;
        result.transferred_bytes = moved as u32;
        status::SUCCESS
    })
}

fn is_cleared(flags: u32, result: &RequestResult, next: *mut std::ffi::c_void) -> bool {
    flags == 0 && *result == RequestResult::default() && next.is_null()
}

unsafe extern "C" fn mock_ctrl_xfer(
    handle: RawDevHandle,
    interface: u8,
    endpoint: u8,
    request: *mut CtrlRequest,
) -> i32 {
    let request = &mut *request;
    with_state(|state| state.last_setup = Some(request.setup));

    let exchange_request = Exchange {
        transfer_type: TransferType::Control,
        handle,
        interface,
        endpoint,
        payload: request.payload,
        length: request.length,
        timeout: request.timeout,
        zeroed: is_cleared(request.flags, &request.result, request.next),
        reading: request.setup.request_type & 0x80 != 0,
    };
    exchange(exchange_request, &mut request.result)
}

unsafe extern "C" fn mock_intr_xfer(
    handle: RawDevHandle,
    interface: u8,
    endpoint: u8,
    request: *mut IntrRequest,
) -> i32 {
    let request = &mut *request;
    let exchange_request = Exchange {
        transfer_type: TransferType::Interrupt,
        handle,
        interface,
        endpoint,
        payload: request.payload,
        length: request.length,
        timeout: request.timeout,
        zeroed: request.interval == 0 && is_cleared(request.flags, &request.result, request.next),
        reading: endpoint & 0x80 != 0,
    };
    exchange(exchange_request, &mut request.result)
}

unsafe extern "C" fn mock_bulk_xfer(
    handle: RawDevHandle,
    interface: u8,
    endpoint: u8,
    request: *mut BulkRequest,
) -> i32 {
    let request = &mut *request;
    let exchange_request = Exchange {
        transfer_type: TransferType::Bulk,
        handle,
        interface,
        endpoint,
        payload: request.payload,
        length: request.length,
        timeout: request.timeout,
        zeroed: is_cleared(request.flags, &request.result, request.next),
        reading: endpoint & 0x80 != 0,
    };
    exchange(exchange_request, &mut request.result)
}

unsafe extern "C" fn mock_isoc_xfer(
    _handle: RawDevHandle,
    _interface: u8,
    _endpoint: u8,
    _request: *mut IsocRequest,
) -> i32 {
    status::NOT_SUPPORTED
}
