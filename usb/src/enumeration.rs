// OpenUSB hands out bus and device lists which it allocated itself, and expects them handed back
// to the matching free call. NativeList owns one of those for as long as it's being walked, and
// gives it back the moment it runs dry (or when dropped, if iteration stops early).
use crate::backend::Runtime;
use crate::ffi::{RawBusId, RawDevId};
use log::trace;
use std::marker::PhantomData;
use std::ptr;
use usb_backend_types::{BusId, DeviceId, UsbError, UsbResult};

type FreeList<T> = unsafe extern "C" fn(*mut T);

pub(crate) struct NativeList<'a, T: Copy> {
    items: *mut T,
    count: usize,
    position: usize,
    free: FreeList<T>,

    // The list must not outlive the library which allocated it.
    _runtime: PhantomData<&'a Runtime>,
}

impl<'a, T: Copy> NativeList<'a, T> {
    fn new(items: *mut T, count: u32, free: FreeList<T>) -> Self {
        Self {
            items,
            count: if items.is_null() { 0 } else { count as usize },
            position: 0,
            free,
            _runtime: PhantomData,
        }
    }

    fn next_item(&mut self) -> Option<T> {
        if self.position >= self.count {
            return None;
        }

        // SAFETY: The library gave us `count` entries at `items`, and the pointer is only cleared
        // (with count zeroed) on release.
        let item = unsafe { *self.items.add(self.position) };
        self.position += 1;
        Some(item)
    }

    /// Hands the list back to the library. Safe to call more than once, only the first call frees.
    fn release(&mut self) {
        if self.items.is_null() {
            return;
        }

        unsafe { (self.free)(self.items) };
        self.items = ptr::null_mut();
        self.count = 0;
        self.position = 0;
    }
}

impl<T: Copy> Drop for NativeList<'_, T> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Every device on every bus, walked lazily. Each bus' device list is only fetched when
/// iteration reaches that bus.
pub(crate) struct Devices<'a> {
    runtime: &'a Runtime,
    buses: NativeList<'a, RawBusId>,
    devices: Option<NativeList<'a, RawDevId>>,
    finished: bool,
}

impl Devices<'_> {
    fn finish(&mut self) {
        if let Some(mut devices) = self.devices.take() {
            devices.release();
        }
        self.buses.release();
        self.finished = true;
    }
}

impl Iterator for Devices<'_> {
    type Item = UsbResult<DeviceId>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            if let Some(devices) = &mut self.devices {
                if let Some(device) = devices.next_item() {
                    return Some(Ok(DeviceId::from_raw(device)));
                }

                // This bus is done with, give the list back before moving on.
                devices.release();
                self.devices = None;
            }

            let Some(bus) = self.buses.next_item() else {
                self.finish();
                return None;
            };

            match self.runtime.device_list(BusId::from_raw(bus)) {
                Ok(devices) => self.devices = Some(devices),
                Err(error) => {
                    self.finish();
                    return Some(Err(error));
                }
            }
        }
    }
}

impl Runtime {
    pub(crate) fn bus_list(&self) -> UsbResult<NativeList<'_, RawBusId>> {
        let free = self.api.free_busid_list;
        let mut items: *mut RawBusId = ptr::null_mut();
        let mut count: u32 = 0;

        trace!("openusb_get_busid_list({:#x})", self.context.handle());
        let result =
            unsafe { (self.api.get_busid_list)(self.context.handle(), &mut items, &mut count) };

        // Anything allocated alongside a failure still needs handing back.
        let list = NativeList::new(items, count, free);
        self.api.check(result).map_err(UsbError::Enumeration)?;
        Ok(list)
    }

    pub(crate) fn device_list(&self, bus: BusId) -> UsbResult<NativeList<'_, RawDevId>> {
        let free = self.api.free_devid_list;
        let mut items: *mut RawDevId = ptr::null_mut();
        let mut count: u32 = 0;

        trace!("openusb_get_devids_by_bus({:#x}, {})", self.context.handle(), bus);
        let result = unsafe {
            (self.api.get_devids_by_bus)(
                self.context.handle(),
                bus.as_raw(),
                &mut items,
                &mut count,
            )
        };

        let list = NativeList::new(items, count, free);
        self.api.check(result).map_err(UsbError::Enumeration)?;
        Ok(list)
    }

    pub(crate) fn enumerate_devices(&self) -> UsbResult<Devices<'_>> {
        Ok(Devices {
            runtime: self,
            buses: self.bus_list()?,
            devices: None,
            finished: false,
        })
    }
}
