use crate::ffi::{Fini, NativeApi, RawHandle};
use log::debug;
use usb_backend_types::UsbError;

/// An initialised OpenUSB session. Dropping it finalises the session.
pub(crate) struct Context {
    handle: RawHandle,
    fini: Fini,
}

impl Context {
    pub(crate) fn init(api: &NativeApi, flags: u32) -> Result<Self, UsbError> {
        let mut handle: RawHandle = 0;
        let result = unsafe { (api.init)(flags, &mut handle) };
        api.check(result).map_err(UsbError::Init)?;

        debug!("OpenUSB context {:#x} initialised", handle);
        Ok(Self {
            handle,
            fini: api.fini,
        })
    }

    pub(crate) fn handle(&self) -> RawHandle {
        self.handle
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        // openusb_fini has no result, so there's nothing to report here either way.
        debug!("Finalising OpenUSB context {:#x}", self.handle);
        unsafe { (self.fini)(self.handle) };
    }
}
