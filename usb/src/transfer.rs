// Synchronous transfers. Every request record starts zeroed, gets the payload pointer, length
// and timeout attached, and is handed to the library which blocks until it's done (or the
// timeout expires). The buffer a request points at always lives in the calling frame (either
// the caller's slice, or a Vec we allocated here), so it can't move or be freed mid transfer.
use crate::backend::Runtime;
use crate::ffi::{BulkRequest, CtrlRequest, CtrlSetup, IntrRequest, RawDevHandle, RequestResult};
use log::trace;
use usb_backend_types::{
    ControlOutcome, ControlPayload, ControlSetup, DeviceHandle, Timeout, TransferType, UsbError,
    UsbResult,
};

type Xfer<R> = unsafe extern "C" fn(RawDevHandle, u8, u8, *mut R) -> i32;

trait Request: Default {
    fn attach(&mut self, payload: *mut u8, length: u32, timeout: Timeout);
    fn result(&self) -> RequestResult;
}

macro_rules! request {
    ($($request:ident),*) => {
        $(
            impl Request for $request {
                fn attach(&mut self, payload: *mut u8, length: u32, timeout: Timeout) {
                    self.payload = payload;
                    self.length = length;
                    self.timeout = timeout.as_millis();
                }

                fn result(&self) -> RequestResult {
                    self.result
                }
            }
        )*
    };
}

request!(CtrlRequest, IntrRequest, BulkRequest);

fn native_length(length: usize, limit: usize) -> UsbResult<u32> {
    if length > limit {
        return Err(UsbError::InvalidArgument(format!(
            "Transfer of {} bytes exceeds the limit of {}",
            length, limit
        )));
    }
    Ok(length as u32)
}

impl Runtime {
    /// Sends a prepared request, returning how many bytes the library says it moved.
    #[allow(clippy::too_many_arguments)]
    fn submit<R: Request>(
        &self,
        xfer: Xfer<R>,
        handle: DeviceHandle,
        interface: u8,
        endpoint: u8,
        mut request: R,
        payload: *mut u8,
        length: u32,
        timeout: Timeout,
    ) -> UsbResult<usize> {
        request.attach(payload, length, timeout);

        let result = unsafe { xfer(handle.as_raw(), interface, endpoint, &mut request) };
        self.api.check(result).map_err(UsbError::Transfer)?;

        // The call itself can succeed while the request reports its own failure.
        let outcome = request.result();
        self.api.check(outcome.status).map_err(UsbError::Transfer)?;
        Ok(outcome.transferred_bytes as usize)
    }

    #[allow(clippy::too_many_arguments)]
    fn write<R: Request>(
        &self,
        xfer: Xfer<R>,
        transfer_type: TransferType,
        handle: DeviceHandle,
        endpoint: u8,
        interface: u8,
        data: &[u8],
        timeout: Timeout,
    ) -> UsbResult<usize> {
        trace!(
            "{} write(handle={}, endpoint={:#04x}, interface={}, length={}, timeout={}ms)",
            transfer_type,
            handle,
            endpoint,
            interface,
            data.len(),
            timeout.as_millis()
        );

        let length = native_length(data.len(), u32::MAX as usize)?;

        // The library only reads from the payload of an OUT transfer, the pointer just has to be
        // *mut to fit the record.
        let payload = data.as_ptr() as *mut u8;
        self.submit(
            xfer,
            handle,
            interface,
            endpoint,
            R::default(),
            payload,
            length,
            timeout,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn read<R: Request>(
        &self,
        xfer: Xfer<R>,
        transfer_type: TransferType,
        handle: DeviceHandle,
        endpoint: u8,
        interface: u8,
        size: usize,
        timeout: Timeout,
    ) -> UsbResult<Vec<u8>> {
        trace!(
            "{} read(handle={}, endpoint={:#04x}, interface={}, size={}, timeout={}ms)",
            transfer_type,
            handle,
            endpoint,
            interface,
            size,
            timeout.as_millis()
        );

        let length = native_length(size, u32::MAX as usize)?;
        let mut buffer = vec![0; size];
        let read = self.submit(
            xfer,
            handle,
            interface,
            endpoint,
            R::default(),
            buffer.as_mut_ptr(),
            length,
            timeout,
        )?;

        // Never hand back more than was asked for, whatever the library claims.
        buffer.truncate(read);
        Ok(buffer)
    }

    pub(crate) fn bulk_write(
        &self,
        handle: DeviceHandle,
        endpoint: u8,
        interface: u8,
        data: &[u8],
        timeout: Timeout,
    ) -> UsbResult<usize> {
        let xfer = self.api.bulk_xfer;
        self.write(xfer, TransferType::Bulk, handle, endpoint, interface, data, timeout)
    }

    pub(crate) fn bulk_read(
        &self,
        handle: DeviceHandle,
        endpoint: u8,
        interface: u8,
        size: usize,
        timeout: Timeout,
    ) -> UsbResult<Vec<u8>> {
        let xfer = self.api.bulk_xfer;
        self.read(xfer, TransferType::Bulk, handle, endpoint, interface, size, timeout)
    }

    pub(crate) fn intr_write(
        &self,
        handle: DeviceHandle,
        endpoint: u8,
        interface: u8,
        data: &[u8],
        timeout: Timeout,
    ) -> UsbResult<usize> {
        let xfer = self.api.intr_xfer;
        self.write(xfer, TransferType::Interrupt, handle, endpoint, interface, data, timeout)
    }

    pub(crate) fn intr_read(
        &self,
        handle: DeviceHandle,
        endpoint: u8,
        interface: u8,
        size: usize,
        timeout: Timeout,
    ) -> UsbResult<Vec<u8>> {
        let xfer = self.api.intr_xfer;
        self.read(xfer, TransferType::Interrupt, handle, endpoint, interface, size, timeout)
    }

    pub(crate) fn ctrl_transfer(
        &self,
        handle: DeviceHandle,
        setup: ControlSetup,
        payload: ControlPayload<'_>,
        timeout: Timeout,
    ) -> UsbResult<ControlOutcome> {
        let direction = setup.direction();
        trace!(
            "Control transfer(handle={}, {:?}, direction={}, timeout={}ms)",
            handle,
            setup,
            direction,
            timeout.as_millis()
        );

        if payload.direction() != direction {
            return Err(UsbError::InvalidArgument(format!(
                "bmRequestType {:#04x} is {}, but the payload is {}",
                setup.request_type,
                direction,
                payload.direction()
            )));
        }

        let mut request = CtrlRequest::default();
        request.setup = CtrlSetup {
            request_type: setup.request_type,
            request: setup.request,
            value: setup.value,
            index: setup.index,
        };

        // Control transfers always go to the default pipe.
        let xfer = self.api.ctrl_xfer;
        match payload {
            ControlPayload::Write(data) => {
                let length = native_length(data.len(), u16::MAX as usize)?;
                let written = self.submit(
                    xfer,
                    handle,
                    0,
                    0,
                    request,
                    data.as_ptr() as *mut u8,
                    length,
                    timeout,
                )?;
                Ok(ControlOutcome::Written(written))
            }
            ControlPayload::Read(length) => {
                let mut buffer = vec![0; length as usize];
                let read = self.submit(
                    xfer,
                    handle,
                    0,
                    0,
                    request,
                    buffer.as_mut_ptr(),
                    u32::from(length),
                    timeout,
                )?;

                buffer.truncate(read);
                Ok(ControlOutcome::Read(buffer))
            }
        }
    }
}
