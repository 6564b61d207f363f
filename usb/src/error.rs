use crate::ffi::{status, NativeApi};
use std::ffi::CStr;
use usb_backend_types::NativeError;

const UNKNOWN_ERROR: &str = "unknown OpenUSB error";

impl NativeApi {
    /// Asks the library to describe a status code.
    pub(crate) fn describe(&self, status: i32) -> String {
        let text = unsafe { (self.strerror)(status) };
        if text.is_null() {
            return format!("{} {}", UNKNOWN_ERROR, status);
        }

        // SAFETY: openusb_strerror hands back a static, nul terminated string.
        let text = unsafe { CStr::from_ptr(text) };
        text.to_string_lossy().to_string()
    }

    /// Zero passes, anything else becomes a NativeError carrying the library's own message.
    pub(crate) fn check(&self, result: i32) -> Result<(), NativeError> {
        if result == status::SUCCESS {
            return Ok(());
        }
        Err(NativeError::new(result, self.describe(result)))
    }

    /// As `check`, handing `value` through untouched on success.
    pub(crate) fn check_value<T>(&self, result: i32, value: T) -> Result<T, NativeError> {
        self.check(result).map(|_| value)
    }
}
