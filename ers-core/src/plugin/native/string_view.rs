//! Non-owning byte views exchanged across the plugin ABI.

use std::ffi::CStr;
use std::fmt;

/// A pointer-length pair over memory owned by the other side of the ABI.
///
/// The length is explicit: no null terminator is implied and no encoding is
/// assumed. The empty view (null pointer, zero length) is the convention for
/// "no value".
#[repr(C)]
#[derive(Clone, Copy)]
pub struct StringView {
    data: *const u8,
    len: usize,
}

impl StringView {
    /// The "no value" view.
    pub const EMPTY: StringView = StringView {
        data: std::ptr::null(),
        len: 0,
    };

    /// Views `bytes`. The caller keeps `bytes` alive for as long as the view is used.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: bytes.as_ptr(),
            len: bytes.len(),
        }
    }

    pub const fn from_static(bytes: &'static [u8]) -> Self {
        Self {
            data: bytes.as_ptr(),
            len: bytes.len(),
        }
    }

    /// Views a null-terminated string, excluding the terminator.
    pub fn from_c_str(s: &CStr) -> Self {
        Self::from_bytes(s.to_bytes())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_null(&self) -> bool {
        self.data.is_null()
    }

    /// Borrows the viewed bytes.
    ///
    /// # Safety
    ///
    /// The memory behind the view must be valid for `len` bytes and must not be
    /// mutated for the chosen lifetime `'a`.
    pub unsafe fn as_bytes<'a>(&self) -> &'a [u8] {
        if self.data.is_null() || self.len == 0 {
            return &[];
        }
        std::slice::from_raw_parts(self.data, self.len)
    }

    /// Copies the viewed bytes into an owned buffer.
    ///
    /// # Safety
    ///
    /// Same requirements as [`StringView::as_bytes`], for the duration of the call.
    pub unsafe fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl Default for StringView {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<'a> From<&'a [u8]> for StringView {
    fn from(bytes: &'a [u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl<'a> From<&'a str> for StringView {
    fn from(s: &'a str) -> Self {
        Self::from_bytes(s.as_bytes())
    }
}

impl fmt::Debug for StringView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringView")
            .field("data", &self.data)
            .field("len", &self.len)
            .finish()
    }
}
