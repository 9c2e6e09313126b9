//! Host capabilities as seen by plugin code.
//!
//! [`EditorApi`] is the single seam between plugins and the editor: the host
//! editor implements it directly, and plugins reach it through
//! [`HostHandle`], which forwards every call across the C ABI table.

use std::ffi::c_void;
use std::marker::PhantomData;
use std::ptr::NonNull;

use super::native::abi::{Api, CmdCallback, RenderCallback};
use super::native::string_view::StringView;

/// Capabilities the editor exposes to plugins.
pub trait EditorApi {
    /// Replaces the status line text. Applied before returning.
    fn set_status(&mut self, status: &[u8]);

    /// The row under the cursor. The status line while the cursor is in it.
    fn current_row(&self) -> &[u8];

    /// Overwrites the row under the cursor. The bytes are copied.
    fn update_current_row(&mut self, row: &[u8]);

    /// Whether input focus is currently the status line.
    fn is_cursor_in_status(&self) -> bool;
}

/// Plugin-side wrapper around the capability table received from the host.
///
/// A handle is only valid for the duration of the callback (or init call) it
/// was created in.
pub struct HostHandle<'a> {
    api: NonNull<Api>,
    _marker: PhantomData<&'a mut Api>,
}

impl<'a> HostHandle<'a> {
    /// Wraps a table pointer. Returns `None` for a null table.
    ///
    /// # Safety
    ///
    /// `api` must point to a table populated by the host and must stay valid
    /// for `'a`.
    pub unsafe fn from_raw(api: *mut Api) -> Option<Self> {
        NonNull::new(api).map(|api| Self {
            api,
            _marker: PhantomData,
        })
    }

    /// The raw table pointer, as passed to callbacks.
    pub fn as_ptr(&self) -> *mut Api {
        self.api.as_ptr()
    }

    fn table(&self) -> &Api {
        // SAFETY: guaranteed by `from_raw`.
        unsafe { self.api.as_ref() }
    }

    /// Registers a named command.
    ///
    /// `user_data` is handed back to every invocation and must stay valid for
    /// the lifetime of the plugin.
    pub fn add_command(&mut self, name: &str, callback: CmdCallback, user_data: *mut c_void) {
        let table = self.table();
        // SAFETY: the host populates every function pointer before init.
        unsafe { (table.add_cmd)(table.plugin, StringView::from(name), callback, user_data) }
    }

    /// Registers a callback invoked once per render frame.
    pub fn on_render(&mut self, callback: RenderCallback, user_data: *mut c_void) {
        let table = self.table();
        // SAFETY: as above.
        unsafe { (table.on_render)(table.plugin, callback, user_data) }
    }
}

impl EditorApi for HostHandle<'_> {
    fn set_status(&mut self, status: &[u8]) {
        let table = self.table();
        unsafe { (table.set_status)(table.editor, StringView::from_bytes(status)) }
    }

    fn current_row(&self) -> &[u8] {
        let table = self.table();
        // The host keeps the row alive until the current callback returns,
        // which outlives this borrow of the handle.
        unsafe { (table.get_curr_row)(table.editor).as_bytes() }
    }

    fn update_current_row(&mut self, row: &[u8]) {
        let table = self.table();
        unsafe { (table.update_curr_row)(table.editor, StringView::from_bytes(row)) }
    }

    fn is_cursor_in_status(&self) -> bool {
        self.table().is_cursor_in_status
    }
}
