//! ABI definitions for native plugin loading.
//!
//! This module defines the C ABI interface shared by the editor and its
//! plugins. The capability table is append-only: once a revision is released
//! the offset of every existing field is permanent, and later revisions only
//! add fields at the end.

use std::ffi::c_void;

use super::string_view::StringView;

/// Current ABI revision implemented by the host.
pub const ABI_REVISION: u32 = 2;

/// Revision assumed for plugins that do not declare one.
pub const LEGACY_ABI_REVISION: u32 = 1;

/// Name of the init entry point every plugin exports.
pub const PLUGIN_INIT_SYMBOL: &[u8] = b"ers_plugin_init\0";

/// Name of the optional revision entry point.
pub const PLUGIN_REVISION_SYMBOL: &[u8] = b"ers_plugin_abi_revision\0";

/// Command callback: `(table, args, args_len, user_data) -> output`.
///
/// Returning [`StringView::EMPTY`] signals "no output".
pub type CmdCallback =
    unsafe extern "C" fn(*mut Api, *const StringView, usize, *mut c_void) -> StringView;

/// Render callback, invoked once per render frame (revision 2).
pub type RenderCallback = unsafe extern "C" fn(*mut Api, *mut c_void);

/// Signature of `ers_plugin_init`.
pub type PluginInitFn = unsafe extern "C" fn(*mut Api);

/// Signature of `ers_plugin_abi_revision`.
pub type AbiRevisionFn = unsafe extern "C" fn() -> u32;

pub type SetStatusFn = unsafe extern "C" fn(*mut c_void, StringView);
pub type AddCmdFn = unsafe extern "C" fn(*mut c_void, StringView, CmdCallback, *mut c_void);
pub type GetCurrRowFn = unsafe extern "C" fn(*mut c_void) -> StringView;
pub type UpdateCurrRowFn = unsafe extern "C" fn(*mut c_void, StringView);
pub type OnRenderFn = unsafe extern "C" fn(*mut c_void, RenderCallback, *mut c_void);

/// Revision 1 capability table.
///
/// Revision 1 command callbacks received this table through a forward
/// declaration; the layout is identical to the prefix of [`Api`].
#[repr(C)]
pub struct ApiV1 {
    /// Opaque editor handle, owned by the host
    pub editor: *mut c_void,
    /// Opaque handle to this plugin's registration context, owned by the host
    pub plugin: *mut c_void,
    pub set_status: SetStatusFn,
    pub add_cmd: AddCmdFn,
    pub get_curr_row: GetCurrRowFn,
    pub update_curr_row: UpdateCurrRowFn,
}

/// Revision 2 capability table, passed by the host to `ers_plugin_init`.
#[repr(C)]
pub struct Api {
    pub editor: *mut c_void,
    pub plugin: *mut c_void,
    pub set_status: SetStatusFn,
    pub add_cmd: AddCmdFn,
    pub get_curr_row: GetCurrRowFn,
    pub update_curr_row: UpdateCurrRowFn,
    // Revision 2
    /// Whether input focus is the status line. Only meaningful at the moment it is read.
    pub is_cursor_in_status: bool,
    pub on_render: OnRenderFn,
}

impl Api {
    /// Views the revision 1 prefix of this table.
    pub fn as_v1(&self) -> &ApiV1 {
        // SAFETY: both types are repr(C) and `ApiV1` is a strict field prefix of `Api`.
        unsafe { &*(self as *const Api as *const ApiV1) }
    }
}

/// Declares a plugin.
///
/// This macro exports the two C ABI entry points a plugin needs:
/// `ers_plugin_init`, which wraps the raw table in a [`HostHandle`] before
/// calling the given init function, and `ers_plugin_abi_revision`.
///
/// [`HostHandle`]: crate::plugin::api::HostHandle
///
/// # Example
///
/// ```rust,ignore
/// use ers_core::plugin::api::HostHandle;
///
/// fn init(host: &mut HostHandle<'_>) {
///     host.add_command("greet", greet, std::ptr::null_mut());
/// }
///
/// ers_core::ers_plugin!(init);
/// ```
#[macro_export]
macro_rules! ers_plugin {
    ($init:path) => {
        #[no_mangle]
        pub unsafe extern "C" fn ers_plugin_init(api: *mut $crate::plugin::native::abi::Api) {
            if let Some(mut host) = $crate::plugin::api::HostHandle::from_raw(api) {
                $init(&mut host);
            }
        }

        #[no_mangle]
        pub extern "C" fn ers_plugin_abi_revision() -> u32 {
            $crate::plugin::native::abi::ABI_REVISION
        }
    };
}
