//! C ABI shared by the editor and native plugins.
//!
//! Plugins are shared libraries (.so, .dylib, .dll) that export a single
//! entry point. The host passes it a capability table; the plugin registers
//! commands and render hooks through it and later receives the same table in
//! every callback.
//!
//! ```c
//! // Required
//! void ers_plugin_init(Api *api);
//!
//! // Optional; plugins without it are treated as revision 1
//! uint32_t ers_plugin_abi_revision(void);
//! ```
//!
//! The C declarations live in `include/ers.h`. Rust plugins use the
//! `ers_plugin!` macro instead:
//!
//! ```rust,ignore
//! use ers_core::plugin::api::HostHandle;
//!
//! fn init(host: &mut HostHandle<'_>) {
//!     host.add_command("hello", command, std::ptr::null_mut());
//! }
//!
//! ers_core::ers_plugin!(init);
//! ```
//!
//! **Security Note**: Native plugins run with the editor's privileges and
//! should only be loaded from trusted sources.

pub mod abi;
pub mod bridge;
#[cfg(feature = "native-plugins")]
pub mod loader;
pub mod string_view;

pub use abi::{Api, ApiV1, CmdCallback, PluginInitFn, RenderCallback, ABI_REVISION};
#[cfg(feature = "native-plugins")]
pub use loader::{NativeLibrary, NativePluginLoader};
pub use string_view::StringView;
