//! Example plugin.
//!
//! Registers a `hello` command that appends [`MESSAGE`] to the current row,
//! and a render hook that sets the status line every [`RENDER_PERIOD`]
//! frames while the cursor is in the buffer.
//!
//! Build with `cargo build -p hello-plugin` and load the resulting
//! `libhello_plugin.so` with `ers --plugin`.

use std::ffi::c_void;

use ers_core::plugin::api::{EditorApi, HostHandle};
use ers_core::plugin::native::abi::Api;
use ers_core::StringView;
use tracing::debug;

pub const MESSAGE: &[u8] = b"Hello, World!";

pub const STATUS: &[u8] = b"Hello from hello-plugin!";

pub const RENDER_PERIOD: u64 = 100;

/// Replaces the current row with itself followed by [`MESSAGE`].
pub fn append_greeting<E: EditorApi + ?Sized>(editor: &mut E) {
    let row = editor.current_row();
    let mut greeted = Vec::with_capacity(row.len() + MESSAGE.len());
    greeted.extend_from_slice(row);
    greeted.extend_from_slice(MESSAGE);
    editor.update_current_row(&greeted);
}

/// State owned by one loaded instance of the plugin.
#[derive(Debug, Default)]
pub struct HelloPlugin {
    render_count: u64,
}

impl HelloPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames seen so far.
    pub fn render_count(&self) -> u64 {
        self.render_count
    }

    /// Handles one render frame. Returns whether the status line was set.
    pub fn render<E: EditorApi + ?Sized>(&mut self, editor: &mut E) -> bool {
        let fire = self.render_count % RENDER_PERIOD == 0 && !editor.is_cursor_in_status();
        if fire {
            editor.set_status(STATUS);
        }
        self.render_count = self.render_count.wrapping_add(1);
        fire
    }
}

unsafe extern "C" fn command(
    api: *mut Api,
    _args: *const StringView,
    _args_len: usize,
    _user_data: *mut c_void,
) -> StringView {
    if let Some(mut host) = HostHandle::from_raw(api) {
        append_greeting(&mut host);
    }
    StringView::EMPTY
}

unsafe extern "C" fn render(api: *mut Api, user_data: *mut c_void) {
    let Some(plugin) = user_data.cast::<HelloPlugin>().as_mut() else {
        return;
    };
    if let Some(mut host) = HostHandle::from_raw(api) {
        plugin.render(&mut host);
    }
}

fn init(host: &mut HostHandle<'_>) {
    debug!("Initializing hello-plugin");
    host.add_command("hello", command, std::ptr::null_mut());

    // Never freed: the ABI has no unload notification, and the host may call
    // the hook until the library is closed.
    let state = Box::into_raw(Box::new(HelloPlugin::new()));
    host.on_render(render, state.cast());
}

ers_core::ers_plugin!(init);
