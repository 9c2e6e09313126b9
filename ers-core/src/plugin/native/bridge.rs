//! Host side of the capability table.
//!
//! The host installs these `extern "C"` functions in every table it hands
//! out. Editor functions are generic over the editor type so any
//! [`EditorApi`] implementation can back a table.

use std::ffi::c_void;

use tracing::{debug, warn};

use super::abi::{Api, CmdCallback, RenderCallback};
use super::string_view::StringView;
use crate::plugin::api::EditorApi;
use crate::plugin::types::{CommandRegistration, PluginRegistrations, RenderRegistration};

/// Builds a table bound to `editor` and the plugin's `registrations`.
///
/// Both pointers must stay valid, at the same address, for as long as the
/// plugin is loaded.
pub fn build_table<E: EditorApi>(editor: *mut E, registrations: *mut PluginRegistrations) -> Api {
    Api {
        editor: editor.cast(),
        plugin: registrations.cast(),
        set_status: set_status::<E>,
        add_cmd,
        get_curr_row: get_curr_row::<E>,
        update_curr_row: update_curr_row::<E>,
        is_cursor_in_status: false,
        on_render,
    }
}

unsafe extern "C" fn set_status<E: EditorApi>(editor: *mut c_void, status: StringView) {
    let Some(editor) = editor.cast::<E>().as_mut() else {
        warn!("set_status called with a null editor handle");
        return;
    };
    let status = status.to_vec();
    editor.set_status(&status);
}

unsafe extern "C" fn get_curr_row<E: EditorApi>(editor: *mut c_void) -> StringView {
    match editor.cast::<E>().as_ref() {
        Some(editor) => StringView::from_bytes(editor.current_row()),
        None => {
            warn!("get_curr_row called with a null editor handle");
            StringView::EMPTY
        }
    }
}

unsafe extern "C" fn update_curr_row<E: EditorApi>(editor: *mut c_void, row: StringView) {
    let Some(editor) = editor.cast::<E>().as_mut() else {
        warn!("update_curr_row called with a null editor handle");
        return;
    };
    // Copy first: the incoming view may point into the row being replaced.
    let row = row.to_vec();
    debug!(row = %String::from_utf8_lossy(&row), "Updating current row");
    editor.update_current_row(&row);
}

unsafe extern "C" fn add_cmd(
    plugin: *mut c_void,
    name: StringView,
    callback: CmdCallback,
    user_data: *mut c_void,
) {
    let Some(registrations) = plugin.cast::<PluginRegistrations>().as_mut() else {
        warn!("add_cmd called with a null plugin handle");
        return;
    };
    let name = String::from_utf8_lossy(name.as_bytes()).into_owned();
    debug!("Registering command '{}'", name);
    registrations.add_command(CommandRegistration {
        name,
        callback,
        user_data,
    });
}

unsafe extern "C" fn on_render(plugin: *mut c_void, callback: RenderCallback, user_data: *mut c_void) {
    let Some(registrations) = plugin.cast::<PluginRegistrations>().as_mut() else {
        warn!("on_render called with a null plugin handle");
        return;
    };
    debug!("Registering render hook");
    registrations.add_render_hook(RenderRegistration {
        callback,
        user_data,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::api::HostHandle;

    #[derive(Default)]
    struct RecordingEditor {
        row: Vec<u8>,
        status: Vec<u8>,
        in_status: bool,
    }

    impl EditorApi for RecordingEditor {
        fn set_status(&mut self, status: &[u8]) {
            self.status = status.to_vec();
        }

        fn current_row(&self) -> &[u8] {
            &self.row
        }

        fn update_current_row(&mut self, row: &[u8]) {
            self.row = row.to_vec();
        }

        fn is_cursor_in_status(&self) -> bool {
            self.in_status
        }
    }

    unsafe extern "C" fn noop_command(
        _api: *mut Api,
        _args: *const StringView,
        _len: usize,
        _data: *mut c_void,
    ) -> StringView {
        StringView::EMPTY
    }

    unsafe extern "C" fn noop_render(_api: *mut Api, _data: *mut c_void) {}

    #[test]
    fn test_table_round_trip_through_handle() {
        let editor = Box::into_raw(Box::new(RecordingEditor {
            row: b"abc".to_vec(),
            ..Default::default()
        }));
        let registrations = Box::into_raw(Box::new(PluginRegistrations::new()));
        let table = Box::into_raw(Box::new(build_table(editor, registrations)));

        {
            let mut host = unsafe { HostHandle::from_raw(table) }.unwrap();
            assert_eq!(host.current_row(), b"abc");
            host.update_current_row(b"xyz");
            host.set_status(b"ready");
            assert!(!host.is_cursor_in_status());
            host.add_command("noop", noop_command, std::ptr::null_mut());
            host.on_render(noop_render, std::ptr::null_mut());
        }

        unsafe {
            let editor = Box::from_raw(editor);
            let registrations = Box::from_raw(registrations);
            drop(Box::from_raw(table));

            assert_eq!(editor.row, b"xyz");
            assert_eq!(editor.status, b"ready");
            assert!(registrations.command("noop").is_some());
            assert_eq!(registrations.render_hooks().len(), 1);
        }
    }

    #[test]
    fn test_update_with_view_of_current_row() {
        let editor = Box::into_raw(Box::new(RecordingEditor {
            row: b"same".to_vec(),
            ..Default::default()
        }));
        let registrations = Box::into_raw(Box::new(PluginRegistrations::new()));
        let table = build_table(editor, registrations);

        unsafe {
            let view = (table.get_curr_row)(table.editor);
            (table.update_curr_row)(table.editor, view);

            let editor = Box::from_raw(editor);
            drop(Box::from_raw(registrations));
            assert_eq!(editor.row, b"same");
        }
    }

    #[test]
    fn test_null_handles_are_ignored() {
        let table = build_table::<RecordingEditor>(std::ptr::null_mut(), std::ptr::null_mut());
        unsafe {
            (table.set_status)(table.editor, StringView::from_static(b"x"));
            (table.update_curr_row)(table.editor, StringView::from_static(b"x"));
            assert!((table.get_curr_row)(table.editor).is_null());
            (table.add_cmd)(
                table.plugin,
                StringView::from_static(b"x"),
                noop_command,
                std::ptr::null_mut(),
            );
            (table.on_render)(table.plugin, noop_render, std::ptr::null_mut());
        }
    }
}
