pub mod editor;
pub mod plugin;
pub mod settings;

// Public library API. Plugins should only need `plugin::api`, `StringView`
// and the `ers_plugin!` macro.
pub use editor::command::CommandOutcome;
pub use editor::{Editor, EditorSnapshot};
pub use plugin::native::StringView;
pub use plugin::{EditorApi, HostHandle, PluginError, PluginManager};
pub use settings::{Settings, SettingsManager};
