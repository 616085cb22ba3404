//! Exports the plugin symbols with an API version the host does not speak.

use attention_plugin_api::{API_VERSION, Plugin};

#[unsafe(no_mangle)]
pub extern "C-unwind" fn _attention_plugin_api_version() -> u32 {
    API_VERSION + 1
}

#[unsafe(no_mangle)]
#[allow(improper_ctypes_definitions)]
pub extern "C-unwind" fn _attention_plugin_create() -> *mut dyn Plugin {
    unreachable!("never called once the version check fails")
}
