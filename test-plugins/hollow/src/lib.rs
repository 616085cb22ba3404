//! Exports an API version but no create symbol, so it holds no plugin.

use attention_plugin_api::API_VERSION;

#[unsafe(no_mangle)]
pub extern "C-unwind" fn _attention_plugin_api_version() -> u32 {
    API_VERSION
}
