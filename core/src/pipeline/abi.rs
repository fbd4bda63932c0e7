//! C host surface and the external-plugin contract.
//!
//! External plugins register through [`ExternalPluginApi`], a vtable of
//! entry points; the host refuses any plugin whose `api_version` differs
//! from [`PLUGIN_API_VERSION`]. Events cross the boundary as the compact
//! JSON encoding. Every string on either side is UTF-8 and null-terminated.
//!
//! Loading plugins from shared libraries is intentionally out of scope:
//! [`load_external_plugin`] (the path form) always fails cleanly, while
//! [`load_external_plugin_direct`] is the supported registration path for
//! hosts that resolve the entry points themselves.

use std::ffi::{c_char, c_int, c_void, CStr, CString};

use tracing::warn;

use crate::combat_log::{to_json, CombatEvent};

use super::{Pipeline, PipelineError, Plugin, PluginContext};

/// Current plugin API version; plugins must match it exactly.
pub const PLUGIN_API_VERSION: c_int = 1;

/// Plugin metadata, as returned by a plugin's `get_info` entry point.
#[repr(C)]
pub struct PluginInfo {
    pub name: *const c_char,
    pub version: *const c_char,
    pub author: *const c_char,
    pub description: *const c_char,
    pub api_version: c_int,
}

/// Creates a plugin instance, returning an opaque handle.
pub type CreatePluginFn = unsafe extern "C" fn() -> *mut c_void;
/// Destroys a plugin instance.
pub type DestroyPluginFn = unsafe extern "C" fn(*mut c_void);
/// Returns plugin metadata.
pub type GetPluginInfoFn = unsafe extern "C" fn() -> PluginInfo;
/// Feeds one event, encoded as compact JSON.
pub type PluginIngestFn = unsafe extern "C" fn(*mut c_void, *const c_char);
/// Clears all plugin state.
pub type PluginResetFn = unsafe extern "C" fn(*mut c_void);

/// Entry points an external plugin hands to [`load_external_plugin_direct`].
#[repr(C)]
pub struct ExternalPluginApi {
    pub create: CreatePluginFn,
    pub destroy: DestroyPluginFn,
    pub get_info: GetPluginInfoFn,
    pub ingest: PluginIngestFn,
    pub reset: PluginResetFn,
}

/// Registration state of a plugin, for C callers.
#[repr(C)]
pub struct PluginStatus {
    pub id: u16,
    pub priority: c_int,
    pub enabled: bool,
}

/// Adapter driving an external plugin through the [`Plugin`] trait.
struct ExternalPlugin {
    name: String,
    handle: *mut c_void,
    destroy_fn: DestroyPluginFn,
    ingest_fn: PluginIngestFn,
    reset_fn: PluginResetFn,
}

// The handle is owned exclusively by this adapter and only touched from the
// pipeline's thread.
unsafe impl Send for ExternalPlugin {}

impl Plugin for ExternalPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        100
    }

    fn ingest(&mut self, _ctx: &PluginContext<'_>, event: &mut CombatEvent<'_>) {
        let json = to_json(event);
        if let Ok(json) = CString::new(json) {
            unsafe { (self.ingest_fn)(self.handle, json.as_ptr()) }
        }
    }

    fn reset(&mut self) {
        unsafe { (self.reset_fn)(self.handle) }
    }
}

impl Drop for ExternalPlugin {
    fn drop(&mut self) {
        unsafe { (self.destroy_fn)(self.handle) }
    }
}

unsafe fn cstr_or<'a>(ptr: *const c_char, fallback: &'a str) -> &'a str {
    if ptr.is_null() {
        return fallback;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().unwrap_or(fallback)
}

/// Create a pipeline behind an opaque handle.
#[no_mangle]
pub extern "C" fn create_parser() -> *mut Pipeline {
    Box::into_raw(Box::new(Pipeline::new()))
}

/// Destroy a pipeline created by [`create_parser`].
///
/// # Safety
/// `parser` must be a handle from [`create_parser`] not yet destroyed.
#[no_mangle]
pub unsafe extern "C" fn destroy_parser(parser: *mut Pipeline) {
    if !parser.is_null() {
        drop(unsafe { Box::from_raw(parser) });
    }
}

/// Feed one raw line. Returns false for null input or a malformed line.
///
/// # Safety
/// `parser` must be a live handle; `line` a null-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn process_combat_line(parser: *mut Pipeline, line: *const c_char) -> bool {
    let Some(pipeline) = (unsafe { parser.as_mut() }) else {
        return false;
    };
    if line.is_null() {
        return false;
    }
    let Ok(text) = unsafe { CStr::from_ptr(line) }.to_str() else {
        return false;
    };
    pipeline.process_line(text).is_ok()
}

/// Reset every registered plugin.
///
/// # Safety
/// `parser` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn reset_all_plugins(parser: *mut Pipeline) {
    if let Some(pipeline) = unsafe { parser.as_mut() } {
        pipeline.reset_all_plugins();
    }
}

/// Whether the combat state machine currently reports in-combat.
///
/// # Safety
/// `parser` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn is_in_combat(parser: *mut Pipeline) -> bool {
    unsafe { parser.as_ref() }
        .map(|p| p.is_in_combat())
        .unwrap_or(false)
}

/// Look a plugin up by name. Returns its id, 0 when absent.
///
/// # Safety
/// `parser` must be a live handle; `name` a null-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn get_plugin_by_name(parser: *mut Pipeline, name: *const c_char) -> u16 {
    let Some(pipeline) = (unsafe { parser.as_ref() }) else {
        return 0;
    };
    if name.is_null() {
        return 0;
    }
    let Ok(name) = unsafe { CStr::from_ptr(name) }.to_str() else {
        return 0;
    };
    pipeline.plugin_id_by_name(name).unwrap_or(0)
}

/// Fill `out` with the registration state of plugin `id`. Returns false when
/// no such plugin exists.
///
/// # Safety
/// `parser` must be a live handle; `out` must point to writable memory for
/// one [`PluginStatus`].
#[no_mangle]
pub unsafe extern "C" fn get_plugin_by_id(
    parser: *mut Pipeline,
    id: u16,
    out: *mut PluginStatus,
) -> bool {
    let Some(pipeline) = (unsafe { parser.as_ref() }) else {
        return false;
    };
    let Some((_, priority, enabled)) = pipeline.plugin_info(id) else {
        return false;
    };
    if let Some(out) = unsafe { out.as_mut() } {
        out.id = id;
        out.priority = priority;
        out.enabled = enabled;
    }
    true
}

/// Path-based loading is not provided; always returns 0. Hosts resolve the
/// entry points themselves and call [`load_external_plugin_direct`].
///
/// # Safety
/// `parser` may be null; `path` may be null.
#[no_mangle]
pub unsafe extern "C" fn load_external_plugin(
    _parser: *mut Pipeline,
    path: *const c_char,
) -> u16 {
    let err = PipelineError::LoaderUnavailable {
        path: unsafe { cstr_or(path, "<null>") }.to_string(),
    };
    warn!(%err, "use load_external_plugin_direct");
    0
}

/// Register an external plugin from its entry points. Returns the assigned
/// plugin id, or 0 when the API version mismatches or creation fails.
///
/// # Safety
/// `parser` must be a live handle; `api` must point to a valid vtable whose
/// function pointers satisfy the documented contract.
#[no_mangle]
pub unsafe extern "C" fn load_external_plugin_direct(
    parser: *mut Pipeline,
    api: *const ExternalPluginApi,
) -> u16 {
    let Some(pipeline) = (unsafe { parser.as_mut() }) else {
        return 0;
    };
    let Some(api) = (unsafe { api.as_ref() }) else {
        return 0;
    };
    match unsafe { register_external(pipeline, api) } {
        Ok(id) => id,
        Err(err) => {
            warn!(%err, "refusing external plugin");
            0
        }
    }
}

/// Validate an external plugin's vtable and register it.
///
/// # Safety
/// `api`'s function pointers must satisfy the documented contract.
pub(crate) unsafe fn register_external(
    pipeline: &mut Pipeline,
    api: &ExternalPluginApi,
) -> Result<u16, PipelineError> {
    let info = unsafe { (api.get_info)() };
    if info.api_version != PLUGIN_API_VERSION {
        return Err(PipelineError::AbiMismatch {
            plugin: info.api_version,
            host: PLUGIN_API_VERSION,
        });
    }
    let name = unsafe { cstr_or(info.name, "external plugin") }.to_string();

    let handle = unsafe { (api.create)() };
    if handle.is_null() {
        return Err(PipelineError::PluginRegistration(format!(
            "{name}: create returned a null handle"
        )));
    }

    Ok(pipeline.register_plugin(Box::new(ExternalPlugin {
        name,
        handle,
        destroy_fn: api.destroy,
        ingest_fn: api.ingest,
        reset_fn: api.reset,
    })))
}
