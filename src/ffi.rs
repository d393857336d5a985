//! FFI bindings for Last Stand
//!
//! This module provides C-compatible functions for calling the engine from the
//! host app. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `laststand_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::EngineConfig;
use crate::pipeline::{summarize_json, ActivityEngine};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Read a required string argument, recording an error when it is missing
unsafe fn required_arg(ptr: *const c_char, name: &str) -> Option<String> {
    let value = cstr_to_string(ptr);
    if value.is_none() {
        set_last_error(&format!("Invalid {} string pointer", name));
    }
    value
}

/// Read an optional string argument; only NULL means absent
unsafe fn optional_arg(ptr: *const c_char, name: &str) -> Result<Option<String>, ()> {
    if ptr.is_null() {
        return Ok(None);
    }
    match CStr::from_ptr(ptr).to_str() {
        Ok(s) => Ok(Some(s.to_string())),
        Err(e) => {
            set_last_error(&format!("Invalid {} string: {}", name, e));
            Err(())
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Build an activity report from a JSON array of sample records.
///
/// # Safety
/// - `samples_json` and `now_rfc3339` must be valid null-terminated C strings.
/// - `config_json` may be NULL, in which case defaults apply; a non-UTF-8 string is an error.
/// - Returns a newly allocated string that must be freed with `laststand_free_string`.
/// - Returns NULL on error; call `laststand_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn laststand_summarize(
    samples_json: *const c_char,
    now_rfc3339: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(samples) = required_arg(samples_json, "samples JSON") else {
        return ptr::null_mut();
    };
    let Some(now) = required_arg(now_rfc3339, "now") else {
        return ptr::null_mut();
    };
    let Ok(config) = optional_arg(config_json, "config JSON") else {
        return ptr::null_mut();
    };

    match summarize_json(samples, now, config) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Engine API
// ============================================================================

/// Opaque handle to an ActivityEngine
pub struct ActivityEngineHandle {
    engine: ActivityEngine,
}

/// Create an engine with the given JSON config.
///
/// # Safety
/// - `config_json` may be NULL, in which case defaults apply; a non-UTF-8 string is an error.
/// - Returns a pointer that must be freed with `laststand_engine_free`.
/// - Returns NULL on error (e.g. invalid config).
#[no_mangle]
pub unsafe extern "C" fn laststand_engine_new(config_json: *const c_char) -> *mut ActivityEngineHandle {
    clear_last_error();

    let Ok(config) = optional_arg(config_json, "config JSON") else {
        return ptr::null_mut();
    };
    let engine = match config {
        Some(json) => ActivityEngine::from_config_json(&json),
        None => ActivityEngine::new(EngineConfig::default()),
    };

    match engine {
        Ok(engine) => Box::into_raw(Box::new(ActivityEngineHandle { engine })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `laststand_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn laststand_engine_free(engine: *mut ActivityEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Build an activity report with an existing engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `laststand_engine_new`.
/// - `samples_json` and `now_rfc3339` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `laststand_free_string`.
/// - Returns NULL on error; call `laststand_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn laststand_engine_process(
    engine: *const ActivityEngineHandle,
    samples_json: *const c_char,
    now_rfc3339: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }
    let handle = &*engine;

    let Some(samples) = required_arg(samples_json, "samples JSON") else {
        return ptr::null_mut();
    };
    let Some(now) = required_arg(now_rfc3339, "now") else {
        return ptr::null_mut();
    };

    match handle.engine.process_json(&samples, &now) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by a `laststand_*` function.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by this library, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn laststand_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next `laststand_*` call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn laststand_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn laststand_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
