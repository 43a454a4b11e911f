//! FFI bindings for Sleep Sessions
//!
//! This module provides C-compatible functions for calling the engine from
//! other languages. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using
//! `sleep_sessions_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::pipeline::SessionReconstructor;

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

/// Reconstruct daily sleep summaries from a JSON array of sample records.
///
/// `config_json` may be NULL to use the default thresholds.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `sleep_sessions_free_string`.
/// - Returns NULL on error; call `sleep_sessions_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn sleep_sessions_reconstruct(
    json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let reconstructor = if config_json.is_null() {
        SessionReconstructor::new()
    } else {
        let config_str = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match SessionReconstructor::from_config_json(&config_str) {
            Ok(r) => r,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    match reconstructor.process_json(&json_str) {
        Ok(result) => string_to_cstr(&result),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a static string that is valid until the next call
///   into this library on the same thread.
/// - Returns NULL if no error has occurred.
/// - Do NOT free the returned pointer.
#[no_mangle]
pub unsafe extern "C" fn sleep_sessions_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Free a string returned by this library.
///
/// # Safety
/// - `s` must be a pointer returned by this library, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn sleep_sessions_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Get the engine version string.
///
/// # Safety
/// - Returns a pointer to a static string.
/// - Do NOT free the returned pointer.
#[no_mangle]
pub unsafe extern "C" fn sleep_sessions_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &str = r#"[
        {"start": "2024-01-15T22:00:00Z", "end": "2024-01-16T07:00:00Z", "stage": "InBed"},
        {"start": "2024-01-15T22:30:00Z", "end": "2024-01-16T06:30:00Z", "stage": "Core"}
    ]"#;

    #[test]
    fn test_reconstruct_ffi() {
        let json = CString::new(SAMPLES).unwrap();

        unsafe {
            let result = sleep_sessions_reconstruct(json.as_ptr(), ptr::null());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            let value: serde_json::Value = serde_json::from_str(result_str).unwrap();
            assert_eq!(value[0]["date"], "2024-01-15");

            sleep_sessions_free_string(result);
        }
    }

    #[test]
    fn test_reconstruct_ffi_with_config() {
        let json = CString::new(SAMPLES).unwrap();
        let config = CString::new(r#"{"utc_offset_minutes": 600}"#).unwrap();

        unsafe {
            let result = sleep_sessions_reconstruct(json.as_ptr(), config.as_ptr());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            let value: serde_json::Value = serde_json::from_str(result_str).unwrap();
            // 22:00 UTC is 08:00 the next morning at UTC+10
            assert_eq!(value[0]["date"], "2024-01-16");

            sleep_sessions_free_string(result);
        }
    }

    #[test]
    fn test_error_handling() {
        let invalid_json = CString::new("not valid json").unwrap();

        unsafe {
            let result = sleep_sessions_reconstruct(invalid_json.as_ptr(), ptr::null());
            assert!(result.is_null());

            let error = sleep_sessions_last_error();
            assert!(!error.is_null());
        }
    }

    #[test]
    fn test_invalid_config() {
        let json = CString::new(SAMPLES).unwrap();
        let config = CString::new(r#"{"gap_threshold_minutes": 0}"#).unwrap();

        unsafe {
            let result = sleep_sessions_reconstruct(json.as_ptr(), config.as_ptr());
            assert!(result.is_null());

            let error = CStr::from_ptr(sleep_sessions_last_error()).to_str().unwrap();
            assert!(error.contains("gap_threshold_minutes"));
        }
    }

    #[test]
    fn test_version() {
        unsafe {
            let version = sleep_sessions_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
