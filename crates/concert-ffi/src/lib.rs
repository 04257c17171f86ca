//! C FFI surface for concert.
//!
//! Pattern: opaque ControllerHandle + C strings + JSON payloads. Every
//! playback call returns the same flat JSON status the library produces,
//! as an owned string the caller releases with `concert_string_free`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use concert_core::{Controller, ControllerConfig, Track};

// ---------------------------------------------------------------------------
// Error handling (thread-local last error)
// ---------------------------------------------------------------------------

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn set_error(msg: String) {
    LAST_ERROR.with(|cell| *cell.borrow_mut() = Some(msg));
}

fn clear_error() {
    LAST_ERROR.with(|cell| *cell.borrow_mut() = None);
}

/// Returns the last error message (caller frees with `concert_string_free`).
#[no_mangle]
pub extern "C" fn concert_last_error() -> *mut c_char {
    LAST_ERROR.with(|cell| {
        cell.borrow_mut()
            .take()
            .and_then(|s| CString::new(s).ok())
            .map(|s| s.into_raw())
            .unwrap_or(ptr::null_mut())
    })
}

/// Frees a string returned from concert FFI.
///
/// # Safety
/// Must be a pointer returned from this FFI and not already freed.
#[no_mangle]
pub unsafe extern "C" fn concert_string_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ---------------------------------------------------------------------------
// Opaque handle
// ---------------------------------------------------------------------------

#[repr(C)]
pub struct ControllerHandle {
    _private: [u8; 0],
}

struct ControllerHandleInner {
    controller: Controller,
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Opens a controller over the native engine.
///
/// `config_json` may be NULL, in which case the file named by
/// `CONCERT_CONFIG` is used (defaults when unset). Returns NULL on a bad
/// config.
///
/// # Safety
/// `config_json` must be NULL or a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn concert_open(config_json: *const c_char) -> *mut ControllerHandle {
    clear_error();
    let config = if config_json.is_null() {
        ControllerConfig::from_env()
    } else {
        match read_cstr(config_json) {
            Ok(json) => ControllerConfig::from_json_str(&json),
            Err(e) => {
                set_error(e);
                return ptr::null_mut();
            }
        }
    };
    match config {
        Ok(config) => {
            let controller = Controller::new(config);
            Box::into_raw(Box::new(ControllerHandleInner { controller })) as *mut ControllerHandle
        }
        Err(e) => {
            set_error(e.to_string());
            ptr::null_mut()
        }
    }
}

/// Stops playback and releases the controller.
#[no_mangle]
pub extern "C" fn concert_close(handle: *mut ControllerHandle) {
    if !handle.is_null() {
        unsafe {
            drop(Box::from_raw(handle as *mut ControllerHandleInner));
        }
    }
}

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

/// Set the volume. Returns `{"volume": n}` (caller frees).
#[no_mangle]
pub extern "C" fn concert_set_volume(handle: *mut ControllerHandle, volume: i32) -> *mut c_char {
    clear_error();
    match controller_ref(handle) {
        Ok(c) => json_to_cstr(&c.set_volume(volume)),
        Err(e) => err_null(e),
    }
}

/// Play a track given as JSON `{title, stream, duration, thumbnail?, playedby?}`.
/// Returns the status JSON (caller frees); failures carry an `error` code.
#[no_mangle]
pub extern "C" fn concert_play(handle: *mut ControllerHandle, track_json: *const c_char) -> *mut c_char {
    clear_error();
    let controller = match controller_ref(handle) {
        Ok(c) => c,
        Err(e) => return err_null(e),
    };
    let json = match read_cstr(track_json) {
        Ok(s) => s,
        Err(e) => return err_null(e),
    };
    let track: Track = match serde_json::from_str(&json) {
        Ok(t) => t,
        Err(e) => return err_null(format!("invalid track: {}", e)),
    };
    to_cstr(controller.play(&track).to_value().to_string())
}

/// Toggle pause/resume. Returns pause status JSON (caller frees).
#[no_mangle]
pub extern "C" fn concert_pause(handle: *mut ControllerHandle) -> *mut c_char {
    clear_error();
    match controller_ref(handle) {
        Ok(c) => to_cstr(c.pause().to_value().to_string()),
        Err(e) => err_null(e),
    }
}

/// Stop playback. Returns status JSON (caller frees).
#[no_mangle]
pub extern "C" fn concert_stop(handle: *mut ControllerHandle) -> *mut c_char {
    clear_error();
    match controller_ref(handle) {
        Ok(c) => json_to_cstr(&c.stop()),
        Err(e) => err_null(e),
    }
}

/// Seek to `percent` (0..=1) of the current track. Returns status JSON.
#[no_mangle]
pub extern "C" fn concert_set_time(handle: *mut ControllerHandle, percent: f64) -> *mut c_char {
    clear_error();
    match controller_ref(handle) {
        Ok(c) => to_cstr(c.set_time(percent).to_value().to_string()),
        Err(e) => err_null(e),
    }
}

/// Current status JSON (caller frees).
#[no_mangle]
pub extern "C" fn concert_state(handle: *mut ControllerHandle) -> *mut c_char {
    clear_error();
    match controller_ref(handle) {
        Ok(c) => json_to_cstr(&c.cur_state()),
        Err(e) => err_null(e),
    }
}

/// 1 when playing, 0 when not, -1 on a null handle.
#[no_mangle]
pub extern "C" fn concert_is_playing(handle: *mut ControllerHandle) -> i32 {
    clear_error();
    match controller_ref(handle) {
        Ok(c) => i32::from(c.is_playing()),
        Err(e) => {
            set_error(e);
            -1
        }
    }
}

/// Abort an in-flight `concert_play` running on another thread.
/// Returns 1 on success, 0 on a null handle.
#[no_mangle]
pub extern "C" fn concert_cancel(handle: *mut ControllerHandle) -> i32 {
    clear_error();
    match controller_ref(handle) {
        Ok(c) => {
            c.cancel_handle().cancel();
            1
        }
        Err(e) => {
            set_error(e);
            0
        }
    }
}

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

/// Returns the FFI API version.
#[no_mangle]
pub extern "C" fn concert_version() -> u32 {
    1
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn controller_ref<'a>(handle: *mut ControllerHandle) -> Result<&'a Controller, String> {
    if handle.is_null() {
        return Err("null controller handle".into());
    }
    let inner = unsafe { &*(handle as *mut ControllerHandleInner) };
    Ok(&inner.controller)
}

fn read_cstr(ptr: *const c_char) -> Result<String, String> {
    if ptr.is_null() {
        return Err("null string pointer".into());
    }
    unsafe {
        CStr::from_ptr(ptr)
            .to_str()
            .map(String::from)
            .map_err(|_| "invalid utf-8".into())
    }
}

fn json_to_cstr<T: serde::Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => to_cstr(json),
        Err(e) => err_null(e.to_string()),
    }
}

fn to_cstr(s: String) -> *mut c_char {
    CString::new(s)
        .map(|c| c.into_raw())
        .unwrap_or(ptr::null_mut())
}

fn err_null(msg: String) -> *mut c_char {
    set_error(msg);
    ptr::null_mut()
}

// ---------------------------------------------------------------------------
// FFI Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Open a controller with fast, fixed timings.
    fn ffi_controller() -> *mut ControllerHandle {
        let cfg = c(r#"{"play_attempt_delay_ms":0,"pause_delay_ms":0,"network_attempt_timeout_ms":50}"#);
        let handle = unsafe { concert_open(cfg.as_ptr()) };
        assert!(!handle.is_null(), "concert_open returned null");
        handle
    }

    /// Read a *mut c_char into JSON and free it.
    fn read_ffi_json(ptr: *mut c_char) -> serde_json::Value {
        assert!(!ptr.is_null(), "FFI returned null string");
        let s = unsafe { CStr::from_ptr(ptr).to_str().unwrap().to_string() };
        unsafe { concert_string_free(ptr) };
        serde_json::from_str(&s).unwrap()
    }

    fn last_error() -> String {
        let ptr = concert_last_error();
        assert!(!ptr.is_null(), "no last error set");
        let s = unsafe { CStr::from_ptr(ptr).to_str().unwrap().to_string() };
        unsafe { concert_string_free(ptr) };
        s
    }

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    #[test]
    fn ffi_version() {
        assert_eq!(concert_version(), 1);
    }

    #[test]
    fn ffi_open_close_lifecycle() {
        let handle = ffi_controller();
        concert_close(handle);
        concert_close(ptr::null_mut());
    }

    #[test]
    fn ffi_open_rejects_bad_config() {
        let bad = c(r#"{"max_play_attempts":0}"#);
        let handle = unsafe { concert_open(bad.as_ptr()) };
        assert!(handle.is_null());
        assert!(last_error().contains("max_play_attempts"));

        let garbage = c("not json");
        assert!(unsafe { concert_open(garbage.as_ptr()) }.is_null());
    }

    #[test]
    fn ffi_null_handle_returns_error() {
        let ptr = concert_state(ptr::null_mut());
        assert!(ptr.is_null());
        assert!(last_error().contains("null"));

        assert_eq!(concert_is_playing(ptr::null_mut()), -1);
        assert_eq!(concert_cancel(ptr::null_mut()), 0);
    }

    // -------------------------------------------------------------------
    // Playback
    // -------------------------------------------------------------------

    #[test]
    fn ffi_initial_state() {
        let handle = ffi_controller();
        let state = read_ffi_json(concert_state(handle));
        assert_eq!(state["audio_status"], "NothingSpecial");
        assert_eq!(state["volume"], 70);
        assert_eq!(state["is_playing"], false);
        assert!(state["media"].is_null());
        assert_eq!(concert_is_playing(handle), 0);
        concert_close(handle);
    }

    #[test]
    fn ffi_volume_clamps() {
        let handle = ffi_controller();
        let v = read_ffi_json(concert_set_volume(handle, 250));
        assert_eq!(v, serde_json::json!({"volume": 100}));
        let v = read_ffi_json(concert_set_volume(handle, 40));
        assert_eq!(v["volume"], 40);
        concert_close(handle);
    }

    #[test]
    fn ffi_pause_without_media_reports_error() {
        let handle = ffi_controller();
        let v = read_ffi_json(concert_pause(handle));
        assert_eq!(v["is_playing"], false);
        assert_eq!(v["error"], "no_media_loaded");
        concert_close(handle);
    }

    #[test]
    fn ffi_play_rejects_bad_track_json() {
        let handle = ffi_controller();
        let bad = c(r#"{"title":"no stream"}"#);
        assert!(concert_play(handle, bad.as_ptr()).is_null());
        assert!(last_error().starts_with("invalid track"));
        assert!(concert_play(handle, ptr::null()).is_null());
        concert_close(handle);
    }

    #[test]
    fn ffi_play_missing_file_is_unreachable() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.mp3");
        let track = serde_json::json!({
            "title": "Ghost",
            "stream": missing.to_str().unwrap(),
            "duration": 180
        });
        let handle = ffi_controller();
        let json = c(&track.to_string());

        let v = read_ffi_json(concert_play(handle, json.as_ptr()));

        assert_eq!(v["is_playing"], false);
        assert_eq!(v["error"], "unreachable");
        assert!(v.get("current_track").is_none());
        concert_close(handle);
    }

    #[test]
    fn ffi_seek_without_track_reports_error() {
        let handle = ffi_controller();
        let v = read_ffi_json(concert_set_time(handle, 0.5));
        assert_eq!(v["error"], "no_media_loaded");
        concert_close(handle);
    }

    #[test]
    fn ffi_stop_when_idle() {
        let handle = ffi_controller();
        let v = read_ffi_json(concert_stop(handle));
        assert_eq!(v["is_playing"], false);
        assert!(v["media"].is_null());
        assert_eq!(concert_cancel(handle), 1);
        concert_close(handle);
    }
}
