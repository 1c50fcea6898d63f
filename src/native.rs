//! [`StafApi`] over the STAF C library, loaded at runtime

use std::ffi::CString;
use std::os::raw::c_char;
use std::path::Path;
use std::{fmt, ptr, slice};

use libloading::Library;
use tracing::{debug, warn};

use crate::api::{StafApi, SyncOption, Submission};
use crate::config::ApiConfig;
use crate::error::{Result, StafError};
use crate::rc::{self, Rc};

type RegisterFn = unsafe extern "C" fn(name: *const c_char, handle: *mut u32) -> Rc;
type UnRegisterFn = unsafe extern "C" fn(handle: u32) -> Rc;
type Submit2Fn = unsafe extern "C" fn(
    handle: u32,
    sync_option: u32,
    location: *const c_char,
    service: *const c_char,
    request: *const c_char,
    request_len: u32,
    result: *mut *mut c_char,
    result_len: *mut u32,
) -> Rc;
type FreeFn = unsafe extern "C" fn(handle: u32, result: *mut c_char) -> Rc;

/// The loaded runtime library and the entry points a handle uses.
pub struct NativeApi {
    register: RegisterFn,
    unregister: UnRegisterFn,
    submit: Submit2Fn,
    free: FreeFn,
    path: String,
    // Keeps the function pointers above valid; must outlive them.
    _library: Library,
}

impl NativeApi {
    /// Load the library named by `config`, trying each candidate in order.
    pub fn load(config: &ApiConfig) -> Result<Self> {
        let order = config.search_order();
        if order.is_empty() {
            return Err(StafError::Library("no library candidates configured".into()));
        }

        let mut failures = Vec::new();
        for candidate in &order {
            match Self::open(candidate) {
                Ok(api) => {
                    debug!(library = %api.path, "loaded STAF library");
                    return Ok(api);
                }
                Err(e) => {
                    debug!(library = %candidate.display(), error = %e, "library candidate failed");
                    failures.push(format!("{}: {}", candidate.display(), e));
                }
            }
        }
        Err(StafError::Library(format!(
            "couldn't load the STAF library ({})",
            failures.join("; ")
        )))
    }

    fn open(path: &Path) -> std::result::Result<Self, libloading::Error> {
        // SAFETY: loading runs the library's initialisers; the STAF runtime
        // library has no unusual requirements there. The symbol types match
        // the C declarations in STAF.h.
        unsafe {
            let library = Library::new(path)?;
            let register = *library.get::<RegisterFn>(b"STAFRegisterUTF8\0")?;
            let unregister = *library.get::<UnRegisterFn>(b"STAFUnRegister\0")?;
            let submit = *library.get::<Submit2Fn>(b"STAFSubmit2UTF8\0")?;
            let free = *library.get::<FreeFn>(b"STAFFree\0")?;
            Ok(Self {
                register,
                unregister,
                submit,
                free,
                path: path.display().to_string(),
                _library: library,
            })
        }
    }

    /// The path or name the library was loaded from.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Debug for NativeApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeApi").field("path", &self.path).finish()
    }
}

impl StafApi for NativeApi {
    fn register(&self, name: &str) -> std::result::Result<u32, Rc> {
        let name = CString::new(name).map_err(|_| rc::INVALID_VALUE)?;
        let mut handle: u32 = 0;
        // SAFETY: `name` is NUL-terminated and outlives the call.
        let code = unsafe { (self.register)(name.as_ptr(), &mut handle) };
        if code == rc::OK {
            Ok(handle)
        } else {
            Err(code)
        }
    }

    fn unregister(&self, handle: u32) -> std::result::Result<(), Rc> {
        // SAFETY: plain integer argument.
        let code = unsafe { (self.unregister)(handle) };
        if code == rc::OK {
            Ok(())
        } else {
            Err(code)
        }
    }

    fn submit(
        &self,
        handle: u32,
        sync: SyncOption,
        location: &str,
        service: &str,
        request: &[u8],
    ) -> Submission {
        let (location, service) = match (CString::new(location), CString::new(service)) {
            (Ok(l), Ok(s)) => (l, s),
            _ => {
                return Submission::failed(
                    rc::INVALID_VALUE,
                    "location and service must not contain NUL",
                )
            }
        };
        let request_len = match u32::try_from(request.len()) {
            Ok(n) => n,
            Err(_) => return Submission::failed(rc::INVALID_VALUE, "request too long"),
        };

        let mut result_ptr: *mut c_char = ptr::null_mut();
        let mut result_len: u32 = 0;
        // SAFETY: the strings are NUL-terminated, `request` is valid for
        // `request_len` bytes, and the out-pointers refer to live locals.
        let code = unsafe {
            (self.submit)(
                handle,
                sync.as_raw(),
                location.as_ptr(),
                service.as_ptr(),
                request.as_ptr().cast::<c_char>(),
                request_len,
                &mut result_ptr,
                &mut result_len,
            )
        };

        let mut result = Vec::new();
        if !result_ptr.is_null() {
            if result_len > 0 {
                // SAFETY: the runtime hands back `result_len` readable bytes.
                let bytes =
                    unsafe { slice::from_raw_parts(result_ptr.cast::<u8>(), result_len as usize) };
                result.extend_from_slice(bytes);
            }
            // The buffer is allocated even when `code` is an error.
            // SAFETY: `result_ptr` came from STAFSubmit2UTF8 and is freed once.
            let free_rc = unsafe { (self.free)(handle, result_ptr) };
            if free_rc != rc::OK {
                warn!(handle, rc = free_rc, "STAFFree failed");
            }
        }

        Submission { rc: code, result }
    }
}
