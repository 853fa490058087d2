//! Mapping of platform error codes to the error classes the deletion engine recovers from.
//!
//! Both tables are compiled on every platform so they can be tested anywhere; only the one
//! matching the host is consulted by [`classify_io_error`].

use std::io;

use core_types::ErrorClass;

const ERROR_ACCESS_DENIED: i32 = 5;
const ERROR_SHARING_VIOLATION: i32 = 32;
const ERROR_LOCK_VIOLATION: i32 = 33;
const ERROR_DIR_NOT_EMPTY: i32 = 145;
const ERROR_USER_MAPPED_FILE: i32 = 1224;

const EPERM: i32 = 1;
const EACCES: i32 = 13;
const EBUSY: i32 = 16;
const ETXTBSY: i32 = 26;

pub fn classify_io_error(error: &io::Error) -> ErrorClass {
    if let Some(code) = error.raw_os_error() {
        let class = classify_os_code(code);
        if class != ErrorClass::Other {
            return class;
        }
    }
    classify_error_kind(error.kind())
}

#[cfg(windows)]
fn classify_os_code(code: i32) -> ErrorClass {
    classify_windows_code(code)
}

#[cfg(not(windows))]
fn classify_os_code(code: i32) -> ErrorClass {
    classify_unix_code(code)
}

pub fn classify_windows_code(code: i32) -> ErrorClass {
    match code {
        ERROR_SHARING_VIOLATION | ERROR_LOCK_VIOLATION | ERROR_USER_MAPPED_FILE => ErrorClass::Busy,
        // A directory still holding entries whose delete is pending on an open handle.
        ERROR_DIR_NOT_EMPTY => ErrorClass::Busy,
        ERROR_ACCESS_DENIED => ErrorClass::AccessDenied,
        _ => ErrorClass::Other,
    }
}

pub fn classify_unix_code(code: i32) -> ErrorClass {
    match code {
        EBUSY | ETXTBSY => ErrorClass::Busy,
        EACCES | EPERM => ErrorClass::AccessDenied,
        _ => ErrorClass::Other,
    }
}

pub fn classify_error_kind(kind: io::ErrorKind) -> ErrorClass {
    match kind {
        io::ErrorKind::ResourceBusy | io::ErrorKind::ExecutableFileBusy => ErrorClass::Busy,
        io::ErrorKind::PermissionDenied => ErrorClass::AccessDenied,
        _ => ErrorClass::Other,
    }
}
