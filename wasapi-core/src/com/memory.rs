//! The COM task allocator.
//!
//! Blocks handed out by COM methods (device ids, mix formats, PROPVARIANT
//! strings) belong to the caller and go back through [`co_task_mem_free`].
//! Off Windows the C heap stands in so fakes follow the same rules.

use std::ffi::c_void;

#[cfg(target_os = "windows")]
mod sys {
    use std::ffi::c_void;

    use windows::Win32::System::Com::{CoTaskMemAlloc, CoTaskMemFree};

    pub unsafe fn alloc(len: usize) -> *mut c_void {
        CoTaskMemAlloc(len)
    }

    pub unsafe fn free(ptr: *mut c_void) {
        CoTaskMemFree(Some(ptr as *const c_void));
    }
}

#[cfg(not(target_os = "windows"))]
mod sys {
    use std::ffi::c_void;

    pub unsafe fn alloc(len: usize) -> *mut c_void {
        libc::malloc(len.max(1))
    }

    pub unsafe fn free(ptr: *mut c_void) {
        libc::free(ptr)
    }
}

/// Allocates `len` bytes from the task allocator. Returns null on failure.
pub fn co_task_mem_alloc(len: usize) -> *mut c_void {
    unsafe { sys::alloc(len) }
}

/// Frees a task-allocated block. Null is a no-op.
///
/// # Safety
///
/// `ptr` must be null or a block from the task allocator that has not been
/// freed yet.
pub unsafe fn co_task_mem_free(ptr: *mut c_void) {
    if !ptr.is_null() {
        sys::free(ptr);
    }
}
