use std::fmt;

use super::error::{ComError, ComResult};
use super::hresult::E_OUTOFMEMORY;
use super::memory::{co_task_mem_alloc, co_task_mem_free};

/// An owned, NUL-terminated UTF-16 string for `LPCWSTR` arguments.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct WideString(Vec<u16>);

impl WideString {
    /// Encodes `text`. Interior NULs would silently truncate the string on
    /// the other side, so they are rejected.
    pub fn new(text: &str) -> ComResult<Self> {
        if text.contains('\0') {
            return Err(ComError::InvalidArgument(format!("string contains an interior NUL: {:?}", text)));
        }
        let mut units: Vec<u16> = text.encode_utf16().collect();
        units.push(0);
        Ok(Self(units))
    }

    /// Valid for as long as `self` is alive.
    pub fn as_ptr(&self) -> *const u16 {
        self.0.as_ptr()
    }

    /// Code units, excluding the terminator.
    pub fn as_units(&self) -> &[u16] {
        &self.0[..self.0.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.0.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the string, terminator included, into a task-allocated block
    /// the receiver is expected to free.
    pub fn to_task_mem(&self) -> ComResult<*mut u16> {
        let bytes = self.0.len() * std::mem::size_of::<u16>();
        let block = co_task_mem_alloc(bytes) as *mut u16;
        if block.is_null() {
            return Err(ComError::Call { method: "CoTaskMemAlloc", code: E_OUTOFMEMORY });
        }
        unsafe {
            std::ptr::copy_nonoverlapping(self.0.as_ptr(), block, self.0.len());
        }
        Ok(block)
    }
}

impl fmt::Display for WideString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf16_lossy(self.as_units()))
    }
}

impl fmt::Debug for WideString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WideString({:?})", self.to_string())
    }
}

/// Number of code units before the terminator.
///
/// # Safety
///
/// `ptr` must be null or point at a NUL-terminated UTF-16 string.
pub unsafe fn wide_len(ptr: *const u16) -> usize {
    if ptr.is_null() {
        return 0;
    }
    let mut len = 0;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    len
}

/// Decodes a NUL-terminated UTF-16 string, replacing unpaired surrogates.
/// Null decodes to the empty string.
///
/// # Safety
///
/// Same as [`wide_len`].
pub unsafe fn wide_ptr_to_string(ptr: *const u16) -> String {
    if ptr.is_null() {
        return String::new();
    }
    let units = std::slice::from_raw_parts(ptr, wide_len(ptr));
    String::from_utf16_lossy(units)
}

/// Decodes a task-allocated string and frees it.
///
/// # Safety
///
/// `ptr` must be null or a NUL-terminated string owned by the caller and
/// allocated with the task allocator.
pub unsafe fn take_task_wide_string(ptr: *mut u16) -> String {
    let text = wide_ptr_to_string(ptr);
    co_task_mem_free(ptr.cast());
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_with_terminator() {
        let wide = WideString::new("Hi").unwrap();
        assert_eq!(wide.as_units(), &[0x48, 0x69]);
        assert_eq!(wide.len(), 2);
        assert_eq!(unsafe { *wide.as_ptr().add(2) }, 0);
    }

    #[test]
    fn rejects_interior_nul() {
        let err = WideString::new("a\0b").unwrap_err();
        assert!(matches!(err, ComError::InvalidArgument(_)));
    }

    #[test]
    fn decodes_non_ascii_device_ids() {
        let id = "{0.0.0.00000000}.{Lautsprecher-ä-🎧}";
        let wide = WideString::new(id).unwrap();
        assert_eq!(unsafe { wide_ptr_to_string(wide.as_ptr()) }, id);
        assert_eq!(wide.to_string(), id);
    }

    #[test]
    fn null_decodes_to_empty() {
        assert_eq!(unsafe { wide_ptr_to_string(std::ptr::null()) }, "");
        assert_eq!(unsafe { wide_len(std::ptr::null()) }, 0);
    }

    #[test]
    fn task_memory_copy_is_taken_back() {
        let wide = WideString::new("Speakers (Realtek)").unwrap();
        let block = wide.to_task_mem().unwrap();
        assert_eq!(unsafe { take_task_wide_string(block) }, "Speakers (Realtek)");
    }

    #[test]
    fn empty_string_is_just_the_terminator() {
        let wide = WideString::new("").unwrap();
        assert!(wide.is_empty());
        assert_eq!(unsafe { wide_len(wide.as_ptr()) }, 0);
    }
}
