use std::fmt;
use std::mem::size_of;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};

use super::error::{ComError, ComResult};
use super::guid::Guid;
use super::hresult::E_OUTOFMEMORY;
use super::memory::co_task_mem_alloc;
use super::wide::{wide_ptr_to_string, WideString};

pub const VT_EMPTY: u16 = 0;
pub const VT_NULL: u16 = 1;
pub const VT_I2: u16 = 2;
pub const VT_I4: u16 = 3;
pub const VT_R4: u16 = 4;
pub const VT_R8: u16 = 5;
pub const VT_BOOL: u16 = 11;
pub const VT_I1: u16 = 16;
pub const VT_UI1: u16 = 17;
pub const VT_UI2: u16 = 18;
pub const VT_UI4: u16 = 19;
pub const VT_I8: u16 = 20;
pub const VT_UI8: u16 = 21;
pub const VT_INT: u16 = 22;
pub const VT_UINT: u16 = 23;
pub const VT_LPWSTR: u16 = 31;
pub const VT_BLOB: u16 = 65;
pub const VT_CLSID: u16 = 72;

const VARIANT_TRUE: i16 = -1;
const VARIANT_FALSE: i16 = 0;

/// Identifies a property: a format id plus a property id within it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyKey {
    pub fmtid: Guid,
    pub pid: u32,
}

impl PropertyKey {
    pub const fn new(fmtid: Guid, pid: u32) -> Self {
        Self { fmtid, pid }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}", self.fmtid, self.pid)
    }
}

/// The `PROPVARIANT` tagged union.
///
/// ```text
/// [0-1]   vt (VARTYPE)
/// [2-7]   reserved
/// [8-23]  value union
/// ```
///
/// A value has a single owner: it is neither `Copy` nor `Clone`, since the
/// payload pointers are owned. Dropping it does not free the payload; call
/// [`PropVariant::clear`] or wrap it in a [`PropVariantGuard`].
#[repr(C)]
#[derive(Default)]
pub struct PropVariant {
    vt: u16,
    reserved: [u16; 3],
    data: [u64; 2],
}

impl PropVariant {
    pub const fn empty() -> Self {
        Self {
            vt: VT_EMPTY,
            reserved: [0; 3],
            data: [0; 2],
        }
    }

    fn with(vt: u16, low: u64) -> Self {
        Self {
            vt,
            reserved: [0; 3],
            data: [low, 0],
        }
    }

    pub fn from_u32(value: u32) -> Self {
        Self::with(VT_UI4, value as u64)
    }

    pub fn from_i32(value: i32) -> Self {
        Self::with(VT_I4, value as u32 as u64)
    }

    pub fn from_u64(value: u64) -> Self {
        Self::with(VT_UI8, value)
    }

    pub fn from_bool(value: bool) -> Self {
        let flag = if value { VARIANT_TRUE } else { VARIANT_FALSE };
        Self::with(VT_BOOL, flag as u16 as u64)
    }

    pub fn from_f32(value: f32) -> Self {
        Self::with(VT_R4, value.to_bits() as u64)
    }

    pub fn from_f64(value: f64) -> Self {
        Self::with(VT_R8, value.to_bits())
    }

    /// A `VT_LPWSTR` holding a task-allocated copy of `text`, so that
    /// [`PropVariant::clear`] (or the callee) can free it.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> ComResult<Self> {
        let block = WideString::new(text)?.to_task_mem()?;
        Ok(Self::with(VT_LPWSTR, block as usize as u64))
    }

    /// A `VT_BLOB` holding a task-allocated copy of `bytes`.
    pub fn from_blob(bytes: &[u8]) -> ComResult<Self> {
        let len = u32::try_from(bytes.len())
            .map_err(|_| ComError::InvalidArgument(format!("blob of {} bytes is too large", bytes.len())))?;
        let block = co_task_mem_alloc(bytes.len()) as *mut u8;
        if block.is_null() {
            return Err(ComError::Call { method: "CoTaskMemAlloc", code: E_OUTOFMEMORY });
        }
        let mut value = Self::with(VT_BLOB, len as u64);
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), block, bytes.len());
            value.write_ptr_at(size_of::<usize>(), block);
        }
        Ok(value)
    }

    pub fn vt(&self) -> u16 {
        self.vt
    }

    pub fn is_empty(&self) -> bool {
        self.vt == VT_EMPTY
    }

    fn mismatch(&self, expected: &'static str) -> ComError {
        ComError::PropertyType {
            expected,
            found: self.vt,
        }
    }

    fn low_u32(&self) -> u32 {
        self.data[0] as u32
    }

    fn data_bytes(&self) -> *const u8 {
        self.data.as_ptr() as *const u8
    }

    unsafe fn read_ptr_at<T>(&self, offset: usize) -> *mut T {
        std::ptr::read_unaligned(self.data_bytes().add(offset) as *const *mut T)
    }

    unsafe fn write_ptr_at<T>(&mut self, offset: usize, ptr: *mut T) {
        let base = self.data.as_mut_ptr() as *mut u8;
        std::ptr::write_unaligned(base.add(offset) as *mut *mut T, ptr);
    }

    /// The raw `pwszVal` pointer, or an error for other tags.
    pub fn pwsz_val(&self) -> ComResult<*const u16> {
        if self.vt != VT_LPWSTR {
            return Err(self.mismatch("VT_LPWSTR"));
        }
        Ok(unsafe { self.read_ptr_at::<u16>(0) })
    }

    /// Decodes a `VT_LPWSTR` value.
    pub fn to_string_value(&self) -> ComResult<String> {
        let ptr = self.pwsz_val()?;
        Ok(unsafe { wide_ptr_to_string(ptr) })
    }

    pub fn as_u32(&self) -> ComResult<u32> {
        match self.vt {
            VT_UI4 | VT_UINT => Ok(self.low_u32()),
            VT_UI2 => Ok(self.low_u32() & 0xFFFF),
            VT_UI1 => Ok(self.low_u32() & 0xFF),
            _ => Err(self.mismatch("VT_UI4")),
        }
    }

    pub fn as_i32(&self) -> ComResult<i32> {
        match self.vt {
            VT_I4 | VT_INT => Ok(self.low_u32() as i32),
            VT_I2 => Ok(self.low_u32() as u16 as i16 as i32),
            VT_I1 => Ok(self.low_u32() as u8 as i8 as i32),
            _ => Err(self.mismatch("VT_I4")),
        }
    }

    pub fn as_u64(&self) -> ComResult<u64> {
        match self.vt {
            VT_UI8 => Ok(self.data[0]),
            VT_UI4 | VT_UINT => Ok(self.low_u32() as u64),
            _ => Err(self.mismatch("VT_UI8")),
        }
    }

    pub fn as_i64(&self) -> ComResult<i64> {
        match self.vt {
            VT_I8 => Ok(self.data[0] as i64),
            VT_I4 | VT_INT => Ok(self.low_u32() as i32 as i64),
            _ => Err(self.mismatch("VT_I8")),
        }
    }

    pub fn as_bool(&self) -> ComResult<bool> {
        if self.vt != VT_BOOL {
            return Err(self.mismatch("VT_BOOL"));
        }
        Ok(self.low_u32() as u16 as i16 != VARIANT_FALSE)
    }

    pub fn as_f32(&self) -> ComResult<f32> {
        if self.vt != VT_R4 {
            return Err(self.mismatch("VT_R4"));
        }
        Ok(f32::from_bits(self.low_u32()))
    }

    pub fn as_f64(&self) -> ComResult<f64> {
        match self.vt {
            VT_R8 => Ok(f64::from_bits(self.data[0])),
            VT_R4 => Ok(f32::from_bits(self.low_u32()) as f64),
            _ => Err(self.mismatch("VT_R8")),
        }
    }

    /// Reads the GUID a `VT_CLSID` value points at.
    pub fn as_guid(&self) -> ComResult<Guid> {
        if self.vt != VT_CLSID {
            return Err(self.mismatch("VT_CLSID"));
        }
        let ptr = unsafe { self.read_ptr_at::<Guid>(0) };
        if ptr.is_null() {
            return Err(ComError::NullPointer("PROPVARIANT::puuid"));
        }
        Ok(unsafe { std::ptr::read_unaligned(ptr) })
    }

    /// Copies the bytes of a `VT_BLOB` value.
    pub fn as_blob(&self) -> ComResult<Vec<u8>> {
        if self.vt != VT_BLOB {
            return Err(self.mismatch("VT_BLOB"));
        }
        let len = self.low_u32() as usize;
        // BLOB is { cbSize: u32, pBlobData: *mut u8 }; the pointer sits at
        // pointer alignment.
        let ptr = unsafe { self.read_ptr_at::<u8>(size_of::<usize>()) };
        if len == 0 {
            return Ok(Vec::new());
        }
        if ptr.is_null() {
            return Err(ComError::NullPointer("PROPVARIANT::blob"));
        }
        Ok(unsafe { std::slice::from_raw_parts(ptr, len) }.to_vec())
    }

    /// Frees whatever the value owns and resets it to `VT_EMPTY`.
    pub fn clear(&mut self) -> ComResult<()> {
        let result = unsafe { sys::clear(self) };
        *self = Self::empty();
        result
    }

    /// Takes ownership so the payload is freed on drop.
    pub fn into_guard(self) -> PropVariantGuard {
        PropVariantGuard(self)
    }
}

impl fmt::Debug for PropVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("PropVariant");
        out.field("vt", &vt_name(self.vt));
        match self.vt {
            VT_LPWSTR => out.field("value", &self.to_string_value().unwrap_or_default()),
            VT_BOOL => out.field("value", &self.as_bool().unwrap_or_default()),
            VT_R4 | VT_R8 => out.field("value", &self.as_f64().unwrap_or_default()),
            VT_EMPTY | VT_NULL => &mut out,
            _ => out.field("data", &self.data),
        };
        out.finish()
    }
}

pub fn vt_name(vt: u16) -> &'static str {
    match vt {
        VT_EMPTY => "VT_EMPTY",
        VT_NULL => "VT_NULL",
        VT_I2 => "VT_I2",
        VT_I4 => "VT_I4",
        VT_R4 => "VT_R4",
        VT_R8 => "VT_R8",
        VT_BOOL => "VT_BOOL",
        VT_I1 => "VT_I1",
        VT_UI1 => "VT_UI1",
        VT_UI2 => "VT_UI2",
        VT_UI4 => "VT_UI4",
        VT_I8 => "VT_I8",
        VT_UI8 => "VT_UI8",
        VT_INT => "VT_INT",
        VT_UINT => "VT_UINT",
        VT_LPWSTR => "VT_LPWSTR",
        VT_BLOB => "VT_BLOB",
        VT_CLSID => "VT_CLSID",
        _ => "VT_?",
    }
}

#[cfg(target_os = "windows")]
mod sys {
    use windows::Win32::System::Com::StructuredStorage::{PropVariantClear, PROPVARIANT};

    use super::PropVariant;
    use crate::com::error::{ComError, ComResult};
    use crate::com::hresult::HResult;

    pub unsafe fn clear(value: &mut PropVariant) -> ComResult<()> {
        PropVariantClear(value as *mut PropVariant as *mut PROPVARIANT).map_err(|e| ComError::Call {
            method: "PropVariantClear",
            code: HResult(e.code().0),
        })
    }
}

#[cfg(not(target_os = "windows"))]
mod sys {
    use std::mem::size_of;

    use super::{PropVariant, VT_BLOB, VT_CLSID, VT_LPWSTR};
    use crate::com::error::ComResult;
    use crate::com::memory::co_task_mem_free;

    pub unsafe fn clear(value: &mut PropVariant) -> ComResult<()> {
        match value.vt {
            VT_LPWSTR | VT_CLSID => co_task_mem_free(value.read_ptr_at(0)),
            VT_BLOB => co_task_mem_free(value.read_ptr_at(size_of::<usize>())),
            _ => {}
        }
        Ok(())
    }
}

/// Owns a [`PropVariant`] and clears it on drop.
#[derive(Debug, Default)]
pub struct PropVariantGuard(PropVariant);

impl PropVariantGuard {
    /// Gives the value back without clearing it.
    pub fn into_inner(self) -> PropVariant {
        let mut this = ManuallyDrop::new(self);
        std::mem::take(&mut this.0)
    }
}

impl Deref for PropVariantGuard {
    type Target = PropVariant;

    fn deref(&self) -> &PropVariant {
        &self.0
    }
}

impl DerefMut for PropVariantGuard {
    fn deref_mut(&mut self) -> &mut PropVariant {
        &mut self.0
    }
}

impl Drop for PropVariantGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.clear() {
            log::warn!("failed to clear PROPVARIANT: {}", e);
        }
    }
}
