use std::ffi::c_void;
use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::Deref;
use std::ptr;

use super::error::{ComError, ComResult};
use super::guid::Guid;
use super::hresult::HResult;

/// An untyped COM object pointer.
pub type RawPtr = *mut c_void;

pub const IID_IUNKNOWN: Guid = Guid::from_u128(0x00000000_0000_0000_c000_000000000046);

/// The three slots every COM vtable starts with.
#[repr(C)]
pub struct IUnknownVtbl {
    pub query_interface: unsafe extern "system" fn(this: RawPtr, riid: *const Guid, ppv: *mut RawPtr) -> HResult,
    pub add_ref: unsafe extern "system" fn(this: RawPtr) -> u32,
    pub release: unsafe extern "system" fn(this: RawPtr) -> u32,
}

/// A typed, non-owning handle to a COM object.
///
/// # Safety
///
/// Implementors must be `#[repr(transparent)]` over a non-null object
/// pointer whose first field points at a `Self::Vtable`, and
/// `Self::Vtable` must begin with an [`IUnknownVtbl`].
pub unsafe trait Interface: Copy + Sized {
    type Vtable;
    const IID: Guid;
    const NAME: &'static str;

    /// Wraps `raw` without touching its reference count.
    ///
    /// # Safety
    ///
    /// `raw` must be a non-null pointer to an object implementing this
    /// interface.
    unsafe fn from_raw(raw: RawPtr) -> Self;

    fn as_raw(&self) -> RawPtr;

    /// Hands the pointer back to the caller, who becomes responsible for
    /// the reference it carries.
    fn into_raw(self) -> RawPtr {
        self.as_raw()
    }

    /// Like [`Interface::from_raw`], but turns a null pointer into
    /// [`ComError::NullPointer`] labelled with `method`.
    unsafe fn from_raw_checked(raw: RawPtr, method: &'static str) -> ComResult<Self> {
        if raw.is_null() {
            Err(ComError::NullPointer(method))
        } else {
            Ok(Self::from_raw(raw))
        }
    }

    /// # Safety
    ///
    /// The object must still be alive.
    unsafe fn vtable(&self) -> &Self::Vtable {
        &**(self.as_raw() as *const *const Self::Vtable)
    }

    unsafe fn unknown_vtable(&self) -> &IUnknownVtbl {
        &**(self.as_raw() as *const *const IUnknownVtbl)
    }

    /// Increments the reference count and returns the new value.
    unsafe fn add_ref(&self) -> u32 {
        (self.unknown_vtable().add_ref)(self.as_raw())
    }

    /// Decrements the reference count and returns the new value. The handle
    /// must not be used once the count reaches zero.
    ///
    /// The returned count is informational only; a non-zero value is not an
    /// error.
    unsafe fn release(self) -> u32 {
        (self.unknown_vtable().release)(self.as_raw())
    }

    /// Asks the object for another interface. The result carries its own
    /// reference.
    unsafe fn query_interface<T: Interface>(&self) -> ComResult<T> {
        let vtbl = self.unknown_vtable();
        out_interface(method!(IUnknown::QueryInterface), |ppv| {
            (vtbl.query_interface)(self.as_raw(), &T::IID, ppv)
        })
    }

    fn as_unknown(&self) -> IUnknown {
        // Every interface pointer is also a valid IUnknown pointer.
        unsafe { IUnknown::from_raw(self.as_raw()) }
    }
}

com_interface! {
    /// The root interface.
    pub struct IUnknown: IUnknownVtbl = IID_IUNKNOWN;
}

/// Runs a call that writes an interface pointer through its last argument
/// and wraps the result.
pub(crate) unsafe fn out_interface<T: Interface>(
    method: &'static str,
    call: impl FnOnce(*mut RawPtr) -> HResult,
) -> ComResult<T> {
    let mut raw: RawPtr = ptr::null_mut();
    call(&mut raw).check(method)?;
    T::from_raw_checked(raw, method)
}

/// Owning guard that releases the wrapped interface on drop.
pub struct ComOwned<T: Interface>(T);

impl<T: Interface> ComOwned<T> {
    /// Takes over one reference held by the caller.
    ///
    /// # Safety
    ///
    /// The caller must own a reference on `inner` and must not release it
    /// separately.
    pub unsafe fn new(inner: T) -> Self {
        Self(inner)
    }

    pub fn get(&self) -> T {
        self.0
    }

    /// Gives up ownership without releasing.
    pub fn into_inner(self) -> T {
        let this = ManuallyDrop::new(self);
        this.0
    }
}

impl<T: Interface> Deref for ComOwned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Interface> Clone for ComOwned<T> {
    fn clone(&self) -> Self {
        unsafe {
            self.0.add_ref();
        }
        Self(self.0)
    }
}

impl<T: Interface> Drop for ComOwned<T> {
    fn drop(&mut self) {
        unsafe {
            self.0.release();
        }
    }
}

impl<T: Interface> fmt::Debug for ComOwned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComOwned<{}>({:p})", T::NAME, self.0.as_raw())
    }
}
