//! Process and thread bootstrap: `CoInitializeEx`, `CoUninitialize` and
//! object creation.

use std::marker::PhantomData;

use super::error::ComResult;
use super::guid::Guid;
use super::hresult::HResult;
use super::unknown::{IUnknown, Interface};

pub const COINIT_MULTITHREADED: u32 = 0x0;
pub const COINIT_APARTMENTTHREADED: u32 = 0x2;
pub const COINIT_DISABLE_OLE1DDE: u32 = 0x4;
pub const COINIT_SPEED_OVER_MEMORY: u32 = 0x8;

pub const CLSCTX_INPROC_SERVER: u32 = 0x1;
pub const CLSCTX_INPROC_HANDLER: u32 = 0x2;
pub const CLSCTX_LOCAL_SERVER: u32 = 0x4;
pub const CLSCTX_REMOTE_SERVER: u32 = 0x10;
pub const CLSCTX_ALL: u32 = CLSCTX_INPROC_SERVER | CLSCTX_INPROC_HANDLER | CLSCTX_LOCAL_SERVER | CLSCTX_REMOTE_SERVER;

/// Threading model for the calling thread's COM apartment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyModel {
    /// Single-threaded apartment.
    ApartmentThreaded,
    /// The process-wide multithreaded apartment.
    MultiThreaded,
}

impl ConcurrencyModel {
    pub fn flags(self) -> u32 {
        match self {
            ConcurrencyModel::ApartmentThreaded => COINIT_APARTMENTTHREADED | COINIT_DISABLE_OLE1DDE,
            ConcurrencyModel::MultiThreaded => COINIT_MULTITHREADED | COINIT_DISABLE_OLE1DDE,
        }
    }
}

#[cfg(target_os = "windows")]
mod sys {
    use windows::core::{IUnknown as WinUnknown, Interface as _, GUID};
    use windows::Win32::System::Com::{CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX, COINIT};

    use crate::com::error::{ComError, ComResult};
    use crate::com::guid::Guid;
    use crate::com::hresult::HResult;
    use crate::com::unknown::RawPtr;

    pub unsafe fn initialize(flags: u32) -> ComResult<HResult> {
        Ok(HResult(CoInitializeEx(None, COINIT(flags as i32)).0))
    }

    pub unsafe fn uninitialize() -> ComResult<()> {
        CoUninitialize();
        Ok(())
    }

    pub unsafe fn create_unknown(clsid: &Guid, outer: Option<RawPtr>, clsctx: u32) -> ComResult<RawPtr> {
        let clsid = GUID::from_u128(clsid.to_u128());
        let outer = outer.as_ref().and_then(|raw| WinUnknown::from_raw_borrowed(raw));
        let unknown: WinUnknown = CoCreateInstance(&clsid, outer, CLSCTX(clsctx)).map_err(|e| ComError::Call {
            method: "CoCreateInstance",
            code: HResult(e.code().0),
        })?;
        Ok(unknown.into_raw())
    }
}

#[cfg(not(target_os = "windows"))]
mod sys {
    use crate::com::error::{ComError, ComResult};
    use crate::com::guid::Guid;
    use crate::com::hresult::HResult;
    use crate::com::unknown::RawPtr;

    pub unsafe fn initialize(_flags: u32) -> ComResult<HResult> {
        Err(ComError::Unsupported("CoInitializeEx"))
    }

    pub unsafe fn uninitialize() -> ComResult<()> {
        Err(ComError::Unsupported("CoUninitialize"))
    }

    pub unsafe fn create_unknown(_clsid: &Guid, _outer: Option<RawPtr>, _clsctx: u32) -> ComResult<RawPtr> {
        Err(ComError::Unsupported("CoCreateInstance"))
    }
}

/// Initializes COM on the calling thread.
///
/// Returns the success code so callers can tell a first initialization
/// (`S_OK`) from a nested one (`S_FALSE`); both need a matching
/// [`co_uninitialize`]. `RPC_E_CHANGED_MODE` comes back as an error.
pub fn co_initialize_ex(flags: u32) -> ComResult<HResult> {
    let hr = unsafe { sys::initialize(flags)? };
    hr.check("CoInitializeEx")?;
    Ok(hr)
}

/// Balances one successful `co_initialize_ex` on this thread.
pub fn co_uninitialize() -> ComResult<()> {
    unsafe { sys::uninitialize() }
}

/// Creates an instance of `clsid` and returns its `T` interface.
///
/// # Safety
///
/// COM must be initialized on the calling thread, and `outer` must be a
/// live controlling unknown when given.
pub unsafe fn co_create_instance<T: Interface>(clsid: &Guid, outer: Option<IUnknown>, clsctx: u32) -> ComResult<T> {
    let raw = sys::create_unknown(clsid, outer.map(|unk| unk.as_raw()), clsctx)?;
    let unknown = IUnknown::from_raw_checked(raw, "CoCreateInstance")?;
    let result = unknown.query_interface::<T>();
    unknown.release();
    result
}

/// Keeps COM initialized on the current thread until dropped.
///
/// Not `Send`: `CoUninitialize` has to run on the thread that initialized.
pub struct ComRuntime {
    model: ConcurrencyModel,
    _thread_bound: PhantomData<*const ()>,
}

impl ComRuntime {
    pub fn initialize(model: ConcurrencyModel) -> ComResult<Self> {
        let hr = co_initialize_ex(model.flags())?;
        log::debug!("COM initialized ({:?}): {}", model, hr);
        Ok(Self {
            model,
            _thread_bound: PhantomData,
        })
    }

    pub fn model(&self) -> ConcurrencyModel {
        self.model
    }
}

impl Drop for ComRuntime {
    fn drop(&mut self) {
        if let Err(e) = co_uninitialize() {
            log::warn!("CoUninitialize failed: {}", e);
        }
    }
}

impl std::fmt::Debug for ComRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComRuntime").field("model", &self.model).finish()
    }
}
