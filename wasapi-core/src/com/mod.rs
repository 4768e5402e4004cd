//! COM plumbing shared by every interface binding.

pub mod error;
pub mod guid;
pub mod hresult;
pub mod memory;
pub mod property_store;
pub mod propvariant;
pub mod runtime;
pub mod unknown;
pub mod wide;

pub use error::{ComError, ComResult};
pub use guid::Guid;
pub use hresult::HResult;
pub use memory::{co_task_mem_alloc, co_task_mem_free};
pub use property_store::{IPropertyStore, IPropertyStoreVtbl, STGM_READ, STGM_READWRITE, STGM_WRITE};
pub use propvariant::{PropVariant, PropVariantGuard, PropertyKey};
pub use runtime::{
    co_create_instance, co_initialize_ex, co_uninitialize, ComRuntime, ConcurrencyModel, CLSCTX_ALL,
    CLSCTX_INPROC_HANDLER, CLSCTX_INPROC_SERVER, CLSCTX_LOCAL_SERVER, CLSCTX_REMOTE_SERVER,
    COINIT_APARTMENTTHREADED, COINIT_DISABLE_OLE1DDE, COINIT_MULTITHREADED, COINIT_SPEED_OVER_MEMORY,
};
pub use unknown::{ComOwned, IUnknown, IUnknownVtbl, Interface, RawPtr, IID_IUNKNOWN};
pub use wide::WideString;
