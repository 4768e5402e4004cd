//! In-process fake COM objects for exercising the vtable dispatch.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::com::hresult::{E_NOINTERFACE, E_POINTER, S_OK};
use crate::com::{Guid, HResult, Interface, RawPtr, IID_IUNKNOWN};

/// Object layout every fake shares: the vtable pointer first, then the
/// bookkeeping the generic `IUnknown` slots need, then per-test state.
#[repr(C)]
pub(crate) struct FakeObject<V: 'static, S> {
    vtbl: &'static V,
    refs: AtomicU32,
    iids: &'static [Guid],
    pub state: S,
}

/// Owns a fake object for the duration of a test. Releasing to zero does
/// not free it so the test can still inspect the state afterwards.
pub(crate) struct Fake<V: 'static, S> {
    object: Box<FakeObject<V, S>>,
}

impl<V: 'static, S> Fake<V, S> {
    pub fn new(vtbl: &'static V, iids: &'static [Guid], state: S) -> Self {
        Self {
            object: Box::new(FakeObject {
                vtbl,
                refs: AtomicU32::new(1),
                iids,
                state,
            }),
        }
    }

    pub fn raw(&self) -> RawPtr {
        &*self.object as *const FakeObject<V, S> as RawPtr
    }

    pub fn handle<T: Interface>(&self) -> T {
        unsafe { T::from_raw(self.raw()) }
    }

    pub fn refs(&self) -> u32 {
        self.object.refs.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> &S {
        &self.object.state
    }
}

/// Recovers the fake behind `this` inside a vtable slot.
pub(crate) unsafe fn object<'a, V: 'static, S>(this: RawPtr) -> &'a FakeObject<V, S> {
    &*(this as *const FakeObject<V, S>)
}

/// Shortcut for the per-test state behind `this`.
pub(crate) unsafe fn state<'a, V: 'static, S>(this: RawPtr) -> &'a S {
    &object::<V, S>(this).state
}

pub(crate) unsafe extern "system" fn fake_query_interface<V: 'static, S>(
    this: RawPtr,
    riid: *const Guid,
    ppv: *mut RawPtr,
) -> HResult {
    if ppv.is_null() {
        return E_POINTER;
    }
    let obj = object::<V, S>(this);
    let iid = *riid;
    if iid == IID_IUNKNOWN || obj.iids.contains(&iid) {
        obj.refs.fetch_add(1, Ordering::SeqCst);
        *ppv = this;
        S_OK
    } else {
        *ppv = std::ptr::null_mut();
        E_NOINTERFACE
    }
}

pub(crate) unsafe extern "system" fn fake_add_ref<V: 'static, S>(this: RawPtr) -> u32 {
    object::<V, S>(this).refs.fetch_add(1, Ordering::SeqCst) + 1
}

pub(crate) unsafe extern "system" fn fake_release<V: 'static, S>(this: RawPtr) -> u32 {
    object::<V, S>(this).refs.fetch_sub(1, Ordering::SeqCst) - 1
}

/// Builds the `IUnknownVtbl` for a fake with vtable `V` and state `S`.
macro_rules! fake_unknown {
    ($vtbl:ty, $state:ty) => {
        $crate::com::IUnknownVtbl {
            query_interface: $crate::testing::fake_query_interface::<$vtbl, $state>,
            add_ref: $crate::testing::fake_add_ref::<$vtbl, $state>,
            release: $crate::testing::fake_release::<$vtbl, $state>,
        }
    };
}

pub(crate) use fake_unknown;

/// Copies `text` into a task-allocated, NUL-terminated UTF-16 block, the
/// way COM servers hand strings out.
pub(crate) fn task_wide(text: &str) -> *mut u16 {
    crate::com::WideString::new(text)
        .and_then(|wide| wide.to_task_mem())
        .unwrap()
}
