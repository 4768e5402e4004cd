use crate::com::unknown::out_interface;
use crate::com::{ComResult, Guid, HResult, IUnknownVtbl, Interface, RawPtr};

use super::device::IMMDevice;

pub const IID_IMM_DEVICE_COLLECTION: Guid = Guid::from_u128(0x0bd7a1be_7a1a_44db_8397_cc5392387b5e);

#[repr(C)]
pub struct IMMDeviceCollectionVtbl {
    pub base: IUnknownVtbl,
    pub get_count: unsafe extern "system" fn(this: RawPtr, count: *mut u32) -> HResult,
    pub item: unsafe extern "system" fn(this: RawPtr, index: u32, device: *mut RawPtr) -> HResult,
}

com_interface! {
    /// A snapshot of endpoints returned by
    /// [`IMMDeviceEnumerator::enum_audio_endpoints`](super::IMMDeviceEnumerator::enum_audio_endpoints).
    pub struct IMMDeviceCollection: IMMDeviceCollectionVtbl = IID_IMM_DEVICE_COLLECTION;
}

impl IMMDeviceCollection {
    /// Number of endpoints in the collection.
    pub unsafe fn get_count(&self) -> ComResult<u32> {
        let mut count = 0u32;
        (self.vtable().get_count)(self.as_raw(), &mut count).check(method!(IMMDeviceCollection::GetCount))?;
        Ok(count)
    }

    /// The endpoint at `index`, with a reference owned by the caller.
    pub unsafe fn item(&self, index: u32) -> ComResult<IMMDevice> {
        out_interface(method!(IMMDeviceCollection::Item), |ppv| {
            (self.vtable().item)(self.as_raw(), index, ppv)
        })
    }

    /// Every device in the collection. Each handle carries its own
    /// reference; on error the ones already fetched are released.
    pub unsafe fn devices(&self) -> ComResult<Vec<IMMDevice>> {
        let count = self.get_count()?;
        let mut devices = Vec::with_capacity(count as usize);
        for index in 0..count {
            match self.item(index) {
                Ok(device) => devices.push(device),
                Err(e) => {
                    for device in devices {
                        device.release();
                    }
                    return Err(e);
                }
            }
        }
        Ok(devices)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::com::hresult::{E_INVALIDARG, S_OK};
    use crate::com::IUnknown;
    use crate::mmdevice::device::tests::fake_device;
    use crate::mmdevice::EDataFlow;
    use crate::testing::{fake_unknown, state, Fake};

    pub(crate) struct CollectionState {
        pub devices: Vec<RawPtr>,
        /// Pretend to hold more entries than `devices` has.
        pub extra: Cell<u32>,
    }

    unsafe fn coll(this: RawPtr) -> &'static CollectionState {
        state::<IMMDeviceCollectionVtbl, CollectionState>(this)
    }

    unsafe extern "system" fn get_count(this: RawPtr, count: *mut u32) -> HResult {
        let state = coll(this);
        *count = state.devices.len() as u32 + state.extra.get();
        S_OK
    }

    unsafe extern "system" fn item(this: RawPtr, index: u32, device: *mut RawPtr) -> HResult {
        match coll(this).devices.get(index as usize) {
            Some(raw) => {
                IUnknown::from_raw(*raw).add_ref();
                *device = *raw;
                S_OK
            }
            None => {
                *device = std::ptr::null_mut();
                E_INVALIDARG
            }
        }
    }

    static COLLECTION_VTBL: IMMDeviceCollectionVtbl = IMMDeviceCollectionVtbl {
        base: fake_unknown!(IMMDeviceCollectionVtbl, CollectionState),
        get_count,
        item,
    };

    pub(crate) fn fake_collection(devices: Vec<RawPtr>) -> Fake<IMMDeviceCollectionVtbl, CollectionState> {
        let state = CollectionState {
            devices,
            extra: Cell::new(0),
        };
        Fake::new(&COLLECTION_VTBL, &[IID_IMM_DEVICE_COLLECTION], state)
    }

    #[test]
    fn count_and_item() {
        let first = fake_device("a", "Speakers", EDataFlow::Render);
        let second = fake_device("b", "HDMI", EDataFlow::Render);
        let fake = fake_collection(vec![first.raw(), second.raw()]);
        let devices: IMMDeviceCollection = fake.handle();
        unsafe {
            assert_eq!(devices.get_count().unwrap(), 2);
            let device = devices.item(1).unwrap();
            assert_eq!(device.get_id().unwrap(), "b");
            assert_eq!(second.refs(), 2);
            device.release();
        }
    }

    #[test]
    fn item_out_of_range() {
        let fake = fake_collection(Vec::new());
        let devices: IMMDeviceCollection = fake.handle();
        let err = unsafe { devices.item(0) }.unwrap_err();
        assert_eq!(err.code(), Some(E_INVALIDARG));
    }

    #[test]
    fn devices_collects_all_and_cleans_up_on_error() {
        let first = fake_device("a", "Speakers", EDataFlow::Render);
        let fake = fake_collection(vec![first.raw()]);
        let devices: IMMDeviceCollection = fake.handle();

        let all = unsafe { devices.devices() }.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(first.refs(), 2);
        unsafe { all[0].release() };

        fake.state().extra.set(1);
        assert!(unsafe { devices.devices() }.is_err());
        assert_eq!(first.refs(), 1);
    }
}
