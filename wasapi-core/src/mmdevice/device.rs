use std::ptr;

use crate::audioclient::WaveFormatExtensible;
use crate::com::property_store::{IPropertyStore, STGM_READ};
use crate::com::unknown::out_interface;
use crate::com::wide::take_task_wide_string;
use crate::com::{ComError, ComOwned, ComResult, Guid, HResult, IUnknownVtbl, Interface, PropVariant, RawPtr};

use super::endpoint::IMMEndpoint;
use super::properties::{PKEY_AUDIO_ENDPOINT_FORM_FACTOR, PKEY_AUDIO_ENGINE_DEVICE_FORMAT, PKEY_DEVICE_FRIENDLY_NAME};
use super::types::{DeviceState, EDataFlow, EndpointFormFactor};

pub const IID_IMM_DEVICE: Guid = Guid::from_u128(0xd666063f_1587_4e43_81f1_b948e807363f);

#[repr(C)]
pub struct IMMDeviceVtbl {
    pub base: IUnknownVtbl,
    pub activate: unsafe extern "system" fn(
        this: RawPtr,
        iid: *const Guid,
        clsctx: u32,
        params: *const PropVariant,
        interface: *mut RawPtr,
    ) -> HResult,
    pub open_property_store: unsafe extern "system" fn(this: RawPtr, stgm: u32, store: *mut RawPtr) -> HResult,
    pub get_id: unsafe extern "system" fn(this: RawPtr, id: *mut *mut u16) -> HResult,
    pub get_state: unsafe extern "system" fn(this: RawPtr, state: *mut u32) -> HResult,
}

com_interface! {
    /// An audio endpoint device.
    pub struct IMMDevice: IMMDeviceVtbl = IID_IMM_DEVICE;
}

impl IMMDevice {
    /// Creates a COM object with interface `T` on this device, typically
    /// [`IAudioClient`](crate::audioclient::IAudioClient) or one of the
    /// endpoint volume interfaces.
    pub unsafe fn activate<T: Interface>(&self, clsctx: u32, params: Option<&PropVariant>) -> ComResult<T> {
        let params = params.map_or(ptr::null(), |p| p as *const PropVariant);
        out_interface(method!(IMMDevice::Activate), |ppv| {
            (self.vtable().activate)(self.as_raw(), &T::IID, clsctx, params, ppv)
        })
    }

    /// The endpoint's property store, opened with `stgm` access.
    pub unsafe fn open_property_store(&self, stgm: u32) -> ComResult<IPropertyStore> {
        out_interface(method!(IMMDevice::OpenPropertyStore), |ppv| {
            (self.vtable().open_property_store)(self.as_raw(), stgm, ppv)
        })
    }

    /// The endpoint id string. The native copy is freed before returning.
    pub unsafe fn get_id(&self) -> ComResult<String> {
        let mut id: *mut u16 = ptr::null_mut();
        (self.vtable().get_id)(self.as_raw(), &mut id).check(method!(IMMDevice::GetId))?;
        if id.is_null() {
            return Err(ComError::NullPointer(method!(IMMDevice::GetId)));
        }
        Ok(take_task_wide_string(id))
    }

    /// Current `DEVICE_STATE_*` of the endpoint.
    pub unsafe fn get_state(&self) -> ComResult<DeviceState> {
        let mut state = 0u32;
        (self.vtable().get_state)(self.as_raw(), &mut state).check(method!(IMMDevice::GetState))?;
        Ok(DeviceState::from_bits_retain(state))
    }

    unsafe fn read_store<R>(&self, read: impl FnOnce(IPropertyStore) -> ComResult<R>) -> ComResult<R> {
        let store = ComOwned::new(self.open_property_store(STGM_READ)?);
        read(store.get())
    }

    /// `PKEY_Device_FriendlyName`, e.g. "Speakers (Realtek Audio)".
    pub unsafe fn friendly_name(&self) -> ComResult<Option<String>> {
        self.read_store(|store| store.get_string(&PKEY_DEVICE_FRIENDLY_NAME))
    }

    /// `PKEY_AudioEndpoint_FormFactor`, if set.
    pub unsafe fn form_factor(&self) -> ComResult<Option<EndpointFormFactor>> {
        self.read_store(|store| {
            let value = store.get_value(&PKEY_AUDIO_ENDPOINT_FORM_FACTOR)?.into_guard();
            if value.is_empty() {
                return Ok(None);
            }
            EndpointFormFactor::try_from(value.as_u32()?).map(Some)
        })
    }

    /// The shared-mode engine format stored in the device properties.
    pub unsafe fn device_format(&self) -> ComResult<Option<WaveFormatExtensible>> {
        self.read_store(|store| {
            let value = store.get_value(&PKEY_AUDIO_ENGINE_DEVICE_FORMAT)?.into_guard();
            if value.is_empty() {
                return Ok(None);
            }
            WaveFormatExtensible::from_bytes(&value.as_blob()?).map(Some)
        })
    }

    /// Render or capture, via the device's [`IMMEndpoint`] interface.
    pub unsafe fn data_flow(&self) -> ComResult<EDataFlow> {
        let endpoint = ComOwned::new(self.query_interface::<IMMEndpoint>()?);
        endpoint.get_data_flow()
    }
}
