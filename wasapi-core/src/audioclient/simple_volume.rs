use std::ptr;

use crate::com::{ComResult, Guid, HResult, IUnknownVtbl, Interface, RawPtr};

use super::types::validate_level;

pub const IID_ISIMPLE_AUDIO_VOLUME: Guid = Guid::from_u128(0x87ce5498_68d6_44e5_9215_6da47ef883d8);

#[repr(C)]
pub struct ISimpleAudioVolumeVtbl {
    pub base: IUnknownVtbl,
    pub set_master_volume: unsafe extern "system" fn(this: RawPtr, level: f32, context: *const Guid) -> HResult,
    pub get_master_volume: unsafe extern "system" fn(this: RawPtr, level: *mut f32) -> HResult,
    pub set_mute: unsafe extern "system" fn(this: RawPtr, mute: i32, context: *const Guid) -> HResult,
    pub get_mute: unsafe extern "system" fn(this: RawPtr, mute: *mut i32) -> HResult,
}

com_interface! {
    /// Master volume and mute of an audio session.
    pub struct ISimpleAudioVolume: ISimpleAudioVolumeVtbl = IID_ISIMPLE_AUDIO_VOLUME;
}

pub(crate) fn context_ptr(context: Option<&Guid>) -> *const Guid {
    context.map_or(ptr::null(), |guid| guid as *const Guid)
}

impl ISimpleAudioVolume {
    /// `context` is echoed to session event listeners so a client can
    /// recognise its own changes.
    pub unsafe fn set_master_volume(&self, level: f32, context: Option<&Guid>) -> ComResult<()> {
        validate_level(level)?;
        (self.vtable().set_master_volume)(self.as_raw(), level, context_ptr(context))
            .check(method!(ISimpleAudioVolume::SetMasterVolume))
    }

    /// Session master volume, 0.0 to 1.0.
    pub unsafe fn get_master_volume(&self) -> ComResult<f32> {
        let mut level = 0f32;
        (self.vtable().get_master_volume)(self.as_raw(), &mut level)
            .check(method!(ISimpleAudioVolume::GetMasterVolume))?;
        Ok(level)
    }

    /// Mutes or unmutes the session; `context` is echoed to session events.
    pub unsafe fn set_mute(&self, mute: bool, context: Option<&Guid>) -> ComResult<()> {
        (self.vtable().set_mute)(self.as_raw(), mute as i32, context_ptr(context))
            .check(method!(ISimpleAudioVolume::SetMute))
    }

    /// Whether the session is muted.
    pub unsafe fn get_mute(&self) -> ComResult<bool> {
        let mut mute = 0i32;
        (self.vtable().get_mute)(self.as_raw(), &mut mute).check(method!(ISimpleAudioVolume::GetMute))?;
        Ok(mute != 0)
    }
}
