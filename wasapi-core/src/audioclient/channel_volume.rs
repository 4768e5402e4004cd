use crate::com::{ComResult, Guid, HResult, IUnknownVtbl, Interface, RawPtr};

use super::simple_volume::context_ptr;
use super::stream_volume::validate_levels;
use super::types::validate_level;

pub const IID_ICHANNEL_AUDIO_VOLUME: Guid = Guid::from_u128(0x1c158861_b533_4b30_b1cf_e853e51c59b8);

#[repr(C)]
pub struct IChannelAudioVolumeVtbl {
    pub base: IUnknownVtbl,
    pub get_channel_count: unsafe extern "system" fn(this: RawPtr, count: *mut u32) -> HResult,
    pub set_channel_volume:
        unsafe extern "system" fn(this: RawPtr, index: u32, level: f32, context: *const Guid) -> HResult,
    pub get_channel_volume: unsafe extern "system" fn(this: RawPtr, index: u32, level: *mut f32) -> HResult,
    pub set_all_volumes:
        unsafe extern "system" fn(this: RawPtr, count: u32, levels: *const f32, context: *const Guid) -> HResult,
    pub get_all_volumes: unsafe extern "system" fn(this: RawPtr, count: u32, levels: *mut f32) -> HResult,
}

com_interface! {
    /// Per-channel volume of an audio session.
    pub struct IChannelAudioVolume: IChannelAudioVolumeVtbl = IID_ICHANNEL_AUDIO_VOLUME;
}

impl IChannelAudioVolume {
    /// Channels in the session format.
    pub unsafe fn get_channel_count(&self) -> ComResult<u32> {
        let mut count = 0u32;
        (self.vtable().get_channel_count)(self.as_raw(), &mut count)
            .check(method!(IChannelAudioVolume::GetChannelCount))?;
        Ok(count)
    }

    /// Sets one channel's level (0.0 to 1.0).
    pub unsafe fn set_channel_volume(&self, index: u32, level: f32, context: Option<&Guid>) -> ComResult<()> {
        validate_level(level)?;
        (self.vtable().set_channel_volume)(self.as_raw(), index, level, context_ptr(context))
            .check(method!(IChannelAudioVolume::SetChannelVolume))
    }

    /// One channel's level.
    pub unsafe fn get_channel_volume(&self, index: u32) -> ComResult<f32> {
        let mut level = 0f32;
        (self.vtable().get_channel_volume)(self.as_raw(), index, &mut level)
            .check(method!(IChannelAudioVolume::GetChannelVolume))?;
        Ok(level)
    }

    /// Sets every channel's level in one call.
    pub unsafe fn set_all_volumes(&self, levels: &[f32], context: Option<&Guid>) -> ComResult<()> {
        let count = validate_levels(levels)?;
        (self.vtable().set_all_volumes)(self.as_raw(), count, levels.as_ptr(), context_ptr(context))
            .check(method!(IChannelAudioVolume::SetAllVolumes))
    }

    /// Levels of the first `count` channels.
    pub unsafe fn get_all_volumes(&self, count: u32) -> ComResult<Vec<f32>> {
        let mut levels = vec![0f32; count as usize];
        (self.vtable().get_all_volumes)(self.as_raw(), count, levels.as_mut_ptr())
            .check(method!(IChannelAudioVolume::GetAllVolumes))?;
        Ok(levels)
    }
}
