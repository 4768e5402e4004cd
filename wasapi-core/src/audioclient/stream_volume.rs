use crate::com::{ComError, ComResult, Guid, HResult, IUnknownVtbl, Interface, RawPtr};

use super::types::validate_level;

pub const IID_IAUDIO_STREAM_VOLUME: Guid = Guid::from_u128(0x93014887_242d_4068_8a15_cf5e93b90fe3);

#[repr(C)]
pub struct IAudioStreamVolumeVtbl {
    pub base: IUnknownVtbl,
    pub get_channel_count: unsafe extern "system" fn(this: RawPtr, count: *mut u32) -> HResult,
    pub set_channel_volume: unsafe extern "system" fn(this: RawPtr, index: u32, level: f32) -> HResult,
    pub get_channel_volume: unsafe extern "system" fn(this: RawPtr, index: u32, level: *mut f32) -> HResult,
    pub set_all_volumes: unsafe extern "system" fn(this: RawPtr, count: u32, levels: *const f32) -> HResult,
    pub get_all_volumes: unsafe extern "system" fn(this: RawPtr, count: u32, levels: *mut f32) -> HResult,
}

com_interface! {
    /// Per-channel volume of a single stream.
    pub struct IAudioStreamVolume: IAudioStreamVolumeVtbl = IID_IAUDIO_STREAM_VOLUME;
}

pub(crate) fn validate_levels(levels: &[f32]) -> ComResult<u32> {
    if levels.is_empty() {
        return Err(ComError::InvalidArgument("no channel levels given".into()));
    }
    levels.iter().try_for_each(|level| validate_level(*level))?;
    u32::try_from(levels.len()).map_err(|_| ComError::InvalidArgument("too many channel levels".into()))
}

impl IAudioStreamVolume {
    /// Channels in the stream format.
    pub unsafe fn get_channel_count(&self) -> ComResult<u32> {
        let mut count = 0u32;
        (self.vtable().get_channel_count)(self.as_raw(), &mut count)
            .check(method!(IAudioStreamVolume::GetChannelCount))?;
        Ok(count)
    }

    /// Sets one channel's level (0.0 to 1.0).
    pub unsafe fn set_channel_volume(&self, index: u32, level: f32) -> ComResult<()> {
        validate_level(level)?;
        (self.vtable().set_channel_volume)(self.as_raw(), index, level)
            .check(method!(IAudioStreamVolume::SetChannelVolume))
    }

    /// One channel's level.
    pub unsafe fn get_channel_volume(&self, index: u32) -> ComResult<f32> {
        let mut level = 0f32;
        (self.vtable().get_channel_volume)(self.as_raw(), index, &mut level)
            .check(method!(IAudioStreamVolume::GetChannelVolume))?;
        Ok(level)
    }

    /// One level per channel; the slice length must match the channel count.
    pub unsafe fn set_all_volumes(&self, levels: &[f32]) -> ComResult<()> {
        let count = validate_levels(levels)?;
        (self.vtable().set_all_volumes)(self.as_raw(), count, levels.as_ptr())
            .check(method!(IAudioStreamVolume::SetAllVolumes))
    }

    /// Levels of the first `count` channels.
    pub unsafe fn get_all_volumes(&self, count: u32) -> ComResult<Vec<f32>> {
        let mut levels = vec![0f32; count as usize];
        (self.vtable().get_all_volumes)(self.as_raw(), count, levels.as_mut_ptr())
            .check(method!(IAudioStreamVolume::GetAllVolumes))?;
        Ok(levels)
    }
}
