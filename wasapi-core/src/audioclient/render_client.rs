use std::ptr;
use std::slice;

use crate::com::{ComError, ComResult, Guid, HResult, IUnknownVtbl, Interface, RawPtr};

use super::types::BufferFlags;

pub const IID_IAUDIO_RENDER_CLIENT: Guid = Guid::from_u128(0xf294acfc_3146_4483_a7bf_addca7c260e2);

#[repr(C)]
pub struct IAudioRenderClientVtbl {
    pub base: IUnknownVtbl,
    pub get_buffer: unsafe extern "system" fn(this: RawPtr, frames: u32, data: *mut *mut u8) -> HResult,
    pub release_buffer: unsafe extern "system" fn(this: RawPtr, frames: u32, flags: u32) -> HResult,
}

com_interface! {
    /// Writes rendering data into the endpoint buffer.
    pub struct IAudioRenderClient: IAudioRenderClientVtbl = IID_IAUDIO_RENDER_CLIENT;
}

impl IAudioRenderClient {
    /// Locks space for `frames` frames of `block_align` bytes each. The
    /// slice is valid until [`release_buffer`](Self::release_buffer).
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_buffer(&self, frames: u32, block_align: usize) -> ComResult<&mut [u8]> {
        if block_align == 0 {
            return Err(ComError::InvalidArgument("block align must be non-zero".into()));
        }
        let mut data: *mut u8 = ptr::null_mut();
        (self.vtable().get_buffer)(self.as_raw(), frames, &mut data).check(method!(IAudioRenderClient::GetBuffer))?;
        if frames == 0 {
            return Ok(&mut []);
        }
        if data.is_null() {
            return Err(ComError::NullPointer(method!(IAudioRenderClient::GetBuffer)));
        }
        Ok(slice::from_raw_parts_mut(data, frames as usize * block_align))
    }

    /// Commits `frames_written` frames. [`BufferFlags::SILENT`] makes the
    /// engine treat them as silence regardless of content.
    pub unsafe fn release_buffer(&self, frames_written: u32, flags: BufferFlags) -> ComResult<()> {
        (self.vtable().release_buffer)(self.as_raw(), frames_written, flags.bits())
            .check(method!(IAudioRenderClient::ReleaseBuffer))
    }
}
