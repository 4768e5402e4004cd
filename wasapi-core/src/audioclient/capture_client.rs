use std::ptr;
use std::slice;

use crate::com::hresult::AUDCLNT_S_BUFFER_EMPTY;
use crate::com::{ComError, ComResult, Guid, HResult, IUnknownVtbl, Interface, RawPtr};

use super::types::BufferFlags;

pub const IID_IAUDIO_CAPTURE_CLIENT: Guid = Guid::from_u128(0xc8adbd64_e71e_48a0_a4de_185c395cd317);

#[repr(C)]
pub struct IAudioCaptureClientVtbl {
    pub base: IUnknownVtbl,
    pub get_buffer: unsafe extern "system" fn(
        this: RawPtr,
        data: *mut *mut u8,
        frames: *mut u32,
        flags: *mut u32,
        device_position: *mut u64,
        qpc_position: *mut u64,
    ) -> HResult,
    pub release_buffer: unsafe extern "system" fn(this: RawPtr, frames: u32) -> HResult,
    pub get_next_packet_size: unsafe extern "system" fn(this: RawPtr, frames: *mut u32) -> HResult,
}

com_interface! {
    /// Reads captured data from the endpoint buffer.
    pub struct IAudioCaptureClient: IAudioCaptureClientVtbl = IID_IAUDIO_CAPTURE_CLIENT;
}

/// One packet of captured frames. `data` points into the endpoint buffer
/// and is only valid until [`IAudioCaptureClient::release_buffer`].
#[derive(Debug, Clone, Copy)]
pub struct CapturePacket<'a> {
    pub data: &'a [u8],
    pub frames: u32,
    pub flags: BufferFlags,
    /// Stream position of the first frame, in frames.
    pub device_position: u64,
    /// Performance-counter time of the first frame, in 100 ns units.
    pub qpc_position: u64,
}

impl CapturePacket<'_> {
    /// Silent packets carry garbage that must be treated as zeros.
    pub fn is_silent(&self) -> bool {
        self.flags.contains(BufferFlags::SILENT)
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }
}

impl IAudioCaptureClient {
    /// Locks the next packet. `block_align` is the stream's bytes per frame
    /// and sizes the returned slice. An empty buffer yields a zero-frame
    /// packet rather than an error.
    pub unsafe fn get_buffer(&self, block_align: usize) -> ComResult<CapturePacket<'_>> {
        if block_align == 0 {
            return Err(ComError::InvalidArgument("block align must be non-zero".into()));
        }
        let mut data: *mut u8 = ptr::null_mut();
        let mut frames = 0u32;
        let mut flags = 0u32;
        let mut device_position = 0u64;
        let mut qpc_position = 0u64;
        let hr = (self.vtable().get_buffer)(
            self.as_raw(),
            &mut data,
            &mut frames,
            &mut flags,
            &mut device_position,
            &mut qpc_position,
        );
        hr.check(method!(IAudioCaptureClient::GetBuffer))?;

        let data: &[u8] = if hr == AUDCLNT_S_BUFFER_EMPTY || frames == 0 {
            frames = 0;
            &[]
        } else if data.is_null() {
            return Err(ComError::NullPointer(method!(IAudioCaptureClient::GetBuffer)));
        } else {
            slice::from_raw_parts(data, frames as usize * block_align)
        };
        Ok(CapturePacket {
            data,
            frames,
            flags: BufferFlags::from_bits_retain(flags),
            device_position,
            qpc_position,
        })
    }

    /// Hands the packet back. `frames` must be the packet's full frame count
    /// or 0.
    pub unsafe fn release_buffer(&self, frames: u32) -> ComResult<()> {
        (self.vtable().release_buffer)(self.as_raw(), frames).check(method!(IAudioCaptureClient::ReleaseBuffer))
    }

    /// Frames in the next packet, 0 when nothing is queued.
    pub unsafe fn get_next_packet_size(&self) -> ComResult<u32> {
        let mut frames = 0u32;
        (self.vtable().get_next_packet_size)(self.as_raw(), &mut frames)
            .check(method!(IAudioCaptureClient::GetNextPacketSize))?;
        Ok(frames)
    }
}
