use std::ptr;

use crate::com::hresult::{AUDCLNT_E_UNSUPPORTED_FORMAT, S_FALSE};
use crate::com::unknown::out_interface;
use crate::com::{co_task_mem_free, ComError, ComResult, Guid, HResult, IUnknownVtbl, Interface, RawPtr};

use super::types::{ReferenceTime, ShareMode, StreamFlags};
use super::wave_format::WaveFormatExtensible;

pub const IID_IAUDIO_CLIENT: Guid = Guid::from_u128(0x1cb9ad4c_dbfa_4c32_b178_c2f568a703b2);

#[repr(C)]
pub struct IAudioClientVtbl {
    pub base: IUnknownVtbl,
    pub initialize: unsafe extern "system" fn(
        this: RawPtr,
        share_mode: u32,
        stream_flags: u32,
        buffer_duration: ReferenceTime,
        periodicity: ReferenceTime,
        format: *const u8,
        session_guid: *const Guid,
    ) -> HResult,
    pub get_buffer_size: unsafe extern "system" fn(this: RawPtr, frames: *mut u32) -> HResult,
    pub get_stream_latency: unsafe extern "system" fn(this: RawPtr, latency: *mut ReferenceTime) -> HResult,
    pub get_current_padding: unsafe extern "system" fn(this: RawPtr, frames: *mut u32) -> HResult,
    pub is_format_supported: unsafe extern "system" fn(
        this: RawPtr,
        share_mode: u32,
        format: *const u8,
        closest_match: *mut *mut u8,
    ) -> HResult,
    pub get_mix_format: unsafe extern "system" fn(this: RawPtr, format: *mut *mut u8) -> HResult,
    pub get_device_period: unsafe extern "system" fn(
        this: RawPtr,
        default_period: *mut ReferenceTime,
        minimum_period: *mut ReferenceTime,
    ) -> HResult,
    pub start: unsafe extern "system" fn(this: RawPtr) -> HResult,
    pub stop: unsafe extern "system" fn(this: RawPtr) -> HResult,
    pub reset: unsafe extern "system" fn(this: RawPtr) -> HResult,
    pub set_event_handle: unsafe extern "system" fn(this: RawPtr, event: RawPtr) -> HResult,
    pub get_service: unsafe extern "system" fn(this: RawPtr, riid: *const Guid, service: *mut RawPtr) -> HResult,
}

com_interface! {
    /// An audio stream between the client and an endpoint device.
    pub struct IAudioClient: IAudioClientVtbl = IID_IAUDIO_CLIENT;
}

/// Outcome of [`IAudioClient::is_format_supported`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSupport {
    Supported,
    /// Shared mode only: the engine proposes this format instead.
    ClosestMatch(WaveFormatExtensible),
    Unsupported,
}

impl FormatSupport {
    /// True for an exact match.
    pub fn is_supported(&self) -> bool {
        matches!(self, FormatSupport::Supported)
    }
}

impl IAudioClient {
    /// `buffer_duration` and `periodicity` are in 100 ns units; periodicity
    /// must be 0 in shared mode.
    pub unsafe fn initialize(
        &self,
        share_mode: ShareMode,
        flags: StreamFlags,
        buffer_duration: ReferenceTime,
        periodicity: ReferenceTime,
        format: &WaveFormatExtensible,
        session: Option<&Guid>,
    ) -> ComResult<()> {
        let session = session.map_or(ptr::null(), |guid| guid as *const Guid);
        (self.vtable().initialize)(
            self.as_raw(),
            share_mode as u32,
            flags.bits(),
            buffer_duration,
            periodicity,
            format.as_ptr(),
            session,
        )
        .check(method!(IAudioClient::Initialize))
    }

    /// Capacity of the endpoint buffer, in frames.
    pub unsafe fn get_buffer_size(&self) -> ComResult<u32> {
        let mut frames = 0u32;
        (self.vtable().get_buffer_size)(self.as_raw(), &mut frames).check(method!(IAudioClient::GetBufferSize))?;
        Ok(frames)
    }

    /// Maximum latency of the initialized stream, in 100 ns units.
    pub unsafe fn get_stream_latency(&self) -> ComResult<ReferenceTime> {
        let mut latency: ReferenceTime = 0;
        (self.vtable().get_stream_latency)(self.as_raw(), &mut latency)
            .check(method!(IAudioClient::GetStreamLatency))?;
        Ok(latency)
    }

    /// Frames queued in the endpoint buffer and not yet consumed.
    pub unsafe fn get_current_padding(&self) -> ComResult<u32> {
        let mut frames = 0u32;
        (self.vtable().get_current_padding)(self.as_raw(), &mut frames)
            .check(method!(IAudioClient::GetCurrentPadding))?;
        Ok(frames)
    }

    /// `AUDCLNT_E_UNSUPPORTED_FORMAT` is reported as
    /// [`FormatSupport::Unsupported`] rather than an error. Any closest-match
    /// format the engine allocates is copied and freed.
    pub unsafe fn is_format_supported(
        &self,
        share_mode: ShareMode,
        format: &WaveFormatExtensible,
    ) -> ComResult<FormatSupport> {
        const METHOD: &str = method!(IAudioClient::IsFormatSupported);
        let mut closest: *mut u8 = ptr::null_mut();
        // Exclusive mode requires a null closest-match pointer.
        let closest_out = match share_mode {
            ShareMode::Shared => &mut closest as *mut *mut u8,
            ShareMode::Exclusive => ptr::null_mut(),
        };
        let hr = (self.vtable().is_format_supported)(self.as_raw(), share_mode as u32, format.as_ptr(), closest_out);
        if hr == AUDCLNT_E_UNSUPPORTED_FORMAT {
            co_task_mem_free(closest.cast());
            return Ok(FormatSupport::Unsupported);
        }
        if let Err(err) = hr.check(METHOD) {
            co_task_mem_free(closest.cast());
            return Err(err);
        }
        if hr == S_FALSE && !closest.is_null() {
            return WaveFormatExtensible::take_task_mem(closest, METHOD).map(FormatSupport::ClosestMatch);
        }
        co_task_mem_free(closest.cast());
        Ok(FormatSupport::Supported)
    }

    /// The shared-mode engine format. The native block is freed after the
    /// copy.
    pub unsafe fn get_mix_format(&self) -> ComResult<WaveFormatExtensible> {
        let mut raw: *mut u8 = ptr::null_mut();
        (self.vtable().get_mix_format)(self.as_raw(), &mut raw).check(method!(IAudioClient::GetMixFormat))?;
        WaveFormatExtensible::take_task_mem(raw, method!(IAudioClient::GetMixFormat))
    }

    /// Returns `(default, minimum)` periods in 100 ns units.
    pub unsafe fn get_device_period(&self) -> ComResult<(ReferenceTime, ReferenceTime)> {
        let mut default_period: ReferenceTime = 0;
        let mut minimum_period: ReferenceTime = 0;
        (self.vtable().get_device_period)(self.as_raw(), &mut default_period, &mut minimum_period)
            .check(method!(IAudioClient::GetDevicePeriod))?;
        Ok((default_period, minimum_period))
    }

    /// Starts the stream; capture data begins to accumulate.
    pub unsafe fn start(&self) -> ComResult<()> {
        (self.vtable().start)(self.as_raw()).check(method!(IAudioClient::Start))
    }

    /// Stops the stream. Buffered data is kept until `reset`.
    pub unsafe fn stop(&self) -> ComResult<()> {
        (self.vtable().stop)(self.as_raw()).check(method!(IAudioClient::Stop))
    }

    /// Flushes pending data. The stream must be stopped.
    pub unsafe fn reset(&self) -> ComResult<()> {
        (self.vtable().reset)(self.as_raw()).check(method!(IAudioClient::Reset))
    }

    /// `event` is a Win32 event `HANDLE`, signalled when a buffer is ready
    /// in event-driven mode.
    pub unsafe fn set_event_handle(&self, event: RawPtr) -> ComResult<()> {
        if event.is_null() {
            return Err(ComError::InvalidArgument("event handle is null".into()));
        }
        (self.vtable().set_event_handle)(self.as_raw(), event).check(method!(IAudioClient::SetEventHandle))
    }

    /// Fetches a stream service such as
    /// [`IAudioCaptureClient`](super::IAudioCaptureClient) or
    /// [`IAudioClock`](super::IAudioClock).
    pub unsafe fn get_service<T: Interface>(&self) -> ComResult<T> {
        out_interface(method!(IAudioClient::GetService), |ppv| {
            (self.vtable().get_service)(self.as_raw(), &T::IID, ppv)
        })
    }
}
