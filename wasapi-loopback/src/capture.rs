//! Threaded capture from a loopback or capture endpoint.
//!
//! The stream owns a dedicated thread that initializes COM (MTA), opens the
//! endpoint, initializes a shared-mode `IAudioClient` on the mix format and
//! then polls the capture client every half buffer, handing decoded packets
//! to the caller's callback. Silent packets are delivered as zeros.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use wasapi_core::audioclient::{
    frames_to_reference_time, reference_time_to_duration, BufferFlags, CapturePacket, IAudioCaptureClient,
    IAudioClient, ShareMode, WaveFormatExtensible,
};
use wasapi_core::com::{ComRuntime, ConcurrencyModel, CLSCTX_ALL};
use wasapi_core::mmdevice::{ERole, IMMDeviceEnumerator};
use wasapi_core::{ComOwned, Guid};

use crate::config::{CaptureConfig, EndpointKind};
use crate::error::CaptureError;
use crate::samples::SampleDecoder;

/// Longest single sleep while waiting for the next poll, so `stop` is
/// noticed quickly even with long buffers.
const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// One decoded packet, valid for the duration of the callback.
#[derive(Debug, Clone, Copy)]
pub struct AudioPacket<'a> {
    /// Interleaved samples, `frames * channels` long.
    pub samples: &'a [f32],
    pub frames: u32,
    pub channels: u16,
    pub sample_rate: u32,
    pub flags: BufferFlags,
    pub device_position: u64,
    pub captured_at: DateTime<Utc>,
}

/// Receives every packet on the capture thread. Keep the work short: the
/// endpoint buffer keeps filling while the callback runs.
pub type PacketCallback = Box<dyn FnMut(&AudioPacket<'_>) + Send + 'static>;

/// Where the capture loop reads packets from.
pub trait PacketSource {
    /// Frames in the next packet, 0 when the buffer is drained.
    fn next_packet_size(&mut self) -> Result<u32, CaptureError>;

    /// Locks one packet, passes it to `sink` and releases it. Returns the
    /// number of frames consumed.
    fn read_packet(&mut self, sink: &mut dyn FnMut(&CapturePacket<'_>)) -> Result<u32, CaptureError>;
}

/// [`PacketSource`] over a live `IAudioCaptureClient`.
struct EndpointSource {
    client: IAudioCaptureClient,
    block_align: usize,
}

impl PacketSource for EndpointSource {
    fn next_packet_size(&mut self) -> Result<u32, CaptureError> {
        Ok(unsafe { self.client.get_next_packet_size() }?)
    }

    fn read_packet(&mut self, sink: &mut dyn FnMut(&CapturePacket<'_>)) -> Result<u32, CaptureError> {
        unsafe {
            let packet = self.client.get_buffer(self.block_align)?;
            let frames = packet.frames;
            sink(&packet);
            self.client.release_buffer(frames)?;
            Ok(frames)
        }
    }
}

/// Totals of a finished capture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureSummary {
    pub endpoint: EndpointKind,
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: u64,
    pub packets: u64,
    pub silent_packets: u64,
    pub discontinuities: u64,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
}

impl CaptureSummary {
    /// Captured audio length in seconds.
    pub fn audio_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }
}

/// Decodes packets from a [`PacketSource`] and keeps running totals.
pub struct PacketPump {
    decoder: SampleDecoder,
    sample_rate: u32,
    scratch: Vec<f32>,
    frames: u64,
    packets: u64,
    silent_packets: u64,
    discontinuities: u64,
}

impl PacketPump {
    /// Empty pump for a stream at `sample_rate`.
    pub fn new(decoder: SampleDecoder, sample_rate: u32) -> Self {
        Self {
            decoder,
            sample_rate,
            scratch: Vec::new(),
            frames: 0,
            packets: 0,
            silent_packets: 0,
            discontinuities: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Reads packets until the source reports an empty buffer. Returns the
    /// frames delivered by this call.
    pub fn drain<S: PacketSource + ?Sized>(
        &mut self,
        source: &mut S,
        callback: &mut PacketCallback,
    ) -> Result<u64, CaptureError> {
        let mut delivered = 0u64;
        let mut packet_size = source.next_packet_size()?;
        while packet_size != 0 {
            delivered += source.read_packet(&mut |packet: &CapturePacket<'_>| self.deliver(packet, callback))? as u64;
            packet_size = source.next_packet_size()?;
        }
        Ok(delivered)
    }

    fn deliver(&mut self, packet: &CapturePacket<'_>, callback: &mut PacketCallback) {
        if packet.is_empty() {
            return;
        }
        let channels = self.decoder.channels();
        if packet.is_silent() {
            self.silent_packets += 1;
            self.scratch.clear();
            self.scratch.resize(packet.frames as usize * channels as usize, 0.0);
        } else {
            self.decoder.decode_into(packet.data, &mut self.scratch);
        }
        if packet.flags.contains(BufferFlags::DATA_DISCONTINUITY) {
            self.discontinuities += 1;
            log::debug!("Capture discontinuity at device position {}", packet.device_position);
        }
        self.frames += packet.frames as u64;
        self.packets += 1;

        callback(&AudioPacket {
            samples: &self.scratch,
            frames: packet.frames,
            channels,
            sample_rate: self.sample_rate,
            flags: packet.flags,
            device_position: packet.device_position,
            captured_at: Utc::now(),
        });
    }

    /// Totals so far, stamped with the run's start and stop times.
    pub fn summary(&self, endpoint: EndpointKind, started_at: DateTime<Utc>, stopped_at: DateTime<Utc>) -> CaptureSummary {
        CaptureSummary {
            endpoint,
            sample_rate: self.sample_rate,
            channels: self.decoder.channels(),
            frames: self.frames,
            packets: self.packets,
            silent_packets: self.silent_packets,
            discontinuities: self.discontinuities,
            started_at,
            stopped_at,
        }
    }
}

/// Sleeps for `interval` or until `running` goes false.
fn sleep_while_running(running: &AtomicBool, interval: Duration) {
    let deadline = Instant::now() + interval;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(STOP_CHECK_INTERVAL));
    }
}

/// Polls `source` every `poll_interval` until `running` is cleared or
/// `max_frames` have been delivered. The buffer is drained once more after
/// a stop request.
pub fn pump_until_stopped<S: PacketSource + ?Sized>(
    source: &mut S,
    pump: &mut PacketPump,
    callback: &mut PacketCallback,
    running: &AtomicBool,
    poll_interval: Duration,
    max_frames: Option<u64>,
) -> Result<(), CaptureError> {
    while running.load(Ordering::SeqCst) {
        sleep_while_running(running, poll_interval);
        pump.drain(source, callback)?;
        if let Some(limit) = max_frames {
            if pump.frames() >= limit {
                log::info!("Capture reached its maximum duration ({} frames)", limit);
                running.store(false, Ordering::SeqCst);
            }
        }
    }
    Ok(())
}

#[cfg(target_os = "windows")]
mod mmcss {
    use windows::core::w;
    use windows::Win32::Foundation::HANDLE;
    use windows::Win32::System::Threading::{AvRevertMmThreadCharacteristics, AvSetMmThreadCharacteristicsW};

    /// Reverts the thread's MMCSS registration on drop.
    pub struct MmcssGuard(HANDLE);

    pub fn register_pro_audio() -> Option<MmcssGuard> {
        let mut task_index = 0u32;
        match unsafe { AvSetMmThreadCharacteristicsW(w!("Pro Audio"), &mut task_index) } {
            Ok(handle) => Some(MmcssGuard(handle)),
            Err(e) => {
                log::warn!("MMCSS registration failed: {}", e);
                None
            }
        }
    }

    impl Drop for MmcssGuard {
        fn drop(&mut self) {
            if let Err(e) = unsafe { AvRevertMmThreadCharacteristics(self.0) } {
                log::warn!("MMCSS revert failed: {}", e);
            }
        }
    }
}

#[cfg(not(target_os = "windows"))]
mod mmcss {
    pub struct MmcssGuard;

    pub fn register_pro_audio() -> Option<MmcssGuard> {
        None
    }
}

type ReadySender = SyncSender<Result<WaveFormatExtensible, CaptureError>>;

/// Main capture sequence, run on the stream's thread.
///
/// 1. CoInitializeEx (MTA)
/// 2. Resolve the endpoint (by id, or the default console endpoint)
/// 3. Activate IAudioClient and read the mix format
/// 4. Initialize in shared mode (LOOPBACK for loopback streams)
/// 5. Get IAudioCaptureClient, register with MMCSS
/// 6. Start and poll every half buffer until stopped
fn run_capture(
    config: &CaptureConfig,
    running: &AtomicBool,
    ready: &ReadySender,
    mut callback: PacketCallback,
) -> Result<CaptureSummary, CaptureError> {
    let _com = ComRuntime::initialize(ConcurrencyModel::MultiThreaded)?;

    unsafe {
        let enumerator = ComOwned::new(IMMDeviceEnumerator::create()?);
        let device = match &config.device_id {
            Some(id) => enumerator.get_device(id),
            None => enumerator.get_default_audio_endpoint(config.endpoint.data_flow(), ERole::Console),
        }
        .map_err(|e| {
            log::warn!("Endpoint lookup failed: {}", e);
            CaptureError::DeviceNotAvailable
        })?;
        let device = ComOwned::new(device);

        let client = ComOwned::new(device.activate::<IAudioClient>(CLSCTX_ALL, None)?);
        let format = client.get_mix_format()?;
        let decoder = SampleDecoder::new(&format)?;

        let session = config.session_id.map(Guid::from);
        client.initialize(
            ShareMode::Shared,
            config.stream_flags(),
            config.buffer_duration,
            0,
            &format,
            session.as_ref(),
        )?;

        let buffer_frames = client.get_buffer_size()?;
        let capture_client = ComOwned::new(client.get_service::<IAudioCaptureClient>()?);

        let sample_rate = format.format().samples_per_sec();
        let actual_duration = frames_to_reference_time(buffer_frames, sample_rate);
        let poll_interval = reference_time_to_duration(actual_duration / 2);
        log::info!(
            "Capturing {:?} endpoint: {}, buffer {} frames, polling every {:?}",
            config.endpoint,
            format,
            buffer_frames,
            poll_interval
        );

        let _mmcss = mmcss::register_pro_audio();

        client.start()?;
        let _ = ready.send(Ok(format));

        let mut source = EndpointSource {
            client: capture_client.get(),
            block_align: format.frame_bytes(),
        };
        let mut pump = PacketPump::new(decoder, sample_rate);
        let max_frames = config
            .max_duration_secs
            .map(|secs| (secs * sample_rate as f64).ceil() as u64);

        let started_at = Utc::now();
        let result = pump_until_stopped(&mut source, &mut pump, &mut callback, running, poll_interval, max_frames);
        if let Err(e) = client.stop() {
            log::warn!("Failed to stop capture stream: {}", e);
        }
        result?;

        Ok(pump.summary(config.endpoint, started_at, Utc::now()))
    }
}

/// Ends a running capture from another thread, such as a signal handler.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Clears the run flag; the capture thread drains and exits within one
    /// poll interval. `CaptureStream::wait` then returns the summary.
    pub fn request_stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A capture stream on its own thread.
///
/// `start` returns once the endpoint is streaming (or failed to open), so
/// configuration errors surface synchronously.
pub struct CaptureStream {
    config: CaptureConfig,
    running: Arc<AtomicBool>,
    capture_handle: Mutex<Option<thread::JoinHandle<Result<CaptureSummary, CaptureError>>>>,
    format: Mutex<Option<WaveFormatExtensible>>,
}

impl CaptureStream {
    /// Validates `config`; nothing is opened until `start`.
    pub fn new(config: CaptureConfig) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            capture_handle: Mutex::new(None),
            format: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// True between a successful `start` and the end of capture.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Handle that stops this stream from any thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.running))
    }

    /// The stream format, once started.
    pub fn format(&self) -> Option<WaveFormatExtensible> {
        *self.format.lock()
    }

    /// Opens the endpoint and starts delivering packets to `callback`.
    /// Returns the stream's mix format.
    pub fn start(&self, callback: PacketCallback) -> Result<WaveFormatExtensible, CaptureError> {
        let mut handle_slot = self.capture_handle.lock();
        if self.running.load(Ordering::SeqCst) {
            return Err(CaptureError::AlreadyRunning);
        }
        // A previous run that ended on its own (max duration or error).
        if let Some(finished) = handle_slot.take() {
            if let Ok(Err(e)) = finished.join() {
                log::debug!("Previous capture ended with: {}", e);
            }
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let config = self.config.clone();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let thread_name = match config.endpoint {
            EndpointKind::Loopback => "wasapi-loopback-capture",
            EndpointKind::Capture => "wasapi-endpoint-capture",
        };

        let handle = thread::Builder::new()
            .name(thread_name.into())
            .spawn(move || {
                let result = run_capture(&config, &running, &ready_tx, callback);
                if let Err(e) = &result {
                    log::error!("Capture error: {}", e);
                    let _ = ready_tx.try_send(Err(e.clone()));
                }
                running.store(false, Ordering::SeqCst);
                result
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                CaptureError::Thread(format!("failed to spawn capture thread: {}", e))
            })?;

        match ready_rx.recv() {
            Ok(Ok(format)) => {
                *self.format.lock() = Some(format);
                *handle_slot = Some(handle);
                Ok(format)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                self.running.store(false, Ordering::SeqCst);
                Err(CaptureError::Thread("capture thread exited during startup".into()))
            }
        }
    }

    /// Waits for the capture thread to finish on its own (for example after
    /// the configured maximum duration) without requesting a stop.
    pub fn wait(&self) -> Result<Option<CaptureSummary>, CaptureError> {
        let handle = self.capture_handle.lock().take();
        match handle {
            Some(handle) => handle
                .join()
                .map_err(|_| CaptureError::Thread("capture thread panicked".into()))?
                .map(Some),
            None => Ok(None),
        }
    }

    /// Requests a stop and joins the capture thread. Returns the capture
    /// totals, or None when the stream was not started.
    pub fn stop(&self) -> Result<Option<CaptureSummary>, CaptureError> {
        self.running.store(false, Ordering::SeqCst);
        self.wait()
    }
}

impl Drop for CaptureStream {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("Capture stream ended with an error: {}", e);
        }
    }
}
