//! # wasapi-loopback
//!
//! Loopback and endpoint capture built on `wasapi-core`.
//!
//! Provides:
//! - `CaptureStream`: capture thread over a loopback (render) or capture endpoint
//! - `DeviceEnumerator`: endpoint listing via the MMDevice API
//! - `SampleDecoder`: packet bytes to interleaved `f32`, plus level metering
//!
//! ## Usage
//! ```ignore
//! use wasapi_loopback::{CaptureConfig, CaptureStream};
//!
//! let stream = CaptureStream::new(CaptureConfig::loopback())?;
//! let format = stream.start(Box::new(|packet| {
//!     println!("{} frames at {}", packet.frames, packet.captured_at);
//! }))?;
//! println!("{}", format);
//! let summary = stream.stop()?;
//! ```

pub mod capture;
pub mod config;
pub mod device_enumerator;
pub mod error;
pub mod samples;

pub use capture::{AudioPacket, CaptureStream, CaptureSummary, PacketCallback, PacketPump, PacketSource, StopHandle};
pub use config::{CaptureConfig, EndpointKind};
pub use device_enumerator::{classify_transport, DeviceEnumerator, DeviceInfo, TransportType};
pub use error::CaptureError;
pub use samples::{peak_level, rms_level, ChannelLevels, SampleDecoder};
