//! Decoding captured packet bytes into interleaved `f32` samples, and
//! simple level metering.

use wasapi_core::audioclient::{SampleFormat, WaveFormatExtensible};

use crate::error::CaptureError;

const I16_SCALE: f32 = 1.0 / 32_768.0;
const I24_SCALE: f32 = 1.0 / 8_388_608.0;
const I32_SCALE: f32 = 1.0 / 2_147_483_648.0;

/// Converts packets of one stream format into normalized `f32` samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleDecoder {
    format: SampleFormat,
    channels: u16,
}

impl SampleDecoder {
    /// Fails for sample formats other than float32 and 16/24/32-bit PCM.
    pub fn new(format: &WaveFormatExtensible) -> Result<Self, CaptureError> {
        let sample_format = format.sample_format();
        if sample_format == SampleFormat::Unknown {
            return Err(CaptureError::UnsupportedFormat(format.to_string()));
        }
        let channels = format.format().channels();
        if channels == 0 {
            return Err(CaptureError::UnsupportedFormat("zero channels".into()));
        }
        if sample_format.sample_bytes() * channels as usize != format.frame_bytes() {
            return Err(CaptureError::UnsupportedFormat(format!(
                "block align {} does not match {} x {}",
                format.frame_bytes(),
                channels,
                sample_format
            )));
        }
        Ok(Self {
            format: sample_format,
            channels,
        })
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.format
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Decodes `data` into `out`, replacing its previous contents. Trailing
    /// bytes that do not fill a whole sample are ignored.
    pub fn decode_into(&self, data: &[u8], out: &mut Vec<f32>) {
        out.clear();
        let width = self.format.sample_bytes();
        out.reserve(data.len() / width);
        let chunks = data.chunks_exact(width);
        match self.format {
            SampleFormat::Float32 => {
                out.extend(chunks.map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])));
            }
            SampleFormat::Int16 => {
                out.extend(chunks.map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 * I16_SCALE));
            }
            SampleFormat::Int24 => {
                // Shift into the top of an i32 to sign-extend.
                out.extend(chunks.map(|b| (i32::from_le_bytes([0, b[0], b[1], b[2]]) >> 8) as f32 * I24_SCALE));
            }
            SampleFormat::Int32 => {
                out.extend(chunks.map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f32 * I32_SCALE));
            }
            SampleFormat::Unknown => {}
        }
    }

    /// Interleaved samples; a trailing partial sample is ignored.
    pub fn decode(&self, data: &[u8]) -> Vec<f32> {
        let mut out = Vec::new();
        self.decode_into(data, &mut out);
        out
    }
}

/// RMS of `samples`, 0 for an empty slice.
pub fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Peak absolute level of `samples`.
pub fn peak_level(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
}

/// Per-channel levels of one interleaved block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelLevels {
    pub rms: Vec<f32>,
    pub peak: Vec<f32>,
}

impl ChannelLevels {
    /// RMS and peak per channel of an interleaved buffer.
    pub fn measure(samples: &[f32], channels: u16) -> Self {
        let channels = channels.max(1) as usize;
        let mut levels = Self::default();
        for channel in 0..channels {
            let lane: Vec<f32> = samples.iter().skip(channel).step_by(channels).copied().collect();
            levels.rms.push(rms_level(&lane));
            levels.peak.push(peak_level(&lane));
        }
        levels
    }
}
