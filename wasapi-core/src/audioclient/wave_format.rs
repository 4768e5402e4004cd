//! Byte-level views of `WAVEFORMATEX` and `WAVEFORMATEXTENSIBLE`.
//!
//! Both structs are packed little-endian blobs in native memory, so they
//! are stored here as plain byte arrays with typed accessors instead of
//! `#[repr(C)]` structs with unaligned fields.

use std::fmt;
use std::ptr;

use crate::com::{co_task_mem_free, ComError, ComResult, Guid};

use super::types::{
    default_channel_mask, wave_format_tag_name, KSDATAFORMAT_SUBTYPE_IEEE_FLOAT, KSDATAFORMAT_SUBTYPE_PCM,
    WAVE_FORMAT_EXTENSIBLE, WAVE_FORMAT_IEEE_FLOAT, WAVE_FORMAT_PCM,
};

/// Size of `WAVEFORMATEX` without trailing extra bytes.
pub const WAVE_FORMAT_EX_SIZE: usize = 18;
/// Size of `WAVEFORMATEXTENSIBLE`.
pub const WAVE_FORMAT_EXTENSIBLE_SIZE: usize = 40;
/// `cbSize` of a `WAVEFORMATEXTENSIBLE`.
pub const WAVE_FORMAT_EXTENSIBLE_CB_SIZE: u16 = (WAVE_FORMAT_EXTENSIBLE_SIZE - WAVE_FORMAT_EX_SIZE) as u16;

/// The 18-byte `WAVEFORMATEX` header.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WaveFormatEx([u8; WAVE_FORMAT_EX_SIZE]);

impl WaveFormatEx {
    pub fn from_bytes(bytes: [u8; WAVE_FORMAT_EX_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; WAVE_FORMAT_EX_SIZE] {
        &self.0
    }

    fn u16_at(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.0[offset], self.0[offset + 1]])
    }

    fn u32_at(&self, offset: usize) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.0[offset..offset + 4]);
        u32::from_le_bytes(raw)
    }

    fn put_u16(&mut self, offset: usize, value: u16) {
        self.0[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn put_u32(&mut self, offset: usize, value: u32) {
        self.0[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn format_tag(&self) -> u16 {
        self.u16_at(0)
    }

    pub fn set_format_tag(&mut self, value: u16) {
        self.put_u16(0, value)
    }

    pub fn channels(&self) -> u16 {
        self.u16_at(2)
    }

    pub fn set_channels(&mut self, value: u16) {
        self.put_u16(2, value)
    }

    pub fn samples_per_sec(&self) -> u32 {
        self.u32_at(4)
    }

    pub fn set_samples_per_sec(&mut self, value: u32) {
        self.put_u32(4, value)
    }

    pub fn avg_bytes_per_sec(&self) -> u32 {
        self.u32_at(8)
    }

    pub fn set_avg_bytes_per_sec(&mut self, value: u32) {
        self.put_u32(8, value)
    }

    pub fn block_align(&self) -> u16 {
        self.u16_at(12)
    }

    pub fn set_block_align(&mut self, value: u16) {
        self.put_u16(12, value)
    }

    /// Container size of one sample, in bits.
    pub fn bits_per_sample(&self) -> u16 {
        self.u16_at(14)
    }

    pub fn set_bits_per_sample(&mut self, value: u16) {
        self.put_u16(14, value)
    }

    /// Number of extra bytes following the header.
    pub fn cb_size(&self) -> u16 {
        self.u16_at(16)
    }

    pub fn set_cb_size(&mut self, value: u16) {
        self.put_u16(16, value)
    }
}

impl fmt::Debug for WaveFormatEx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaveFormatEx")
            .field("format_tag", &format_args!("0x{:04X}", self.format_tag()))
            .field("channels", &self.channels())
            .field("samples_per_sec", &self.samples_per_sec())
            .field("avg_bytes_per_sec", &self.avg_bytes_per_sec())
            .field("block_align", &self.block_align())
            .field("bits_per_sample", &self.bits_per_sample())
            .field("cb_size", &self.cb_size())
            .finish()
    }
}

/// Sample encoding of a stream, as far as the capture path cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    Float32,
    Int16,
    /// Packed 24-bit samples (3 bytes each).
    Int24,
    /// 32-bit container, which may carry fewer valid bits.
    Int32,
    Unknown,
}

impl SampleFormat {
    /// Bytes per sample, 0 when unknown.
    pub fn sample_bytes(self) -> usize {
        match self {
            SampleFormat::Float32 | SampleFormat::Int32 => 4,
            SampleFormat::Int24 => 3,
            SampleFormat::Int16 => 2,
            SampleFormat::Unknown => 0,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SampleFormat::Float32 => "f32",
            SampleFormat::Int16 => "i16",
            SampleFormat::Int24 => "i24",
            SampleFormat::Int32 => "i32",
            SampleFormat::Unknown => "unknown",
        })
    }
}

/// A `WAVEFORMATEXTENSIBLE`, or a plain `WAVEFORMATEX` padded with zeros
/// when `cb_size` is below 22.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaveFormatExtensible {
    format: WaveFormatEx,
    extension: [u8; WAVE_FORMAT_EXTENSIBLE_SIZE - WAVE_FORMAT_EX_SIZE],
}

impl Default for WaveFormatExtensible {
    fn default() -> Self {
        Self {
            format: WaveFormatEx::default(),
            extension: [0; WAVE_FORMAT_EXTENSIBLE_SIZE - WAVE_FORMAT_EX_SIZE],
        }
    }
}

impl WaveFormatExtensible {
    fn extensible(rate: u32, channels: u16, bits: u16, sub_format: Guid) -> ComResult<Self> {
        if channels == 0 || bits == 0 || bits % 8 != 0 {
            return Err(ComError::InvalidFormat(format!(
                "{} channels of {} bits is not a byte-aligned format",
                channels, bits
            )));
        }
        let too_large = || ComError::InvalidFormat(format!("{} channels of {} bits at {} Hz is too large", channels, bits, rate));
        let block_align = channels.checked_mul(bits / 8).ok_or_else(too_large)?;
        let avg_bytes_per_sec = rate.checked_mul(block_align as u32).ok_or_else(too_large)?;

        let mut wf = Self::default();
        let format = wf.format_mut();
        format.set_format_tag(WAVE_FORMAT_EXTENSIBLE);
        format.set_channels(channels);
        format.set_samples_per_sec(rate);
        format.set_avg_bytes_per_sec(avg_bytes_per_sec);
        format.set_block_align(block_align);
        format.set_bits_per_sample(bits);
        format.set_cb_size(WAVE_FORMAT_EXTENSIBLE_CB_SIZE);
        wf.set_samples(bits);
        wf.set_channel_mask(default_channel_mask(channels));
        wf.set_sub_format(sub_format);
        Ok(wf)
    }

    /// Integer PCM with `bits` both as container size and valid bits.
    /// `bits` must be a non-zero multiple of 8.
    pub fn pcm(rate: u32, channels: u16, bits: u16) -> ComResult<Self> {
        Self::extensible(rate, channels, bits, KSDATAFORMAT_SUBTYPE_PCM)
    }

    /// 32-bit IEEE float, the usual shared-mode mix format.
    pub fn ieee_float(rate: u32, channels: u16) -> ComResult<Self> {
        Self::extensible(rate, channels, 32, KSDATAFORMAT_SUBTYPE_IEEE_FLOAT)
    }

    /// Parses a serialized format: at least the 18-byte header, and the full
    /// 40 bytes when the header announces the extensible part.
    pub fn from_bytes(bytes: &[u8]) -> ComResult<Self> {
        if bytes.len() < WAVE_FORMAT_EX_SIZE {
            return Err(ComError::InvalidFormat(format!(
                "WAVEFORMATEX needs {} bytes, got {}",
                WAVE_FORMAT_EX_SIZE,
                bytes.len()
            )));
        }
        let mut wf = Self::default();
        wf.format.0.copy_from_slice(&bytes[..WAVE_FORMAT_EX_SIZE]);
        if wf.format.cb_size() >= WAVE_FORMAT_EXTENSIBLE_CB_SIZE {
            if bytes.len() < WAVE_FORMAT_EXTENSIBLE_SIZE {
                return Err(ComError::InvalidFormat(format!(
                    "cbSize {} announces {} bytes, got {}",
                    wf.format.cb_size(),
                    WAVE_FORMAT_EXTENSIBLE_SIZE,
                    bytes.len()
                )));
            }
            wf.extension.copy_from_slice(&bytes[WAVE_FORMAT_EX_SIZE..WAVE_FORMAT_EXTENSIBLE_SIZE]);
        }
        Ok(wf)
    }

    /// Copies a format out of native memory. Only the header is read unless
    /// its `cbSize` covers the extensible part.
    pub unsafe fn from_ptr(raw: *const u8) -> ComResult<Self> {
        if raw.is_null() {
            return Err(ComError::NullPointer("WAVEFORMATEX"));
        }
        let mut wf = Self::default();
        ptr::copy_nonoverlapping(raw, wf.format.0.as_mut_ptr(), WAVE_FORMAT_EX_SIZE);
        if wf.format.cb_size() >= WAVE_FORMAT_EXTENSIBLE_CB_SIZE {
            ptr::copy_nonoverlapping(
                raw.add(WAVE_FORMAT_EX_SIZE),
                wf.extension.as_mut_ptr(),
                WAVE_FORMAT_EXTENSIBLE_SIZE - WAVE_FORMAT_EX_SIZE,
            );
        }
        Ok(wf)
    }

    /// Copies a task-allocated format and frees the native block.
    pub(crate) unsafe fn take_task_mem(raw: *mut u8, method: &'static str) -> ComResult<Self> {
        if raw.is_null() {
            return Err(ComError::NullPointer(method));
        }
        let wf = Self::from_ptr(raw);
        co_task_mem_free(raw.cast());
        wf
    }

    pub fn as_bytes(&self) -> &[u8; WAVE_FORMAT_EXTENSIBLE_SIZE] {
        // Both fields are byte arrays, so the struct is exactly 40 unpadded bytes.
        unsafe { &*(self as *const Self as *const [u8; WAVE_FORMAT_EXTENSIBLE_SIZE]) }
    }

    /// Pointer suitable for the `const WAVEFORMATEX*` parameters.
    pub fn as_ptr(&self) -> *const u8 {
        self.format.0.as_ptr()
    }

    pub fn format(&self) -> &WaveFormatEx {
        &self.format
    }

    pub fn format_mut(&mut self) -> &mut WaveFormatEx {
        &mut self.format
    }

    /// Valid bits per sample (the `Samples` union).
    pub fn samples(&self) -> u16 {
        u16::from_le_bytes([self.extension[0], self.extension[1]])
    }

    pub fn set_samples(&mut self, value: u16) {
        self.extension[0..2].copy_from_slice(&value.to_le_bytes());
    }

    pub fn channel_mask(&self) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.extension[2..6]);
        u32::from_le_bytes(raw)
    }

    pub fn set_channel_mask(&mut self, value: u32) {
        self.extension[2..6].copy_from_slice(&value.to_le_bytes());
    }

    /// GUID at offset 24.
    pub fn sub_format(&self) -> Guid {
        let mut raw = [0u8; 16];
        raw.copy_from_slice(&self.extension[6..22]);
        Guid::from_bytes_le(raw)
    }

    pub fn set_sub_format(&mut self, value: Guid) {
        self.extension[6..22].copy_from_slice(&value.to_bytes_le());
    }

    /// The format tag encoded in the sub-format GUID.
    pub fn sub_format_tag(&self) -> u16 {
        self.sub_format().data1 as u16
    }

    pub fn is_extensible(&self) -> bool {
        self.format.format_tag() == WAVE_FORMAT_EXTENSIBLE && self.format.cb_size() >= WAVE_FORMAT_EXTENSIBLE_CB_SIZE
    }

    /// The effective format tag: the sub-format tag for extensible formats.
    pub fn effective_tag(&self) -> u16 {
        if self.is_extensible() {
            self.sub_format_tag()
        } else {
            self.format.format_tag()
        }
    }

    pub fn sample_format(&self) -> SampleFormat {
        match (self.effective_tag(), self.format.bits_per_sample()) {
            (WAVE_FORMAT_IEEE_FLOAT, 32) => SampleFormat::Float32,
            (WAVE_FORMAT_PCM, 16) => SampleFormat::Int16,
            (WAVE_FORMAT_PCM, 24) => SampleFormat::Int24,
            (WAVE_FORMAT_PCM, 32) => SampleFormat::Int32,
            _ => SampleFormat::Unknown,
        }
    }

    /// Bytes per frame (`nBlockAlign`).
    pub fn frame_bytes(&self) -> usize {
        self.format.block_align() as usize
    }
}

impl fmt::Debug for WaveFormatExtensible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("WaveFormatExtensible");
        s.field("format", &self.format);
        if self.is_extensible() {
            s.field("samples", &self.samples())
                .field("channel_mask", &format_args!("0x{:08X}", self.channel_mask()))
                .field("sub_format", &self.sub_format());
        }
        s.finish()
    }
}

impl fmt::Display for WaveFormatExtensible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self.effective_tag();
        match wave_format_tag_name(tag) {
            Some(name) => f.write_str(name)?,
            None => write!(f, "0x{:04X}", tag)?,
        }
        write!(
            f,
            ", {} Hz, {} ch, {} bit",
            self.format.samples_per_sec(),
            self.format.channels(),
            self.format.bits_per_sample()
        )?;
        if self.is_extensible() {
            write!(f, " ({} valid), mask 0x{:08X}", self.samples(), self.channel_mask())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audioclient::types::KSAUDIO_SPEAKER_STEREO;
    use crate::com::co_task_mem_alloc;

    /// A real mix format as reported by a 48 kHz stereo endpoint.
    const MIX_FORMAT: [u8; 40] = [
        0xFE, 0xFF, 0x02, 0x00, 0x80, 0xBB, 0x00, 0x00, 0x00, 0xDC, 0x05, 0x00, 0x08, 0x00, 0x20, 0x00, 0x16, 0x00,
        0x20, 0x00, 0x03, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA,
        0x00, 0x38, 0x9B, 0x71,
    ];

    #[test]
    fn parses_native_mix_format() {
        let wf = WaveFormatExtensible::from_bytes(&MIX_FORMAT).unwrap();
        assert_eq!(wf.format().format_tag(), WAVE_FORMAT_EXTENSIBLE);
        assert_eq!(wf.format().channels(), 2);
        assert_eq!(wf.format().samples_per_sec(), 48_000);
        assert_eq!(wf.format().avg_bytes_per_sec(), 384_000);
        assert_eq!(wf.format().block_align(), 8);
        assert_eq!(wf.format().bits_per_sample(), 32);
        assert_eq!(wf.format().cb_size(), 22);
        assert_eq!(wf.samples(), 32);
        assert_eq!(wf.channel_mask(), KSAUDIO_SPEAKER_STEREO);
        assert_eq!(wf.sub_format(), KSDATAFORMAT_SUBTYPE_IEEE_FLOAT);
        assert_eq!(wf.sub_format_tag(), WAVE_FORMAT_IEEE_FLOAT);
        assert_eq!(wf.sample_format(), SampleFormat::Float32);
        assert_eq!(wf, WaveFormatExtensible::ieee_float(48_000, 2).unwrap());
        assert_eq!(wf.as_bytes(), &MIX_FORMAT);
    }

    #[test]
    fn plain_header_leaves_extension_zeroed() {
        let mut header = *WaveFormatExtensible::pcm(44_100, 2, 16).unwrap().format();
        header.set_format_tag(WAVE_FORMAT_PCM);
        header.set_cb_size(0);
        let wf = WaveFormatExtensible::from_bytes(header.as_bytes()).unwrap();
        assert!(!wf.is_extensible());
        assert_eq!(wf.format().format_tag(), WAVE_FORMAT_PCM);
        assert_eq!(wf.sample_format(), SampleFormat::Int16);
        assert_eq!(wf.channel_mask(), 0);
        assert_eq!(wf.frame_bytes(), 4);
    }

    #[test]
    fn rejects_truncated_blobs() {
        assert!(matches!(
            WaveFormatExtensible::from_bytes(&MIX_FORMAT[..10]),
            Err(ComError::InvalidFormat(_))
        ));
        assert!(matches!(
            WaveFormatExtensible::from_bytes(&MIX_FORMAT[..18]),
            Err(ComError::InvalidFormat(_))
        ));
    }

    #[test]
    fn from_ptr_honours_cb_size() {
        // Only 18 readable bytes: a cbSize of 0 must not read further.
        let mut header = [0u8; 18];
        header.copy_from_slice(&MIX_FORMAT[..18]);
        header[16] = 0;
        let wf = unsafe { WaveFormatExtensible::from_ptr(header.as_ptr()) }.unwrap();
        assert_eq!(wf.format().channels(), 2);
        assert_eq!(wf.sub_format(), Guid::zeroed());

        let full = unsafe { WaveFormatExtensible::from_ptr(MIX_FORMAT.as_ptr()) }.unwrap();
        assert!(full.is_extensible());
        assert!(unsafe { WaveFormatExtensible::from_ptr(ptr::null()) }.is_err());
    }

    #[test]
    fn take_task_mem_copies_then_frees() {
        let raw = co_task_mem_alloc(MIX_FORMAT.len()) as *mut u8;
        unsafe {
            ptr::copy_nonoverlapping(MIX_FORMAT.as_ptr(), raw, MIX_FORMAT.len());
            let wf = WaveFormatExtensible::take_task_mem(raw, "test").unwrap();
            assert_eq!(wf.format().samples_per_sec(), 48_000);
        }
    }

    #[test]
    fn constructors_are_consistent() {
        let wf = WaveFormatExtensible::pcm(96_000, 6, 24).unwrap();
        assert_eq!(wf.format().block_align(), 18);
        assert_eq!(wf.format().avg_bytes_per_sec(), 96_000 * 18);
        assert_eq!(wf.channel_mask(), 0x3F);
        assert_eq!(wf.sample_format(), SampleFormat::Int24);
        assert_eq!(wf.sample_format().sample_bytes(), 3);

        let mut edited = wf;
        edited.format_mut().set_samples_per_sec(48_000);
        edited.set_samples(20);
        assert_eq!(edited.format().samples_per_sec(), 48_000);
        assert_eq!(edited.samples(), 20);
        assert_ne!(edited, wf);
    }

    #[test]
    fn constructors_reject_unrepresentable_formats() {
        assert!(matches!(WaveFormatExtensible::pcm(48_000, 2, 12), Err(ComError::InvalidFormat(_))));
        assert!(WaveFormatExtensible::pcm(48_000, 2, 0).is_err());
        assert!(WaveFormatExtensible::ieee_float(48_000, 0).is_err());
        assert!(WaveFormatExtensible::pcm(48_000, u16::MAX, 16).is_err());
        assert!(WaveFormatExtensible::ieee_float(u32::MAX, 2).is_err());

        let widest = WaveFormatExtensible::pcm(48_000, 8_191, 64).unwrap();
        assert_eq!(widest.format().block_align(), 65_528);
    }

    #[test]
    fn display_summary() {
        let wf = WaveFormatExtensible::ieee_float(48_000, 2).unwrap();
        assert_eq!(
            wf.to_string(),
            "WAVE_FORMAT_IEEE_FLOAT, 48000 Hz, 2 ch, 32 bit (32 valid), mask 0x00000003"
        );
    }
}
