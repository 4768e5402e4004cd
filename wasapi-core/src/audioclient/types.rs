use std::time::Duration;

use bitflags::bitflags;

use crate::com::{ComError, ComResult, Guid};

/// Time in 100-nanosecond units (`REFERENCE_TIME`).
pub type ReferenceTime = i64;

pub const REFTIMES_PER_SEC: ReferenceTime = 10_000_000;
pub const REFTIMES_PER_MILLISEC: ReferenceTime = 10_000;

/// How long `frames` frames last at `sample_rate`, in reference time.
/// Zero for a zero sample rate.
pub fn frames_to_reference_time(frames: u32, sample_rate: u32) -> ReferenceTime {
    if sample_rate == 0 {
        return 0;
    }
    REFTIMES_PER_SEC * frames as ReferenceTime / sample_rate as ReferenceTime
}

/// Negative values clamp to zero.
pub fn reference_time_to_duration(value: ReferenceTime) -> Duration {
    Duration::from_nanos((value.max(0) as u64).saturating_mul(100))
}

/// Truncates to 100 ns units, saturating at `ReferenceTime::MAX`.
pub fn duration_to_reference_time(duration: Duration) -> ReferenceTime {
    (duration.as_nanos() / 100).min(ReferenceTime::MAX as u128) as ReferenceTime
}

raw_enum! {
    /// `AUDCLNT_SHAREMODE`.
    pub enum ShareMode {
        Shared = 0,
        Exclusive = 1,
    }
}

raw_enum! {
    /// `AUDIO_STREAM_CATEGORY`.
    pub enum AudioStreamCategory {
        Other = 0,
        ForegroundOnlyMedia = 1,
        BackgroundCapableMedia = 2,
        Communications = 3,
        Alerts = 4,
        SoundEffects = 5,
        GameEffects = 6,
        GameMedia = 7,
        GameChat = 8,
        Speech = 9,
        Movie = 10,
        Media = 11,
        FarFieldSpeech = 12,
        UniformSpeech = 13,
        VoiceTyping = 14,
    }
}

bitflags! {
    /// `AUDCLNT_STREAMFLAGS_*` and `AUDCLNT_SESSIONFLAGS_*`, passed together
    /// to `IAudioClient::Initialize`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StreamFlags: u32 {
        const CROSSPROCESS = 0x0001_0000;
        const LOOPBACK = 0x0002_0000;
        const EVENTCALLBACK = 0x0004_0000;
        const NOPERSIST = 0x0008_0000;
        const RATEADJUST = 0x0010_0000;
        const SRC_DEFAULT_QUALITY = 0x0800_0000;
        const EXPIREWHENUNOWNED = 0x1000_0000;
        const DISPLAY_HIDE = 0x2000_0000;
        const DISPLAY_HIDEWHENEXPIRED = 0x4000_0000;
        const AUTOCONVERTPCM = 0x8000_0000;
    }
}

bitflags! {
    /// `_AUDCLNT_BUFFERFLAGS`, reported per capture packet and accepted by
    /// `IAudioRenderClient::ReleaseBuffer`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferFlags: u32 {
        const DATA_DISCONTINUITY = 0x1;
        const SILENT = 0x2;
        const TIMESTAMP_ERROR = 0x4;
    }
}

/// Volume levels are linear amplitudes in `0.0..=1.0`; the engine rejects
/// anything else with `E_INVALIDARG`.
pub(crate) fn validate_level(level: f32) -> ComResult<()> {
    if (0.0..=1.0).contains(&level) {
        Ok(())
    } else {
        Err(ComError::InvalidArgument(format!("volume level {} outside 0.0..=1.0", level)))
    }
}

/// `AUDIOCLOCK_CHARACTERISTIC_FIXED_FREQ`.
pub const AUDIOCLOCK_CHARACTERISTIC_FIXED_FREQ: u32 = 0x1;

pub const WAVE_FORMAT_UNKNOWN: u16 = 0x0000;
pub const WAVE_FORMAT_PCM: u16 = 0x0001;
pub const WAVE_FORMAT_ADPCM: u16 = 0x0002;
pub const WAVE_FORMAT_IEEE_FLOAT: u16 = 0x0003;
pub const WAVE_FORMAT_VSELP: u16 = 0x0004;
pub const WAVE_FORMAT_IBM_CVSD: u16 = 0x0005;
pub const WAVE_FORMAT_ALAW: u16 = 0x0006;
pub const WAVE_FORMAT_MULAW: u16 = 0x0007;
pub const WAVE_FORMAT_DTS: u16 = 0x0008;
pub const WAVE_FORMAT_DRM: u16 = 0x0009;
pub const WAVE_FORMAT_WMAVOICE9: u16 = 0x000A;
pub const WAVE_FORMAT_WMAVOICE10: u16 = 0x000B;
pub const WAVE_FORMAT_OKI_ADPCM: u16 = 0x0010;
pub const WAVE_FORMAT_IMA_ADPCM: u16 = 0x0011;
pub const WAVE_FORMAT_GSM610: u16 = 0x0031;
pub const WAVE_FORMAT_MPEG: u16 = 0x0050;
pub const WAVE_FORMAT_MPEGLAYER3: u16 = 0x0055;
pub const WAVE_FORMAT_DOLBY_AC3_SPDIF: u16 = 0x0092;
pub const WAVE_FORMAT_RAW_AAC1: u16 = 0x00FF;
pub const WAVE_FORMAT_WMAUDIO2: u16 = 0x0161;
pub const WAVE_FORMAT_WMAUDIO3: u16 = 0x0162;
pub const WAVE_FORMAT_WMAUDIO_LOSSLESS: u16 = 0x0163;
pub const WAVE_FORMAT_WMASPDIF: u16 = 0x0164;
pub const WAVE_FORMAT_MPEG_ADTS_AAC: u16 = 0x1600;
pub const WAVE_FORMAT_MPEG_LOAS: u16 = 0x1602;
pub const WAVE_FORMAT_MPEG_HEAAC: u16 = 0x1610;
pub const WAVE_FORMAT_DOLBY_AC4: u16 = 0xAC40;
pub const WAVE_FORMAT_FLAC: u16 = 0xF1AC;
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;
pub const WAVE_FORMAT_DEVELOPMENT: u16 = 0xFFFF;

/// Symbolic name of a `wFormatTag`, for diagnostics.
pub fn wave_format_tag_name(tag: u16) -> Option<&'static str> {
    let name = match tag {
        WAVE_FORMAT_UNKNOWN => "WAVE_FORMAT_UNKNOWN",
        WAVE_FORMAT_PCM => "WAVE_FORMAT_PCM",
        WAVE_FORMAT_ADPCM => "WAVE_FORMAT_ADPCM",
        WAVE_FORMAT_IEEE_FLOAT => "WAVE_FORMAT_IEEE_FLOAT",
        WAVE_FORMAT_VSELP => "WAVE_FORMAT_VSELP",
        WAVE_FORMAT_IBM_CVSD => "WAVE_FORMAT_IBM_CVSD",
        WAVE_FORMAT_ALAW => "WAVE_FORMAT_ALAW",
        WAVE_FORMAT_MULAW => "WAVE_FORMAT_MULAW",
        WAVE_FORMAT_DTS => "WAVE_FORMAT_DTS",
        WAVE_FORMAT_DRM => "WAVE_FORMAT_DRM",
        WAVE_FORMAT_WMAVOICE9 => "WAVE_FORMAT_WMAVOICE9",
        WAVE_FORMAT_WMAVOICE10 => "WAVE_FORMAT_WMAVOICE10",
        WAVE_FORMAT_OKI_ADPCM => "WAVE_FORMAT_OKI_ADPCM",
        WAVE_FORMAT_IMA_ADPCM => "WAVE_FORMAT_IMA_ADPCM",
        WAVE_FORMAT_GSM610 => "WAVE_FORMAT_GSM610",
        WAVE_FORMAT_MPEG => "WAVE_FORMAT_MPEG",
        WAVE_FORMAT_MPEGLAYER3 => "WAVE_FORMAT_MPEGLAYER3",
        WAVE_FORMAT_DOLBY_AC3_SPDIF => "WAVE_FORMAT_DOLBY_AC3_SPDIF",
        WAVE_FORMAT_RAW_AAC1 => "WAVE_FORMAT_RAW_AAC1",
        WAVE_FORMAT_WMAUDIO2 => "WAVE_FORMAT_WMAUDIO2",
        WAVE_FORMAT_WMAUDIO3 => "WAVE_FORMAT_WMAUDIO3",
        WAVE_FORMAT_WMAUDIO_LOSSLESS => "WAVE_FORMAT_WMAUDIO_LOSSLESS",
        WAVE_FORMAT_WMASPDIF => "WAVE_FORMAT_WMASPDIF",
        WAVE_FORMAT_MPEG_ADTS_AAC => "WAVE_FORMAT_MPEG_ADTS_AAC",
        WAVE_FORMAT_MPEG_LOAS => "WAVE_FORMAT_MPEG_LOAS",
        WAVE_FORMAT_MPEG_HEAAC => "WAVE_FORMAT_MPEG_HEAAC",
        WAVE_FORMAT_DOLBY_AC4 => "WAVE_FORMAT_DOLBY_AC4",
        WAVE_FORMAT_FLAC => "WAVE_FORMAT_FLAC",
        WAVE_FORMAT_EXTENSIBLE => "WAVE_FORMAT_EXTENSIBLE",
        WAVE_FORMAT_DEVELOPMENT => "WAVE_FORMAT_DEVELOPMENT",
        _ => return None,
    };
    Some(name)
}

/// The `KSDATAFORMAT_SUBTYPE_*` GUID for a format tag:
/// `{tag}-0000-0010-8000-00AA00389B71`.
pub const fn ksdataformat_subtype(tag: u16) -> Guid {
    Guid::from_values(tag as u32, 0x0000, 0x0010, [0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71])
}

pub const KSDATAFORMAT_SUBTYPE_PCM: Guid = ksdataformat_subtype(WAVE_FORMAT_PCM);
pub const KSDATAFORMAT_SUBTYPE_IEEE_FLOAT: Guid = ksdataformat_subtype(WAVE_FORMAT_IEEE_FLOAT);

pub const SPEAKER_FRONT_LEFT: u32 = 0x1;
pub const SPEAKER_FRONT_RIGHT: u32 = 0x2;
pub const SPEAKER_FRONT_CENTER: u32 = 0x4;
pub const SPEAKER_LOW_FREQUENCY: u32 = 0x8;
pub const SPEAKER_BACK_LEFT: u32 = 0x10;
pub const SPEAKER_BACK_RIGHT: u32 = 0x20;
pub const SPEAKER_FRONT_LEFT_OF_CENTER: u32 = 0x40;
pub const SPEAKER_FRONT_RIGHT_OF_CENTER: u32 = 0x80;
pub const SPEAKER_BACK_CENTER: u32 = 0x100;
pub const SPEAKER_SIDE_LEFT: u32 = 0x200;
pub const SPEAKER_SIDE_RIGHT: u32 = 0x400;
pub const SPEAKER_TOP_CENTER: u32 = 0x800;

pub const KSAUDIO_SPEAKER_MONO: u32 = SPEAKER_FRONT_CENTER;
pub const KSAUDIO_SPEAKER_STEREO: u32 = SPEAKER_FRONT_LEFT | SPEAKER_FRONT_RIGHT;
pub const KSAUDIO_SPEAKER_QUAD: u32 = KSAUDIO_SPEAKER_STEREO | SPEAKER_BACK_LEFT | SPEAKER_BACK_RIGHT;
pub const KSAUDIO_SPEAKER_SURROUND: u32 = KSAUDIO_SPEAKER_STEREO | SPEAKER_FRONT_CENTER | SPEAKER_BACK_CENTER;
pub const KSAUDIO_SPEAKER_5POINT1: u32 = KSAUDIO_SPEAKER_QUAD | SPEAKER_FRONT_CENTER | SPEAKER_LOW_FREQUENCY;
pub const KSAUDIO_SPEAKER_7POINT1: u32 =
    KSAUDIO_SPEAKER_5POINT1 | SPEAKER_FRONT_LEFT_OF_CENTER | SPEAKER_FRONT_RIGHT_OF_CENTER;
pub const KSAUDIO_SPEAKER_5POINT1_SURROUND: u32 =
    KSAUDIO_SPEAKER_STEREO | SPEAKER_FRONT_CENTER | SPEAKER_LOW_FREQUENCY | SPEAKER_SIDE_LEFT | SPEAKER_SIDE_RIGHT;
pub const KSAUDIO_SPEAKER_7POINT1_SURROUND: u32 =
    KSAUDIO_SPEAKER_5POINT1_SURROUND | SPEAKER_BACK_LEFT | SPEAKER_BACK_RIGHT;

/// The conventional speaker layout for a channel count, or 0 (no
/// positions) when there is none.
pub fn default_channel_mask(channels: u16) -> u32 {
    match channels {
        1 => KSAUDIO_SPEAKER_MONO,
        2 => KSAUDIO_SPEAKER_STEREO,
        3 => KSAUDIO_SPEAKER_STEREO | SPEAKER_FRONT_CENTER,
        4 => KSAUDIO_SPEAKER_QUAD,
        5 => KSAUDIO_SPEAKER_QUAD | SPEAKER_FRONT_CENTER,
        6 => KSAUDIO_SPEAKER_5POINT1,
        7 => KSAUDIO_SPEAKER_5POINT1 | SPEAKER_BACK_CENTER,
        8 => KSAUDIO_SPEAKER_7POINT1_SURROUND,
        _ => 0,
    }
}
