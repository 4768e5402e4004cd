//! Audio stream interfaces: the client, its buffer services, clock and
//! volume controls, plus the wave format blobs they exchange.

pub mod capture_client;
pub mod channel_volume;
pub mod client;
pub mod clock;
pub mod render_client;
pub mod simple_volume;
pub mod stream_volume;
pub mod types;
pub mod wave_format;

pub use capture_client::{CapturePacket, IAudioCaptureClient, IAudioCaptureClientVtbl, IID_IAUDIO_CAPTURE_CLIENT};
pub use channel_volume::{IChannelAudioVolume, IChannelAudioVolumeVtbl, IID_ICHANNEL_AUDIO_VOLUME};
pub use client::{FormatSupport, IAudioClient, IAudioClientVtbl, IID_IAUDIO_CLIENT};
pub use clock::{IAudioClock, IAudioClockVtbl, IID_IAUDIO_CLOCK};
pub use render_client::{IAudioRenderClient, IAudioRenderClientVtbl, IID_IAUDIO_RENDER_CLIENT};
pub use simple_volume::{ISimpleAudioVolume, ISimpleAudioVolumeVtbl, IID_ISIMPLE_AUDIO_VOLUME};
pub use stream_volume::{IAudioStreamVolume, IAudioStreamVolumeVtbl, IID_IAUDIO_STREAM_VOLUME};
pub use types::*;
pub use wave_format::{
    SampleFormat, WaveFormatEx, WaveFormatExtensible, WAVE_FORMAT_EXTENSIBLE_CB_SIZE, WAVE_FORMAT_EXTENSIBLE_SIZE,
    WAVE_FORMAT_EX_SIZE,
};
