use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wasapi_core::audioclient::{ReferenceTime, StreamFlags, REFTIMES_PER_MILLISEC, REFTIMES_PER_SEC};
use wasapi_core::mmdevice::EDataFlow;

use crate::error::CaptureError;

/// Which side of the audio engine a stream reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    /// The mix sent to a render endpoint (what the speakers play).
    #[default]
    Loopback,
    /// A capture endpoint such as a microphone.
    Capture,
}

impl EndpointKind {
    /// The endpoint direction to open: loopback reads from a render device.
    pub fn data_flow(self) -> EDataFlow {
        match self {
            EndpointKind::Loopback => EDataFlow::Render,
            EndpointKind::Capture => EDataFlow::Capture,
        }
    }

    /// `Initialize` flags: `LOOPBACK` for loopback, none for capture.
    pub fn stream_flags(self) -> StreamFlags {
        match self {
            EndpointKind::Loopback => StreamFlags::LOOPBACK,
            EndpointKind::Capture => StreamFlags::empty(),
        }
    }
}

/// Configuration for a [`CaptureStream`](crate::CaptureStream).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Endpoint id, or None for the default console endpoint.
    pub device_id: Option<String>,

    pub endpoint: EndpointKind,

    /// Requested endpoint buffer length in 100 ns units (default: 1 s).
    pub buffer_duration: ReferenceTime,

    /// Stop on its own after this many seconds (None = until stopped).
    pub max_duration_secs: Option<f64>,

    /// Audio session to join, or None for a new session.
    pub session_id: Option<Uuid>,

    /// Keep the session out of the volume mixer's persisted settings.
    pub no_persist: bool,
}

impl CaptureConfig {
    /// Default render endpoint in loopback mode.
    pub fn loopback() -> Self {
        Self::default()
    }

    /// Default capture endpoint.
    pub fn microphone() -> Self {
        Self {
            endpoint: EndpointKind::Capture,
            ..Self::default()
        }
    }

    /// Parses and validates a JSON document; missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, CaptureError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| CaptureError::ConfigurationFailed(format!("invalid config: {}", e)))?;
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(config)
    }

    /// Checks ranges; the error names the offending field.
    pub fn validate(&self) -> Result<(), String> {
        if self.buffer_duration < 10 * REFTIMES_PER_MILLISEC {
            return Err(format!(
                "buffer duration must be at least 10 ms, got {} (100 ns units)",
                self.buffer_duration
            ));
        }
        if self.buffer_duration > 20 * REFTIMES_PER_SEC {
            return Err(format!("buffer duration too long: {} (100 ns units)", self.buffer_duration));
        }
        if let Some(secs) = self.max_duration_secs {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(format!("max duration must be positive, got {}", secs));
            }
        }
        if let Some(id) = &self.device_id {
            if id.is_empty() || id.contains('\0') {
                return Err("device id must be a non-empty string without NUL".into());
            }
        }
        Ok(())
    }

    /// Flags passed to `IAudioClient::Initialize`.
    pub fn stream_flags(&self) -> StreamFlags {
        let mut flags = self.endpoint.stream_flags();
        if self.no_persist {
            flags |= StreamFlags::NOPERSIST;
        }
        flags
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            endpoint: EndpointKind::Loopback,
            buffer_duration: REFTIMES_PER_SEC,
            max_duration_secs: None,
            session_id: None,
            no_persist: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_one_second_loopback() {
        let config = CaptureConfig::default();
        assert_eq!(config.endpoint, EndpointKind::Loopback);
        assert_eq!(config.buffer_duration, 10_000_000);
        assert_eq!(config.stream_flags(), StreamFlags::LOOPBACK);
        assert_eq!(config.endpoint.data_flow(), EDataFlow::Render);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn microphone_uses_capture_endpoint() {
        let config = CaptureConfig {
            no_persist: true,
            ..CaptureConfig::microphone()
        };
        assert_eq!(config.endpoint.data_flow(), EDataFlow::Capture);
        assert_eq!(config.stream_flags(), StreamFlags::NOPERSIST);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let short = CaptureConfig {
            buffer_duration: REFTIMES_PER_MILLISEC,
            ..CaptureConfig::default()
        };
        assert!(short.validate().is_err());

        let negative = CaptureConfig {
            max_duration_secs: Some(-1.0),
            ..CaptureConfig::default()
        };
        assert!(negative.validate().is_err());

        let nan = CaptureConfig {
            max_duration_secs: Some(f64::NAN),
            ..CaptureConfig::default()
        };
        assert!(nan.validate().is_err());

        let empty_id = CaptureConfig {
            device_id: Some(String::new()),
            ..CaptureConfig::default()
        };
        assert!(empty_id.validate().is_err());
    }

    #[test]
    fn parses_partial_json() {
        let config = CaptureConfig::from_json(
            r#"{"endpoint": "capture", "max_duration_secs": 2.5,
                "session_id": "6f9619ff-8b86-d011-b42d-00c04fc964ff"}"#,
        )
        .unwrap();
        assert_eq!(config.endpoint, EndpointKind::Capture);
        assert_eq!(config.max_duration_secs, Some(2.5));
        assert_eq!(config.buffer_duration, REFTIMES_PER_SEC);
        assert!(config.session_id.is_some());

        assert!(matches!(
            CaptureConfig::from_json(r#"{"buffer_duration": 5}"#),
            Err(CaptureError::ConfigurationFailed(_))
        ));
        assert!(CaptureConfig::from_json("not json").is_err());
    }
}
