//! Audio endpoint listing via the MMDevice API.
//!
//! Wraps `IMMDeviceEnumerator` to list render (speaker/headphone) and
//! capture (microphone) endpoints with friendly names, form factors and
//! transport types.

use std::fmt;

use serde::{Serialize, Serializer};

use wasapi_core::com::STGM_READ;
use wasapi_core::mmdevice::{
    DeviceState, EDataFlow, ERole, EndpointFormFactor, IMMDevice, IMMDeviceEnumerator, PKEY_DEVICE_ENUMERATOR_NAME,
};
use wasapi_core::ComOwned;

use crate::error::CaptureError;

/// Bus an endpoint is attached through, from `PKEY_Device_EnumeratorName`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    BuiltIn,
    Usb,
    Bluetooth,
    BluetoothLe,
    Unknown,
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportType::BuiltIn => "built-in",
            TransportType::Usb => "USB",
            TransportType::Bluetooth => "Bluetooth",
            TransportType::BluetoothLe => "Bluetooth LE",
            TransportType::Unknown => "unknown",
        })
    }
}

/// Maps an enumerator name such as `"BTHENUM"` or `"USB"` to a transport.
pub fn classify_transport(enumerator_name: Option<&str>) -> TransportType {
    let Some(name) = enumerator_name else {
        return TransportType::Unknown;
    };
    let name = name.to_ascii_uppercase();
    if name.contains("BTHENUM") {
        TransportType::Bluetooth
    } else if name.contains("BTHLEENUM") {
        TransportType::BluetoothLe
    } else if name.contains("USB") {
        TransportType::Usb
    } else {
        TransportType::BuiltIn
    }
}

fn serialize_display<T: fmt::Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn serialize_form_factor<S: Serializer>(value: &Option<EndpointFormFactor>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(form_factor) => serializer.collect_str(&format_args!("{:?}", form_factor)),
        None => serializer.serialize_none(),
    }
}

/// One endpoint as listed by [`DeviceEnumerator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    #[serde(serialize_with = "serialize_display")]
    pub flow: EDataFlow,
    #[serde(serialize_with = "serialize_display")]
    pub state: DeviceState,
    /// Default console endpoint for its flow.
    pub is_default: bool,
    #[serde(serialize_with = "serialize_form_factor")]
    pub form_factor: Option<EndpointFormFactor>,
    pub transport: TransportType,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.is_default { "*" } else { " " };
        write!(f, "{} [{}] {} ({}, {})", marker, self.flow, self.name, self.transport, self.state)?;
        if let Some(form_factor) = self.form_factor {
            write!(f, " {:?}", form_factor)?;
        }
        write!(f, "\n    {}", self.id)
    }
}

/// Endpoint enumerator. COM must be initialized on the calling thread and
/// the value must stay on that thread.
pub struct DeviceEnumerator {
    enumerator: ComOwned<IMMDeviceEnumerator>,
}

impl DeviceEnumerator {
    /// Creates the system `MMDeviceEnumerator`.
    pub fn new() -> Result<Self, CaptureError> {
        let enumerator = unsafe { ComOwned::new(IMMDeviceEnumerator::create()?) };
        Ok(Self { enumerator })
    }

    /// Active render endpoints (loopback sources).
    pub fn list_render_devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        self.list(EDataFlow::Render, DeviceState::ACTIVE)
    }

    /// Active capture endpoints.
    pub fn list_capture_devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        self.list(EDataFlow::Capture, DeviceState::ACTIVE)
    }

    /// Endpoints of `flow` (or both with [`EDataFlow::All`]) whose state is
    /// in `state_mask`. Endpoints whose id or state cannot be read are skipped.
    pub fn list(&self, flow: EDataFlow, state_mask: DeviceState) -> Result<Vec<DeviceInfo>, CaptureError> {
        let render_default = self.default_id_for(flow, EDataFlow::Render);
        let capture_default = self.default_id_for(flow, EDataFlow::Capture);

        let devices: Vec<ComOwned<IMMDevice>> = unsafe {
            let collection = ComOwned::new(self.enumerator.enum_audio_endpoints(flow, state_mask)?);
            collection.devices()?.into_iter().map(|device| ComOwned::new(device)).collect()
        };
        Ok(describe_endpoints(
            &devices,
            flow,
            render_default.as_deref(),
            capture_default.as_deref(),
        ))
    }

    /// Id of the default console endpoint for `flow`.
    pub fn default_device_id(&self, flow: EDataFlow) -> Result<String, CaptureError> {
        unsafe {
            let device = self
                .enumerator
                .get_default_audio_endpoint(flow, ERole::Console)
                .map_err(|_| CaptureError::DeviceNotAvailable)?;
            let device = ComOwned::new(device);
            Ok(device.get_id()?)
        }
    }

    fn default_id_for(&self, listed: EDataFlow, flow: EDataFlow) -> Option<String> {
        if listed != EDataFlow::All && listed != flow {
            return None;
        }
        self.default_device_id(flow).ok()
    }
}

/// Per-endpoint reads used to build a [`DeviceInfo`].
trait EndpointProperties {
    fn id(&self) -> Result<String, CaptureError>;
    fn data_flow(&self) -> Result<EDataFlow, CaptureError>;
    fn state(&self) -> Result<DeviceState, CaptureError>;
    fn friendly_name(&self) -> Option<String>;
    fn form_factor(&self) -> Option<EndpointFormFactor>;
    fn transport(&self) -> TransportType;
}

impl EndpointProperties for ComOwned<IMMDevice> {
    fn id(&self) -> Result<String, CaptureError> {
        Ok(unsafe { self.get_id()? })
    }

    fn data_flow(&self) -> Result<EDataFlow, CaptureError> {
        Ok(unsafe { IMMDevice::data_flow(self)? })
    }

    fn state(&self) -> Result<DeviceState, CaptureError> {
        Ok(unsafe { self.get_state()? })
    }

    fn friendly_name(&self) -> Option<String> {
        unsafe { IMMDevice::friendly_name(self) }.ok().flatten()
    }

    fn form_factor(&self) -> Option<EndpointFormFactor> {
        unsafe { IMMDevice::form_factor(self) }.ok().flatten()
    }

    fn transport(&self) -> TransportType {
        let name = unsafe {
            self.open_property_store(STGM_READ).and_then(|store| {
                let store = ComOwned::new(store);
                store.get_string(&PKEY_DEVICE_ENUMERATOR_NAME)
            })
        };
        match name {
            Ok(name) => classify_transport(name.as_deref()),
            Err(e) => {
                log::debug!("Enumerator name unavailable: {}", e);
                TransportType::Unknown
            }
        }
    }
}

fn describe_endpoints<E: EndpointProperties>(
    devices: &[E],
    flow: EDataFlow,
    render_default: Option<&str>,
    capture_default: Option<&str>,
) -> Vec<DeviceInfo> {
    let mut listed = Vec::with_capacity(devices.len());
    for (index, device) in devices.iter().enumerate() {
        let (id, state) = match device.id().and_then(|id| device.state().map(|state| (id, state))) {
            Ok(read) => read,
            Err(e) => {
                log::warn!("Skipping endpoint {}: {}", index, e);
                continue;
            }
        };
        let device_flow = match flow {
            EDataFlow::All => device.data_flow().unwrap_or(EDataFlow::All),
            other => other,
        };
        let default_id = match device_flow {
            EDataFlow::Render => render_default,
            EDataFlow::Capture => capture_default,
            EDataFlow::All => None,
        };
        listed.push(DeviceInfo {
            is_default: default_id == Some(id.as_str()),
            name: device.friendly_name().unwrap_or_else(|| format!("Device {}", index)),
            id,
            flow: device_flow,
            state,
            form_factor: device.form_factor(),
            transport: device.transport(),
        });
    }
    listed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_from_enumerator_name() {
        assert_eq!(classify_transport(Some("BTHENUM")), TransportType::Bluetooth);
        assert_eq!(classify_transport(Some("BTHLEENUM")), TransportType::BluetoothLe);
        assert_eq!(classify_transport(Some("usb")), TransportType::Usb);
        assert_eq!(classify_transport(Some("HDAUDIO")), TransportType::BuiltIn);
        assert_eq!(classify_transport(None), TransportType::Unknown);
    }

    fn speakers() -> DeviceInfo {
        DeviceInfo {
            id: "{0.0.0.00000000}.{b3f8fa53-0004-438e-9003-51a46e139bfc}".into(),
            name: "Speakers (Realtek Audio)".into(),
            flow: EDataFlow::Render,
            state: DeviceState::ACTIVE,
            is_default: true,
            form_factor: Some(EndpointFormFactor::Speakers),
            transport: TransportType::BuiltIn,
        }
    }

    #[test]
    fn device_info_serializes_readable_fields() {
        let json = serde_json::to_value(speakers()).unwrap();
        assert_eq!(json["flow"], "render");
        assert_eq!(json["state"], "active");
        assert_eq!(json["form_factor"], "Speakers");
        assert_eq!(json["transport"], "built_in");
        assert_eq!(json["is_default"], true);

        let unplugged = DeviceInfo {
            state: DeviceState::UNPLUGGED,
            form_factor: None,
            ..speakers()
        };
        let json = serde_json::to_value(unplugged).unwrap();
        assert_eq!(json["state"], "unplugged");
        assert!(json["form_factor"].is_null());
    }

    #[test]
    fn device_info_display_marks_default() {
        let text = speakers().to_string();
        assert!(text.starts_with("* [render] Speakers (Realtek Audio) (built-in, active) Speakers"));
        assert!(text.ends_with("{0.0.0.00000000}.{b3f8fa53-0004-438e-9003-51a46e139bfc}"));
    }

    struct StubEndpoint {
        id: Option<&'static str>,
        flow: Option<EDataFlow>,
        state: Option<DeviceState>,
        name: Option<&'static str>,
    }

    impl StubEndpoint {
        fn new(id: &'static str, flow: EDataFlow, name: &'static str) -> Self {
            Self {
                id: Some(id),
                flow: Some(flow),
                state: Some(DeviceState::ACTIVE),
                name: Some(name),
            }
        }
    }

    impl EndpointProperties for StubEndpoint {
        fn id(&self) -> Result<String, CaptureError> {
            self.id.map(String::from).ok_or(CaptureError::DeviceNotAvailable)
        }

        fn data_flow(&self) -> Result<EDataFlow, CaptureError> {
            self.flow.ok_or(CaptureError::DeviceNotAvailable)
        }

        fn state(&self) -> Result<DeviceState, CaptureError> {
            self.state.ok_or(CaptureError::DeviceNotAvailable)
        }

        fn friendly_name(&self) -> Option<String> {
            self.name.map(String::from)
        }

        fn form_factor(&self) -> Option<EndpointFormFactor> {
            None
        }

        fn transport(&self) -> TransportType {
            TransportType::Usb
        }
    }

    #[test]
    fn marks_defaults_per_flow_when_listing_all() {
        let devices = [
            StubEndpoint::new("spk", EDataFlow::Render, "Speakers"),
            StubEndpoint::new("hp", EDataFlow::Render, "Headphones"),
            StubEndpoint::new("mic", EDataFlow::Capture, "Microphone"),
        ];
        let listed = describe_endpoints(&devices, EDataFlow::All, Some("hp"), Some("mic"));

        let flows: Vec<_> = listed.iter().map(|d| d.flow).collect();
        assert_eq!(flows, [EDataFlow::Render, EDataFlow::Render, EDataFlow::Capture]);
        let defaults: Vec<_> = listed.iter().map(|d| d.is_default).collect();
        assert_eq!(defaults, [false, true, true]);
        assert_eq!(listed[2].transport, TransportType::Usb);
    }

    #[test]
    fn listed_flow_wins_over_endpoint_query() {
        let mut unknown = StubEndpoint::new("spk", EDataFlow::Render, "Speakers");
        unknown.flow = None;
        let listed = describe_endpoints(&[unknown], EDataFlow::Render, Some("spk"), None);
        assert_eq!(listed[0].flow, EDataFlow::Render);
        assert!(listed[0].is_default);

        let mut unknown = StubEndpoint::new("spk", EDataFlow::Render, "Speakers");
        unknown.flow = None;
        let listed = describe_endpoints(&[unknown], EDataFlow::All, Some("spk"), None);
        assert_eq!(listed[0].flow, EDataFlow::All);
        assert!(!listed[0].is_default);
    }

    #[test]
    fn unreadable_endpoints_are_skipped() {
        let mut no_id = StubEndpoint::new("a", EDataFlow::Render, "A");
        no_id.id = None;
        let mut no_state = StubEndpoint::new("b", EDataFlow::Render, "B");
        no_state.state = None;
        let devices = [no_id, no_state, StubEndpoint::new("c", EDataFlow::Render, "C")];

        let listed = describe_endpoints(&devices, EDataFlow::Render, None, None);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "c");
        assert_eq!(listed[0].state, DeviceState::ACTIVE);
    }

    #[test]
    fn missing_name_falls_back_to_position() {
        let mut unnamed = StubEndpoint::new("x", EDataFlow::Capture, "");
        unnamed.name = None;
        let devices = [StubEndpoint::new("w", EDataFlow::Capture, "Line In"), unnamed];

        let listed = describe_endpoints(&devices, EDataFlow::Capture, None, None);
        assert_eq!(listed[0].name, "Line In");
        assert_eq!(listed[1].name, "Device 1");
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn enumerator_needs_windows() {
        assert!(matches!(DeviceEnumerator::new(), Err(CaptureError::Com(_))));
    }
}
