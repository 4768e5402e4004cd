use std::fmt;

use bitflags::bitflags;

use crate::com::Guid;

pub const CLSID_MM_DEVICE_ENUMERATOR: Guid = Guid::from_u128(0xbcde0395_e52f_467c_8e3d_c4579291692e);

pub const DEVICE_STATE_ACTIVE: u32 = 0x1;
pub const DEVICE_STATE_DISABLED: u32 = 0x2;
pub const DEVICE_STATE_NOTPRESENT: u32 = 0x4;
pub const DEVICE_STATE_UNPLUGGED: u32 = 0x8;
pub const DEVICE_STATEMASK_ALL: u32 = 0xF;

bitflags! {
    /// Endpoint device state, also used as a filter mask when enumerating.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DeviceState: u32 {
        const ACTIVE = DEVICE_STATE_ACTIVE;
        const DISABLED = DEVICE_STATE_DISABLED;
        const NOTPRESENT = DEVICE_STATE_NOTPRESENT;
        const UNPLUGGED = DEVICE_STATE_UNPLUGGED;
        const ALL = DEVICE_STATEMASK_ALL;
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if *self == DeviceState::ACTIVE {
            "active"
        } else if *self == DeviceState::DISABLED {
            "disabled"
        } else if *self == DeviceState::NOTPRESENT {
            "not present"
        } else if *self == DeviceState::UNPLUGGED {
            "unplugged"
        } else {
            return write!(f, "0x{:X}", self.bits());
        };
        f.write_str(name)
    }
}

raw_enum! {
    /// Direction of the audio stream through an endpoint.
    pub enum EDataFlow {
        Render = 0,
        Capture = 1,
        All = 2,
    }
}

raw_enum! {
    /// Role the system assigns to a default endpoint.
    pub enum ERole {
        Console = 0,
        Multimedia = 1,
        Communications = 2,
    }
}

raw_enum! {
    pub enum EndpointFormFactor {
        RemoteNetworkDevice = 0,
        Speakers = 1,
        LineLevel = 2,
        Headphones = 3,
        Microphone = 4,
        Headset = 5,
        Handset = 6,
        UnknownDigitalPassthrough = 7,
        Spdif = 8,
        DigitalAudioDisplayDevice = 9,
        UnknownFormFactor = 10,
    }
}

impl fmt::Display for EDataFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EDataFlow::Render => "render",
            EDataFlow::Capture => "capture",
            EDataFlow::All => "all",
        })
    }
}
