//! Multimedia device API: endpoint discovery, properties and change
//! notifications.

pub mod collection;
pub mod device;
pub mod endpoint;
pub mod enumerator;
pub mod notification;
pub mod properties;
pub mod types;

pub use collection::{IMMDeviceCollection, IMMDeviceCollectionVtbl, IID_IMM_DEVICE_COLLECTION};
pub use device::{IMMDevice, IMMDeviceVtbl, IID_IMM_DEVICE};
pub use endpoint::{IMMEndpoint, IMMEndpointVtbl, IID_IMM_ENDPOINT};
pub use enumerator::{IMMDeviceEnumerator, IMMDeviceEnumeratorVtbl, IID_IMM_DEVICE_ENUMERATOR};
pub use notification::{
    EndpointNotificationHandler, IMMNotificationClient, IMMNotificationClientVtbl, NotificationClient,
    IID_IMM_NOTIFICATION_CLIENT,
};
pub use properties::*;
pub use types::{
    DeviceState, EDataFlow, ERole, EndpointFormFactor, CLSID_MM_DEVICE_ENUMERATOR, DEVICE_STATEMASK_ALL,
    DEVICE_STATE_ACTIVE, DEVICE_STATE_DISABLED, DEVICE_STATE_NOTPRESENT, DEVICE_STATE_UNPLUGGED,
};
