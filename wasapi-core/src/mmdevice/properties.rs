//! Well-known device property keys.

use crate::com::{Guid, PropertyKey};

const DEVICE_FMTID: Guid = Guid::from_u128(0xa45c254e_df1c_4efd_8020_67d146a850e0);
const DEVICE_INTERFACE_FMTID: Guid = Guid::from_u128(0x026e516e_b814_414b_83cd_856d6fef4822);
const AUDIO_ENDPOINT_FMTID: Guid = Guid::from_u128(0x1da5d803_d492_4edd_8c23_e0c0ffee7f0e);
const AUDIO_ENGINE_FMTID: Guid = Guid::from_u128(0xf19f064d_082c_4e27_bc73_6882a1bb8e4c);

/// `VT_LPWSTR`, e.g. "Speakers (High Definition Audio Device)".
pub const PKEY_DEVICE_FRIENDLY_NAME: PropertyKey = PropertyKey::new(DEVICE_FMTID, 14);
/// `VT_LPWSTR`, e.g. "Speakers".
pub const PKEY_DEVICE_DEVICE_DESC: PropertyKey = PropertyKey::new(DEVICE_FMTID, 2);
pub const PKEY_DEVICE_ENUMERATOR_NAME: PropertyKey = PropertyKey::new(DEVICE_FMTID, 24);
/// `VT_LPWSTR`, the adapter name.
pub const PKEY_DEVICE_INTERFACE_FRIENDLY_NAME: PropertyKey = PropertyKey::new(DEVICE_INTERFACE_FMTID, 2);
/// `VT_UI4`, an [`EndpointFormFactor`](super::EndpointFormFactor).
pub const PKEY_AUDIO_ENDPOINT_FORM_FACTOR: PropertyKey = PropertyKey::new(AUDIO_ENDPOINT_FMTID, 0);
/// `VT_UI4` speaker mask.
pub const PKEY_AUDIO_ENDPOINT_PHYSICAL_SPEAKERS: PropertyKey = PropertyKey::new(AUDIO_ENDPOINT_FMTID, 3);
/// `VT_LPWSTR` holding a braced GUID.
pub const PKEY_AUDIO_ENDPOINT_GUID: PropertyKey = PropertyKey::new(AUDIO_ENDPOINT_FMTID, 4);
/// `VT_BLOB` holding the shared-mode `WAVEFORMATEX`.
pub const PKEY_AUDIO_ENGINE_DEVICE_FORMAT: PropertyKey = PropertyKey::new(AUDIO_ENGINE_FMTID, 0);
