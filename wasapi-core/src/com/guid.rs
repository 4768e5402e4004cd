use std::fmt;
use std::str::FromStr;

use super::error::ComError;

/// A 16-byte COM identifier (IID, CLSID, format id, session id).
///
/// Layout matches the native `GUID` exactly:
/// ```text
/// [0-3]   data1 (u32)
/// [4-5]   data2 (u16)
/// [6-7]   data3 (u16)
/// [8-15]  data4 ([u8; 8])
/// ```
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    pub const fn zeroed() -> Self {
        Self::from_values(0, 0, 0, [0; 8])
    }

    pub const fn from_values(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self { data1, data2, data3, data4 }
    }

    /// Builds a GUID from its canonical big-endian 128-bit spelling, e.g.
    /// `0x1cb9ad4c_dbfa_4c32_b178_c2f568a703b2`.
    pub const fn from_u128(value: u128) -> Self {
        Self {
            data1: (value >> 96) as u32,
            data2: (value >> 80 & 0xffff) as u16,
            data3: (value >> 64 & 0xffff) as u16,
            data4: (value as u64).to_be_bytes(),
        }
    }

    pub const fn to_u128(&self) -> u128 {
        ((self.data1 as u128) << 96)
            | ((self.data2 as u128) << 80)
            | ((self.data3 as u128) << 64)
            | u64::from_be_bytes(self.data4) as u128
    }

    /// Random (version 4) GUID, used for audio session identifiers.
    pub fn new_v4() -> Self {
        uuid::Uuid::new_v4().into()
    }

    pub fn is_zero(&self) -> bool {
        self.to_u128() == 0
    }

    /// The native in-memory representation (little-endian for the first
    /// three fields).
    pub fn to_bytes_le(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[0..4].copy_from_slice(&self.data1.to_le_bytes());
        out[4..6].copy_from_slice(&self.data2.to_le_bytes());
        out[6..8].copy_from_slice(&self.data3.to_le_bytes());
        out[8..16].copy_from_slice(&self.data4);
        out
    }

    pub fn from_bytes_le(bytes: [u8; 16]) -> Self {
        let mut data4 = [0u8; 8];
        data4.copy_from_slice(&bytes[8..16]);
        Self {
            data1: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            data2: u16::from_le_bytes([bytes[4], bytes[5]]),
            data3: u16::from_le_bytes([bytes[6], bytes[7]]),
            data4,
        }
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self)
    }
}

impl FromStr for Guid {
    type Err = ComError;

    /// Accepts `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX`, optionally wrapped in
    /// braces, plus the other spellings `uuid` understands.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s.trim())
            .map(Guid::from)
            .map_err(|e| ComError::InvalidArgument(format!("malformed GUID {:?}: {}", s, e)))
    }
}

impl From<uuid::Uuid> for Guid {
    fn from(value: uuid::Uuid) -> Self {
        Self::from_u128(value.as_u128())
    }
}

impl From<Guid> for uuid::Uuid {
    fn from(value: Guid) -> Self {
        uuid::Uuid::from_u128(value.to_u128())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IID_IAUDIOCLIENT: Guid = Guid::from_u128(0x1cb9ad4c_dbfa_4c32_b178_c2f568a703b2);

    #[test]
    fn layout_matches_native_guid() {
        assert_eq!(std::mem::size_of::<Guid>(), 16);
        assert_eq!(std::mem::align_of::<Guid>(), 4);
    }

    #[test]
    fn from_u128_splits_fields() {
        assert_eq!(IID_IAUDIOCLIENT.data1, 0x1CB9AD4C);
        assert_eq!(IID_IAUDIOCLIENT.data2, 0xDBFA);
        assert_eq!(IID_IAUDIOCLIENT.data3, 0x4C32);
        assert_eq!(IID_IAUDIOCLIENT.data4, [0xB1, 0x78, 0xC2, 0xF5, 0x68, 0xA7, 0x03, 0xB2]);
        assert_eq!(IID_IAUDIOCLIENT.to_u128(), 0x1cb9ad4c_dbfa_4c32_b178_c2f568a703b2);
    }

    #[test]
    fn display_is_canonical_uppercase() {
        assert_eq!(IID_IAUDIOCLIENT.to_string(), "1CB9AD4C-DBFA-4C32-B178-C2F568A703B2");
        assert_eq!(format!("{:?}", IID_IAUDIOCLIENT), "{1CB9AD4C-DBFA-4C32-B178-C2F568A703B2}");
    }

    #[test]
    fn parses_with_and_without_braces() {
        let plain: Guid = "1cb9ad4c-dbfa-4c32-b178-c2f568a703b2".parse().unwrap();
        let braced: Guid = "{1CB9AD4C-DBFA-4C32-B178-C2F568A703B2}".parse().unwrap();
        assert_eq!(plain, IID_IAUDIOCLIENT);
        assert_eq!(braced, IID_IAUDIOCLIENT);
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!("1cb9ad4c-dbfa-4c32-b178".parse::<Guid>().is_err());
        assert!("zzb9ad4c-dbfa-4c32-b178-c2f568a703b2".parse::<Guid>().is_err());
        assert!("+1111111-2222-3333-4444-555555555555".parse::<Guid>().is_err());
        assert!("{1cb9ad4c-dbfa-4c32-b178-c2f568a703b2".parse::<Guid>().is_err());
        assert!("1cb9ad4c-dbfa-4c32-b178-c2f568a703b".parse::<Guid>().is_err());
    }

    #[test]
    fn native_bytes_are_mixed_endian() {
        let bytes = IID_IAUDIOCLIENT.to_bytes_le();
        assert_eq!(&bytes[0..4], &[0x4C, 0xAD, 0xB9, 0x1C]);
        assert_eq!(&bytes[4..6], &[0xFA, 0xDB]);
        assert_eq!(&bytes[8..10], &[0xB1, 0x78]);
        assert_eq!(Guid::from_bytes_le(bytes), IID_IAUDIOCLIENT);
    }

    #[test]
    fn uuid_conversion_preserves_value() {
        let guid = Guid::new_v4();
        let uuid: uuid::Uuid = guid.into();
        assert_eq!(uuid.to_string().to_uppercase(), guid.to_string());
        assert!(!guid.is_zero());
        assert!(Guid::zeroed().is_zero());
    }
}
