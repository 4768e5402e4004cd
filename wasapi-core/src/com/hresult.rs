use std::fmt;

use super::error::{ComError, ComResult};

/// A 32-bit COM status code.
///
/// Negative values are failures. Everything else (`S_OK`, `S_FALSE`,
/// `AUDCLNT_S_BUFFER_EMPTY`, ...) is a success.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HResult(pub i32);

const fn hresult(bits: u32) -> HResult {
    HResult(bits as i32)
}

const FACILITY_AUDCLNT: u32 = 0x889;

const fn audclnt_err(code: u32) -> HResult {
    hresult(0x8000_0000 | (FACILITY_AUDCLNT << 16) | code)
}

const fn audclnt_success(code: u32) -> HResult {
    hresult((FACILITY_AUDCLNT << 16) | code)
}

pub const S_OK: HResult = hresult(0);
pub const S_FALSE: HResult = hresult(1);
pub const E_NOTIMPL: HResult = hresult(0x8000_4001);
pub const E_NOINTERFACE: HResult = hresult(0x8000_4002);
pub const E_POINTER: HResult = hresult(0x8000_4003);
pub const E_ABORT: HResult = hresult(0x8000_4004);
pub const E_FAIL: HResult = hresult(0x8000_4005);
pub const E_UNEXPECTED: HResult = hresult(0x8000_FFFF);
pub const E_ACCESSDENIED: HResult = hresult(0x8007_0005);
pub const E_HANDLE: HResult = hresult(0x8007_0006);
pub const E_OUTOFMEMORY: HResult = hresult(0x8007_000E);
pub const E_INVALIDARG: HResult = hresult(0x8007_0057);
pub const E_NOTFOUND: HResult = hresult(0x8007_0490);
pub const CO_E_NOTINITIALIZED: HResult = hresult(0x8004_01F0);
pub const RPC_E_CHANGED_MODE: HResult = hresult(0x8001_0106);
pub const REGDB_E_CLASSNOTREG: HResult = hresult(0x8004_0154);
pub const CLASS_E_NOAGGREGATION: HResult = hresult(0x8004_0110);
pub const INPLACE_S_TRUNCATED: HResult = hresult(0x0004_01A0);

pub const AUDCLNT_E_NOT_INITIALIZED: HResult = audclnt_err(0x001);
pub const AUDCLNT_E_ALREADY_INITIALIZED: HResult = audclnt_err(0x002);
pub const AUDCLNT_E_WRONG_ENDPOINT_TYPE: HResult = audclnt_err(0x003);
pub const AUDCLNT_E_DEVICE_INVALIDATED: HResult = audclnt_err(0x004);
pub const AUDCLNT_E_NOT_STOPPED: HResult = audclnt_err(0x005);
pub const AUDCLNT_E_BUFFER_TOO_LARGE: HResult = audclnt_err(0x006);
pub const AUDCLNT_E_OUT_OF_ORDER: HResult = audclnt_err(0x007);
pub const AUDCLNT_E_UNSUPPORTED_FORMAT: HResult = audclnt_err(0x008);
pub const AUDCLNT_E_INVALID_SIZE: HResult = audclnt_err(0x009);
pub const AUDCLNT_E_DEVICE_IN_USE: HResult = audclnt_err(0x00A);
pub const AUDCLNT_E_BUFFER_OPERATION_PENDING: HResult = audclnt_err(0x00B);
pub const AUDCLNT_E_THREAD_NOT_REGISTERED: HResult = audclnt_err(0x00C);
pub const AUDCLNT_E_EXCLUSIVE_MODE_NOT_ALLOWED: HResult = audclnt_err(0x00E);
pub const AUDCLNT_E_ENDPOINT_CREATE_FAILED: HResult = audclnt_err(0x00F);
pub const AUDCLNT_E_SERVICE_NOT_RUNNING: HResult = audclnt_err(0x010);
pub const AUDCLNT_E_EVENTHANDLE_NOT_EXPECTED: HResult = audclnt_err(0x011);
pub const AUDCLNT_E_EXCLUSIVE_MODE_ONLY: HResult = audclnt_err(0x012);
pub const AUDCLNT_E_BUFDURATION_PERIOD_NOT_EQUAL: HResult = audclnt_err(0x013);
pub const AUDCLNT_E_EVENTHANDLE_NOT_SET: HResult = audclnt_err(0x014);
pub const AUDCLNT_E_INCORRECT_BUFFER_SIZE: HResult = audclnt_err(0x015);
pub const AUDCLNT_E_BUFFER_SIZE_ERROR: HResult = audclnt_err(0x016);
pub const AUDCLNT_E_CPUUSAGE_EXCEEDED: HResult = audclnt_err(0x017);
pub const AUDCLNT_E_BUFFER_ERROR: HResult = audclnt_err(0x018);
pub const AUDCLNT_E_BUFFER_SIZE_NOT_ALIGNED: HResult = audclnt_err(0x019);
pub const AUDCLNT_E_INVALID_DEVICE_PERIOD: HResult = audclnt_err(0x020);
pub const AUDCLNT_E_INVALID_STREAM_FLAG: HResult = audclnt_err(0x021);
pub const AUDCLNT_E_ENDPOINT_OFFLOAD_NOT_CAPABLE: HResult = audclnt_err(0x022);
pub const AUDCLNT_E_OUT_OF_OFFLOAD_RESOURCES: HResult = audclnt_err(0x023);
pub const AUDCLNT_E_OFFLOAD_MODE_ONLY: HResult = audclnt_err(0x024);
pub const AUDCLNT_E_NONOFFLOAD_MODE_ONLY: HResult = audclnt_err(0x025);
pub const AUDCLNT_E_RESOURCES_INVALIDATED: HResult = audclnt_err(0x026);
pub const AUDCLNT_E_RAW_MODE_UNSUPPORTED: HResult = audclnt_err(0x027);
pub const AUDCLNT_E_ENGINE_PERIODICITY_LOCKED: HResult = audclnt_err(0x028);
pub const AUDCLNT_E_ENGINE_FORMAT_LOCKED: HResult = audclnt_err(0x029);
pub const AUDCLNT_E_HEADTRACKING_ENABLED: HResult = audclnt_err(0x030);
pub const AUDCLNT_E_HEADTRACKING_UNSUPPORTED: HResult = audclnt_err(0x040);

pub const AUDCLNT_S_BUFFER_EMPTY: HResult = audclnt_success(0x001);
pub const AUDCLNT_S_THREAD_ALREADY_REGISTERED: HResult = audclnt_success(0x002);
pub const AUDCLNT_S_POSITION_STALLED: HResult = audclnt_success(0x003);

const KNOWN: &[(HResult, &str)] = &[
    (S_OK, "S_OK"),
    (S_FALSE, "S_FALSE"),
    (E_NOTIMPL, "E_NOTIMPL"),
    (E_NOINTERFACE, "E_NOINTERFACE"),
    (E_POINTER, "E_POINTER"),
    (E_ABORT, "E_ABORT"),
    (E_FAIL, "E_FAIL"),
    (E_UNEXPECTED, "E_UNEXPECTED"),
    (E_ACCESSDENIED, "E_ACCESSDENIED"),
    (E_HANDLE, "E_HANDLE"),
    (E_OUTOFMEMORY, "E_OUTOFMEMORY"),
    (E_INVALIDARG, "E_INVALIDARG"),
    (E_NOTFOUND, "E_NOTFOUND"),
    (CO_E_NOTINITIALIZED, "CO_E_NOTINITIALIZED"),
    (RPC_E_CHANGED_MODE, "RPC_E_CHANGED_MODE"),
    (REGDB_E_CLASSNOTREG, "REGDB_E_CLASSNOTREG"),
    (CLASS_E_NOAGGREGATION, "CLASS_E_NOAGGREGATION"),
    (INPLACE_S_TRUNCATED, "INPLACE_S_TRUNCATED"),
    (AUDCLNT_E_NOT_INITIALIZED, "AUDCLNT_E_NOT_INITIALIZED"),
    (AUDCLNT_E_ALREADY_INITIALIZED, "AUDCLNT_E_ALREADY_INITIALIZED"),
    (AUDCLNT_E_WRONG_ENDPOINT_TYPE, "AUDCLNT_E_WRONG_ENDPOINT_TYPE"),
    (AUDCLNT_E_DEVICE_INVALIDATED, "AUDCLNT_E_DEVICE_INVALIDATED"),
    (AUDCLNT_E_NOT_STOPPED, "AUDCLNT_E_NOT_STOPPED"),
    (AUDCLNT_E_BUFFER_TOO_LARGE, "AUDCLNT_E_BUFFER_TOO_LARGE"),
    (AUDCLNT_E_OUT_OF_ORDER, "AUDCLNT_E_OUT_OF_ORDER"),
    (AUDCLNT_E_UNSUPPORTED_FORMAT, "AUDCLNT_E_UNSUPPORTED_FORMAT"),
    (AUDCLNT_E_INVALID_SIZE, "AUDCLNT_E_INVALID_SIZE"),
    (AUDCLNT_E_DEVICE_IN_USE, "AUDCLNT_E_DEVICE_IN_USE"),
    (AUDCLNT_E_BUFFER_OPERATION_PENDING, "AUDCLNT_E_BUFFER_OPERATION_PENDING"),
    (AUDCLNT_E_THREAD_NOT_REGISTERED, "AUDCLNT_E_THREAD_NOT_REGISTERED"),
    (AUDCLNT_E_EXCLUSIVE_MODE_NOT_ALLOWED, "AUDCLNT_E_EXCLUSIVE_MODE_NOT_ALLOWED"),
    (AUDCLNT_E_ENDPOINT_CREATE_FAILED, "AUDCLNT_E_ENDPOINT_CREATE_FAILED"),
    (AUDCLNT_E_SERVICE_NOT_RUNNING, "AUDCLNT_E_SERVICE_NOT_RUNNING"),
    (AUDCLNT_E_EVENTHANDLE_NOT_EXPECTED, "AUDCLNT_E_EVENTHANDLE_NOT_EXPECTED"),
    (AUDCLNT_E_EXCLUSIVE_MODE_ONLY, "AUDCLNT_E_EXCLUSIVE_MODE_ONLY"),
    (AUDCLNT_E_BUFDURATION_PERIOD_NOT_EQUAL, "AUDCLNT_E_BUFDURATION_PERIOD_NOT_EQUAL"),
    (AUDCLNT_E_EVENTHANDLE_NOT_SET, "AUDCLNT_E_EVENTHANDLE_NOT_SET"),
    (AUDCLNT_E_INCORRECT_BUFFER_SIZE, "AUDCLNT_E_INCORRECT_BUFFER_SIZE"),
    (AUDCLNT_E_BUFFER_SIZE_ERROR, "AUDCLNT_E_BUFFER_SIZE_ERROR"),
    (AUDCLNT_E_CPUUSAGE_EXCEEDED, "AUDCLNT_E_CPUUSAGE_EXCEEDED"),
    (AUDCLNT_E_BUFFER_ERROR, "AUDCLNT_E_BUFFER_ERROR"),
    (AUDCLNT_E_BUFFER_SIZE_NOT_ALIGNED, "AUDCLNT_E_BUFFER_SIZE_NOT_ALIGNED"),
    (AUDCLNT_E_INVALID_DEVICE_PERIOD, "AUDCLNT_E_INVALID_DEVICE_PERIOD"),
    (AUDCLNT_E_INVALID_STREAM_FLAG, "AUDCLNT_E_INVALID_STREAM_FLAG"),
    (AUDCLNT_E_ENDPOINT_OFFLOAD_NOT_CAPABLE, "AUDCLNT_E_ENDPOINT_OFFLOAD_NOT_CAPABLE"),
    (AUDCLNT_E_OUT_OF_OFFLOAD_RESOURCES, "AUDCLNT_E_OUT_OF_OFFLOAD_RESOURCES"),
    (AUDCLNT_E_OFFLOAD_MODE_ONLY, "AUDCLNT_E_OFFLOAD_MODE_ONLY"),
    (AUDCLNT_E_NONOFFLOAD_MODE_ONLY, "AUDCLNT_E_NONOFFLOAD_MODE_ONLY"),
    (AUDCLNT_E_RESOURCES_INVALIDATED, "AUDCLNT_E_RESOURCES_INVALIDATED"),
    (AUDCLNT_E_RAW_MODE_UNSUPPORTED, "AUDCLNT_E_RAW_MODE_UNSUPPORTED"),
    (AUDCLNT_E_ENGINE_PERIODICITY_LOCKED, "AUDCLNT_E_ENGINE_PERIODICITY_LOCKED"),
    (AUDCLNT_E_ENGINE_FORMAT_LOCKED, "AUDCLNT_E_ENGINE_FORMAT_LOCKED"),
    (AUDCLNT_E_HEADTRACKING_ENABLED, "AUDCLNT_E_HEADTRACKING_ENABLED"),
    (AUDCLNT_E_HEADTRACKING_UNSUPPORTED, "AUDCLNT_E_HEADTRACKING_UNSUPPORTED"),
    (AUDCLNT_S_BUFFER_EMPTY, "AUDCLNT_S_BUFFER_EMPTY"),
    (AUDCLNT_S_THREAD_ALREADY_REGISTERED, "AUDCLNT_S_THREAD_ALREADY_REGISTERED"),
    (AUDCLNT_S_POSITION_STALLED, "AUDCLNT_S_POSITION_STALLED"),
];

impl HResult {
    pub const fn is_ok(self) -> bool {
        self.0 >= 0
    }

    pub const fn is_err(self) -> bool {
        self.0 < 0
    }

    pub const fn facility(self) -> u16 {
        ((self.0 as u32 >> 16) & 0x1FFF) as u16
    }

    pub const fn code(self) -> u16 {
        (self.0 as u32 & 0xFFFF) as u16
    }

    pub const fn as_u32(self) -> u32 {
        self.0 as u32
    }

    /// Symbolic name for the well-known codes.
    pub fn name(self) -> Option<&'static str> {
        KNOWN.iter().find(|(hr, _)| *hr == self).map(|(_, name)| *name)
    }

    /// Converts a call status into a `Result`, labelling failures with the
    /// `"Interface::Method"` that produced them.
    pub fn check(self, method: &'static str) -> ComResult<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(ComError::Call { method, code: self })
        }
    }
}

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.as_u32())?;
        if let Some(name) = self.name() {
            write!(f, " ({})", name)?;
        }
        Ok(())
    }
}

impl fmt::Debug for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HResult({})", self)
    }
}

impl From<i32> for HResult {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<u32> for HResult {
    fn from(value: u32) -> Self {
        hresult(value)
    }
}
