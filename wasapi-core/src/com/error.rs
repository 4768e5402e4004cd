use thiserror::Error;

use super::hresult::HResult;

/// Errors raised by the COM bindings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComError {
    /// A vtable call returned a failure HRESULT.
    #[error("{method} failed with code: {code}")]
    Call { method: &'static str, code: HResult },

    /// The call succeeded but left its out-pointer null.
    #[error("{0} returned a null pointer")]
    NullPointer(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("property type mismatch: expected {expected}, found VARTYPE {found}")]
    PropertyType { expected: &'static str, found: u16 },

    #[error("invalid wave format: {0}")]
    InvalidFormat(String),

    #[error("unsupported on this platform: {0}")]
    Unsupported(&'static str),
}

impl ComError {
    /// The HRESULT behind a failed call, if any.
    pub fn code(&self) -> Option<HResult> {
        match self {
            ComError::Call { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type ComResult<T> = Result<T, ComError>;
