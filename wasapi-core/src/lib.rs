//! # wasapi-core
//!
//! Raw virtual-table bindings for the Windows Audio Session API.
//!
//! Every interface type is a `Copy` handle around a COM object pointer and
//! every method is a direct call through the object's vtable. Handles do
//! not track ownership; call [`com::Interface::release`] when done, or wrap
//! the handle in [`com::ComOwned`] to release on drop.
//!
//! ## Architecture
//!
//! ```text
//! wasapi-core (this crate)
//! ├── com/          ← Guid, HResult, ComError, IUnknown, runtime bootstrap,
//! │                   task memory, UTF-16, PROPVARIANT, IPropertyStore
//! ├── mmdevice/     ← IMMDeviceEnumerator, IMMDeviceCollection, IMMDevice,
//! │                   IMMEndpoint, IMMNotificationClient, property keys
//! └── audioclient/  ← IAudioClient, capture/render clients, IAudioClock,
//!                     volume interfaces, WAVEFORMATEX(TENSIBLE)
//! ```
//!
//! The dispatch layer only calls through function pointers and builds on
//! every target. The process bootstrap (`CoInitializeEx`,
//! `CoCreateInstance`, ...) is only available on Windows; elsewhere it
//! returns [`ComError::Unsupported`].
//!
//! ## Usage
//! ```ignore
//! use wasapi_core::com::{ComRuntime, ConcurrencyModel, Interface};
//! use wasapi_core::mmdevice::{EDataFlow, ERole, IMMDeviceEnumerator};
//! use wasapi_core::audioclient::IAudioClient;
//!
//! let _com = ComRuntime::initialize(ConcurrencyModel::MultiThreaded)?;
//! unsafe {
//!     let enumerator = IMMDeviceEnumerator::create()?;
//!     let device = enumerator.get_default_audio_endpoint(EDataFlow::Render, ERole::Console)?;
//!     let client: IAudioClient = device.activate(wasapi_core::com::CLSCTX_ALL, None)?;
//!     println!("{}", client.get_mix_format()?);
//! }
//! ```

#![allow(clippy::missing_safety_doc)]

#[macro_use]
mod macros;

pub mod audioclient;
pub mod com;
pub mod mmdevice;

#[cfg(test)]
pub(crate) mod testing;

pub use com::{ComError, ComOwned, ComResult, Guid, HResult, Interface, PropVariant, PropertyKey};
