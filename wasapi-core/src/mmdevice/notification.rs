//! Endpoint change notifications.
//!
//! The system calls `IMMNotificationClient` on its own worker threads, so
//! the client is a COM object implemented here: a static vtable, an atomic
//! reference count and a boxed [`EndpointNotificationHandler`].

use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::com::hresult::{E_NOINTERFACE, E_POINTER, S_OK};
use crate::com::wide::wide_ptr_to_string;
use crate::com::{ComResult, Guid, HResult, IUnknownVtbl, Interface, PropertyKey, RawPtr, WideString, IID_IUNKNOWN};

use super::types::{DeviceState, EDataFlow, ERole};

pub const IID_IMM_NOTIFICATION_CLIENT: Guid = Guid::from_u128(0x7991eec9_7e89_4d85_8390_6c703cec60c0);

#[repr(C)]
pub struct IMMNotificationClientVtbl {
    pub base: IUnknownVtbl,
    pub on_device_state_changed: unsafe extern "system" fn(this: RawPtr, device_id: *const u16, state: u32) -> HResult,
    pub on_device_added: unsafe extern "system" fn(this: RawPtr, device_id: *const u16) -> HResult,
    pub on_device_removed: unsafe extern "system" fn(this: RawPtr, device_id: *const u16) -> HResult,
    pub on_default_device_changed:
        unsafe extern "system" fn(this: RawPtr, flow: u32, role: u32, device_id: *const u16) -> HResult,
    pub on_property_value_changed:
        unsafe extern "system" fn(this: RawPtr, device_id: *const u16, key: PropertyKey) -> HResult,
}

com_interface! {
    pub struct IMMNotificationClient: IMMNotificationClientVtbl = IID_IMM_NOTIFICATION_CLIENT;
}

impl IMMNotificationClient {
    /// Invokes `OnDeviceStateChanged` through the vtable.
    pub unsafe fn on_device_state_changed(&self, device_id: &str, state: DeviceState) -> ComResult<()> {
        let id = WideString::new(device_id)?;
        (self.vtable().on_device_state_changed)(self.as_raw(), id.as_ptr(), state.bits())
            .check(method!(IMMNotificationClient::OnDeviceStateChanged))
    }

    /// Invokes `OnDeviceAdded` through the vtable.
    pub unsafe fn on_device_added(&self, device_id: &str) -> ComResult<()> {
        let id = WideString::new(device_id)?;
        (self.vtable().on_device_added)(self.as_raw(), id.as_ptr()).check(method!(IMMNotificationClient::OnDeviceAdded))
    }

    /// Invokes `OnDeviceRemoved` through the vtable.
    pub unsafe fn on_device_removed(&self, device_id: &str) -> ComResult<()> {
        let id = WideString::new(device_id)?;
        (self.vtable().on_device_removed)(self.as_raw(), id.as_ptr())
            .check(method!(IMMNotificationClient::OnDeviceRemoved))
    }

    /// `default_device_id` is `None` when the last endpoint for the role
    /// went away.
    pub unsafe fn on_default_device_changed(
        &self,
        flow: EDataFlow,
        role: ERole,
        default_device_id: Option<&str>,
    ) -> ComResult<()> {
        let id = default_device_id.map(WideString::new).transpose()?;
        let id_ptr = id.as_ref().map_or(ptr::null(), |id| id.as_ptr());
        (self.vtable().on_default_device_changed)(self.as_raw(), flow as u32, role as u32, id_ptr)
            .check(method!(IMMNotificationClient::OnDefaultDeviceChanged))
    }

    /// The key is passed by value, as the native signature declares.
    pub unsafe fn on_property_value_changed(&self, device_id: &str, key: PropertyKey) -> ComResult<()> {
        let id = WideString::new(device_id)?;
        (self.vtable().on_property_value_changed)(self.as_raw(), id.as_ptr(), key)
            .check(method!(IMMNotificationClient::OnPropertyValueChanged))
    }
}

/// Receives endpoint notifications. Every method defaults to doing
/// nothing.
///
/// Calls arrive on system threads and must not block: in particular they
/// must not call back into the enumerator that delivered them.
pub trait EndpointNotificationHandler: Send + Sync {
    fn on_device_state_changed(&self, _device_id: &str, _new_state: DeviceState) {}
    fn on_device_added(&self, _device_id: &str) {}
    fn on_device_removed(&self, _device_id: &str) {}
    fn on_default_device_changed(&self, _flow: EDataFlow, _role: ERole, _default_device_id: Option<&str>) {}
    fn on_property_value_changed(&self, _device_id: &str, _key: PropertyKey) {}
}

/// The COM object behind an [`IMMNotificationClient`] created by
/// [`NotificationClient::create`].
#[repr(C)]
pub struct NotificationClient {
    vtbl: &'static IMMNotificationClientVtbl,
    refs: AtomicU32,
    handler: Box<dyn EndpointNotificationHandler>,
}

impl NotificationClient {
    /// Wraps `handler` in a COM object. The returned handle holds the only
    /// reference; the object frees itself when the count reaches zero.
    pub fn create(handler: impl EndpointNotificationHandler + 'static) -> IMMNotificationClient {
        let object = Box::new(NotificationClient {
            vtbl: &NOTIFICATION_CLIENT_VTBL,
            refs: AtomicU32::new(1),
            handler: Box::new(handler),
        });
        unsafe { IMMNotificationClient::from_raw(Box::into_raw(object).cast()) }
    }
}

static NOTIFICATION_CLIENT_VTBL: IMMNotificationClientVtbl = IMMNotificationClientVtbl {
    base: IUnknownVtbl {
        query_interface,
        add_ref,
        release,
    },
    on_device_state_changed,
    on_device_added,
    on_device_removed,
    on_default_device_changed,
    on_property_value_changed,
};

unsafe fn client<'a>(this: RawPtr) -> &'a NotificationClient {
    &*(this as *const NotificationClient)
}

unsafe extern "system" fn query_interface(this: RawPtr, riid: *const Guid, ppv: *mut RawPtr) -> HResult {
    if ppv.is_null() || riid.is_null() {
        return E_POINTER;
    }
    let iid = *riid;
    if iid == IID_IUNKNOWN || iid == IID_IMM_NOTIFICATION_CLIENT {
        add_ref(this);
        *ppv = this;
        S_OK
    } else {
        *ppv = ptr::null_mut();
        E_NOINTERFACE
    }
}

unsafe extern "system" fn add_ref(this: RawPtr) -> u32 {
    client(this).refs.fetch_add(1, Ordering::AcqRel) + 1
}

unsafe extern "system" fn release(this: RawPtr) -> u32 {
    let remaining = client(this).refs.fetch_sub(1, Ordering::AcqRel) - 1;
    if remaining == 0 {
        drop(Box::from_raw(this as *mut NotificationClient));
    }
    remaining
}

/// Runs a handler callback, keeping panics from unwinding into the caller's
/// frames.
unsafe fn dispatch(this: RawPtr, callback: &'static str, call: impl FnOnce(&dyn EndpointNotificationHandler)) -> HResult {
    let handler = &*client(this).handler;
    if panic::catch_unwind(AssertUnwindSafe(|| call(handler))).is_err() {
        log::error!("endpoint notification handler panicked in {}", callback);
    }
    S_OK
}

unsafe extern "system" fn on_device_state_changed(this: RawPtr, device_id: *const u16, state: u32) -> HResult {
    let id = wide_ptr_to_string(device_id);
    dispatch(this, "OnDeviceStateChanged", |h| {
        h.on_device_state_changed(&id, DeviceState::from_bits_retain(state))
    })
}

unsafe extern "system" fn on_device_added(this: RawPtr, device_id: *const u16) -> HResult {
    let id = wide_ptr_to_string(device_id);
    dispatch(this, "OnDeviceAdded", |h| h.on_device_added(&id))
}

unsafe extern "system" fn on_device_removed(this: RawPtr, device_id: *const u16) -> HResult {
    let id = wide_ptr_to_string(device_id);
    dispatch(this, "OnDeviceRemoved", |h| h.on_device_removed(&id))
}

unsafe extern "system" fn on_default_device_changed(
    this: RawPtr,
    flow: u32,
    role: u32,
    device_id: *const u16,
) -> HResult {
    let (flow, role) = match (EDataFlow::try_from(flow), ERole::try_from(role)) {
        (Ok(flow), Ok(role)) => (flow, role),
        (flow, role) => {
            log::warn!("ignoring default device change with flow {:?}, role {:?}", flow, role);
            return S_OK;
        }
    };
    let id = (!device_id.is_null()).then(|| wide_ptr_to_string(device_id));
    dispatch(this, "OnDefaultDeviceChanged", |h| {
        h.on_default_device_changed(flow, role, id.as_deref())
    })
}

unsafe extern "system" fn on_property_value_changed(this: RawPtr, device_id: *const u16, key: PropertyKey) -> HResult {
    let id = wide_ptr_to_string(device_id);
    dispatch(this, "OnPropertyValueChanged", |h| h.on_property_value_changed(&id, key))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::com::IUnknown;
    use crate::mmdevice::properties::PKEY_DEVICE_FRIENDLY_NAME;

    #[derive(Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<String>>>,
        dropped: Arc<AtomicBool>,
    }

    impl EndpointNotificationHandler for Recorder {
        fn on_device_state_changed(&self, device_id: &str, new_state: DeviceState) {
            self.events.lock().unwrap().push(format!("state {} {}", device_id, new_state));
        }

        fn on_device_added(&self, device_id: &str) {
            self.events.lock().unwrap().push(format!("added {}", device_id));
        }

        fn on_device_removed(&self, _device_id: &str) {
            panic!("handler bug");
        }

        fn on_default_device_changed(&self, flow: EDataFlow, role: ERole, default_device_id: Option<&str>) {
            self.events
                .lock()
                .unwrap()
                .push(format!("default {} {:?} {:?}", flow, role, default_device_id));
        }

        fn on_property_value_changed(&self, device_id: &str, key: PropertyKey) {
            self.events.lock().unwrap().push(format!("property {} {}", device_id, key.pid));
        }
    }

    impl Drop for Recorder {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    fn recorder() -> (Recorder, Arc<Mutex<Vec<String>>>, Arc<AtomicBool>) {
        let recorder = Recorder::default();
        let events = Arc::clone(&recorder.events);
        let dropped = Arc::clone(&recorder.dropped);
        (recorder, events, dropped)
    }

    #[test]
    fn callbacks_reach_the_handler() {
        let (handler, events, _) = recorder();
        let client = NotificationClient::create(handler);
        unsafe {
            client.on_device_state_changed("spk", DeviceState::UNPLUGGED).unwrap();
            client.on_device_added("usb").unwrap();
            client
                .on_default_device_changed(EDataFlow::Render, ERole::Console, Some("spk"))
                .unwrap();
            client
                .on_default_device_changed(EDataFlow::Capture, ERole::Communications, None)
                .unwrap();
            client.on_property_value_changed("spk", PKEY_DEVICE_FRIENDLY_NAME).unwrap();
            client.release();
        }
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "state spk unplugged".to_string(),
                "added usb".to_string(),
                "default render Console Some(\"spk\")".to_string(),
                "default capture Communications None".to_string(),
                "property spk 14".to_string(),
            ]
        );
    }

    #[test]
    fn handler_panic_is_contained() {
        let (handler, _, _) = recorder();
        let client = NotificationClient::create(handler);
        unsafe {
            assert!(client.on_device_removed("gone").is_ok());
            client.release();
        }
    }

    #[test]
    fn frees_itself_on_last_release() {
        let (handler, _, dropped) = recorder();
        let client = NotificationClient::create(handler);
        unsafe {
            let unknown: IUnknown = client.query_interface().unwrap();
            let again: IMMNotificationClient = unknown.query_interface().unwrap();
            assert_eq!(again.as_raw(), client.as_raw());
            assert_eq!(again.release(), 2);
            assert_eq!(unknown.release(), 1);
            assert!(!dropped.load(Ordering::SeqCst));
            assert_eq!(client.release(), 0);
        }
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn unknown_interface_is_refused() {
        let (handler, _, _) = recorder();
        let client = NotificationClient::create(handler);
        unsafe {
            let err = client.query_interface::<crate::mmdevice::IMMDevice>().unwrap_err();
            assert_eq!(err.code(), Some(E_NOINTERFACE));
            assert_eq!(client.release(), 0);
        }
    }
}
