use crate::com::unknown::out_interface;
use crate::com::{co_create_instance, ComResult, Guid, HResult, IUnknownVtbl, Interface, RawPtr, WideString, CLSCTX_ALL};

use super::collection::IMMDeviceCollection;
use super::device::IMMDevice;
use super::notification::IMMNotificationClient;
use super::types::{DeviceState, EDataFlow, ERole, CLSID_MM_DEVICE_ENUMERATOR};

pub const IID_IMM_DEVICE_ENUMERATOR: Guid = Guid::from_u128(0xa95664d2_9614_4f35_a746_de8db63617e6);

#[repr(C)]
pub struct IMMDeviceEnumeratorVtbl {
    pub base: IUnknownVtbl,
    pub enum_audio_endpoints:
        unsafe extern "system" fn(this: RawPtr, flow: u32, state_mask: u32, devices: *mut RawPtr) -> HResult,
    pub get_default_audio_endpoint:
        unsafe extern "system" fn(this: RawPtr, flow: u32, role: u32, endpoint: *mut RawPtr) -> HResult,
    pub get_device: unsafe extern "system" fn(this: RawPtr, id: *const u16, device: *mut RawPtr) -> HResult,
    pub register_endpoint_notification_callback: unsafe extern "system" fn(this: RawPtr, client: RawPtr) -> HResult,
    pub unregister_endpoint_notification_callback: unsafe extern "system" fn(this: RawPtr, client: RawPtr) -> HResult,
}

com_interface! {
    /// Entry point for endpoint discovery.
    pub struct IMMDeviceEnumerator: IMMDeviceEnumeratorVtbl = IID_IMM_DEVICE_ENUMERATOR;
}

impl IMMDeviceEnumerator {
    /// Creates the system enumerator (`CLSID_MMDeviceEnumerator`). COM must
    /// be initialized on the calling thread.
    pub unsafe fn create() -> ComResult<Self> {
        co_create_instance(&CLSID_MM_DEVICE_ENUMERATOR, None, CLSCTX_ALL)
    }

    /// Endpoints of `flow` whose state is in `state_mask`.
    pub unsafe fn enum_audio_endpoints(&self, flow: EDataFlow, state_mask: DeviceState) -> ComResult<IMMDeviceCollection> {
        out_interface(method!(IMMDeviceEnumerator::EnumAudioEndpoints), |ppv| {
            (self.vtable().enum_audio_endpoints)(self.as_raw(), flow as u32, state_mask.bits(), ppv)
        })
    }

    /// Fails with `E_NOTFOUND` when no endpoint exists for the flow.
    pub unsafe fn get_default_audio_endpoint(&self, flow: EDataFlow, role: ERole) -> ComResult<IMMDevice> {
        out_interface(method!(IMMDeviceEnumerator::GetDefaultAudioEndpoint), |ppv| {
            (self.vtable().get_default_audio_endpoint)(self.as_raw(), flow as u32, role as u32, ppv)
        })
    }

    /// Opens an endpoint by its id string.
    pub unsafe fn get_device(&self, id: &str) -> ComResult<IMMDevice> {
        let id = WideString::new(id)?;
        out_interface(method!(IMMDeviceEnumerator::GetDevice), |ppv| {
            (self.vtable().get_device)(self.as_raw(), id.as_ptr(), ppv)
        })
    }

    /// The enumerator takes its own reference on `client`.
    pub unsafe fn register_endpoint_notification_callback(&self, client: &IMMNotificationClient) -> ComResult<()> {
        (self.vtable().register_endpoint_notification_callback)(self.as_raw(), client.as_raw())
            .check(method!(IMMDeviceEnumerator::RegisterEndpointNotificationCallback))
    }

    /// Stops delivering notifications to `client`.
    pub unsafe fn unregister_endpoint_notification_callback(&self, client: &IMMNotificationClient) -> ComResult<()> {
        (self.vtable().unregister_endpoint_notification_callback)(self.as_raw(), client.as_raw())
            .check(method!(IMMDeviceEnumerator::UnregisterEndpointNotificationCallback))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::com::hresult::{E_NOTFOUND, S_OK};
    use crate::com::IUnknown;
    use crate::mmdevice::collection::tests::fake_collection;
    use crate::mmdevice::device::tests::fake_device;
    use crate::mmdevice::notification::{EndpointNotificationHandler, NotificationClient};
    use crate::testing::{fake_unknown, state, Fake};

    struct EnumeratorState {
        devices: Vec<(String, RawPtr, EDataFlow)>,
        default_render: Option<RawPtr>,
        last_query: Cell<(u32, u32)>,
        clients: RefCell<Vec<RawPtr>>,
        /// Keeps the collections handed out alive for the test.
        collections: RefCell<Vec<Box<dyn std::any::Any>>>,
    }

    unsafe fn en(this: RawPtr) -> &'static EnumeratorState {
        state::<IMMDeviceEnumeratorVtbl, EnumeratorState>(this)
    }

    unsafe extern "system" fn enum_audio_endpoints(
        this: RawPtr,
        flow: u32,
        state_mask: u32,
        devices: *mut RawPtr,
    ) -> HResult {
        let state = en(this);
        state.last_query.set((flow, state_mask));
        let matching: Vec<RawPtr> = state
            .devices
            .iter()
            .filter(|(_, _, f)| flow == EDataFlow::All as u32 || *f as u32 == flow)
            .map(|(_, raw, _)| *raw)
            .collect();
        let collection = fake_collection(matching);
        *devices = collection.raw();
        state.collections.borrow_mut().push(Box::new(collection));
        S_OK
    }

    unsafe extern "system" fn get_default_audio_endpoint(
        this: RawPtr,
        flow: u32,
        role: u32,
        endpoint: *mut RawPtr,
    ) -> HResult {
        let state = en(this);
        state.last_query.set((flow, role));
        match state.default_render {
            Some(raw) if flow == EDataFlow::Render as u32 => {
                IUnknown::from_raw(raw).add_ref();
                *endpoint = raw;
                S_OK
            }
            _ => {
                *endpoint = std::ptr::null_mut();
                E_NOTFOUND
            }
        }
    }

    unsafe extern "system" fn get_device(this: RawPtr, id: *const u16, device: *mut RawPtr) -> HResult {
        let id = crate::com::wide::wide_ptr_to_string(id);
        match en(this).devices.iter().find(|(d, _, _)| *d == id) {
            Some((_, raw, _)) => {
                IUnknown::from_raw(*raw).add_ref();
                *device = *raw;
                S_OK
            }
            None => {
                *device = std::ptr::null_mut();
                E_NOTFOUND
            }
        }
    }

    unsafe extern "system" fn register(this: RawPtr, client: RawPtr) -> HResult {
        IUnknown::from_raw(client).add_ref();
        en(this).clients.borrow_mut().push(client);
        S_OK
    }

    unsafe extern "system" fn unregister(this: RawPtr, client: RawPtr) -> HResult {
        let mut clients = en(this).clients.borrow_mut();
        match clients.iter().position(|c| *c == client) {
            Some(index) => {
                clients.remove(index);
                IUnknown::from_raw(client).release();
                S_OK
            }
            None => E_NOTFOUND,
        }
    }

    static ENUMERATOR_VTBL: IMMDeviceEnumeratorVtbl = IMMDeviceEnumeratorVtbl {
        base: fake_unknown!(IMMDeviceEnumeratorVtbl, EnumeratorState),
        enum_audio_endpoints,
        get_default_audio_endpoint,
        get_device,
        register_endpoint_notification_callback: register,
        unregister_endpoint_notification_callback: unregister,
    };

    fn fake_enumerator(
        devices: Vec<(String, RawPtr, EDataFlow)>,
        default_render: Option<RawPtr>,
    ) -> Fake<IMMDeviceEnumeratorVtbl, EnumeratorState> {
        let state = EnumeratorState {
            devices,
            default_render,
            last_query: Cell::new((0, 0)),
            clients: RefCell::new(Vec::new()),
            collections: RefCell::new(Vec::new()),
        };
        Fake::new(&ENUMERATOR_VTBL, &[IID_IMM_DEVICE_ENUMERATOR], state)
    }

    #[test]
    fn enumerates_by_flow_and_state() {
        let speakers = fake_device("spk", "Speakers", EDataFlow::Render);
        let mic = fake_device("mic", "Microphone", EDataFlow::Capture);
        let fake = fake_enumerator(
            vec![
                ("spk".into(), speakers.raw(), EDataFlow::Render),
                ("mic".into(), mic.raw(), EDataFlow::Capture),
            ],
            None,
        );
        let enumerator: IMMDeviceEnumerator = fake.handle();
        unsafe {
            let render = enumerator
                .enum_audio_endpoints(EDataFlow::Render, DeviceState::ACTIVE)
                .unwrap();
            assert_eq!(fake.state().last_query.get(), (0, 1));
            assert_eq!(render.get_count().unwrap(), 1);
            let first = render.item(0).unwrap();
            assert_eq!(first.friendly_name().unwrap().as_deref(), Some("Speakers"));
            first.release();

            let all = enumerator.enum_audio_endpoints(EDataFlow::All, DeviceState::ALL).unwrap();
            assert_eq!(fake.state().last_query.get(), (2, 0xF));
            assert_eq!(all.get_count().unwrap(), 2);
        }
    }

    #[test]
    fn default_endpoint_and_lookup_by_id() {
        let speakers = fake_device("spk", "Speakers", EDataFlow::Render);
        let fake = fake_enumerator(
            vec![("spk".into(), speakers.raw(), EDataFlow::Render)],
            Some(speakers.raw()),
        );
        let enumerator: IMMDeviceEnumerator = fake.handle();
        unsafe {
            let device = enumerator
                .get_default_audio_endpoint(EDataFlow::Render, ERole::Multimedia)
                .unwrap();
            assert_eq!(fake.state().last_query.get(), (0, 1));
            assert_eq!(device.get_id().unwrap(), "spk");
            device.release();

            let missing = enumerator
                .get_default_audio_endpoint(EDataFlow::Capture, ERole::Console)
                .unwrap_err();
            assert_eq!(missing.code(), Some(E_NOTFOUND));

            let by_id = enumerator.get_device("spk").unwrap();
            assert_eq!(by_id.as_raw(), speakers.raw());
            by_id.release();
            assert!(enumerator.get_device("nope").is_err());
            assert!(enumerator.get_device("bad\0id").is_err());
        }
        assert_eq!(speakers.refs(), 1);
    }

    struct Counter(Arc<AtomicUsize>);

    impl EndpointNotificationHandler for Counter {
        fn on_device_added(&self, _device_id: &str) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn registers_and_unregisters_notification_clients() {
        let fake = fake_enumerator(Vec::new(), None);
        let enumerator: IMMDeviceEnumerator = fake.handle();
        let added = Arc::new(AtomicUsize::new(0));
        let client = NotificationClient::create(Counter(Arc::clone(&added)));
        unsafe {
            enumerator.register_endpoint_notification_callback(&client).unwrap();
            assert_eq!(fake.state().clients.borrow().len(), 1);

            let registered = IMMNotificationClient::from_raw(fake.state().clients.borrow()[0]);
            registered.on_device_added("usb-headset").unwrap();
            assert_eq!(added.load(Ordering::SeqCst), 1);

            enumerator.unregister_endpoint_notification_callback(&client).unwrap();
            assert!(enumerator.unregister_endpoint_notification_callback(&client).is_err());
            assert_eq!(client.release(), 0);
        }
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn create_needs_the_com_runtime() {
        assert!(unsafe { IMMDeviceEnumerator::create() }.is_err());
    }
}
