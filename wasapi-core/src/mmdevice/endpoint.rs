use crate::com::{ComResult, Guid, HResult, IUnknownVtbl, Interface, RawPtr};

use super::types::EDataFlow;

pub const IID_IMM_ENDPOINT: Guid = Guid::from_u128(0x1be09788_6894_4089_8586_9a2a6c265ac5);

#[repr(C)]
pub struct IMMEndpointVtbl {
    pub base: IUnknownVtbl,
    pub get_data_flow: unsafe extern "system" fn(this: RawPtr, flow: *mut u32) -> HResult,
}

com_interface! {
    /// Endpoint-specific view of an [`IMMDevice`](super::IMMDevice),
    /// obtained with `QueryInterface`.
    pub struct IMMEndpoint: IMMEndpointVtbl = IID_IMM_ENDPOINT;
}

impl IMMEndpoint {
    /// Whether the endpoint renders or captures.
    pub unsafe fn get_data_flow(&self) -> ComResult<EDataFlow> {
        let mut flow = 0u32;
        (self.vtable().get_data_flow)(self.as_raw(), &mut flow).check(method!(IMMEndpoint::GetDataFlow))?;
        EDataFlow::try_from(flow)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::com::hresult::S_OK;
    use crate::testing::{fake_unknown, state, Fake};

    unsafe extern "system" fn get_data_flow(this: RawPtr, flow: *mut u32) -> HResult {
        *flow = state::<IMMEndpointVtbl, Cell<u32>>(this).get();
        S_OK
    }

    static ENDPOINT_VTBL: IMMEndpointVtbl = IMMEndpointVtbl {
        base: fake_unknown!(IMMEndpointVtbl, Cell<u32>),
        get_data_flow,
    };

    pub(crate) fn fake_endpoint(flow: EDataFlow) -> Fake<IMMEndpointVtbl, Cell<u32>> {
        Fake::new(&ENDPOINT_VTBL, &[IID_IMM_ENDPOINT], Cell::new(flow as u32))
    }

    #[test]
    fn reads_data_flow() {
        let fake = fake_endpoint(EDataFlow::Render);
        let endpoint: IMMEndpoint = fake.handle();
        assert_eq!(unsafe { endpoint.get_data_flow() }.unwrap(), EDataFlow::Render);
    }

    #[test]
    fn out_of_range_flow_is_rejected() {
        let fake = fake_endpoint(EDataFlow::Render);
        fake.state().set(7);
        let endpoint: IMMEndpoint = fake.handle();
        assert!(unsafe { endpoint.get_data_flow() }.is_err());
    }
}
