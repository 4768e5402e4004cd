use super::error::ComResult;
use super::guid::Guid;
use super::hresult::HResult;
use super::propvariant::{PropVariant, PropertyKey};
use super::unknown::{IUnknownVtbl, Interface, RawPtr};

pub const STGM_READ: u32 = 0x0;
pub const STGM_WRITE: u32 = 0x1;
pub const STGM_READWRITE: u32 = 0x2;

pub const IID_IPROPERTYSTORE: Guid = Guid::from_u128(0x886d8eeb_8cf2_4446_8d02_cdba1dbdcf99);

#[repr(C)]
pub struct IPropertyStoreVtbl {
    pub base: IUnknownVtbl,
    pub get_count: unsafe extern "system" fn(this: RawPtr, count: *mut u32) -> HResult,
    pub get_at: unsafe extern "system" fn(this: RawPtr, index: u32, key: *mut PropertyKey) -> HResult,
    pub get_value: unsafe extern "system" fn(this: RawPtr, key: *const PropertyKey, value: *mut PropVariant) -> HResult,
    pub set_value:
        unsafe extern "system" fn(this: RawPtr, key: *const PropertyKey, value: *const PropVariant) -> HResult,
    pub commit: unsafe extern "system" fn(this: RawPtr) -> HResult,
}

com_interface! {
    /// Key/value metadata attached to a device.
    pub struct IPropertyStore: IPropertyStoreVtbl = IID_IPROPERTYSTORE;
}

impl IPropertyStore {
    /// Number of properties in the store.
    pub unsafe fn get_count(&self) -> ComResult<u32> {
        let mut count = 0u32;
        (self.vtable().get_count)(self.as_raw(), &mut count).check(method!(IPropertyStore::GetCount))?;
        Ok(count)
    }

    /// The key at `index`, returned by value.
    pub unsafe fn get_at(&self, index: u32) -> ComResult<PropertyKey> {
        let mut key = PropertyKey::new(Guid::zeroed(), 0);
        (self.vtable().get_at)(self.as_raw(), index, &mut key).check(method!(IPropertyStore::GetAt))?;
        Ok(key)
    }

    /// Reads a value. The caller owns the result and must clear it.
    ///
    /// `INPLACE_S_TRUNCATED` is a success code and is accepted.
    pub unsafe fn get_value(&self, key: &PropertyKey) -> ComResult<PropVariant> {
        let mut value = PropVariant::empty();
        (self.vtable().get_value)(self.as_raw(), key, &mut value).check(method!(IPropertyStore::GetValue))?;
        Ok(value)
    }

    /// Writes `value` into the store's cache; `commit` persists it.
    pub unsafe fn set_value(&self, key: &PropertyKey, value: &PropVariant) -> ComResult<()> {
        (self.vtable().set_value)(self.as_raw(), key, value).check(method!(IPropertyStore::SetValue))
    }

    /// Persists cached changes.
    pub unsafe fn commit(&self) -> ComResult<()> {
        (self.vtable().commit)(self.as_raw()).check(method!(IPropertyStore::Commit))
    }

    /// Reads a `VT_LPWSTR` property and frees the native copy. `None` when
    /// the property is not set.
    pub unsafe fn get_string(&self, key: &PropertyKey) -> ComResult<Option<String>> {
        let value = self.get_value(key)?.into_guard();
        if value.is_empty() {
            return Ok(None);
        }
        value.to_string_value().map(Some)
    }

    /// Every key in the store, in store order.
    pub unsafe fn keys(&self) -> ComResult<Vec<PropertyKey>> {
        let count = self.get_count()?;
        (0..count).map(|index| self.get_at(index)).collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::com::hresult::{E_INVALIDARG, INPLACE_S_TRUNCATED, S_OK};
    use crate::com::propvariant::VT_LPWSTR;
    use crate::testing::{fake_unknown, state, Fake};

    /// Values are stored as plain Rust data; strings are re-allocated on
    /// every read so the caller can free them.
    #[derive(Default)]
    pub(crate) struct StoreState {
        pub entries: RefCell<Vec<(PropertyKey, StoredValue)>>,
        pub committed: Cell<bool>,
        pub truncate: Cell<bool>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum StoredValue {
        Text(String),
        Number(u32),
        Blob(Vec<u8>),
    }

    unsafe fn store(this: RawPtr) -> &'static StoreState {
        state::<IPropertyStoreVtbl, StoreState>(this)
    }

    unsafe extern "system" fn get_count(this: RawPtr, count: *mut u32) -> HResult {
        *count = store(this).entries.borrow().len() as u32;
        S_OK
    }

    unsafe extern "system" fn get_at(this: RawPtr, index: u32, key: *mut PropertyKey) -> HResult {
        match store(this).entries.borrow().get(index as usize) {
            Some((k, _)) => {
                *key = *k;
                S_OK
            }
            None => E_INVALIDARG,
        }
    }

    unsafe extern "system" fn get_value(this: RawPtr, key: *const PropertyKey, value: *mut PropVariant) -> HResult {
        let state = store(this);
        let entries = state.entries.borrow();
        *value = match entries.iter().find(|(k, _)| *k == *key) {
            Some((_, StoredValue::Text(text))) => PropVariant::from_str(text).unwrap(),
            Some((_, StoredValue::Number(n))) => PropVariant::from_u32(*n),
            Some((_, StoredValue::Blob(bytes))) => PropVariant::from_blob(bytes).unwrap(),
            None => PropVariant::empty(),
        };
        if state.truncate.get() {
            INPLACE_S_TRUNCATED
        } else {
            S_OK
        }
    }

    unsafe extern "system" fn set_value(this: RawPtr, key: *const PropertyKey, value: *const PropVariant) -> HResult {
        let stored = match (*value).vt() {
            VT_LPWSTR => StoredValue::Text((*value).to_string_value().unwrap()),
            _ => match (*value).as_u32() {
                Ok(n) => StoredValue::Number(n),
                Err(_) => return E_INVALIDARG,
            },
        };
        let mut entries = store(this).entries.borrow_mut();
        entries.retain(|(k, _)| *k != *key);
        entries.push((*key, stored));
        S_OK
    }

    unsafe extern "system" fn commit(this: RawPtr) -> HResult {
        store(this).committed.set(true);
        S_OK
    }

    pub(crate) static STORE_VTBL: IPropertyStoreVtbl = IPropertyStoreVtbl {
        base: fake_unknown!(IPropertyStoreVtbl, StoreState),
        get_count,
        get_at,
        get_value,
        set_value,
        commit,
    };

    pub(crate) fn fake_store(entries: Vec<(PropertyKey, StoredValue)>) -> Fake<IPropertyStoreVtbl, StoreState> {
        let state = StoreState {
            entries: RefCell::new(entries),
            ..Default::default()
        };
        Fake::new(&STORE_VTBL, &[IID_IPROPERTYSTORE], state)
    }

    const NAME_KEY: PropertyKey = PropertyKey::new(Guid::from_u128(0xa45c254e_df1c_4efd_8020_67d146a850e0), 14);
    const FORM_KEY: PropertyKey = PropertyKey::new(Guid::from_u128(0x1da5d803_d492_4edd_8c23_e0c0ffee7f0e), 0);

    #[test]
    fn reads_strings_and_numbers() {
        let fake = fake_store(vec![
            (NAME_KEY, StoredValue::Text("Speakers".into())),
            (FORM_KEY, StoredValue::Number(1)),
        ]);
        let props: IPropertyStore = fake.handle();
        unsafe {
            assert_eq!(props.get_count().unwrap(), 2);
            assert_eq!(props.get_at(1).unwrap(), FORM_KEY);
            assert_eq!(props.get_string(&NAME_KEY).unwrap().as_deref(), Some("Speakers"));
            let mut form = props.get_value(&FORM_KEY).unwrap();
            assert_eq!(form.as_u32().unwrap(), 1);
            form.clear().unwrap();
            assert_eq!(props.keys().unwrap(), vec![NAME_KEY, FORM_KEY]);
        }
    }

    #[test]
    fn missing_property_is_none() {
        let fake = fake_store(Vec::new());
        let props: IPropertyStore = fake.handle();
        assert_eq!(unsafe { props.get_string(&NAME_KEY) }.unwrap(), None);
    }

    #[test]
    fn truncated_read_still_succeeds() {
        let fake = fake_store(vec![(NAME_KEY, StoredValue::Text("Headphones".into()))]);
        fake.state().truncate.set(true);
        let props: IPropertyStore = fake.handle();
        assert_eq!(unsafe { props.get_string(&NAME_KEY) }.unwrap().as_deref(), Some("Headphones"));
    }

    #[test]
    fn out_of_range_index_fails() {
        let fake = fake_store(Vec::new());
        let props: IPropertyStore = fake.handle();
        let err = unsafe { props.get_at(3) }.unwrap_err();
        assert_eq!(err.code(), Some(E_INVALIDARG));
        assert!(err.to_string().starts_with("IPropertyStore::GetAt failed"));
    }

    #[test]
    fn set_value_and_commit() {
        let fake = fake_store(Vec::new());
        let props: IPropertyStore = fake.handle();
        unsafe {
            let value = PropVariant::from_str("Renamed").unwrap().into_guard();
            props.set_value(&NAME_KEY, &value).unwrap();
            props.commit().unwrap();
        }
        assert!(fake.state().committed.get());
        assert_eq!(
            fake.state().entries.borrow()[0],
            (NAME_KEY, StoredValue::Text("Renamed".into()))
        );
    }
}
