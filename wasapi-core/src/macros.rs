/// Declares a typed COM interface handle.
///
/// The generated struct is a `Copy` wrapper around the object pointer. It
/// does not track ownership: copying it does not `AddRef`, and dropping it
/// does not `Release`.
macro_rules! com_interface {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: $vtbl:ty = $iid:expr;
    ) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(::core::ptr::NonNull<::core::ffi::c_void>);

        unsafe impl $crate::com::Interface for $name {
            type Vtable = $vtbl;
            const IID: $crate::com::Guid = $iid;
            const NAME: &'static str = stringify!($name);

            unsafe fn from_raw(raw: *mut ::core::ffi::c_void) -> Self {
                Self(::core::ptr::NonNull::new_unchecked(raw))
            }

            fn as_raw(&self) -> *mut ::core::ffi::c_void {
                self.0.as_ptr()
            }
        }
    };
}

/// Expands to the `"Interface::Method"` label used in call errors.
macro_rules! method {
    ($iface:ident :: $method:ident) => {
        concat!(stringify!($iface), "::", stringify!($method))
    };
}

/// Generates a `#[repr(u32)]` enum with a fallible conversion from the raw
/// value the API passes around.
macro_rules! raw_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident = $value:expr,)+ }
    ) => {
        $(#[$meta])*
        #[repr(u32)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant = $value,)+
        }

        impl TryFrom<u32> for $name {
            type Error = $crate::com::ComError;

            fn try_from(value: u32) -> Result<Self, $crate::com::ComError> {
                match value {
                    $(v if v == $value => Ok($name::$variant),)+
                    other => Err($crate::com::ComError::InvalidArgument(format!(
                        "{} out of range: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> u32 {
                value as u32
            }
        }
    };
}
