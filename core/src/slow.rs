//! Macros that do run-time safety checks. These can be disabled, but this increases
//! the risk of unsafe behavior.

/// `assert!` that is exists only if `"no-slow-safety-checks"` feature is not enabled.
#[macro_export]
#[cfg(not(feature = "no-slow-safety-checks"))]
macro_rules! kiln_slow_assert {
    ($($tt:tt)*) => { assert!($($tt)*) };
}

/// `assert!` that is exists only if `"no-slow-safety-checks"` feature is not enabled.
#[macro_export]
#[cfg(feature = "no-slow-safety-checks")]
macro_rules! kiln_slow_assert {
    ($($tt:tt)*) => {};
}

/// `assert_eq!` that is exists only if `"no-slow-safety-checks"` feature is not enabled.
#[macro_export]
#[cfg(not(feature = "no-slow-safety-checks"))]
macro_rules! kiln_slow_assert_eq {
    ($($tt:tt)*) => { assert_eq!($($tt)*) };
}

/// `assert_eq!` that is exists only if `"no-slow-safety-checks"` feature is not enabled.
#[macro_export]
#[cfg(feature = "no-slow-safety-checks")]
macro_rules! kiln_slow_assert_eq {
    ($($tt:tt)*) => {};
}

/// Implements `device_id` and `assert_device_owner` for a type with a `device: DeviceId` field.
#[macro_export]
macro_rules! device_owned {
    ($type:ident<B $(, $arg:ident)*>) => {
        #[allow(unused_qualifications)]
        impl<B $(, $arg)*> $type<B $(, $arg)*>
        where
            B: $crate::hal::Backend,
        {
            /// Get owner id.
            pub fn device_id(&self) -> $crate::DeviceId {
                self.device
            }

            /// Assert specified device is owner.
            pub fn assert_device_owner(&self, device: &$crate::Device<B>) {
                $crate::kiln_slow_assert_eq!(
                    self.device,
                    device.id(),
                    "Resource is not owned by specified device"
                );
            }
        }
    };
}
