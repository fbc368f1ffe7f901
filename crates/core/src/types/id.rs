//! Newtype IDs for backend entity references.
//!
//! The restaurant API identifies every entity with a numeric id. Wrapping
//! them keeps a user id from being passed where an employee id is expected.

/// Macro to define a type-safe ID wrapper around the backend's `i64` ids.
///
/// ```rust
/// # use buen_sabor_core::define_id;
/// define_id!(BranchId);
///
/// let id = BranchId::new(7);
/// assert_eq!(id.to_string(), "7");
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from a raw backend value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the raw backend value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(UserId);
define_id!(EmployeeId);
define_id!(ImageId);
define_id!(BranchId);
define_id!(CompanyId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_transparent_on_the_wire() {
        let id = UserId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let parsed: UserId = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_id_conversions() {
        let id = EmployeeId::from(5);
        assert_eq!(id.as_i64(), 5);
        assert_eq!(i64::from(id), 5);
        assert_eq!(id.to_string(), "5");
    }
}
