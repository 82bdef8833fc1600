//! Opaque identifiers used throughout the engine.
//!
//! These are thin newtypes over `String` rather than content hashes: the
//! legacy database hands out stable but otherwise meaningless identifiers,
//! and keeping them in distinct types stops a project id from being passed
//! where a file id (or a raw display name) is expected.

use std::fmt;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

opaque_id!(
    /// Stable opaque identifier for an [`Item`](crate::revision::Item) in the
    /// legacy database. Never reused, never parsed.
    PhysicalId
);

opaque_id!(
    /// The legacy user name that authored a revision, kept distinct from
    /// free-form comment text so the two are never swapped by accident.
    UserName
);
