//! Common data types for lane server components.
//!
//! Identifiers are opaque strings chosen by the venue (lanes, venues) or by
//! the client (device fingerprints). They serialize transparently so the wire
//! format carries plain JSON strings.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is empty (treated as absent by request validation).
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of one physical throwing bay.
    LaneId
);

string_id!(
    /// Identifier of a venue; admins watch all lanes of one venue.
    VenueId
);

string_id!(
    /// Persistent per-browser fingerprint supplied by user and projector clients.
    DeviceId
);

/// The two device classes that can be paired to a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    User,
    Projector,
}

impl DeviceClass {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::User => "user",
            DeviceClass::Projector => "projector",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
