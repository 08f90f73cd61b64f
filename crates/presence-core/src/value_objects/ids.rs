//! Room and participant identifiers
//!
//! Both are opaque strings handed out by the backend. Inputs are trimmed and
//! an identifier that is empty after trimming is treated as absent, so a
//! whitespace-only id never opens a subscription.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trim a raw identifier, mapping missing or blank input to `None`.
pub fn normalize_id(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Parse a raw identifier, returning `None` when it is blank
            pub fn parse(raw: &str) -> Option<Self> {
                normalize_id(Some(raw)).map(Self)
            }

            /// Parse an optional raw identifier
            pub fn from_optional(raw: Option<&str>) -> Option<Self> {
                normalize_id(raw).map(Self)
            }

            /// Borrow the identifier as a string slice
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Take the inner string
            #[inline]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

opaque_id! {
    /// Identifier scoping a conversation's typing stream
    RoomId
}

opaque_id! {
    /// Identifier of a conversation participant (the peer or the local user)
    ParticipantId
}
