//! Typed identifiers.
//!
//! Every entity gets its own [`Uuid`] newtype, so a `TicketId` cannot be
//! passed where a `LocationId` is expected:
//!
//! ```compile_fail
//! use civic_core::{LocationId, UserId};
//!
//! fn village_name(id: LocationId) -> String {
//!     id.to_string()
//! }
//!
//! village_name(UserId::new());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// A string that is not a valid id of the named kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} {input:?}: {reason}")]
pub struct ParseIdError {
    /// Id type that was being parsed, e.g. `"TicketId"`.
    pub kind: &'static str,
    /// The rejected input.
    pub input: String,
    pub reason: String,
}

// Ord compares the raw uuid; "lowest id wins" tie-breaks rely on it.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// A fresh random (v4) id.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<Uuid>().map(Self).map_err(|e| ParseIdError {
                    kind: stringify!($name),
                    input: s.to_owned(),
                    reason: e.to_string(),
                })
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// A node at any level of the hierarchy, province down to village.
    ///
    /// ```
    /// use civic_core::LocationId;
    ///
    /// let id: LocationId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
    /// assert_eq!(id.to_string(), "550e8400-e29b-41d4-a716-446655440000");
    /// ```
    LocationId
);

define_id!(
    /// A citizen or official.
    UserId
);

define_id!(TicketId);

define_id!(
    /// One row of a ticket's status history.
    HistoryEntryId
);

define_id!(CommentId);

define_id!(AuditEventId);

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "550e8400-e29b-41d4-a716-446655440000";

    #[test]
    fn test_new_ids_are_distinct() {
        assert_ne!(LocationId::new(), LocationId::new());
        assert_ne!(TicketId::default(), TicketId::default());
    }

    #[test]
    fn test_uuid_conversions() {
        let uuid = Uuid::new_v4();
        let id = UserId::from(uuid);
        assert_eq!(id.as_uuid(), &uuid);
        assert_eq!(Uuid::from(id), uuid);
    }

    #[test]
    fn test_ordering_follows_uuid() {
        let low = LocationId::from(Uuid::from_u128(1));
        let high = LocationId::from(Uuid::from_u128(2));
        assert!(low < high);
        assert_eq!([high, low].iter().min(), Some(&low));
    }

    #[test]
    fn test_serde_is_a_plain_string() {
        let id: TicketId = SAMPLE.parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{SAMPLE}\""));
        let back: TicketId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_parse_tolerates_surrounding_whitespace() {
        let id: CommentId = format!("  {SAMPLE}\n").parse().unwrap();
        assert_eq!(id.to_string(), SAMPLE);
    }

    #[test]
    fn test_parse_error_names_the_kind() {
        let err = "village-7".parse::<LocationId>().unwrap_err();
        assert_eq!(err.kind, "LocationId");
        assert_eq!(err.input, "village-7");
        let shown = err.to_string();
        assert!(shown.starts_with("invalid LocationId \"village-7\""), "{shown}");
    }
}
