//! civic Core Library
//!
//! Shared types and traits for the civic workspace.
//!
//! # Modules
//!
//! - [`ids`] - Strongly typed identifiers (LocationId, UserId, TicketId, ...)
//! - [`traits`] - Hierarchy anchoring (VillageAnchored)
//!
//! # Example
//!
//! ```
//! use civic_core::{LocationId, TicketId, UserId};
//!
//! let village = LocationId::new();
//! let citizen = UserId::new();
//! let ticket = TicketId::new();
//! assert_ne!(village.as_uuid(), citizen.as_uuid());
//! # let _ = ticket;
//! ```

pub mod ids;
pub mod traits;

pub use ids::{
    AuditEventId, CommentId, HistoryEntryId, LocationId, ParseIdError, TicketId, UserId,
};
pub use traits::VillageAnchored;
