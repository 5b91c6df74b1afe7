//! Anchoring Traits
//!
//! Everything that lives "somewhere" in the hierarchy (a resident, an
//! official, a complaint) hangs off exactly one village. Jurisdiction checks
//! only ever need that village to resolve the rest of the ancestry.
//!
//! # Example
//!
//! ```
//! use civic_core::{LocationId, VillageAnchored};
//!
//! struct Complaint {
//!     village_id: LocationId,
//! }
//!
//! impl VillageAnchored for Complaint {
//!     fn anchor_village(&self) -> Option<LocationId> {
//!         Some(self.village_id)
//!     }
//! }
//!
//! let village = LocationId::new();
//! let complaint = Complaint { village_id: village };
//! assert_eq!(complaint.anchor_village(), Some(village));
//! ```

use crate::ids::LocationId;

/// Trait for entities anchored to a village of the hierarchy.
///
/// `None` means the entity has no anchor (global administrators).
///
/// # Object Safety
///
/// This trait is object-safe: `&dyn VillageAnchored` works.
pub trait VillageAnchored {
    /// Returns the village this entity is anchored to, if any.
    fn anchor_village(&self) -> Option<LocationId>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Resident {
        village: Option<LocationId>,
    }

    impl VillageAnchored for Resident {
        fn anchor_village(&self) -> Option<LocationId> {
            self.village
        }
    }

    #[test]
    fn test_anchor_is_reported() {
        let village = LocationId::new();
        let resident = Resident {
            village: Some(village),
        };
        assert_eq!(resident.anchor_village(), Some(village));
    }

    #[test]
    fn test_works_through_trait_object() {
        let resident = Resident { village: None };
        let anchored: &dyn VillageAnchored = &resident;
        assert!(anchored.anchor_village().is_none());
    }
}
