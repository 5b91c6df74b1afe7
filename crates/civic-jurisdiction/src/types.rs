//! Type definitions for the jurisdiction domain.
//!
//! Closed enums for hierarchy levels, roles, ticket statuses and priorities.
//! The delegation table lives on [`Role`] and is the only place that decides
//! which role may grant which.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::JurisdictionError;

// ============================================================================
// Location Hierarchy
// ============================================================================

/// A level of the administrative hierarchy, from the root down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationLevel {
    Province,
    District,
    Sector,
    Cell,
    Village,
}

impl LocationLevel {
    /// All levels, root first.
    pub const ALL: [LocationLevel; 5] = [
        Self::Province,
        Self::District,
        Self::Sector,
        Self::Cell,
        Self::Village,
    ];

    /// Distance from the root (Province = 0, Village = 4).
    #[must_use]
    pub fn depth(self) -> u8 {
        match self {
            Self::Province => 0,
            Self::District => 1,
            Self::Sector => 2,
            Self::Cell => 3,
            Self::Village => 4,
        }
    }

    /// Level of this level's parent; `None` for provinces.
    #[must_use]
    pub fn parent_level(self) -> Option<Self> {
        match self {
            Self::Province => None,
            Self::District => Some(Self::Province),
            Self::Sector => Some(Self::District),
            Self::Cell => Some(Self::Sector),
            Self::Village => Some(Self::Cell),
        }
    }

    /// Level of this level's children; `None` for villages.
    #[must_use]
    pub fn child_level(self) -> Option<Self> {
        match self {
            Self::Province => Some(Self::District),
            Self::District => Some(Self::Sector),
            Self::Sector => Some(Self::Cell),
            Self::Cell => Some(Self::Village),
            Self::Village => None,
        }
    }

    /// Levels strictly below this one, nearest first.
    pub fn descendants(self) -> impl Iterator<Item = LocationLevel> {
        Self::ALL.into_iter().filter(move |l| l.depth() > self.depth())
    }

    /// Resource name used in error messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Province => "Province",
            Self::District => "District",
            Self::Sector => "Sector",
            Self::Cell => "Cell",
            Self::Village => "Village",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Province => "PROVINCE",
            Self::District => "DISTRICT",
            Self::Sector => "SECTOR",
            Self::Cell => "CELL",
            Self::Village => "VILLAGE",
        }
    }
}

impl fmt::Display for LocationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationLevel {
    type Err = JurisdictionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PROVINCE" => Ok(Self::Province),
            "DISTRICT" => Ok(Self::District),
            "SECTOR" => Ok(Self::Sector),
            "CELL" => Ok(Self::Cell),
            "VILLAGE" => Ok(Self::Village),
            other => Err(JurisdictionError::validation(
                "level",
                format!("unknown location level: {other}"),
            )),
        }
    }
}

// ============================================================================
// Role Model
// ============================================================================

/// Administrative roles ordered by authority, plus `Citizen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Global scope, no anchor.
    Admin,
    Governor,
    Mayor,
    SectorExec,
    CellExec,
    Chairman,
    /// Resident of one village; no jurisdiction.
    Citizen,
}

impl Role {
    /// All roles, highest authority first.
    pub const ALL: [Role; 7] = [
        Self::Admin,
        Self::Governor,
        Self::Mayor,
        Self::SectorExec,
        Self::CellExec,
        Self::Chairman,
        Self::Citizen,
    ];

    /// The hierarchy level this role presides over.
    ///
    /// `None` for `Admin` (everything) and `Citizen` (nothing).
    #[must_use]
    pub fn level(self) -> Option<LocationLevel> {
        match self {
            Self::Governor => Some(LocationLevel::Province),
            Self::Mayor => Some(LocationLevel::District),
            Self::SectorExec => Some(LocationLevel::Sector),
            Self::CellExec => Some(LocationLevel::Cell),
            Self::Chairman => Some(LocationLevel::Village),
            Self::Admin | Self::Citizen => None,
        }
    }

    /// The leader role presiding over `level`.
    #[must_use]
    pub fn leader_of(level: LocationLevel) -> Self {
        match level {
            LocationLevel::Province => Self::Governor,
            LocationLevel::District => Self::Mayor,
            LocationLevel::Sector => Self::SectorExec,
            LocationLevel::Cell => Self::CellExec,
            LocationLevel::Village => Self::Chairman,
        }
    }

    /// Whether this is an official's role (anything but `Citizen`).
    #[must_use]
    pub fn is_administrative(self) -> bool {
        !matches!(self, Self::Citizen)
    }

    /// Whether this role leads a specific location (`Governor` ..= `Chairman`).
    #[must_use]
    pub fn is_leader(self) -> bool {
        self.level().is_some()
    }

    /// Position in the authority order, used for listings.
    #[must_use]
    pub fn authority_rank(self) -> u8 {
        match self {
            Self::Admin => 0,
            Self::Governor => 1,
            Self::Mayor => 2,
            Self::SectorExec => 3,
            Self::CellExec => 4,
            Self::Chairman => 5,
            Self::Citizen => 6,
        }
    }

    /// Roles this role may grant.
    #[must_use]
    pub fn delegable_roles(self) -> &'static [Role] {
        match self {
            Self::Admin => &Self::ALL,
            Self::Governor => &[
                Self::Mayor,
                Self::SectorExec,
                Self::CellExec,
                Self::Chairman,
                Self::Citizen,
            ],
            Self::Mayor => &[
                Self::SectorExec,
                Self::CellExec,
                Self::Chairman,
                Self::Citizen,
            ],
            Self::SectorExec => &[Self::CellExec, Self::Chairman, Self::Citizen],
            Self::CellExec => &[Self::Chairman, Self::Citizen],
            Self::Chairman => &[Self::Citizen],
            Self::Citizen => &[],
        }
    }

    /// Whether this role may grant `target`.
    #[must_use]
    pub fn can_delegate(self, target: Role) -> bool {
        self.delegable_roles().contains(&target)
    }

    /// Whether this role may create a location node at `level`.
    ///
    /// Admins create anything. Other officials create nodes at least two
    /// levels below their own, under a parent inside their jurisdiction.
    #[must_use]
    pub fn can_create_location(self, level: LocationLevel) -> bool {
        match self {
            Self::Admin => true,
            Self::Citizen => false,
            leader => leader
                .level()
                .is_some_and(|own| level.depth() >= own.depth() + 2),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Governor => "GOVERNOR",
            Self::Mayor => "MAYOR",
            Self::SectorExec => "SECTOR_EXEC",
            Self::CellExec => "CELL_EXEC",
            Self::Chairman => "CHAIRMAN",
            Self::Citizen => "CITIZEN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = JurisdictionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "GOVERNOR" => Ok(Self::Governor),
            "MAYOR" => Ok(Self::Mayor),
            "SECTOR_EXEC" => Ok(Self::SectorExec),
            "CELL_EXEC" => Ok(Self::CellExec),
            "CHAIRMAN" => Ok(Self::Chairman),
            "CITIZEN" => Ok(Self::Citizen),
            _ => Err(JurisdictionError::InvalidRole(s.to_string())),
        }
    }
}

// ============================================================================
// Ticket Lifecycle
// ============================================================================

/// Status of a citizen complaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Open,
    InReview,
    Resolved,
    Rejected,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [Self::Open, Self::InReview, Self::Resolved, Self::Rejected];

    /// Resolved and rejected tickets are finished, though still reopenable.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InReview => "IN_REVIEW",
            Self::Resolved => "RESOLVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = JurisdictionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(Self::Open),
            "IN_REVIEW" => Ok(Self::InReview),
            "RESOLVED" => Ok(Self::Resolved),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(JurisdictionError::InvalidStatus(s.to_string())),
        }
    }
}

/// Urgency of a complaint.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketPriority {
    type Err = JurisdictionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "URGENT" => Ok(Self::Urgent),
            other => Err(JurisdictionError::validation(
                "priority",
                format!("unknown priority: {other}"),
            )),
        }
    }
}

/// What an actor wants to do with a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketOperation {
    Read,
    Comment,
    UpdateStatus,
}

impl fmt::Display for TicketOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Comment => write!(f, "comment"),
            Self::UpdateStatus => write!(f, "update_status"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_role_levels() {
        assert_eq!(Role::Governor.level(), Some(LocationLevel::Province));
        assert_eq!(Role::Mayor.level(), Some(LocationLevel::District));
        assert_eq!(Role::SectorExec.level(), Some(LocationLevel::Sector));
        assert_eq!(Role::CellExec.level(), Some(LocationLevel::Cell));
        assert_eq!(Role::Chairman.level(), Some(LocationLevel::Village));
        assert_eq!(Role::Admin.level(), None);
        assert_eq!(Role::Citizen.level(), None);

        for level in LocationLevel::ALL {
            assert_eq!(Role::leader_of(level).level(), Some(level));
        }
    }

    #[test]
    fn test_delegation_table() {
        use Role::*;

        let expected: [(Role, &[Role]); 7] = [
            (Admin, &Role::ALL),
            (Governor, &[Mayor, SectorExec, CellExec, Chairman, Citizen]),
            (Mayor, &[SectorExec, CellExec, Chairman, Citizen]),
            (SectorExec, &[CellExec, Chairman, Citizen]),
            (CellExec, &[Chairman, Citizen]),
            (Chairman, &[Citizen]),
            (Citizen, &[]),
        ];

        for (actor, grantable) in expected {
            for target in Role::ALL {
                assert_eq!(
                    actor.can_delegate(target),
                    grantable.contains(&target),
                    "{actor} -> {target}"
                );
            }
        }
    }

    #[test]
    fn test_delegation_only_goes_down() {
        for actor in Role::ALL {
            if actor == Role::Admin {
                continue;
            }
            for target in actor.delegable_roles() {
                assert!(target.authority_rank() > actor.authority_rank());
            }
        }
    }

    #[test]
    fn test_location_creation_rights() {
        assert!(Role::Admin.can_create_location(LocationLevel::Province));
        assert!(Role::Admin.can_create_location(LocationLevel::District));
        assert!(!Role::Governor.can_create_location(LocationLevel::District));
        assert!(Role::Governor.can_create_location(LocationLevel::Sector));
        assert!(!Role::Mayor.can_create_location(LocationLevel::Sector));
        assert!(Role::Mayor.can_create_location(LocationLevel::Cell));
        assert!(Role::SectorExec.can_create_location(LocationLevel::Village));
        assert!(!Role::CellExec.can_create_location(LocationLevel::Village));
        assert!(!Role::Chairman.can_create_location(LocationLevel::Village));
        assert!(!Role::Citizen.can_create_location(LocationLevel::Village));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("SECTOR_EXEC".parse::<Role>().unwrap(), Role::SectorExec);
        assert_eq!("chairman".parse::<Role>().unwrap(), Role::Chairman);

        let err = "KING".parse::<Role>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRole);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(
            "in_review".parse::<TicketStatus>().unwrap(),
            TicketStatus::InReview
        );
        let err = "CLOSED".parse::<TicketStatus>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatus);
    }

    #[test]
    fn test_serde_wire_names() {
        assert_eq!(
            serde_json::to_string(&Role::SectorExec).unwrap(),
            "\"SECTOR_EXEC\""
        );
        assert_eq!(
            serde_json::to_string(&TicketStatus::InReview).unwrap(),
            "\"IN_REVIEW\""
        );
        assert_eq!(
            serde_json::to_string(&LocationLevel::Village).unwrap(),
            "\"VILLAGE\""
        );
    }

    #[test]
    fn test_level_navigation() {
        assert_eq!(LocationLevel::Province.parent_level(), None);
        assert_eq!(
            LocationLevel::Village.parent_level(),
            Some(LocationLevel::Cell)
        );
        assert_eq!(LocationLevel::Village.child_level(), None);
        let below_sector: Vec<_> = LocationLevel::Sector.descendants().collect();
        assert_eq!(below_sector, vec![LocationLevel::Cell, LocationLevel::Village]);
    }

    #[test]
    fn test_default_priority_is_medium() {
        assert_eq!(TicketPriority::default(), TicketPriority::Medium);
    }
}
