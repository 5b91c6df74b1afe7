//! Jurisdiction-scoped administration for civic complaint handling.
//!
//! This crate provides the authorization and assignment core of a civic
//! complaint system over a fixed five-level administrative hierarchy
//! (Province, District, Sector, Cell, Village).
//!
//! # Features
//!
//! - Location hierarchy management with per-parent unique names
//! - Ancestor chain resolution with cached lookups
//! - Containment checks for locations, users and tickets
//! - Delegation of leader roles with one leader per seat
//! - Ticket lifecycle with append-only status history and comments
//! - Scope predicates for listings with drill-down filters
//! - Analytics with status and category breakdowns and trends
//! - Audit logging for administrative changes
//!
//! # Services
//!
//! The [`services`] module provides business logic for:
//! - [`services::LocationService`] - Create and list hierarchy nodes
//! - [`services::JurisdictionResolver`] - Ancestor chains and containment
//! - [`services::ScopeBuilder`] - Listing predicates per role
//! - [`services::UserService`] - Registration, creation and listing of users
//! - [`services::AssignmentService`] - Leader seat assignment
//! - [`services::TicketService`] - Ticket lifecycle and permissions
//! - [`services::AnalyticsService`] - Aggregated ticket statistics
//!
//! [`JurisdictionEngine`] wires all of them over a set of stores.
//!
//! # Audit
//!
//! The [`audit`] module provides audit logging:
//! - [`audit::AuditStore`] trait for pluggable storage backends
//! - [`audit::InMemoryAuditStore`] for testing
//! - [`audit::AuditEvent`] for tracking administrative changes

pub mod audit;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod locks;
pub mod pagination;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use audit::{AuditAction, AuditEvent, AuditEventFilter, AuditStore, InMemoryAuditStore};
pub use classifier::{KeywordClassifier, TicketClassifier, TicketSummarizer};
pub use config::{ConfigError, EngineConfig};
pub use engine::{Capabilities, EngineStores, JurisdictionEngine};
pub use error::{ErrorKind, JurisdictionError, LeaderSummary, Result};
pub use pagination::{Page, Paginated};
pub use types::{LocationLevel, Role, TicketOperation, TicketPriority, TicketStatus};

// Re-export service types
pub use services::{
    Actor, AncestorChain, AnalyticsQuery, AssignLeaderInput, CreateLocationInput,
    CreateTicketInput, CreateUserInput, DrillDown, LocationNode, RegisterCitizenInput,
    ScopePredicate, ScopeResource, Target, Ticket, TicketAnalytics, TicketComment, TicketDetail,
    TicketFilter, TicketHistoryEntry, TicketPermissions, TicketTransition, TrendPeriod, User,
};

pub use civic_core::{
    AuditEventId, CommentId, HistoryEntryId, LocationId, TicketId, UserId, VillageAnchored,
};
