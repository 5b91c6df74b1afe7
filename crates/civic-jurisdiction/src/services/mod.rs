//! Service layer for jurisdiction-scoped administration.
//!
//! Each service file carries its domain types, its store trait and an
//! in-memory store next to the service itself.

pub mod analytics;
pub mod assignment;
pub mod jurisdiction;
pub mod location;
pub mod scope;
pub mod ticket;
pub mod user;

// Re-export commonly used types
pub use analytics::{AnalyticsQuery, AnalyticsService, TicketAnalytics, TrendBucket, TrendPeriod};
pub use assignment::{AssignLeaderInput, AssignmentService};
pub use jurisdiction::{AncestorChain, ChainCache, JurisdictionResolver, Target};
pub use location::{
    CreateLocationInput, InMemoryLocationStore, LocationNode, LocationQuery, LocationService,
    LocationStore, NewLocation,
};
pub use scope::{
    DrillDown, LocationConstraint, ScopeBuilder, ScopePredicate, ScopeResource, VillageSelector,
};
pub use ticket::{
    CommentStore, CreateTicketInput, InMemoryCommentStore, InMemoryTicketStore, NewComment,
    NewTicket, Ticket, TicketComment, TicketDetail, TicketFilter, TicketHistoryEntry,
    TicketPermissions, TicketQuery, TicketService, TicketStore, TicketTransition,
};
pub use user::{
    Actor, AssignmentState, CreateUserInput, InMemoryUserStore, LeaderAssignment, NewUser,
    RegisterCitizenInput, User, UserQuery, UserService, UserStore,
};
