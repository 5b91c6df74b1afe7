//! Engine facade.
//!
//! Wires the stores, capabilities and configuration into the services and
//! exposes every operation behind one handle. The engine holds no request
//! state and is safe to share across tasks.
//!
//! # Example
//!
//! ```ignore
//! use civic_jurisdiction::{EngineConfig, JurisdictionEngine};
//!
//! let engine = JurisdictionEngine::in_memory(EngineConfig::default());
//! let actor = engine.authenticate(Some(user_id)).await?;
//! let chain = engine.resolve_jurisdiction(&actor).await?;
//! ```

use std::sync::Arc;

use civic_core::{LocationId, TicketId, UserId};

use crate::audit::{AuditEvent, AuditEventFilter, AuditStore, InMemoryAuditStore};
use crate::classifier::{DisabledClassifier, DisabledSummarizer, TicketClassifier, TicketSummarizer};
use crate::config::EngineConfig;
use crate::error::{JurisdictionError, Result};
use crate::locks::LeaderLocks;
use crate::pagination::{Page, Paginated};
use crate::services::analytics::{AnalyticsQuery, AnalyticsService, TicketAnalytics};
use crate::services::assignment::{AssignLeaderInput, AssignmentService};
use crate::services::jurisdiction::{AncestorChain, JurisdictionResolver, Target};
use crate::services::location::{
    CreateLocationInput, InMemoryLocationStore, LocationNode, LocationService, LocationStore,
};
use crate::services::scope::{DrillDown, ScopeBuilder, ScopePredicate, ScopeResource};
use crate::services::ticket::{
    CommentStore, CreateTicketInput, InMemoryCommentStore, InMemoryTicketStore, Ticket,
    TicketComment, TicketDetail, TicketFilter, TicketHistoryEntry, TicketPermissions,
    TicketService, TicketStore, TicketTransition,
};
use crate::services::user::{
    Actor, CreateUserInput, InMemoryUserStore, RegisterCitizenInput, User, UserService, UserStore,
};
use crate::types::{LocationLevel, Role, TicketOperation, TicketStatus};

/// Store handles injected into the engine.
#[derive(Clone)]
pub struct EngineStores {
    pub locations: Arc<dyn LocationStore>,
    pub users: Arc<dyn UserStore>,
    pub tickets: Arc<dyn TicketStore>,
    pub comments: Arc<dyn CommentStore>,
    pub audit: Arc<dyn AuditStore>,
}

impl EngineStores {
    /// Fresh in-memory stores.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            locations: Arc::new(InMemoryLocationStore::new()),
            users: Arc::new(InMemoryUserStore::new()),
            tickets: Arc::new(InMemoryTicketStore::new()),
            comments: Arc::new(InMemoryCommentStore::new()),
            audit: Arc::new(InMemoryAuditStore::new()),
        }
    }
}

/// External advisory capabilities.
#[derive(Clone)]
pub struct Capabilities {
    pub classifier: Arc<dyn TicketClassifier>,
    pub summarizer: Arc<dyn TicketSummarizer>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            classifier: Arc::new(DisabledClassifier),
            summarizer: Arc::new(DisabledSummarizer),
        }
    }
}

/// The jurisdiction-scoped administration engine.
pub struct JurisdictionEngine {
    config: EngineConfig,
    audit_store: Arc<dyn AuditStore>,
    resolver: Arc<JurisdictionResolver>,
    scopes: Arc<ScopeBuilder>,
    locations: Arc<LocationService>,
    users: Arc<UserService>,
    assignments: Arc<AssignmentService>,
    tickets: Arc<TicketService>,
    analytics: Arc<AnalyticsService>,
}

impl JurisdictionEngine {
    /// Build an engine over the given stores.
    pub fn new(stores: EngineStores, capabilities: Capabilities, config: EngineConfig) -> Self {
        let resolver = Arc::new(JurisdictionResolver::new(stores.locations.clone(), &config));
        let scopes = Arc::new(ScopeBuilder::new(resolver.clone()));

        let locations = Arc::new(LocationService::new(
            stores.locations.clone(),
            resolver.clone(),
            stores.audit.clone(),
        ));
        let assignments = Arc::new(AssignmentService::new(
            stores.users.clone(),
            stores.locations.clone(),
            resolver.clone(),
            Arc::new(LeaderLocks::new()),
            stores.audit.clone(),
        ));
        let users = Arc::new(UserService::new(
            stores.users.clone(),
            stores.locations.clone(),
            resolver.clone(),
            scopes.clone(),
            assignments.clone(),
            stores.audit.clone(),
        ));
        let tickets = Arc::new(TicketService::new(
            stores.tickets.clone(),
            stores.comments.clone(),
            stores.locations.clone(),
            resolver.clone(),
            scopes.clone(),
            capabilities.classifier,
            config.clone(),
        ));
        let analytics = Arc::new(AnalyticsService::new(
            tickets.clone(),
            scopes.clone(),
            capabilities.summarizer,
            config.clone(),
        ));

        Self {
            config,
            audit_store: stores.audit,
            resolver,
            scopes,
            locations,
            users,
            assignments,
            tickets,
            analytics,
        }
    }

    /// An engine over fresh in-memory stores with no external capabilities.
    #[must_use]
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(EngineStores::in_memory(), Capabilities::default(), config)
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Identity and jurisdiction
    // ------------------------------------------------------------------------

    /// Resolve the caller from the identity layer's user id.
    pub async fn authenticate(&self, user_id: Option<UserId>) -> Result<Actor> {
        self.users.authenticate(user_id).await
    }

    /// The actor's ancestor chain (empty for administrators).
    pub async fn resolve_jurisdiction(&self, actor: &Actor) -> Result<AncestorChain> {
        self.resolver.ancestor_chain(actor).await
    }

    /// Whether the target lies inside the actor's jurisdiction.
    pub async fn check_containment(&self, actor: &Actor, target: Target<'_>) -> Result<bool> {
        self.resolver.contains(actor, target).await
    }

    /// Scope predicate for a resource.
    pub async fn build_scope(
        &self,
        actor: &Actor,
        resource: ScopeResource,
        drill: &DrillDown,
    ) -> Result<ScopePredicate> {
        self.scopes.build(actor, resource, drill).await
    }

    // ------------------------------------------------------------------------
    // Locations
    // ------------------------------------------------------------------------

    pub async fn create_location(
        &self,
        actor: &Actor,
        input: CreateLocationInput,
    ) -> Result<LocationNode> {
        self.locations.create_location(actor, input).await
    }

    pub async fn get_location(&self, id: LocationId) -> Result<LocationNode> {
        self.locations.get_location(id).await
    }

    pub async fn list_locations(
        &self,
        level: LocationLevel,
        parent_id: Option<LocationId>,
    ) -> Result<Vec<LocationNode>> {
        self.locations.list_locations(level, parent_id).await
    }

    // ------------------------------------------------------------------------
    // Users and leaders
    // ------------------------------------------------------------------------

    pub async fn register_citizen(&self, input: RegisterCitizenInput) -> Result<User> {
        self.users.register_citizen(input).await
    }

    pub async fn create_user(&self, actor: &Actor, input: CreateUserInput) -> Result<User> {
        self.users.create_user(actor, input).await
    }

    pub async fn get_user(&self, id: UserId) -> Result<User> {
        self.users.get_user(id).await
    }

    pub async fn list_users(
        &self,
        actor: &Actor,
        role: Option<Role>,
        drill: &DrillDown,
    ) -> Result<Vec<User>> {
        self.users.list_users(actor, role, drill).await
    }

    pub async fn assign_leader(&self, actor: &Actor, input: AssignLeaderInput) -> Result<User> {
        self.assignments.assign_leader(actor, input).await
    }

    pub async fn current_leader(&self, role: Role, location_id: LocationId) -> Result<Option<User>> {
        self.assignments.current_leader(role, location_id).await
    }

    // ------------------------------------------------------------------------
    // Tickets
    // ------------------------------------------------------------------------

    pub async fn create_ticket(&self, actor: &Actor, input: CreateTicketInput) -> Result<Ticket> {
        self.tickets.create_ticket(actor, input).await
    }

    /// `Ok` when the actor may perform `op`; `NotFound` precedes `Forbidden`.
    pub async fn check_ticket_permission(
        &self,
        actor: &Actor,
        ticket_id: TicketId,
        op: TicketOperation,
    ) -> Result<()> {
        self.tickets.authorize(actor, ticket_id, op).await.map(|_| ())
    }

    pub async fn ticket_permissions(
        &self,
        actor: &Actor,
        ticket_id: TicketId,
    ) -> Result<TicketPermissions> {
        let ticket = self.tickets.ticket(ticket_id).await?;
        self.tickets.permissions(actor, &ticket).await
    }

    pub async fn transition_ticket(
        &self,
        actor: &Actor,
        ticket_id: TicketId,
        status: TicketStatus,
        note: Option<String>,
    ) -> Result<TicketTransition> {
        self.tickets
            .transition_ticket(actor, ticket_id, status, note)
            .await
    }

    pub async fn get_ticket(&self, actor: &Actor, ticket_id: TicketId) -> Result<TicketDetail> {
        self.tickets.get_ticket(actor, ticket_id).await
    }

    pub async fn ticket_history(
        &self,
        actor: &Actor,
        ticket_id: TicketId,
    ) -> Result<Vec<TicketHistoryEntry>> {
        self.tickets.ticket_history(actor, ticket_id).await
    }

    pub async fn add_comment(
        &self,
        actor: &Actor,
        ticket_id: TicketId,
        content: &str,
    ) -> Result<TicketComment> {
        self.tickets.add_comment(actor, ticket_id, content).await
    }

    pub async fn list_comments(
        &self,
        actor: &Actor,
        ticket_id: TicketId,
    ) -> Result<Vec<TicketComment>> {
        self.tickets.list_comments(actor, ticket_id).await
    }

    pub async fn list_tickets(
        &self,
        actor: &Actor,
        filter: TicketFilter,
        drill: &DrillDown,
        page: Page,
    ) -> Result<Paginated<Ticket>> {
        self.tickets.list_tickets(actor, filter, drill, page).await
    }

    // ------------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------------

    pub async fn analytics(&self, actor: &Actor, query: AnalyticsQuery) -> Result<TicketAnalytics> {
        self.analytics.analytics(actor, query).await
    }

    /// Administrative audit trail, most recent first. Administrators only.
    pub async fn audit_events(
        &self,
        actor: &Actor,
        filter: AuditEventFilter,
    ) -> Result<Vec<AuditEvent>> {
        if actor.role != Role::Admin {
            return Err(JurisdictionError::forbidden(
                "only administrators can read the audit trail",
            ));
        }
        self.audit_store.query_events(filter).await
    }

    // ------------------------------------------------------------------------
    // Service accessors
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn resolver(&self) -> &Arc<JurisdictionResolver> {
        &self.resolver
    }

    #[must_use]
    pub fn ticket_service(&self) -> &Arc<TicketService> {
        &self.tickets
    }

    #[must_use]
    pub fn user_service(&self) -> &Arc<UserService> {
        &self.users
    }
}
