//! Ticket lifecycle service.
//!
//! Complaints move between OPEN, IN_REVIEW, RESOLVED and REJECTED with no
//! ordering restriction. Every move appends a history entry in the same
//! store operation that changes the status, and creation seeds the history
//! with an OPEN entry.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use civic_core::{CommentId, HistoryEntryId, LocationId, TicketId, UserId, VillageAnchored};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::classifier::TicketClassifier;
use crate::config::EngineConfig;
use crate::error::{JurisdictionError, Result};
use crate::pagination::{Page, Paginated};
use crate::services::jurisdiction::{JurisdictionResolver, Target};
use crate::services::location::LocationStore;
use crate::services::scope::{DrillDown, ScopeBuilder, ScopePredicate, ScopeResource, VillageSelector};
use crate::services::user::Actor;
use crate::types::{LocationLevel, TicketOperation, TicketPriority, TicketStatus};

const CREATION_NOTE: &str = "Ticket created";

// ============================================================================
// Domain Types
// ============================================================================

/// A citizen complaint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    /// The citizen who filed the complaint.
    pub citizen_id: UserId,
    /// Fixed at creation.
    pub village_id: LocationId,
    /// Advisory label from the classifier.
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VillageAnchored for Ticket {
    fn anchor_village(&self) -> Option<LocationId> {
        Some(self.village_id)
    }
}

/// One status change of a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketHistoryEntry {
    pub id: HistoryEntryId,
    pub ticket_id: TicketId,
    pub status: TicketStatus,
    pub reviewed_by_id: UserId,
    pub note: String,
    pub timestamp: DateTime<Utc>,
}

/// A comment on a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketComment {
    pub id: CommentId,
    pub ticket_id: TicketId,
    pub user_id: UserId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Input for inserting a ticket together with its first history entry.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub priority: TicketPriority,
    pub citizen_id: UserId,
    pub village_id: LocationId,
    pub category: Option<String>,
}

/// Input for filing a complaint.
#[derive(Debug, Clone)]
pub struct CreateTicketInput {
    pub title: String,
    pub description: String,
    pub village_id: LocationId,
    /// Defaults to `Medium`.
    pub priority: Option<TicketPriority>,
}

/// Input for appending a comment.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub ticket_id: TicketId,
    pub user_id: UserId,
    pub content: String,
}

/// Predicate for ticket lookups.
#[derive(Debug, Clone, Default)]
pub struct TicketQuery {
    pub citizen_id: Option<UserId>,
    pub villages: VillageSelector,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
}

/// Caller-supplied listing filters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
}

/// Result of a status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketTransition {
    pub ticket: Ticket,
    pub entry: TicketHistoryEntry,
}

/// A ticket with its full history and comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketDetail {
    pub ticket: Ticket,
    pub history: Vec<TicketHistoryEntry>,
    pub comments: Vec<TicketComment>,
    pub permissions: TicketPermissions,
}

/// What the caller may do with a ticket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketPermissions {
    pub can_read: bool,
    pub can_comment: bool,
    pub can_update_status: bool,
}

// ============================================================================
// Store Traits
// ============================================================================

/// Storage backend for tickets and their history.
#[async_trait::async_trait]
pub trait TicketStore: Send + Sync {
    /// Find a ticket by id.
    async fn get(&self, id: TicketId) -> Result<Option<Ticket>>;

    /// Insert a ticket in OPEN status and its creation entry atomically.
    async fn create_with_history(
        &self,
        input: NewTicket,
        created_by: UserId,
        note: &str,
    ) -> Result<(Ticket, TicketHistoryEntry)>;

    /// Set the status and append the matching history entry atomically.
    ///
    /// Entry timestamps of one ticket never decrease.
    async fn apply_transition(
        &self,
        id: TicketId,
        status: TicketStatus,
        reviewed_by: UserId,
        note: String,
    ) -> Result<(Ticket, TicketHistoryEntry)>;

    /// History of a ticket, oldest first.
    async fn history(&self, id: TicketId) -> Result<Vec<TicketHistoryEntry>>;

    /// Tickets matching every set field of the query.
    async fn find_matching(&self, query: TicketQuery) -> Result<Vec<Ticket>>;
}

/// Storage backend for comments.
#[async_trait::async_trait]
pub trait CommentStore: Send + Sync {
    /// Append a comment.
    async fn append(&self, input: NewComment) -> Result<TicketComment>;

    /// Comments on a ticket, oldest first.
    async fn list_for_ticket(&self, ticket_id: TicketId) -> Result<Vec<TicketComment>>;
}

// ============================================================================
// In-Memory Stores
// ============================================================================

#[derive(Debug, Default)]
struct TicketTables {
    tickets: HashMap<TicketId, Ticket>,
    history: HashMap<TicketId, Vec<TicketHistoryEntry>>,
}

/// In-memory ticket store. Tickets and history share one lock.
#[derive(Debug, Default)]
pub struct InMemoryTicketStore {
    tables: Arc<RwLock<TicketTables>>,
}

impl InMemoryTicketStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all tickets (for testing).
    pub async fn clear(&self) {
        let mut tables = self.tables.write().await;
        tables.tickets.clear();
        tables.history.clear();
    }

    /// Get the count of tickets.
    pub async fn count(&self) -> usize {
        self.tables.read().await.tickets.len()
    }

    /// Insert a ticket with a chosen creation time (for seeding analytics).
    pub async fn seed(&self, ticket: Ticket, history: Vec<TicketHistoryEntry>) {
        let mut tables = self.tables.write().await;
        tables.history.insert(ticket.id, history);
        tables.tickets.insert(ticket.id, ticket);
    }
}

#[async_trait::async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn get(&self, id: TicketId) -> Result<Option<Ticket>> {
        Ok(self.tables.read().await.tickets.get(&id).cloned())
    }

    async fn create_with_history(
        &self,
        input: NewTicket,
        created_by: UserId,
        note: &str,
    ) -> Result<(Ticket, TicketHistoryEntry)> {
        let now = Utc::now();
        let ticket = Ticket {
            id: TicketId::new(),
            title: input.title,
            description: input.description,
            status: TicketStatus::Open,
            priority: input.priority,
            citizen_id: input.citizen_id,
            village_id: input.village_id,
            category: input.category,
            created_at: now,
            updated_at: now,
        };
        let entry = TicketHistoryEntry {
            id: HistoryEntryId::new(),
            ticket_id: ticket.id,
            status: TicketStatus::Open,
            reviewed_by_id: created_by,
            note: note.to_string(),
            timestamp: now,
        };

        let mut tables = self.tables.write().await;
        tables.tickets.insert(ticket.id, ticket.clone());
        tables.history.insert(ticket.id, vec![entry.clone()]);
        Ok((ticket, entry))
    }

    async fn apply_transition(
        &self,
        id: TicketId,
        status: TicketStatus,
        reviewed_by: UserId,
        note: String,
    ) -> Result<(Ticket, TicketHistoryEntry)> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let ticket = tables
            .tickets
            .get_mut(&id)
            .ok_or_else(|| JurisdictionError::not_found("Ticket", id))?;
        let history = tables.history.entry(id).or_default();

        let now = Utc::now();
        let timestamp = history.last().map_or(now, |last| now.max(last.timestamp));

        ticket.status = status;
        ticket.updated_at = timestamp;

        let entry = TicketHistoryEntry {
            id: HistoryEntryId::new(),
            ticket_id: id,
            status,
            reviewed_by_id: reviewed_by,
            note,
            timestamp,
        };
        history.push(entry.clone());
        Ok((ticket.clone(), entry))
    }

    async fn history(&self, id: TicketId) -> Result<Vec<TicketHistoryEntry>> {
        Ok(self
            .tables
            .read()
            .await
            .history
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_matching(&self, query: TicketQuery) -> Result<Vec<Ticket>> {
        Ok(self
            .tables
            .read()
            .await
            .tickets
            .values()
            .filter(|t| query.citizen_id.is_none_or(|c| t.citizen_id == c))
            .filter(|t| query.villages.admits(Some(t.village_id)))
            .filter(|t| query.status.is_none_or(|s| t.status == s))
            .filter(|t| query.priority.is_none_or(|p| t.priority == p))
            .cloned()
            .collect())
    }
}

/// In-memory comment store.
#[derive(Debug, Default)]
pub struct InMemoryCommentStore {
    comments: Arc<RwLock<HashMap<TicketId, Vec<TicketComment>>>>,
}

impl InMemoryCommentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the total count of comments.
    pub async fn count(&self) -> usize {
        self.comments.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait::async_trait]
impl CommentStore for InMemoryCommentStore {
    async fn append(&self, input: NewComment) -> Result<TicketComment> {
        let comment = TicketComment {
            id: CommentId::new(),
            ticket_id: input.ticket_id,
            user_id: input.user_id,
            content: input.content,
            timestamp: Utc::now(),
        };
        self.comments
            .write()
            .await
            .entry(comment.ticket_id)
            .or_default()
            .push(comment.clone());
        Ok(comment)
    }

    async fn list_for_ticket(&self, ticket_id: TicketId) -> Result<Vec<TicketComment>> {
        Ok(self
            .comments
            .read()
            .await
            .get(&ticket_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// Service
// ============================================================================

/// Service for filing, reading and moving tickets.
pub struct TicketService {
    tickets: Arc<dyn TicketStore>,
    comments: Arc<dyn CommentStore>,
    locations: Arc<dyn LocationStore>,
    resolver: Arc<JurisdictionResolver>,
    scopes: Arc<ScopeBuilder>,
    classifier: Arc<dyn TicketClassifier>,
    config: EngineConfig,
}

impl TicketService {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        comments: Arc<dyn CommentStore>,
        locations: Arc<dyn LocationStore>,
        resolver: Arc<JurisdictionResolver>,
        scopes: Arc<ScopeBuilder>,
        classifier: Arc<dyn TicketClassifier>,
        config: EngineConfig,
    ) -> Self {
        Self {
            tickets,
            comments,
            locations,
            resolver,
            scopes,
            classifier,
            config,
        }
    }

    /// Look up a ticket without a permission check.
    pub async fn ticket(&self, id: TicketId) -> Result<Ticket> {
        self.tickets
            .get(id)
            .await?
            .ok_or_else(|| JurisdictionError::not_found("Ticket", id))
    }

    /// Best-effort category; failures and timeouts leave it empty.
    async fn categorize(&self, description: &str) -> Option<String> {
        if !self.config.classifier_enabled {
            return None;
        }
        match tokio::time::timeout(
            self.config.classifier_timeout,
            self.classifier.classify(description),
        )
        .await
        {
            Ok(Ok(label)) => {
                let label = label.trim();
                (!label.is_empty()).then(|| label.to_string())
            }
            Ok(Err(e)) => {
                warn!(target: "jurisdiction", error = %e, "Ticket classification failed");
                None
            }
            Err(_) => {
                warn!(
                    target: "jurisdiction",
                    timeout_ms = self.config.classifier_timeout.as_millis() as u64,
                    "Ticket classification timed out"
                );
                None
            }
        }
    }

    /// File a complaint owned by the actor.
    pub async fn create_ticket(&self, actor: &Actor, input: CreateTicketInput) -> Result<Ticket> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(JurisdictionError::validation("title", "title is required"));
        }
        let description = input.description.trim();
        if description.is_empty() {
            return Err(JurisdictionError::validation(
                "description",
                "description is required",
            ));
        }

        self.locations
            .get(input.village_id)
            .await?
            .filter(|n| n.level == LocationLevel::Village)
            .ok_or_else(|| JurisdictionError::not_found("Village", input.village_id))?;

        let category = self.categorize(description).await;

        let (ticket, _) = self
            .tickets
            .create_with_history(
                NewTicket {
                    title: title.to_string(),
                    description: description.to_string(),
                    priority: input.priority.unwrap_or_default(),
                    citizen_id: actor.id,
                    village_id: input.village_id,
                    category,
                },
                actor.id,
                CREATION_NOTE,
            )
            .await?;

        info!(
            target: "jurisdiction",
            ticket_id = %ticket.id,
            citizen_id = %actor.id,
            village_id = %ticket.village_id,
            category = ticket.category.as_deref().unwrap_or("-"),
            "Ticket created"
        );

        Ok(ticket)
    }

    /// Whether the actor may perform `op` on `ticket`.
    pub async fn is_permitted(
        &self,
        actor: &Actor,
        ticket: &Ticket,
        op: TicketOperation,
    ) -> Result<bool> {
        let owner = ticket.citizen_id == actor.id;
        if owner && op != TicketOperation::UpdateStatus {
            return Ok(true);
        }
        if !actor.role.is_administrative() {
            return Ok(false);
        }
        self.resolver.contains(actor, Target::Ticket(ticket)).await
    }

    /// `Ok` if the actor may perform `op` on `ticket`, `Forbidden` otherwise.
    pub async fn check_ticket_permission(
        &self,
        actor: &Actor,
        ticket: &Ticket,
        op: TicketOperation,
    ) -> Result<()> {
        if self.is_permitted(actor, ticket, op).await? {
            return Ok(());
        }
        warn!(
            target: "jurisdiction",
            actor_id = %actor.id,
            role = %actor.role,
            ticket_id = %ticket.id,
            operation = %op,
            "Ticket access denied"
        );
        Err(JurisdictionError::forbidden(format!(
            "not allowed to {op} this ticket"
        )))
    }

    /// All three permission bits for the actor.
    pub async fn permissions(&self, actor: &Actor, ticket: &Ticket) -> Result<TicketPermissions> {
        Ok(TicketPermissions {
            can_read: self.is_permitted(actor, ticket, TicketOperation::Read).await?,
            can_comment: self
                .is_permitted(actor, ticket, TicketOperation::Comment)
                .await?,
            can_update_status: self
                .is_permitted(actor, ticket, TicketOperation::UpdateStatus)
                .await?,
        })
    }

    /// Load a ticket and check `op` against it.
    pub async fn authorize(
        &self,
        actor: &Actor,
        id: TicketId,
        op: TicketOperation,
    ) -> Result<Ticket> {
        let ticket = self.ticket(id).await?;
        self.check_ticket_permission(actor, &ticket, op).await?;
        Ok(ticket)
    }

    /// Move a ticket to `status`. Any status may follow any other.
    pub async fn transition_ticket(
        &self,
        actor: &Actor,
        id: TicketId,
        status: TicketStatus,
        note: Option<String>,
    ) -> Result<TicketTransition> {
        let before = self
            .authorize(actor, id, TicketOperation::UpdateStatus)
            .await?;

        let note = note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Status updated to {status}"));

        let (ticket, entry) = self
            .tickets
            .apply_transition(id, status, actor.id, note)
            .await?;

        info!(
            target: "jurisdiction",
            ticket_id = %id,
            actor_id = %actor.id,
            from = %before.status,
            to = %status,
            "Ticket status changed"
        );

        Ok(TicketTransition { ticket, entry })
    }

    /// Ticket with history, comments and the caller's permissions.
    pub async fn get_ticket(&self, actor: &Actor, id: TicketId) -> Result<TicketDetail> {
        let ticket = self.authorize(actor, id, TicketOperation::Read).await?;
        let history = self.tickets.history(id).await?;
        let comments = self.comments.list_for_ticket(id).await?;
        let permissions = self.permissions(actor, &ticket).await?;
        Ok(TicketDetail {
            ticket,
            history,
            comments,
            permissions,
        })
    }

    /// Status history, oldest first.
    pub async fn ticket_history(
        &self,
        actor: &Actor,
        id: TicketId,
    ) -> Result<Vec<TicketHistoryEntry>> {
        self.authorize(actor, id, TicketOperation::Read).await?;
        self.tickets.history(id).await
    }

    /// Comments, oldest first.
    pub async fn list_comments(&self, actor: &Actor, id: TicketId) -> Result<Vec<TicketComment>> {
        self.authorize(actor, id, TicketOperation::Read).await?;
        self.comments.list_for_ticket(id).await
    }

    /// Append a comment.
    pub async fn add_comment(
        &self,
        actor: &Actor,
        id: TicketId,
        content: &str,
    ) -> Result<TicketComment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(JurisdictionError::validation(
                "content",
                "comment content is required",
            ));
        }
        self.authorize(actor, id, TicketOperation::Comment).await?;

        let comment = self
            .comments
            .append(NewComment {
                ticket_id: id,
                user_id: actor.id,
                content: content.to_string(),
            })
            .await?;

        info!(
            target: "jurisdiction",
            ticket_id = %id,
            comment_id = %comment.id,
            user_id = %actor.id,
            "Comment added"
        );
        Ok(comment)
    }

    /// Every ticket a predicate admits, unordered.
    pub async fn tickets_in_scope(
        &self,
        predicate: &ScopePredicate,
        filter: TicketFilter,
    ) -> Result<Vec<Ticket>> {
        let villages = self.scopes.villages_for(predicate).await?;
        self.tickets
            .find_matching(TicketQuery {
                citizen_id: predicate.owner,
                villages,
                status: filter.status,
                priority: filter.priority,
            })
            .await
    }

    /// Tickets visible to the actor, newest first.
    pub async fn list_tickets(
        &self,
        actor: &Actor,
        filter: TicketFilter,
        drill: &DrillDown,
        page: Page,
    ) -> Result<Paginated<Ticket>> {
        let predicate = self
            .scopes
            .build(actor, ScopeResource::Tickets, drill)
            .await?;
        let mut tickets = self.tickets_in_scope(&predicate, filter).await?;
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        debug!(
            target: "jurisdiction",
            actor_id = %actor.id,
            matched = tickets.len(),
            "Tickets listed"
        );
        Ok(Paginated::from_sorted(tickets, page, &self.config))
    }

    /// History entries for a ticket without a permission check.
    pub async fn raw_history(&self, id: TicketId) -> Result<Vec<TicketHistoryEntry>> {
        self.tickets.history(id).await
    }
}

// ============================================================================
// Tests
// ============================================================================
