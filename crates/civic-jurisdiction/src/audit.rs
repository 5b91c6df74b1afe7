//! Audit trail for administrative writes.
//!
//! Every location creation, user creation and leader assignment lands here,
//! with the acting official, the subject and the before/after state.
//!
//! # Example
//!
//! ```rust,ignore
//! use civic_jurisdiction::audit::{AuditAction, AuditEventInput, AuditStore, InMemoryAuditStore};
//! use civic_core::UserId;
//!
//! let store = InMemoryAuditStore::new();
//! let event = store
//!     .log_event(AuditEventInput {
//!         action: AuditAction::UserCreated,
//!         actor_id: UserId::new(),
//!         ..Default::default()
//!     })
//!     .await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use civic_core::{AuditEventId, LocationId, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::Result;
use crate::types::Role;

/// Administrative action recorded in the trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A location node was created.
    #[default]
    LocationCreated,
    /// A user account was created by an official or by self-registration.
    UserCreated,
    /// A user was given a leader seat.
    LeaderAssigned,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LocationCreated => write!(f, "location_created"),
            Self::UserCreated => write!(f, "user_created"),
            Self::LeaderAssigned => write!(f, "leader_assigned"),
        }
    }
}

/// A recorded administrative event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: AuditEventId,
    pub action: AuditAction,
    /// Official who performed the action; the user themself for
    /// self-registration.
    pub actor_id: UserId,
    /// The user the action was applied to, if any.
    pub subject_user_id: Option<UserId>,
    /// The location involved, if any.
    pub location_id: Option<LocationId>,
    /// The role granted, for user creation and leader assignment.
    pub role: Option<Role>,
    pub before_state: Option<serde_json::Value>,
    pub after_state: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// Input for creating an audit event.
#[derive(Debug, Clone, Default)]
pub struct AuditEventInput {
    pub action: AuditAction,
    pub actor_id: UserId,
    pub subject_user_id: Option<UserId>,
    pub location_id: Option<LocationId>,
    pub role: Option<Role>,
    pub before_state: Option<serde_json::Value>,
    pub after_state: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
}

/// Filter for querying audit events.
#[derive(Debug, Clone, Default)]
pub struct AuditEventFilter {
    /// Filter by acting official.
    pub actor_id: Option<UserId>,
    /// Filter by subject user.
    pub subject_user_id: Option<UserId>,
    /// Filter by location.
    pub location_id: Option<LocationId>,
    /// Filter by action type.
    pub action: Option<AuditAction>,
    /// Filter by events at or after this date.
    pub from_date: Option<DateTime<Utc>>,
    /// Filter by events at or before this date.
    pub to_date: Option<DateTime<Utc>>,
    /// Maximum number of results.
    pub limit: Option<usize>,
    /// Number of results to skip.
    pub offset: Option<usize>,
}

/// Trait for audit event storage backends.
#[async_trait::async_trait]
pub trait AuditStore: Send + Sync {
    /// Log an audit event.
    async fn log_event(&self, input: AuditEventInput) -> Result<AuditEvent>;

    /// Query audit events, most recent first.
    async fn query_events(&self, filter: AuditEventFilter) -> Result<Vec<AuditEvent>>;

    /// Get a specific audit event by ID.
    async fn get_event(&self, event_id: AuditEventId) -> Result<Option<AuditEvent>>;
}

/// In-memory audit store.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    events: Arc<RwLock<HashMap<AuditEventId, AuditEvent>>>,
}

impl InMemoryAuditStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the count of events in the store.
    pub async fn count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Clear all events (for testing).
    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

#[async_trait::async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn log_event(&self, input: AuditEventInput) -> Result<AuditEvent> {
        let event = AuditEvent {
            id: AuditEventId::new(),
            action: input.action,
            actor_id: input.actor_id,
            subject_user_id: input.subject_user_id,
            location_id: input.location_id,
            role: input.role,
            before_state: input.before_state,
            after_state: input.after_state,
            metadata: input.metadata,
            timestamp: Utc::now(),
        };

        info!(
            target: "jurisdiction",
            event_id = %event.id,
            action = %event.action,
            actor_id = %event.actor_id,
            "Audit event recorded"
        );

        self.events.write().await.insert(event.id, event.clone());
        Ok(event)
    }

    async fn query_events(&self, filter: AuditEventFilter) -> Result<Vec<AuditEvent>> {
        let events = self.events.read().await;
        let mut results: Vec<_> = events
            .values()
            .filter(|e| filter.actor_id.is_none_or(|id| e.actor_id == id))
            .filter(|e| {
                filter
                    .subject_user_id
                    .is_none_or(|id| e.subject_user_id == Some(id))
            })
            .filter(|e| {
                filter
                    .location_id
                    .is_none_or(|id| e.location_id == Some(id))
            })
            .filter(|e| filter.action.is_none_or(|a| e.action == a))
            .filter(|e| filter.from_date.is_none_or(|d| e.timestamp >= d))
            .filter(|e| filter.to_date.is_none_or(|d| e.timestamp <= d))
            .cloned()
            .collect();

        // Most recent first, id breaks ties
        results.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.id.cmp(&b.id)));

        let offset = filter.offset.unwrap_or(0);
        let limit = filter.limit.unwrap_or(usize::MAX);

        Ok(results.into_iter().skip(offset).take(limit).collect())
    }

    async fn get_event(&self, event_id: AuditEventId) -> Result<Option<AuditEvent>> {
        Ok(self.events.read().await.get(&event_id).cloned())
    }
}
