//! Location hierarchy service.
//!
//! Nodes form a five-level tree (province down to village). They are created
//! under a parent inside the creator's jurisdiction and are never moved or
//! deleted.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use civic_core::LocationId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::audit::{AuditAction, AuditEventInput, AuditStore};
use crate::error::{JurisdictionError, Result};
use crate::services::jurisdiction::{JurisdictionResolver, Target};
use crate::services::user::Actor;
use crate::types::LocationLevel;

// ============================================================================
// Domain Types
// ============================================================================

/// A node of the administrative hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationNode {
    pub id: LocationId,
    pub level: LocationLevel,
    pub name: String,
    /// `None` exactly for provinces.
    pub parent_id: Option<LocationId>,
    pub created_at: DateTime<Utc>,
}

/// Input for inserting a node.
#[derive(Debug, Clone)]
pub struct NewLocation {
    pub level: LocationLevel,
    pub name: String,
    pub parent_id: Option<LocationId>,
}

/// Input for creating a node through the service.
#[derive(Debug, Clone)]
pub struct CreateLocationInput {
    pub level: LocationLevel,
    pub name: String,
    pub parent_id: Option<LocationId>,
}

/// Predicate for listing nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationQuery {
    pub level: Option<LocationLevel>,
    pub parent_id: Option<LocationId>,
}

// ============================================================================
// Store Trait
// ============================================================================

/// Storage backend for location nodes.
#[async_trait::async_trait]
pub trait LocationStore: Send + Sync {
    /// Find a node by id.
    async fn get(&self, id: LocationId) -> Result<Option<LocationNode>>;

    /// Insert a node unless a sibling (same parent, same level) already
    /// carries the name. Check and insert are atomic.
    async fn insert_unique(&self, input: NewLocation) -> Result<LocationNode>;

    /// Direct children of a node.
    async fn children(&self, parent_id: LocationId) -> Result<Vec<LocationNode>>;

    /// Nodes matching every set field of the query.
    async fn find_matching(&self, query: LocationQuery) -> Result<Vec<LocationNode>>;
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// In-memory location store.
#[derive(Debug, Default)]
pub struct InMemoryLocationStore {
    nodes: Arc<RwLock<HashMap<LocationId, LocationNode>>>,
}

impl InMemoryLocationStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Clear all nodes (for testing).
    pub async fn clear(&self) {
        self.nodes.write().await.clear();
    }

    /// Get the count of nodes.
    pub async fn count(&self) -> usize {
        self.nodes.read().await.len()
    }
}

#[async_trait::async_trait]
impl LocationStore for InMemoryLocationStore {
    async fn get(&self, id: LocationId) -> Result<Option<LocationNode>> {
        Ok(self.nodes.read().await.get(&id).cloned())
    }

    async fn insert_unique(&self, input: NewLocation) -> Result<LocationNode> {
        let mut nodes = self.nodes.write().await;

        let taken = nodes.values().any(|n| {
            n.parent_id == input.parent_id && n.level == input.level && n.name == input.name
        });
        if taken {
            return Err(JurisdictionError::conflict(format!(
                "{} '{}' already exists under this parent",
                input.level.label(),
                input.name
            )));
        }

        let node = LocationNode {
            id: LocationId::new(),
            level: input.level,
            name: input.name,
            parent_id: input.parent_id,
            created_at: Utc::now(),
        };
        nodes.insert(node.id, node.clone());
        Ok(node)
    }

    async fn children(&self, parent_id: LocationId) -> Result<Vec<LocationNode>> {
        Ok(self
            .nodes
            .read()
            .await
            .values()
            .filter(|n| n.parent_id == Some(parent_id))
            .cloned()
            .collect())
    }

    async fn find_matching(&self, query: LocationQuery) -> Result<Vec<LocationNode>> {
        Ok(self
            .nodes
            .read()
            .await
            .values()
            .filter(|n| query.level.is_none_or(|l| n.level == l))
            .filter(|n| query.parent_id.is_none_or(|p| n.parent_id == Some(p)))
            .cloned()
            .collect())
    }
}

// ============================================================================
// Service
// ============================================================================

/// Service for creating and browsing the hierarchy.
pub struct LocationService {
    locations: Arc<dyn LocationStore>,
    resolver: Arc<JurisdictionResolver>,
    audit_store: Arc<dyn AuditStore>,
}

impl LocationService {
    pub fn new(
        locations: Arc<dyn LocationStore>,
        resolver: Arc<JurisdictionResolver>,
        audit_store: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            locations,
            resolver,
            audit_store,
        }
    }

    fn validate_input(input: &CreateLocationInput) -> Result<String> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(JurisdictionError::validation("name", "name is required"));
        }
        match (input.level, input.parent_id) {
            (LocationLevel::Province, Some(_)) => Err(JurisdictionError::validation(
                "parent_id",
                "provinces have no parent",
            )),
            (level, None) if level != LocationLevel::Province => {
                Err(JurisdictionError::validation(
                    "parent_id",
                    format!("a {} needs a parent", level.label().to_lowercase()),
                ))
            }
            _ => Ok(name.to_string()),
        }
    }

    /// Create a node under a parent the actor has jurisdiction over.
    pub async fn create_location(
        &self,
        actor: &Actor,
        input: CreateLocationInput,
    ) -> Result<LocationNode> {
        let name = Self::validate_input(&input)?;

        if !actor.role.can_create_location(input.level) {
            warn!(
                target: "jurisdiction",
                actor_id = %actor.id,
                role = %actor.role,
                level = %input.level,
                "Location creation denied: insufficient role"
            );
            return Err(JurisdictionError::forbidden(format!(
                "{} cannot create a {}",
                actor.role,
                input.level.label().to_lowercase()
            )));
        }

        if let Some(parent_id) = input.parent_id {
            let expected = input
                .level
                .parent_level()
                .ok_or_else(|| JurisdictionError::validation("parent_id", "unexpected parent"))?;
            let parent = self
                .locations
                .get(parent_id)
                .await?
                .filter(|p| p.level == expected)
                .ok_or_else(|| JurisdictionError::not_found(expected.label(), parent_id))?;

            if !self
                .resolver
                .contains(actor, Target::Location(&parent))
                .await?
            {
                warn!(
                    target: "jurisdiction",
                    actor_id = %actor.id,
                    parent_id = %parent_id,
                    "Location creation denied: parent outside jurisdiction"
                );
                return Err(JurisdictionError::forbidden(
                    "parent location is outside your jurisdiction",
                ));
            }
        }

        let node = self
            .locations
            .insert_unique(NewLocation {
                level: input.level,
                name,
                parent_id: input.parent_id,
            })
            .await?;

        self.audit_store
            .log_event(AuditEventInput {
                action: AuditAction::LocationCreated,
                actor_id: actor.id,
                location_id: Some(node.id),
                after_state: Some(serde_json::to_value(&node).unwrap_or_default()),
                ..Default::default()
            })
            .await?;

        info!(
            target: "jurisdiction",
            actor_id = %actor.id,
            location_id = %node.id,
            level = %node.level,
            "Location created"
        );

        Ok(node)
    }

    /// Look up a node.
    pub async fn get_location(&self, id: LocationId) -> Result<LocationNode> {
        self.locations
            .get(id)
            .await?
            .ok_or_else(|| JurisdictionError::not_found("Location", id))
    }

    /// Public listing of one level, optionally under a parent, ordered by
    /// name then id.
    pub async fn list_locations(
        &self,
        level: LocationLevel,
        parent_id: Option<LocationId>,
    ) -> Result<Vec<LocationNode>> {
        if let Some(parent_id) = parent_id {
            let expected = level.parent_level().ok_or_else(|| {
                JurisdictionError::validation("parent_id", "provinces have no parent")
            })?;
            self.locations
                .get(parent_id)
                .await?
                .filter(|p| p.level == expected)
                .ok_or_else(|| JurisdictionError::not_found(expected.label(), parent_id))?;
        }

        let mut nodes = self
            .locations
            .find_matching(LocationQuery {
                level: Some(level),
                parent_id,
            })
            .await?;
        nodes.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(nodes)
    }
}

// ============================================================================
// Tests
// ============================================================================
