//! Users, actors and registration.
//!
//! The assignment engine is the only writer of a user's role and anchor; this
//! service creates accounts, resolves actors and lists users within scope.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use civic_core::{LocationId, UserId, VillageAnchored};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::audit::{AuditAction, AuditEventInput, AuditStore};
use crate::error::{JurisdictionError, LeaderSummary, Result};
use crate::services::assignment::{AssignLeaderInput, AssignmentService};
use crate::services::jurisdiction::{JurisdictionResolver, Target};
use crate::services::location::{LocationNode, LocationStore};
use crate::services::scope::{DrillDown, ScopeBuilder, ScopeResource, VillageSelector};
use crate::types::{LocationLevel, Role};

// ============================================================================
// Domain Types
// ============================================================================

/// A citizen or official.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub contact: Option<String>,
    pub role: Role,
    /// Set for every role except `Admin`.
    pub anchor_village_id: Option<LocationId>,
    /// Official who granted the current role; `None` for self-registration.
    pub assigned_by_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn summary(&self) -> LeaderSummary {
        LeaderSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

impl VillageAnchored for User {
    fn anchor_village(&self) -> Option<LocationId> {
        self.anchor_village_id
    }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
    pub anchor_village_id: Option<LocationId>,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
            anchor_village_id: user.anchor_village_id,
        }
    }
}

impl VillageAnchored for Actor {
    fn anchor_village(&self) -> Option<LocationId> {
        self.anchor_village_id
    }
}

/// Input for inserting a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub contact: Option<String>,
    pub role: Role,
    pub anchor_village_id: Option<LocationId>,
    pub assigned_by_id: Option<UserId>,
}

/// Role and anchor a user holds, compared before an assignment write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentState {
    pub role: Role,
    pub anchor_village_id: Option<LocationId>,
}

impl From<&User> for AssignmentState {
    fn from(user: &User) -> Self {
        Self {
            role: user.role,
            anchor_village_id: user.anchor_village_id,
        }
    }
}

/// New role and anchor written by the assignment engine.
#[derive(Debug, Clone, Copy)]
pub struct LeaderAssignment {
    pub role: Role,
    pub anchor_village_id: LocationId,
    pub assigned_by_id: UserId,
}

/// Predicate for user lookups.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub role: Option<Role>,
    pub villages: VillageSelector,
}

/// Self-registration input.
#[derive(Debug, Clone)]
pub struct RegisterCitizenInput {
    pub name: String,
    pub email: String,
    pub contact: Option<String>,
    pub village_id: LocationId,
}

/// Account creation by an official.
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub name: String,
    pub email: String,
    pub contact: Option<String>,
    pub village_id: LocationId,
    /// Defaults to `Citizen`.
    pub role: Option<Role>,
}

// ============================================================================
// Store Trait
// ============================================================================

/// Storage backend for users.
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by id.
    async fn get(&self, id: UserId) -> Result<Option<User>>;

    /// Find a user by email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Insert unless the email is taken. Check and insert are atomic.
    async fn insert_unique(&self, input: NewUser) -> Result<User>;

    /// Users matching every set field of the query.
    async fn find_matching(&self, query: UserQuery) -> Result<Vec<User>>;

    /// Replace role, anchor and assigner if the user still holds `expected`.
    ///
    /// A user whose role or anchor changed in between yields `Conflict`.
    async fn update_assignment(
        &self,
        id: UserId,
        expected: AssignmentState,
        assignment: LeaderAssignment,
    ) -> Result<User>;
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// In-memory user store.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a fully formed user, bypassing validation (for seeding).
    pub async fn seed(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    /// Clear all users (for testing).
    pub async fn clear(&self) {
        self.users.write().await.clear();
    }

    /// Get the count of users.
    pub async fn count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_unique(&self, input: NewUser) -> Result<User> {
        let mut users = self.users.write().await;

        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&input.email))
        {
            return Err(JurisdictionError::conflict(format!(
                "email {} is already registered",
                input.email
            )));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            name: input.name,
            email: input.email,
            contact: input.contact,
            role: input.role,
            anchor_village_id: input.anchor_village_id,
            assigned_by_id: input.assigned_by_id,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_matching(&self, query: UserQuery) -> Result<Vec<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .filter(|u| query.role.is_none_or(|r| u.role == r))
            .filter(|u| query.villages.admits(u.anchor_village_id))
            .cloned()
            .collect())
    }

    async fn update_assignment(
        &self,
        id: UserId,
        expected: AssignmentState,
        assignment: LeaderAssignment,
    ) -> Result<User> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| JurisdictionError::not_found("User", id))?;

        if AssignmentState::from(&*user) != expected {
            return Err(JurisdictionError::conflict(format!(
                "user {id} was reassigned concurrently"
            )));
        }

        user.role = assignment.role;
        user.anchor_village_id = Some(assignment.anchor_village_id);
        user.assigned_by_id = Some(assignment.assigned_by_id);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

// ============================================================================
// Service
// ============================================================================

/// Service for accounts and actor resolution.
pub struct UserService {
    users: Arc<dyn UserStore>,
    locations: Arc<dyn LocationStore>,
    resolver: Arc<JurisdictionResolver>,
    scopes: Arc<ScopeBuilder>,
    assignments: Arc<AssignmentService>,
    audit_store: Arc<dyn AuditStore>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserStore>,
        locations: Arc<dyn LocationStore>,
        resolver: Arc<JurisdictionResolver>,
        scopes: Arc<ScopeBuilder>,
        assignments: Arc<AssignmentService>,
        audit_store: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            users,
            locations,
            resolver,
            scopes,
            assignments,
            audit_store,
        }
    }

    /// Resolve the caller supplied by the identity layer.
    pub async fn authenticate(&self, user_id: Option<UserId>) -> Result<Actor> {
        let id = user_id.ok_or(JurisdictionError::Unauthorized)?;
        let user = self
            .users
            .get(id)
            .await?
            .ok_or(JurisdictionError::Unauthorized)?;
        Ok(Actor::from(&user))
    }

    /// Look up a user.
    pub async fn get_user(&self, id: UserId) -> Result<User> {
        self.users
            .get(id)
            .await?
            .ok_or_else(|| JurisdictionError::not_found("User", id))
    }

    fn validate_profile(name: &str, email: &str) -> Result<(String, String)> {
        let name = name.trim();
        if name.is_empty() {
            return Err(JurisdictionError::validation("name", "name is required"));
        }
        let email = email.trim().to_lowercase();
        let well_formed = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !well_formed {
            return Err(JurisdictionError::validation(
                "email",
                "a valid email is required",
            ));
        }
        Ok((name.to_string(), email))
    }

    async fn village(&self, village_id: LocationId) -> Result<LocationNode> {
        self.locations
            .get(village_id)
            .await?
            .filter(|n| n.level == LocationLevel::Village)
            .ok_or_else(|| JurisdictionError::not_found("Village", village_id))
    }

    /// Self-registration. The account is always a citizen.
    pub async fn register_citizen(&self, input: RegisterCitizenInput) -> Result<User> {
        let (name, email) = Self::validate_profile(&input.name, &input.email)?;
        self.village(input.village_id).await?;

        let user = self
            .users
            .insert_unique(NewUser {
                name,
                email,
                contact: input.contact,
                role: Role::Citizen,
                anchor_village_id: Some(input.village_id),
                assigned_by_id: None,
            })
            .await?;

        self.audit_store
            .log_event(AuditEventInput {
                action: AuditAction::UserCreated,
                actor_id: user.id,
                subject_user_id: Some(user.id),
                location_id: Some(input.village_id),
                role: Some(Role::Citizen),
                after_state: Some(serde_json::to_value(&user).unwrap_or_default()),
                metadata: Some(serde_json::json!({"self_registered": true})),
                ..Default::default()
            })
            .await?;

        info!(
            target: "jurisdiction",
            user_id = %user.id,
            village_id = %input.village_id,
            "Citizen registered"
        );

        Ok(user)
    }

    /// Account creation by an official, optionally straight into a leader
    /// seat covering the given village.
    pub async fn create_user(&self, actor: &Actor, input: CreateUserInput) -> Result<User> {
        if actor.role == Role::Citizen {
            return Err(JurisdictionError::forbidden("citizens cannot create users"));
        }

        let role = input.role.unwrap_or(Role::Citizen);
        if role == Role::Admin {
            return Err(JurisdictionError::InvalidRole(
                "ADMIN accounts cannot be created here".into(),
            ));
        }
        if !actor.role.can_delegate(role) {
            warn!(
                target: "jurisdiction",
                actor_id = %actor.id,
                actor_role = %actor.role,
                requested_role = %role,
                "User creation denied: role not delegable"
            );
            return Err(JurisdictionError::forbidden(format!(
                "{} cannot grant {}",
                actor.role, role
            )));
        }

        let (name, email) = Self::validate_profile(&input.name, &input.email)?;
        let village = self.village(input.village_id).await?;

        if !self
            .resolver
            .contains(actor, Target::Location(&village))
            .await?
        {
            warn!(
                target: "jurisdiction",
                actor_id = %actor.id,
                village_id = %village.id,
                "User creation denied: village outside jurisdiction"
            );
            return Err(JurisdictionError::forbidden(
                "village is outside your jurisdiction",
            ));
        }

        // Fail fast on an occupied seat before creating the account.
        let seat = match role.level() {
            Some(level) => {
                let chain = self
                    .resolver
                    .resolve_chain(village.id)
                    .await?
                    .ok_or(JurisdictionError::DanglingLocation(village.id))?;
                let location_id = chain
                    .at(level)
                    .ok_or(JurisdictionError::DanglingLocation(village.id))?;
                if let Some(existing) = self.assignments.current_leader(role, location_id).await? {
                    return Err(JurisdictionError::Conflict {
                        message: format!("{role} seat is already occupied"),
                        existing_leader: Some(existing.summary()),
                    });
                }
                Some(location_id)
            }
            None => None,
        };

        let mut user = self
            .users
            .insert_unique(NewUser {
                name,
                email,
                contact: input.contact,
                role: Role::Citizen,
                anchor_village_id: Some(village.id),
                assigned_by_id: Some(actor.id),
            })
            .await?;

        self.audit_store
            .log_event(AuditEventInput {
                action: AuditAction::UserCreated,
                actor_id: actor.id,
                subject_user_id: Some(user.id),
                location_id: Some(village.id),
                role: Some(Role::Citizen),
                after_state: Some(serde_json::to_value(&user).unwrap_or_default()),
                ..Default::default()
            })
            .await?;

        if let Some(location_id) = seat {
            let user_id = user.id;
            user = self
                .assignments
                .assign_leader(
                    actor,
                    AssignLeaderInput {
                        user_id,
                        role,
                        location_id,
                    },
                )
                .await
                .map_err(|err| match err {
                    // The seat was taken after the pre-check; the account stays.
                    JurisdictionError::Conflict {
                        message,
                        existing_leader,
                    } => JurisdictionError::Conflict {
                        message: format!(
                            "{message}; user {user_id} was created as CITIZEN, \
                             retry with assign_leader instead of create_user"
                        ),
                        existing_leader,
                    },
                    other => other,
                })?;
        }

        info!(
            target: "jurisdiction",
            actor_id = %actor.id,
            user_id = %user.id,
            role = %user.role,
            "User created"
        );

        Ok(user)
    }

    /// Users visible to the actor, ordered by authority, then name, then id.
    pub async fn list_users(
        &self,
        actor: &Actor,
        role: Option<Role>,
        drill: &DrillDown,
    ) -> Result<Vec<User>> {
        let predicate = self.scopes.build(actor, ScopeResource::Users, drill).await?;
        let villages = self.scopes.villages_for(&predicate).await?;

        let mut users = self.users.find_matching(UserQuery { role, villages }).await?;
        users.sort_by(|a, b| {
            a.role
                .authority_rank()
                .cmp(&b.role.authority_rank())
                .then_with(|| a.name.cmp(&b.name))
                .then(a.id.cmp(&b.id))
        });
        Ok(users)
    }
}

// ============================================================================
// Tests
// ============================================================================
