//! Leader assignment.
//!
//! Grants a leader role over a location while enforcing three rules: the
//! actor may delegate the role, the location lies inside the actor's
//! jurisdiction, and a (role, location) seat never has two holders.

use std::sync::Arc;

use civic_core::{LocationId, UserId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audit::{AuditAction, AuditEventInput, AuditStore};
use crate::error::{JurisdictionError, Result};
use crate::locks::LeaderLocks;
use crate::services::jurisdiction::{JurisdictionResolver, Target};
use crate::services::location::{LocationNode, LocationStore};
use crate::services::scope::VillageSelector;
use crate::services::user::{
    Actor, AssignmentState, LeaderAssignment, User, UserQuery, UserStore,
};
use crate::types::{LocationLevel, Role};

/// Input for assigning a leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignLeaderInput {
    pub user_id: UserId,
    pub role: Role,
    /// Location at the level the role presides over.
    pub location_id: LocationId,
}

/// Service enforcing delegation, containment and seat uniqueness.
pub struct AssignmentService {
    users: Arc<dyn UserStore>,
    locations: Arc<dyn LocationStore>,
    resolver: Arc<JurisdictionResolver>,
    locks: Arc<LeaderLocks>,
    audit_store: Arc<dyn AuditStore>,
}

impl AssignmentService {
    pub fn new(
        users: Arc<dyn UserStore>,
        locations: Arc<dyn LocationStore>,
        resolver: Arc<JurisdictionResolver>,
        locks: Arc<LeaderLocks>,
        audit_store: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            users,
            locations,
            resolver,
            locks,
            audit_store,
        }
    }

    fn deny(actor: &Actor, input: &AssignLeaderInput, reason: &str) -> JurisdictionError {
        warn!(
            target: "jurisdiction",
            actor_id = %actor.id,
            actor_role = %actor.role,
            user_id = %input.user_id,
            role = %input.role,
            location_id = %input.location_id,
            reason,
            "Leader assignment denied"
        );
        JurisdictionError::forbidden(reason.to_string())
    }

    async fn seat_location(&self, role: Role, location_id: LocationId) -> Result<LocationNode> {
        let level = role
            .level()
            .ok_or_else(|| JurisdictionError::InvalidRole(role.to_string()))?;
        self.locations
            .get(location_id)
            .await?
            .filter(|n| n.level == level)
            .ok_or_else(|| JurisdictionError::not_found(level.label(), location_id))
    }

    async fn holders(&self, role: Role, location: &LocationNode) -> Result<Vec<User>> {
        let villages = self.resolver.villages_within(location).await?;
        let mut holders = self
            .users
            .find_matching(UserQuery {
                role: Some(role),
                villages: VillageSelector::Only(villages),
            })
            .await?;
        holders.sort_by_key(|u| u.id);
        Ok(holders)
    }

    /// The user currently holding `role` over `location_id`, if any.
    pub async fn current_leader(
        &self,
        role: Role,
        location_id: LocationId,
    ) -> Result<Option<User>> {
        let location = self.seat_location(role, location_id).await?;
        Ok(self.holders(role, &location).await?.into_iter().next())
    }

    /// Give `input.user_id` the leader seat `(input.role, input.location_id)`.
    pub async fn assign_leader(&self, actor: &Actor, input: AssignLeaderInput) -> Result<User> {
        if !input.role.is_leader() {
            return Err(JurisdictionError::InvalidRole(format!(
                "{} is not a leader role",
                input.role
            )));
        }

        if !actor.role.can_delegate(input.role) {
            return Err(Self::deny(actor, &input, "role is not delegable by the actor"));
        }

        let target = self
            .users
            .get(input.user_id)
            .await?
            .ok_or_else(|| JurisdictionError::not_found("User", input.user_id))?;

        // Officials may only move people they could have appointed themselves.
        if target.role != Role::Citizen {
            let movable = actor.role.can_delegate(target.role)
                && self.resolver.contains(actor, Target::User(&target)).await?;
            if !movable {
                return Err(Self::deny(
                    actor,
                    &input,
                    "target user is outside the actor's authority",
                ));
            }
        }

        let location = self.seat_location(input.role, input.location_id).await?;

        if !self
            .resolver
            .contains(actor, Target::Location(&location))
            .await?
        {
            return Err(Self::deny(
                actor,
                &input,
                "location is outside the actor's jurisdiction",
            ));
        }

        let _seat = self.locks.acquire(input.role, location.id).await;

        if let Some(existing) = self
            .holders(input.role, &location)
            .await?
            .into_iter()
            .find(|u| u.id != target.id)
        {
            warn!(
                target: "jurisdiction",
                actor_id = %actor.id,
                role = %input.role,
                location_id = %location.id,
                existing_leader = %existing.id,
                "Leader assignment conflict"
            );
            return Err(JurisdictionError::Conflict {
                message: format!(
                    "{} already has a {}",
                    location.name, input.role
                ),
                existing_leader: Some(existing.summary()),
            });
        }

        // Re-read under the seat lock so the compare-and-set sees the latest row.
        let current = self
            .users
            .get(target.id)
            .await?
            .ok_or_else(|| JurisdictionError::not_found("User", target.id))?;

        // Keep the user's own village when it already lies under the seat.
        let anchor = if location.level == LocationLevel::Village {
            location.id
        } else {
            let villages = self.resolver.villages_within(&location).await?;
            current
                .anchor_village_id
                .filter(|v| villages.contains(v))
                .or_else(|| villages.into_iter().next())
                .ok_or_else(|| {
                    JurisdictionError::not_found("Village", format!("under {}", location.id))
                })?
        };

        let updated = self
            .users
            .update_assignment(
                current.id,
                AssignmentState::from(&current),
                LeaderAssignment {
                    role: input.role,
                    anchor_village_id: anchor,
                    assigned_by_id: actor.id,
                },
            )
            .await?;

        self.audit_store
            .log_event(AuditEventInput {
                action: AuditAction::LeaderAssigned,
                actor_id: actor.id,
                subject_user_id: Some(updated.id),
                location_id: Some(location.id),
                role: Some(input.role),
                before_state: Some(serde_json::to_value(&current).unwrap_or_default()),
                after_state: Some(serde_json::to_value(&updated).unwrap_or_default()),
                metadata: Some(serde_json::json!({"anchor_village_id": anchor.to_string()})),
            })
            .await?;

        info!(
            target: "jurisdiction",
            actor_id = %actor.id,
            user_id = %updated.id,
            role = %input.role,
            location_id = %location.id,
            anchor_village_id = %anchor,
            "Leader assigned"
        );

        Ok(updated)
    }
}
