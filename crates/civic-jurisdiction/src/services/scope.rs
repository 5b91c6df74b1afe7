//! Scoped query construction.
//!
//! Turns (actor, optional drill-down) into an immutable [`ScopePredicate`]
//! that user listings, ticket listings and analytics all evaluate the same
//! way.

use std::collections::BTreeSet;
use std::sync::Arc;

use civic_core::{LocationId, UserId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{JurisdictionError, Result};
use crate::services::jurisdiction::{AncestorChain, JurisdictionResolver};
use crate::services::user::Actor;
use crate::types::{LocationLevel, Role};

/// Optional narrowing filters supplied by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillDown {
    pub province_id: Option<LocationId>,
    pub district_id: Option<LocationId>,
    pub sector_id: Option<LocationId>,
    pub cell_id: Option<LocationId>,
    pub village_id: Option<LocationId>,
}

impl DrillDown {
    /// Narrow to a single node at `level`.
    #[must_use]
    pub fn at_level(level: LocationLevel, id: LocationId) -> Self {
        let mut drill = Self::default();
        match level {
            LocationLevel::Province => drill.province_id = Some(id),
            LocationLevel::District => drill.district_id = Some(id),
            LocationLevel::Sector => drill.sector_id = Some(id),
            LocationLevel::Cell => drill.cell_id = Some(id),
            LocationLevel::Village => drill.village_id = Some(id),
        }
        drill
    }

    #[must_use]
    pub fn at(&self, level: LocationLevel) -> Option<LocationId> {
        match level {
            LocationLevel::Province => self.province_id,
            LocationLevel::District => self.district_id,
            LocationLevel::Sector => self.sector_id,
            LocationLevel::Cell => self.cell_id,
            LocationLevel::Village => self.village_id,
        }
    }

    /// The most specific filter present: village first, province last.
    #[must_use]
    pub fn most_specific(&self) -> Option<(LocationLevel, LocationId)> {
        LocationLevel::ALL
            .iter()
            .rev()
            .find_map(|level| self.at(*level).map(|id| (*level, id)))
    }
}

/// What a scope is being built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeResource {
    Users,
    Tickets,
    Analytics,
}

/// Equality on the id at one hierarchy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationConstraint {
    pub level: LocationLevel,
    pub location_id: LocationId,
}

/// Canonical filter over anchored records.
///
/// Empty means "everything". Values are built once and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopePredicate {
    /// Restrict to records owned by this citizen.
    pub owner: Option<UserId>,
    /// Every constraint must hold (AND).
    pub constraints: Vec<LocationConstraint>,
}

impl ScopePredicate {
    #[must_use]
    pub fn unconstrained() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_owner(self, owner: UserId) -> Self {
        Self {
            owner: Some(owner),
            ..self
        }
    }

    #[must_use]
    pub fn with_constraint(mut self, level: LocationLevel, location_id: LocationId) -> Self {
        self.constraints.push(LocationConstraint { level, location_id });
        self
    }

    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.owner.is_none() && self.constraints.is_empty()
    }

    /// Whether a location chain satisfies every constraint.
    #[must_use]
    pub fn matches_chain(&self, chain: &AncestorChain) -> bool {
        self.constraints
            .iter()
            .all(|c| chain.at(c.level) == Some(c.location_id))
    }

    /// The constraint at the lowest level.
    #[must_use]
    pub fn deepest(&self) -> Option<&LocationConstraint> {
        self.constraints.iter().max_by_key(|c| c.level.depth())
    }
}

/// Set of villages a store query is restricted to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VillageSelector {
    #[default]
    Any,
    Only(BTreeSet<LocationId>),
}

impl VillageSelector {
    /// Whether a record anchored at `village` is selected. Unanchored
    /// records only pass `Any`.
    #[must_use]
    pub fn admits(&self, village: Option<LocationId>) -> bool {
        match self {
            Self::Any => true,
            Self::Only(set) => village.is_some_and(|v| set.contains(&v)),
        }
    }
}

/// Builds scope predicates for actors.
pub struct ScopeBuilder {
    resolver: Arc<JurisdictionResolver>,
}

impl ScopeBuilder {
    pub fn new(resolver: Arc<JurisdictionResolver>) -> Self {
        Self { resolver }
    }

    /// Predicate limiting `resource` to what `actor` may see.
    pub async fn build(
        &self,
        actor: &Actor,
        resource: ScopeResource,
        drill: &DrillDown,
    ) -> Result<ScopePredicate> {
        let predicate = match actor.role {
            Role::Citizen => match resource {
                ScopeResource::Tickets => ScopePredicate::unconstrained().with_owner(actor.id),
                ScopeResource::Users | ScopeResource::Analytics => {
                    return Err(JurisdictionError::forbidden(
                        "citizens cannot list users or view analytics",
                    ));
                }
            },
            Role::Admin => match drill.most_specific() {
                Some((level, id)) => ScopePredicate::unconstrained().with_constraint(level, id),
                None => ScopePredicate::unconstrained(),
            },
            leader => {
                let own_level = leader
                    .level()
                    .ok_or_else(|| JurisdictionError::Store(format!("{leader} has no level")))?;
                let chain = self.resolver.ancestor_chain(actor).await?;
                let own_id = chain
                    .at(own_level)
                    .ok_or(JurisdictionError::MissingAnchor(actor.id))?;

                let mut predicate = ScopePredicate::unconstrained().with_constraint(own_level, own_id);
                for level in LocationLevel::ALL {
                    let Some(id) = drill.at(level) else {
                        continue;
                    };
                    if level.depth() > own_level.depth() {
                        predicate = predicate.with_constraint(level, id);
                    } else {
                        debug!(
                            target: "jurisdiction",
                            actor_id = %actor.id,
                            level = %level,
                            "Ignoring drill-down at or above the actor's level"
                        );
                    }
                }
                predicate
            }
        };

        debug!(
            target: "jurisdiction",
            actor_id = %actor.id,
            role = %actor.role,
            constraints = predicate.constraints.len(),
            owner_only = predicate.owner.is_some(),
            "Scope built"
        );
        Ok(predicate)
    }

    /// Villages a predicate admits.
    pub async fn villages_for(&self, predicate: &ScopePredicate) -> Result<VillageSelector> {
        let Some(deepest) = predicate.deepest() else {
            return Ok(VillageSelector::Any);
        };

        let candidates = self.resolver.villages_within_id(deepest.location_id).await?;
        let mut admitted = BTreeSet::new();
        for village in candidates {
            if let Some(chain) = self.resolver.resolve_chain(village).await? {
                if predicate.matches_chain(&chain) {
                    admitted.insert(village);
                }
            }
        }
        Ok(VillageSelector::Only(admitted))
    }
}
