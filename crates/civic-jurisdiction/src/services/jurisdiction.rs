//! Jurisdiction resolution.
//!
//! One ancestor-chain walk and one containment test serve every call site:
//! leader assignment, location creation, ticket permissions and scoping.
//!
//! # Example
//!
//! ```ignore
//! use civic_jurisdiction::services::jurisdiction::{JurisdictionResolver, Target};
//!
//! let resolver = JurisdictionResolver::new(location_store, &config);
//! let chain = resolver.ancestor_chain(&actor).await?;
//! if resolver.contains(&actor, Target::Ticket(&ticket)).await? {
//!     // actor may act on the ticket
//! }
//! ```

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use civic_core::{LocationId, VillageAnchored};
use moka::future::Cache;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{JurisdictionError, Result};
use crate::services::location::{LocationNode, LocationStore};
use crate::services::ticket::Ticket;
use crate::services::user::{Actor, User};
use crate::types::{LocationLevel, Role};

/// Ids of a location and all of its ancestors, one slot per level.
///
/// All slots empty means "unconstrained" (administrators).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AncestorChain {
    pub province_id: Option<LocationId>,
    pub district_id: Option<LocationId>,
    pub sector_id: Option<LocationId>,
    pub cell_id: Option<LocationId>,
    pub village_id: Option<LocationId>,
}

impl AncestorChain {
    /// The id recorded at `level`.
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

    fn set(&mut self, level: LocationLevel, id: LocationId) {
        let slot = match level {
            LocationLevel::Province => &mut self.province_id,
            LocationLevel::District => &mut self.district_id,
            LocationLevel::Sector => &mut self.sector_id,
            LocationLevel::Cell => &mut self.cell_id,
            LocationLevel::Village => &mut self.village_id,
        };
        *slot = Some(id);
    }

    /// Whether every level is populated.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        LocationLevel::ALL.iter().all(|l| self.at(*l).is_some())
    }

    /// Whether no level is populated.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        LocationLevel::ALL.iter().all(|l| self.at(*l).is_none())
    }
}

/// Something whose position in the hierarchy can be tested.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Location(&'a LocationNode),
    User(&'a User),
    Ticket(&'a Ticket),
}

/// Cache of resolved location chains.
///
/// Nodes never move, so entries never go stale.
pub struct ChainCache {
    cache: Cache<LocationId, AncestorChain>,
}

impl ChainCache {
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    pub async fn get(&self, id: LocationId) -> Option<AncestorChain> {
        self.cache.get(&id).await
    }

    pub async fn insert(&self, id: LocationId, chain: AncestorChain) {
        self.cache.insert(id, chain).await;
    }
}

/// Resolves ancestor chains and answers containment questions.
pub struct JurisdictionResolver {
    locations: Arc<dyn LocationStore>,
    chains: ChainCache,
}

impl JurisdictionResolver {
    pub fn new(locations: Arc<dyn LocationStore>, config: &EngineConfig) -> Self {
        Self {
            locations,
            chains: ChainCache::new(config.chain_cache_capacity),
        }
    }

    /// Chain of a location node: itself plus every ancestor.
    ///
    /// `None` when the node does not exist. A parent that is missing or sits
    /// at the wrong level is an error, never a partial chain.
    pub async fn resolve_chain(&self, location_id: LocationId) -> Result<Option<AncestorChain>> {
        if let Some(chain) = self.chains.get(location_id).await {
            return Ok(Some(chain));
        }

        let Some(start) = self.locations.get(location_id).await? else {
            return Ok(None);
        };

        let mut chain = AncestorChain::default();
        chain.set(start.level, start.id);

        let mut current = start;
        while let Some(parent_id) = current.parent_id {
            let expected = current
                .level
                .parent_level()
                .ok_or(JurisdictionError::DanglingLocation(current.id))?;
            let parent = self
                .locations
                .get(parent_id)
                .await?
                .filter(|p| p.level == expected)
                .ok_or(JurisdictionError::DanglingLocation(current.id))?;
            chain.set(parent.level, parent.id);
            current = parent;
        }
        if current.level != LocationLevel::Province {
            return Err(JurisdictionError::DanglingLocation(current.id));
        }

        self.chains.insert(location_id, chain).await;
        Ok(Some(chain))
    }

    /// The actor's own chain. Administrators are unconstrained; everyone
    /// else resolves from their anchor village and gets every level filled.
    pub async fn ancestor_chain(&self, actor: &Actor) -> Result<AncestorChain> {
        if actor.role == Role::Admin {
            return Ok(AncestorChain::default());
        }

        let anchor = actor
            .anchor_village()
            .ok_or(JurisdictionError::MissingAnchor(actor.id))?;
        let chain = self
            .resolve_chain(anchor)
            .await?
            .ok_or(JurisdictionError::DanglingLocation(anchor))?;

        // The anchor has to be a village for the walk to reach every level.
        if chain.village_id != Some(anchor) || !chain.is_complete() {
            return Err(JurisdictionError::DanglingLocation(anchor));
        }
        Ok(chain)
    }

    /// Chain of a target: the node itself, or the village it hangs off.
    ///
    /// `None` for unanchored users and nodes absent from the store.
    pub async fn target_chain(&self, target: Target<'_>) -> Result<Option<AncestorChain>> {
        let anchor = match target {
            Target::Location(node) => return self.resolve_chain(node.id).await,
            Target::User(user) => user.anchor_village(),
            Target::Ticket(ticket) => ticket.anchor_village(),
        };
        let Some(village) = anchor else {
            return Ok(None);
        };
        self.resolve_chain(village)
            .await?
            .map(Some)
            .ok_or(JurisdictionError::DanglingLocation(village))
    }

    /// Whether `target` lies inside the actor's jurisdiction.
    pub async fn contains(&self, actor: &Actor, target: Target<'_>) -> Result<bool> {
        let level = match actor.role {
            Role::Admin => return Ok(true),
            Role::Citizen => return Ok(false),
            leader => leader.level(),
        };
        let Some(level) = level else {
            return Ok(false);
        };

        let own = self.ancestor_chain(actor).await?;
        let Some(theirs) = self.target_chain(target).await? else {
            return Ok(false);
        };

        Ok(matches!((own.at(level), theirs.at(level)), (Some(a), Some(b)) if a == b))
    }

    /// Every village in the subtree rooted at `node`, in id order.
    pub async fn villages_within(&self, node: &LocationNode) -> Result<BTreeSet<LocationId>> {
        let mut villages = BTreeSet::new();
        let mut frontier = VecDeque::from([node.clone()]);

        while let Some(current) = frontier.pop_front() {
            if current.level == LocationLevel::Village {
                villages.insert(current.id);
                continue;
            }
            let expected = current.level.child_level();
            for child in self.locations.children(current.id).await? {
                if Some(child.level) == expected {
                    frontier.push_back(child);
                }
            }
        }

        Ok(villages)
    }

    /// Every village under the node with `location_id`; empty if unknown.
    pub async fn villages_within_id(&self, location_id: LocationId) -> Result<BTreeSet<LocationId>> {
        match self.locations.get(location_id).await? {
            Some(node) => self.villages_within(&node).await,
            None => Ok(BTreeSet::new()),
        }
    }

    /// Every village in the hierarchy.
    pub async fn all_villages(&self) -> Result<BTreeSet<LocationId>> {
        Ok(self
            .locations
            .find_matching(crate::services::location::LocationQuery {
                level: Some(LocationLevel::Village),
                parent_id: None,
            })
            .await?
            .into_iter()
            .map(|n| n.id)
            .collect())
    }
}
