//! Test fixtures factory for integration tests.
//!
//! Builds a small two-province hierarchy through the engine and creates
//! users against it with predictable names.

use std::collections::HashMap;

use civic_jurisdiction::{
    CreateLocationInput, CreateTicketInput, CreateUserInput, LocationId, LocationLevel,
    LocationNode, RegisterCitizenInput, Role, Ticket, TicketPriority, User,
};
use uuid::Uuid;

use super::TestContext;

/// Layout, as `(name, level, parent name)`.
///
/// ```text
/// north                      south
/// └── north-d                └── south-d
///     └── north-s                └── south-s
///         ├── north-c1               └── south-c
///         │   ├── north-v1a              └── south-v
///         │   └── north-v1b
///         └── north-c2
///             └── north-v2
/// ```
const LAYOUT: [(&str, LocationLevel, Option<&str>); 13] = [
    ("north", LocationLevel::Province, None),
    ("north-d", LocationLevel::District, Some("north")),
    ("north-s", LocationLevel::Sector, Some("north-d")),
    ("north-c1", LocationLevel::Cell, Some("north-s")),
    ("north-v1a", LocationLevel::Village, Some("north-c1")),
    ("north-v1b", LocationLevel::Village, Some("north-c1")),
    ("north-c2", LocationLevel::Cell, Some("north-s")),
    ("north-v2", LocationLevel::Village, Some("north-c2")),
    ("south", LocationLevel::Province, None),
    ("south-d", LocationLevel::District, Some("south")),
    ("south-s", LocationLevel::Sector, Some("south-d")),
    ("south-c", LocationLevel::Cell, Some("south-s")),
    ("south-v", LocationLevel::Village, Some("south-c")),
];

/// Created hierarchy nodes by name.
#[derive(Debug, Default)]
pub struct TestHierarchy {
    pub nodes: HashMap<&'static str, LocationNode>,
}

impl TestHierarchy {
    /// Build the full layout as the administrator.
    pub async fn build(ctx: &TestContext) -> Self {
        let mut hierarchy = Self::default();
        for (name, level, parent) in LAYOUT {
            let parent_id = parent.map(|p| hierarchy.id(p));
            let node = ctx
                .engine
                .create_location(
                    &ctx.admin,
                    CreateLocationInput {
                        level,
                        name: name.to_string(),
                        parent_id,
                    },
                )
                .await
                .unwrap_or_else(|e| panic!("Failed to create location '{name}': {e}"));
            hierarchy.nodes.insert(name, node);
        }
        hierarchy
    }

    /// Get a node by name, panics if not found.
    pub fn node(&self, name: &str) -> &LocationNode {
        self.nodes
            .get(name)
            .unwrap_or_else(|| panic!("Location '{name}' not found in fixtures"))
    }

    /// Get a node id by name, panics if not found.
    pub fn id(&self, name: &str) -> LocationId {
        self.node(name).id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

fn unique_email(name: &str) -> String {
    format!(
        "{}.{}@civic.test",
        name.to_lowercase().replace(' ', "."),
        Uuid::new_v4().simple()
    )
}

/// Self-register a citizen in `village`.
pub async fn citizen(ctx: &TestContext, name: &str, village: LocationId) -> User {
    ctx.engine
        .register_citizen(RegisterCitizenInput {
            name: name.to_string(),
            email: unique_email(name),
            contact: None,
            village_id: village,
        })
        .await
        .unwrap_or_else(|e| panic!("Failed to register citizen '{name}': {e}"))
}

/// Create an official as the administrator, anchored in `village`.
///
/// Leader roles take the seat at the village's ancestor for the role's level.
pub async fn official(ctx: &TestContext, name: &str, role: Role, village: LocationId) -> User {
    ctx.engine
        .create_user(
            &ctx.admin,
            CreateUserInput {
                name: name.to_string(),
                email: unique_email(name),
                contact: None,
                village_id: village,
                role: Some(role),
            },
        )
        .await
        .unwrap_or_else(|e| panic!("Failed to create official '{name}': {e}"))
}

/// Create a ticket as `citizen` in their own village.
pub async fn ticket(ctx: &TestContext, citizen: &User, title: &str, description: &str) -> Ticket {
    let actor = ctx.actor(citizen).await;
    let village_id = citizen
        .anchor_village_id
        .expect("citizens are anchored to a village");
    ctx.engine
        .create_ticket(
            &actor,
            CreateTicketInput {
                title: title.to_string(),
                description: description.to_string(),
                village_id,
                priority: Some(TicketPriority::Medium),
            },
        )
        .await
        .unwrap_or_else(|e| panic!("Failed to create ticket '{title}': {e}"))
}
