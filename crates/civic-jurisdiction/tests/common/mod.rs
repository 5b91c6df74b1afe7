//! Common test utilities for civic-jurisdiction integration tests.
//!
//! All tests run against in-memory stores wired through a single
//! [`JurisdictionEngine`], so each test owns an isolated world.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::{Arc, Once};

use chrono::Utc;
use civic_jurisdiction::audit::InMemoryAuditStore;
use civic_jurisdiction::classifier::KeywordClassifier;
use civic_jurisdiction::services::location::InMemoryLocationStore;
use civic_jurisdiction::services::ticket::{InMemoryCommentStore, InMemoryTicketStore};
use civic_jurisdiction::services::user::InMemoryUserStore;
use civic_jurisdiction::{
    Actor, Capabilities, EngineConfig, EngineStores, JurisdictionEngine, Role, User, UserId,
};

static INIT_LOGGING: Once = Once::new();

/// Install a test-writer subscriber when `RUST_LOG` is set.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .try_init()
                .ok();
        }
    });
}

/// Concrete in-memory stores, kept so tests can inspect them directly.
#[derive(Clone)]
pub struct TestStores {
    pub location_store: Arc<InMemoryLocationStore>,
    pub user_store: Arc<InMemoryUserStore>,
    pub ticket_store: Arc<InMemoryTicketStore>,
    pub comment_store: Arc<InMemoryCommentStore>,
    pub audit_store: Arc<InMemoryAuditStore>,
}

impl TestStores {
    /// Create a new set of isolated test stores.
    pub fn new() -> Self {
        Self {
            location_store: Arc::new(InMemoryLocationStore::new()),
            user_store: Arc::new(InMemoryUserStore::new()),
            ticket_store: Arc::new(InMemoryTicketStore::new()),
            comment_store: Arc::new(InMemoryCommentStore::new()),
            audit_store: Arc::new(InMemoryAuditStore::new()),
        }
    }

    /// Trait-object handles for the engine.
    pub fn engine_stores(&self) -> EngineStores {
        EngineStores {
            locations: self.location_store.clone(),
            users: self.user_store.clone(),
            tickets: self.ticket_store.clone(),
            comments: self.comment_store.clone(),
            audit: self.audit_store.clone(),
        }
    }
}

impl Default for TestStores {
    fn default() -> Self {
        Self::new()
    }
}

/// Test context containing stores, the engine and a seeded administrator.
pub struct TestContext {
    pub stores: TestStores,
    pub engine: Arc<JurisdictionEngine>,
    pub admin: Actor,
}

impl TestContext {
    /// Engine with no classifier or summarizer.
    pub async fn new() -> Self {
        Self::with_capabilities(Capabilities::default()).await
    }

    /// Engine that categorizes tickets by keyword.
    pub async fn with_keyword_classifier() -> Self {
        Self::with_capabilities(Capabilities {
            classifier: Arc::new(KeywordClassifier::new()),
            ..Capabilities::default()
        })
        .await
    }

    pub async fn with_capabilities(capabilities: Capabilities) -> Self {
        init_test_logging();
        let stores = TestStores::new();
        let engine = Arc::new(JurisdictionEngine::new(
            stores.engine_stores(),
            capabilities,
            EngineConfig::default(),
        ));

        let now = Utc::now();
        let admin = User {
            id: UserId::new(),
            name: "Root Administrator".to_string(),
            email: "root@civic.test".to_string(),
            contact: None,
            role: Role::Admin,
            anchor_village_id: None,
            assigned_by_id: None,
            created_at: now,
            updated_at: now,
        };
        stores.user_store.seed(admin.clone()).await;

        Self {
            stores,
            engine,
            admin: Actor::from(&admin),
        }
    }

    /// Resolve a stored user as the caller.
    pub async fn actor(&self, user: &User) -> Actor {
        self.engine
            .authenticate(Some(user.id))
            .await
            .expect("user should authenticate")
    }
}
