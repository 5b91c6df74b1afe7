//! Integration tests for jurisdiction boundaries.
//!
//! These tests verify that containment, assignment and listings never reach
//! past the subtree an official presides over.

mod common;

use std::collections::BTreeSet;

use civic_jurisdiction::{
    AssignLeaderInput, DrillDown, ErrorKind, LocationLevel, Page, Role, ScopeResource, Target,
    TicketFilter, TicketId, TicketOperation,
};

use common::fixtures::{citizen, official, ticket, TestHierarchy};
use common::TestContext;

// ============================================================================
// Containment
// ============================================================================

/// A leader contains exactly the nodes sharing its ancestor at its level.
#[tokio::test]
async fn test_containment_matches_ancestor_at_role_level() {
    let ctx = TestContext::new().await;
    let h = TestHierarchy::build(&ctx).await;
    let anchor = h.id("north-v1a");
    let resolver = ctx.engine.resolver();
    let anchor_chain = resolver.resolve_chain(anchor).await.unwrap().unwrap();

    for role in [
        Role::Governor,
        Role::Mayor,
        Role::SectorExec,
        Role::CellExec,
        Role::Chairman,
    ] {
        let leader = official(&ctx, &format!("{role} north"), role, anchor).await;
        let actor = ctx.actor(&leader).await;
        let level = role.level().unwrap();

        for (name, node) in &h.nodes {
            let chain = resolver.resolve_chain(node.id).await.unwrap().unwrap();
            let expected = chain.at(level).is_some() && chain.at(level) == anchor_chain.at(level);
            let actual = ctx
                .engine
                .check_containment(&actor, Target::Location(node))
                .await
                .unwrap();
            assert_eq!(actual, expected, "{role} containment of {name}");
        }
    }
}

/// Administrators contain everything; citizens contain nothing.
#[tokio::test]
async fn test_admin_and_citizen_containment_extremes() {
    let ctx = TestContext::new().await;
    let h = TestHierarchy::build(&ctx).await;
    let resident = citizen(&ctx, "Resident", h.id("north-v1a")).await;
    let resident_actor = ctx.actor(&resident).await;

    for node in h.nodes.values() {
        assert!(ctx
            .engine
            .check_containment(&ctx.admin, Target::Location(node))
            .await
            .unwrap());
        assert!(!ctx
            .engine
            .check_containment(&resident_actor, Target::Location(node))
            .await
            .unwrap());
    }
}

/// Users and tickets are contained through their village.
#[tokio::test]
async fn test_users_and_tickets_contained_through_village() {
    let ctx = TestContext::new().await;
    let h = TestHierarchy::build(&ctx).await;
    let exec = official(&ctx, "Cell Exec", Role::CellExec, h.id("north-v1a")).await;
    let exec = ctx.actor(&exec).await;

    let inside = citizen(&ctx, "Inside", h.id("north-v1b")).await;
    let outside = citizen(&ctx, "Outside", h.id("north-v2")).await;
    let inside_ticket = ticket(&ctx, &inside, "Broken tap", "No water since Monday").await;
    let outside_ticket = ticket(&ctx, &outside, "Pothole", "Deep pothole on the road").await;

    let engine = &ctx.engine;
    assert!(engine.check_containment(&exec, Target::User(&inside)).await.unwrap());
    assert!(!engine.check_containment(&exec, Target::User(&outside)).await.unwrap());
    assert!(engine
        .check_containment(&exec, Target::Ticket(&inside_ticket))
        .await
        .unwrap());
    assert!(!engine
        .check_containment(&exec, Target::Ticket(&outside_ticket))
        .await
        .unwrap());
}

/// Resolution of a leader's jurisdiction fills every level.
#[tokio::test]
async fn test_resolve_jurisdiction() {
    let ctx = TestContext::new().await;
    let h = TestHierarchy::build(&ctx).await;
    let mayor = official(&ctx, "Mayor", Role::Mayor, h.id("south-v")).await;
    let actor = ctx.actor(&mayor).await;

    let chain = ctx.engine.resolve_jurisdiction(&actor).await.unwrap();
    assert!(chain.is_complete());
    assert_eq!(chain.at(LocationLevel::Province), Some(h.id("south")));
    assert_eq!(chain.at(LocationLevel::District), Some(h.id("south-d")));

    let admin_chain = ctx.engine.resolve_jurisdiction(&ctx.admin).await.unwrap();
    assert!(admin_chain.is_unconstrained());
}

// ============================================================================
// Cross-boundary operations
// ============================================================================

/// A governor cannot seat a mayor in another province.
#[tokio::test]
async fn test_governor_cannot_assign_mayor_in_other_province() {
    let ctx = TestContext::new().await;
    let h = TestHierarchy::build(&ctx).await;
    let governor = official(&ctx, "North Governor", Role::Governor, h.id("north-v1a")).await;
    let governor = ctx.actor(&governor).await;
    let candidate = citizen(&ctx, "South Candidate", h.id("south-v")).await;

    let err = ctx
        .engine
        .assign_leader(
            &governor,
            AssignLeaderInput {
                user_id: candidate.id,
                role: Role::Mayor,
                location_id: h.id("south-d"),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let unchanged = ctx.engine.get_user(candidate.id).await.unwrap();
    assert_eq!(unchanged.role, Role::Citizen);
    assert!(ctx
        .engine
        .current_leader(Role::Mayor, h.id("south-d"))
        .await
        .unwrap()
        .is_none());

    // Inside the governor's own province the same call succeeds.
    let local = citizen(&ctx, "North Candidate", h.id("north-v2")).await;
    let mayor = ctx
        .engine
        .assign_leader(
            &governor,
            AssignLeaderInput {
                user_id: local.id,
                role: Role::Mayor,
                location_id: h.id("north-d"),
            },
        )
        .await
        .unwrap();
    assert_eq!(mayor.role, Role::Mayor);
    assert_eq!(mayor.assigned_by_id, Some(governor.id));
}

/// A cell executive cannot touch a ticket from another cell, while the
/// ticket's owner can still read it.
#[tokio::test]
async fn test_cell_exec_outside_ticket_cell_is_forbidden() {
    let ctx = TestContext::new().await;
    let h = TestHierarchy::build(&ctx).await;
    let owner = citizen(&ctx, "Owner", h.id("north-v1a")).await;
    let filed = ticket(&ctx, &owner, "Garbage", "Garbage not collected").await;

    let other_cell = official(&ctx, "Other Cell Exec", Role::CellExec, h.id("north-v2")).await;
    let other_cell = ctx.actor(&other_cell).await;

    for op in [
        TicketOperation::Read,
        TicketOperation::Comment,
        TicketOperation::UpdateStatus,
    ] {
        let err = ctx
            .engine
            .check_ticket_permission(&other_cell, filed.id, op)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden, "{op}");
    }
    let perms = ctx
        .engine
        .ticket_permissions(&other_cell, filed.id)
        .await
        .unwrap();
    assert!(!perms.can_read && !perms.can_comment && !perms.can_update_status);

    let owner_actor = ctx.actor(&owner).await;
    let detail = ctx.engine.get_ticket(&owner_actor, filed.id).await.unwrap();
    assert_eq!(detail.ticket.id, filed.id);
    assert!(detail.permissions.can_read);
    assert!(detail.permissions.can_comment);
    assert!(!detail.permissions.can_update_status);

    let own_cell = official(&ctx, "Own Cell Exec", Role::CellExec, h.id("north-v1b")).await;
    let own_cell = ctx.actor(&own_cell).await;
    ctx.engine
        .check_ticket_permission(&own_cell, filed.id, TicketOperation::UpdateStatus)
        .await
        .unwrap();
}

/// Unknown tickets report NotFound before any jurisdiction check.
#[tokio::test]
async fn test_unknown_ticket_is_not_found() {
    let ctx = TestContext::new().await;
    let h = TestHierarchy::build(&ctx).await;
    let resident = citizen(&ctx, "Resident", h.id("south-v")).await;
    let resident = ctx.actor(&resident).await;

    let err = ctx
        .engine
        .check_ticket_permission(&resident, TicketId::new(), TicketOperation::Read)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ============================================================================
// Scope monotonicity
// ============================================================================

async fn visible_tickets(
    ctx: &TestContext,
    actor: &civic_jurisdiction::Actor,
) -> BTreeSet<TicketId> {
    let page = ctx
        .engine
        .list_tickets(
            actor,
            TicketFilter::default(),
            &DrillDown::default(),
            Page::new(1, 100),
        )
        .await
        .unwrap();
    page.items.into_iter().map(|t| t.id).collect()
}

/// Each level down the same chain sees a subset of the level above.
#[tokio::test]
async fn test_scope_narrows_down_the_chain() {
    let ctx = TestContext::new().await;
    let h = TestHierarchy::build(&ctx).await;

    for village in ["north-v1a", "north-v1b", "north-v2", "south-v"] {
        let resident = citizen(&ctx, &format!("Resident {village}"), h.id(village)).await;
        ticket(&ctx, &resident, "Streetlight", "Streetlight is out").await;
    }

    let mut previous = visible_tickets(&ctx, &ctx.admin).await;
    assert_eq!(previous.len(), 4);

    let expected_sizes = [3, 3, 3, 2, 1];
    for (role, expected) in [
        Role::Governor,
        Role::Mayor,
        Role::SectorExec,
        Role::CellExec,
        Role::Chairman,
    ]
    .into_iter()
    .zip(expected_sizes)
    {
        let leader = official(&ctx, &format!("{role}"), role, h.id("north-v1a")).await;
        let actor = ctx.actor(&leader).await;
        let visible = visible_tickets(&ctx, &actor).await;
        assert_eq!(visible.len(), expected, "{role}");
        assert!(visible.is_subset(&previous), "{role} sees beyond its parent");
        previous = visible;
    }
}

/// Drill-downs above a leader's own level do not widen the scope.
#[tokio::test]
async fn test_drill_down_never_widens_scope() {
    let ctx = TestContext::new().await;
    let h = TestHierarchy::build(&ctx).await;
    let exec = official(&ctx, "Cell Exec", Role::CellExec, h.id("north-v1a")).await;
    let exec = ctx.actor(&exec).await;

    let wide = ctx
        .engine
        .build_scope(
            &exec,
            ScopeResource::Tickets,
            &DrillDown::at_level(LocationLevel::Province, h.id("south")),
        )
        .await
        .unwrap();
    let own = ctx
        .engine
        .build_scope(&exec, ScopeResource::Tickets, &DrillDown::default())
        .await
        .unwrap();
    assert_eq!(wide, own);

    let narrow = ctx
        .engine
        .build_scope(
            &exec,
            ScopeResource::Tickets,
            &DrillDown::at_level(LocationLevel::Village, h.id("north-v1b")),
        )
        .await
        .unwrap();
    assert_eq!(
        narrow.deepest().map(|c| c.location_id),
        Some(h.id("north-v1b"))
    );
}

/// Citizens cannot list users.
#[tokio::test]
async fn test_citizen_user_listing_is_forbidden() {
    let ctx = TestContext::new().await;
    let h = TestHierarchy::build(&ctx).await;
    let resident = citizen(&ctx, "Resident", h.id("north-v1a")).await;
    let resident = ctx.actor(&resident).await;

    let err = ctx
        .engine
        .list_users(&resident, None, &DrillDown::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

/// A sector executive lists only the users under its sector.
#[tokio::test]
async fn test_user_listing_respects_jurisdiction() {
    let ctx = TestContext::new().await;
    let h = TestHierarchy::build(&ctx).await;
    let exec = official(&ctx, "Sector Exec", Role::SectorExec, h.id("north-v1a")).await;
    citizen(&ctx, "North Resident", h.id("north-v2")).await;
    citizen(&ctx, "South Resident", h.id("south-v")).await;

    let actor = ctx.actor(&exec).await;
    let users = ctx
        .engine
        .list_users(&actor, None, &DrillDown::default())
        .await
        .unwrap();
    let names: Vec<_> = users.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["Sector Exec", "North Resident"]);

    let citizens = ctx
        .engine
        .list_users(&actor, Some(Role::Citizen), &DrillDown::default())
        .await
        .unwrap();
    assert_eq!(citizens.len(), 1);
}
