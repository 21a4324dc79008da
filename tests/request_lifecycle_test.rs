//! End-to-end coverage of the bulk request lifecycle: composition with the
//! silent line filter, scoped retrieval, password-gated status transitions
//! and deletion, and list/summary consistency.

mod common;

use assert_matches::assert_matches;
use common::TestCtx;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use uuid::Uuid;

use requisition_api::{
    entities::{request, request_item, RequestStatus},
    errors::ServiceError,
    services::requests::{LineItemDraft, RequestFilter},
};

fn catalog_line(item_id: Uuid, unit_type: &str, quantity: i32) -> LineItemDraft {
    LineItemDraft {
        item_id: Some(item_id),
        custom_name: None,
        unit_type: unit_type.into(),
        quantity,
        price_per_unit: dec!(250.00),
    }
}

fn custom_line(name: &str, unit_type: &str, quantity: i32) -> LineItemDraft {
    LineItemDraft {
        item_id: None,
        custom_name: Some(name.into()),
        unit_type: unit_type.into(),
        quantity,
        price_per_unit: dec!(99.50),
    }
}

#[tokio::test]
async fn create_request_persists_request_and_surviving_lines() {
    let ctx = TestCtx::new().await;
    let office = ctx.seed_office("Registrar").await;
    let head = ctx.seed_office_head(office, "registrar_head", "secret123").await;
    let item = ctx.seed_item("Bond Paper A4", dec!(250.00)).await;

    let drafts = vec![
        catalog_line(item, "reams", 5),
        custom_line("Desk nameplate", "pcs", 2),
        // These two fail the validity filter and are dropped silently.
        catalog_line(item, "", 3),
        custom_line("Ghost line", "boxes", 0),
    ];

    let id = ctx
        .services
        .requests
        .create_request(&head, drafts)
        .await
        .expect("request created");

    let stored = request::Entity::find_by_id(id)
        .one(&*ctx.db)
        .await
        .unwrap()
        .expect("request row");
    assert_eq!(stored.status, RequestStatus::Pending);
    assert_eq!(stored.office_id, office);
    assert_eq!(stored.user_id, head.user_id);

    let lines = ctx
        .services
        .requests
        .list_request_items(&head, id)
        .await
        .unwrap();
    assert_eq!(lines.len(), 2);
    // Ordered by display name: "Bond Paper A4" before "Desk nameplate".
    assert_eq!(lines[0].display_name, "Bond Paper A4");
    assert_eq!(lines[0].line_total, dec!(1250.00));
    assert_eq!(lines[1].display_name, "Desk nameplate");
    assert_eq!(lines[1].line_total, dec!(199.00));
}

#[tokio::test]
async fn create_request_rejects_empty_and_fully_invalid_drafts() {
    let ctx = TestCtx::new().await;
    let office = ctx.seed_office("Accounting").await;
    let head = ctx.seed_office_head(office, "acct_head", "secret123").await;

    let err = ctx.services.requests.create_request(&head, vec![]).await;
    assert_matches!(err, Err(ServiceError::EmptyRequest));

    let err = ctx
        .services
        .requests
        .create_request(&head, vec![custom_line("Nothing", "", 1), custom_line("Nope", "pcs", 0)])
        .await;
    assert_matches!(err, Err(ServiceError::EmptyRequest));

    // Nothing was persisted by either attempt.
    let total = request::Entity::find().all(&*ctx.db).await.unwrap().len();
    assert_eq!(total, 0);
    let lines = request_item::Entity::find().all(&*ctx.db).await.unwrap().len();
    assert_eq!(lines, 0);
}

#[tokio::test]
async fn status_update_requires_correct_password_and_mutates_nothing_otherwise() {
    let ctx = TestCtx::new().await;
    let office = ctx.seed_office("Library").await;
    let head = ctx.seed_office_head(office, "lib_head", "secret123").await;
    let admin = ctx.seed_admin("admin", "admin-pass").await;

    let id = ctx
        .services
        .requests
        .create_request(&head, vec![custom_line("Shelf labels", "packs", 4)])
        .await
        .unwrap();

    let err = ctx
        .services
        .requests
        .update_status(&admin, id, RequestStatus::Approved, "wrong-pass")
        .await;
    assert_matches!(err, Err(ServiceError::InvalidCredentials));

    let unchanged = request::Entity::find_by_id(id).one(&*ctx.db).await.unwrap().unwrap();
    assert_eq!(unchanged.status, RequestStatus::Pending);

    ctx.services
        .requests
        .update_status(&admin, id, RequestStatus::Approved, "admin-pass")
        .await
        .expect("status update");

    let updated = request::Entity::find_by_id(id).one(&*ctx.db).await.unwrap().unwrap();
    assert_eq!(updated.status, RequestStatus::Approved);
    assert!(updated.updated_at >= unchanged.updated_at);

    // No state machine: approved may move back to pending.
    ctx.services
        .requests
        .update_status(&admin, id, RequestStatus::Pending, "admin-pass")
        .await
        .expect("backward transition allowed");
}

#[tokio::test]
async fn status_update_is_admin_only() {
    let ctx = TestCtx::new().await;
    let office = ctx.seed_office("Clinic").await;
    let head = ctx.seed_office_head(office, "clinic_head", "secret123").await;

    let id = ctx
        .services
        .requests
        .create_request(&head, vec![custom_line("Gauze", "boxes", 1)])
        .await
        .unwrap();

    let err = ctx
        .services
        .requests
        .update_status(&head, id, RequestStatus::Approved, "secret123")
        .await;
    assert_matches!(err, Err(ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn office_head_deletes_only_own_pending_requests() {
    let ctx = TestCtx::new().await;
    let office = ctx.seed_office("Registrar").await;
    let other_office = ctx.seed_office("Accounting").await;
    let head = ctx.seed_office_head(office, "head_a", "secret123").await;
    let other_head = ctx.seed_office_head(other_office, "head_b", "secret456").await;
    let admin = ctx.seed_admin("admin", "admin-pass").await;

    let own = ctx
        .services
        .requests
        .create_request(&head, vec![custom_line("Folders", "packs", 3)])
        .await
        .unwrap();
    let foreign = ctx
        .services
        .requests
        .create_request(&other_head, vec![custom_line("Binders", "pcs", 2)])
        .await
        .unwrap();

    // Another office's request is invisible, even with a valid password.
    let err = ctx.services.requests.delete_request(&head, foreign, "secret123").await;
    assert_matches!(err, Err(ServiceError::NotFound(_)));

    // Own request but no longer pending: also reported as not found.
    ctx.services
        .requests
        .update_status(&admin, own, RequestStatus::Approved, "admin-pass")
        .await
        .unwrap();
    let err = ctx.services.requests.delete_request(&head, own, "secret123").await;
    assert_matches!(err, Err(ServiceError::NotFound(_)));

    // Admin deletes regardless of status; line items go with the request.
    ctx.services
        .requests
        .delete_request(&admin, own, "admin-pass")
        .await
        .expect("admin delete");
    assert!(request::Entity::find_by_id(own).one(&*ctx.db).await.unwrap().is_none());
    let remaining = request_item::Entity::find().all(&*ctx.db).await.unwrap();
    assert!(remaining.iter().all(|l| l.request_id == foreign));

    // Back to pending: the owner may delete their own request.
    ctx.services
        .requests
        .delete_request(&other_head, foreign, "secret456")
        .await
        .expect("owner delete of pending request");
}

#[tokio::test]
async fn delete_with_wrong_password_leaves_request_intact() {
    let ctx = TestCtx::new().await;
    let office = ctx.seed_office("Motorpool").await;
    let head = ctx.seed_office_head(office, "motor_head", "secret123").await;

    let id = ctx
        .services
        .requests
        .create_request(&head, vec![custom_line("Engine oil", "liters", 12)])
        .await
        .unwrap();

    let err = ctx.services.requests.delete_request(&head, id, "bad-pass").await;
    assert_matches!(err, Err(ServiceError::InvalidCredentials));

    assert!(request::Entity::find_by_id(id).one(&*ctx.db).await.unwrap().is_some());
}

#[tokio::test]
async fn list_requests_summary_matches_listed_rows_under_same_filter() {
    let ctx = TestCtx::new().await;
    let office_a = ctx.seed_office("Registrar").await;
    let office_b = ctx.seed_office("Accounting").await;
    let head_a = ctx.seed_office_head(office_a, "head_a", "secret123").await;
    let head_b = ctx.seed_office_head(office_b, "head_b", "secret123").await;
    let admin = ctx.seed_admin("admin", "admin-pass").await;

    let mut ids = Vec::new();
    for n in 0..3 {
        let id = ctx
            .services
            .requests
            .create_request(&head_a, vec![custom_line(&format!("Item {n}"), "pcs", 1)])
            .await
            .unwrap();
        ids.push(id);
    }
    let foreign = ctx
        .services
        .requests
        .create_request(&head_b, vec![custom_line("Ledger", "pcs", 1)])
        .await
        .unwrap();

    ctx.services
        .requests
        .update_status(&admin, ids[0], RequestStatus::Approved, "admin-pass")
        .await
        .unwrap();
    ctx.services
        .requests
        .update_status(&admin, ids[1], RequestStatus::Rejected, "admin-pass")
        .await
        .unwrap();

    // Admin view filtered to office A.
    let filter = RequestFilter {
        office_id: Some(office_a),
        ..Default::default()
    };
    let listing = ctx.services.requests.list_requests(&admin, filter).await.unwrap();

    assert_eq!(listing.requests.len(), 3);
    assert!(listing.requests.iter().all(|r| r.office_name == "Registrar"));
    assert_eq!(listing.summary.total, 3);
    assert_eq!(listing.summary.pending, 1);
    assert_eq!(listing.summary.approved, 1);
    assert_eq!(listing.summary.rejected, 1);

    let pending_in_list = listing
        .requests
        .iter()
        .filter(|r| r.status == RequestStatus::Pending)
        .count() as u64;
    assert_eq!(pending_in_list, listing.summary.pending);

    // Office heads are pinned to their own office even when asking for more.
    let sneaky = RequestFilter {
        office_id: Some(office_a),
        ..Default::default()
    };
    let scoped = ctx.services.requests.list_requests(&head_b, sneaky).await.unwrap();
    assert_eq!(scoped.requests.len(), 1);
    assert_eq!(scoped.requests[0].id, foreign);
    assert_eq!(scoped.summary.total, 1);

    // Status filter keeps list and summary on the same predicate.
    let approved_only = RequestFilter {
        status: Some(RequestStatus::Approved),
        ..Default::default()
    };
    let approved = ctx.services.requests.list_requests(&admin, approved_only).await.unwrap();
    assert_eq!(approved.requests.len(), 1);
    assert_eq!(approved.summary.total, 1);
    assert_eq!(approved.summary.approved, 1);
    assert_eq!(approved.summary.pending, 0);
}

#[tokio::test]
async fn get_request_hides_foreign_requests_and_counts_items() {
    let ctx = TestCtx::new().await;
    let office = ctx.seed_office("Registrar").await;
    let other = ctx.seed_office("Accounting").await;
    let head = ctx.seed_office_head(office, "head_a", "secret123").await;
    let outsider = ctx.seed_office_head(other, "head_b", "secret123").await;

    let id = ctx
        .services
        .requests
        .create_request(
            &head,
            vec![custom_line("Stamp pads", "pcs", 2), custom_line("Ink", "bottles", 1)],
        )
        .await
        .unwrap();

    let details = ctx.services.requests.get_request(&head, id).await.unwrap();
    assert_eq!(details.item_count, 2);
    assert_eq!(details.office_name, "Registrar");
    assert_eq!(details.requester_username, "head_a");

    let err = ctx.services.requests.get_request(&outsider, id).await;
    assert_matches!(err, Err(ServiceError::NotFound(_)));
}
