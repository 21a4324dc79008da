//! Account/office directory integration: creation validation, combined
//! duplicate checks, and the independently sufficient deletion guards.

mod common;

use assert_matches::assert_matches;
use common::TestCtx;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;

use requisition_api::{
    entities::user,
    errors::ServiceError,
    services::directory::CreateUserInput,
    services::requests::LineItemDraft,
};

fn user_input(username: &str, email: &str, office_id: uuid::Uuid) -> CreateUserInput {
    CreateUserInput {
        username: username.into(),
        email: email.into(),
        password: "secret123".into(),
        full_name: format!("Head {username}"),
        office_id,
    }
}

#[tokio::test]
async fn create_office_rejects_empty_and_duplicate_names() {
    let ctx = TestCtx::new().await;

    let office = ctx.services.directory.create_office("Registrar").await.unwrap();
    assert_eq!(office.name, "Registrar");

    let err = ctx.services.directory.create_office("  ").await;
    assert_matches!(err, Err(ServiceError::ValidationError(_)));

    let err = ctx.services.directory.create_office("Registrar").await;
    assert_matches!(err, Err(ServiceError::Duplicate(_)));

    let offices = ctx.services.directory.list_offices().await.unwrap();
    assert_eq!(offices.len(), 1);
}

#[tokio::test]
async fn create_user_enforces_field_password_and_email_rules() {
    let ctx = TestCtx::new().await;
    let office = ctx.seed_office("Registrar").await;

    let created = ctx
        .services
        .directory
        .create_user(user_input("reg_head", "reg@example.test", office))
        .await
        .unwrap();
    assert_eq!(created.office_name.as_deref(), Some("Registrar"));
    assert!(!created.role.is_admin(), "this path never creates admins");

    // Stored credential is a hash that verifies the original password.
    let stored = user::Entity::find_by_id(created.id).one(&*ctx.db).await.unwrap().unwrap();
    assert_ne!(stored.password_hash, "secret123");
    assert!(requisition_api::auth::password::verify_password(
        &stored.password_hash,
        "secret123"
    ));

    let mut short_pass = user_input("other", "other@example.test", office);
    short_pass.password = "abc".into();
    let err = ctx.services.directory.create_user(short_pass).await;
    assert_matches!(err, Err(ServiceError::ValidationError(_)));

    let bad_email = user_input("other", "not-an-email", office);
    let err = ctx.services.directory.create_user(bad_email).await;
    assert_matches!(err, Err(ServiceError::ValidationError(_)));

    // Username and email collisions share one combined duplicate check.
    let err = ctx
        .services
        .directory
        .create_user(user_input("reg_head", "fresh@example.test", office))
        .await;
    assert_matches!(err, Err(ServiceError::Duplicate(_)));
    let err = ctx
        .services
        .directory
        .create_user(user_input("fresh", "reg@example.test", office))
        .await;
    assert_matches!(err, Err(ServiceError::Duplicate(_)));
}

#[tokio::test]
async fn delete_user_guards_are_each_sufficient() {
    let ctx = TestCtx::new().await;
    let office = ctx.seed_office("Registrar").await;
    let admin = ctx.seed_admin("admin", "admin-pass").await;
    let second_admin = ctx.seed_admin("admin2", "admin2-pass").await;
    let head = ctx.seed_office_head(office, "reg_head", "secret123").await;

    // Self-deletion is blocked before anything else.
    let err = ctx
        .services
        .directory
        .delete_user(&admin, admin.user_id, "admin-pass")
        .await;
    assert_matches!(err, Err(ServiceError::ValidationError(_)));

    // Wrong confirmation password blocks and mutates nothing.
    let err = ctx
        .services
        .directory
        .delete_user(&admin, head.user_id, "wrong")
        .await;
    assert_matches!(err, Err(ServiceError::InvalidCredentials));
    assert!(user::Entity::find_by_id(head.user_id).one(&*ctx.db).await.unwrap().is_some());

    // Admin targets are never deletable, even by another admin.
    let err = ctx
        .services
        .directory
        .delete_user(&admin, second_admin.user_id, "admin-pass")
        .await;
    assert_matches!(err, Err(ServiceError::Forbidden(_)));

    // A user with requests is blocked with the blocking count.
    ctx.services
        .requests
        .create_request(
            &head,
            vec![LineItemDraft {
                item_id: None,
                custom_name: Some("Logbook".into()),
                unit_type: "pcs".into(),
                quantity: 1,
                price_per_unit: dec!(80.00),
            }],
        )
        .await
        .unwrap();
    let err = ctx
        .services
        .directory
        .delete_user(&admin, head.user_id, "admin-pass")
        .await;
    match err {
        Err(ServiceError::ReferencedByOthers { count, .. }) => assert_eq!(count, 1),
        other => panic!("expected ReferencedByOthers, got {other:?}"),
    }

    // A requestless office head deletes cleanly.
    let deletable = ctx.seed_office_head(office, "temp_head", "secret123").await;
    ctx.services
        .directory
        .delete_user(&admin, deletable.user_id, "admin-pass")
        .await
        .expect("delete succeeds");
    assert!(user::Entity::find_by_id(deletable.user_id)
        .one(&*ctx.db)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn change_password_is_gated_and_validated() {
    let ctx = TestCtx::new().await;
    let office = ctx.seed_office("Registrar").await;
    let admin = ctx.seed_admin("admin", "admin-pass").await;
    let head = ctx.seed_office_head(office, "reg_head", "old-secret").await;

    // Wrong admin password: nothing changes, the old credential still works.
    let err = ctx
        .services
        .directory
        .change_password(&admin, head.user_id, "new-secret", "new-secret", "wrong")
        .await;
    assert_matches!(err, Err(ServiceError::InvalidCredentials));
    let stored = user::Entity::find_by_id(head.user_id).one(&*ctx.db).await.unwrap().unwrap();
    assert!(requisition_api::auth::password::verify_password(
        &stored.password_hash,
        "old-secret"
    ));

    // Policy failures.
    let err = ctx
        .services
        .directory
        .change_password(&admin, head.user_id, "abc", "abc", "admin-pass")
        .await;
    assert_matches!(err, Err(ServiceError::ValidationError(_)));
    let err = ctx
        .services
        .directory
        .change_password(&admin, head.user_id, "new-secret", "different", "admin-pass")
        .await;
    assert_matches!(err, Err(ServiceError::ValidationError(_)));

    // Success replaces the credential.
    ctx.services
        .directory
        .change_password(&admin, head.user_id, "new-secret", "new-secret", "admin-pass")
        .await
        .expect("password change");
    let stored = user::Entity::find_by_id(head.user_id).one(&*ctx.db).await.unwrap().unwrap();
    assert!(requisition_api::auth::password::verify_password(
        &stored.password_hash,
        "new-secret"
    ));
    assert!(!requisition_api::auth::password::verify_password(
        &stored.password_hash,
        "old-secret"
    ));
}

#[tokio::test]
async fn list_users_carries_office_names_and_request_counts() {
    let ctx = TestCtx::new().await;
    let office = ctx.seed_office("Registrar").await;
    ctx.seed_admin("admin", "admin-pass").await;
    let head = ctx.seed_office_head(office, "reg_head", "secret123").await;

    ctx.services
        .requests
        .create_request(
            &head,
            vec![LineItemDraft {
                item_id: None,
                custom_name: Some("Stamp".into()),
                unit_type: "pcs".into(),
                quantity: 1,
                price_per_unit: dec!(50.00),
            }],
        )
        .await
        .unwrap();

    let users = ctx.services.directory.list_users().await.unwrap();
    assert_eq!(users.len(), 2);
    // Admins sort first.
    assert!(users[0].role.is_admin());
    assert_eq!(users[0].request_count, 0);
    assert_eq!(users[1].office_name.as_deref(), Some("Registrar"));
    assert_eq!(users[1].request_count, 1);
}
