//! Actor identity and the re-authentication gate.
//!
//! The login/session layer lives outside this service. Every request arrives
//! with an already-authenticated actor described by trusted headers, which the
//! [`ActorContext`] extractor turns into an explicit value passed into every
//! core operation — scope rules are predicates on the actor and the target
//! entity, never ambient state or string comparison.

pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use sea_orm::EntityTrait;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{request, user, RequestStatus, Role},
    errors::ServiceError,
};

/// Header names populated by the upstream authentication boundary.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const ACTOR_OFFICE_HEADER: &str = "x-actor-office";

/// The authenticated actor on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorContext {
    pub user_id: Uuid,
    pub role: Role,
    /// None for the administrator, who belongs to no office.
    pub office_id: Option<Uuid>,
}

impl ActorContext {
    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::Admin,
            office_id: None,
        }
    }

    pub fn office_head(user_id: Uuid, office_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::OfficeHead,
            office_id: Some(office_id),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "administrator access required".into(),
            ))
        }
    }

    fn same_office(&self, office_id: Uuid) -> bool {
        self.office_id == Some(office_id)
    }

    /// Admins see every request; office heads only their own office's.
    pub fn can_view_request(&self, target: &request::Model) -> bool {
        self.is_admin() || self.same_office(target.office_id)
    }

    /// Admins delete any request regardless of status; office heads may only
    /// remove their own office's requests while still pending.
    pub fn can_delete_request(&self, target: &request::Model) -> bool {
        self.is_admin()
            || (self.same_office(target.office_id) && target.status == RequestStatus::Pending)
    }

    /// Single-request export follows the same scope as deletion: admins any,
    /// office heads only their own office's pending requests.
    pub fn can_export_request(&self, target: &request::Model) -> bool {
        self.can_delete_request(target)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let user_id = header(ACTOR_ID_HEADER)
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(|| ServiceError::Forbidden("missing or invalid actor identity".into()))?;

        let role = match header(ACTOR_ROLE_HEADER) {
            Some("admin") => Role::Admin,
            Some("office_head") => Role::OfficeHead,
            _ => return Err(ServiceError::Forbidden("missing or invalid actor role".into())),
        };

        let office_id = match header(ACTOR_OFFICE_HEADER) {
            Some(v) => Some(
                Uuid::parse_str(v)
                    .map_err(|_| ServiceError::Forbidden("invalid actor office".into()))?,
            ),
            None => None,
        };

        if role == Role::OfficeHead && office_id.is_none() {
            return Err(ServiceError::Forbidden(
                "office heads must carry an office".into(),
            ));
        }

        Ok(ActorContext {
            user_id,
            role,
            office_id,
        })
    }
}

/// The re-authentication gate: sensitive mutations require the acting user's
/// own password again, independent of session validity.
///
/// The gate never distinguishes "no such user" from "wrong password" — both
/// surface as [`ServiceError::InvalidCredentials`].
#[derive(Clone)]
pub struct PasswordGate {
    db: Arc<DbPool>,
}

impl PasswordGate {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Verifies `plaintext` against the stored credential of `user_id`.
    /// Callers must invoke this before any state change and propagate the
    /// error unchanged so the mutation short-circuits with no partial effect.
    #[instrument(skip(self, plaintext), fields(user_id = %user_id))]
    pub async fn verify(&self, user_id: Uuid, plaintext: &str) -> Result<(), ServiceError> {
        let user = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        if password::verify_password(&user.password_hash, plaintext) {
            Ok(())
        } else {
            tracing::warn!(user_id = %user_id, "password confirmation failed");
            Err(ServiceError::InvalidCredentials)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_request(office_id: Uuid, status: RequestStatus) -> request::Model {
        request::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            office_id,
            status,
            date_requested: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn admin_sees_and_deletes_everything() {
        let actor = ActorContext::admin(Uuid::new_v4());
        let req = sample_request(Uuid::new_v4(), RequestStatus::Approved);
        assert!(actor.can_view_request(&req));
        assert!(actor.can_delete_request(&req));
        assert!(actor.can_export_request(&req));
    }

    #[test]
    fn office_head_scope_is_limited_to_own_office() {
        let office = Uuid::new_v4();
        let actor = ActorContext::office_head(Uuid::new_v4(), office);

        let own_pending = sample_request(office, RequestStatus::Pending);
        let own_approved = sample_request(office, RequestStatus::Approved);
        let foreign = sample_request(Uuid::new_v4(), RequestStatus::Pending);

        assert!(actor.can_view_request(&own_pending));
        assert!(actor.can_view_request(&own_approved));
        assert!(!actor.can_view_request(&foreign));

        // Deletion additionally requires pending status.
        assert!(actor.can_delete_request(&own_pending));
        assert!(!actor.can_delete_request(&own_approved));
        assert!(!actor.can_delete_request(&foreign));
    }

    #[test]
    fn require_admin_rejects_office_heads() {
        let actor = ActorContext::office_head(Uuid::new_v4(), Uuid::new_v4());
        assert!(actor.require_admin().is_err());
        assert!(ActorContext::admin(Uuid::new_v4()).require_admin().is_ok());
    }
}
