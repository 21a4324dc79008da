use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{password, ActorContext, PasswordGate},
    db::DbPool,
    entities::{
        office::{self, ActiveModel as OfficeActiveModel, Entity as OfficeEntity},
        request::{self, Entity as RequestEntity},
        user::{self, ActiveModel as UserActiveModel, Entity as UserEntity},
        Role,
    },
    errors::ServiceError,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserInput {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub password: String,
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    pub office_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OfficeResponse {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub office_id: Option<Uuid>,
    pub office_name: Option<String>,
    pub role: Role,
    pub request_count: u64,
}

/// Offices and user accounts, with reference-guarded deletion.
#[derive(Clone)]
pub struct DirectoryService {
    db: Arc<DbPool>,
    gate: PasswordGate,
}

impl DirectoryService {
    pub fn new(db: Arc<DbPool>, gate: PasswordGate) -> Self {
        Self { db, gate }
    }

    /// Creates an office. Names are unique and non-empty.
    #[instrument(skip(self), fields(name = %name))]
    pub async fn create_office(&self, name: &str) -> Result<OfficeResponse, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "Office name is required".into(),
            ));
        }

        let existing = OfficeEntity::find()
            .filter(office::Column::Name.eq(name))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Duplicate("Office".into()));
        }

        let model = OfficeActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        info!(office_id = %model.id, "office created");

        Ok(OfficeResponse {
            id: model.id,
            name: model.name,
        })
    }

    /// All offices ordered by name.
    pub async fn list_offices(&self) -> Result<Vec<OfficeResponse>, ServiceError> {
        let offices = OfficeEntity::find()
            .order_by_asc(office::Column::Name)
            .all(&*self.db)
            .await?;

        Ok(offices
            .into_iter()
            .map(|o| OfficeResponse {
                id: o.id,
                name: o.name,
            })
            .collect())
    }

    /// Creates an office-head account. Accounts created through this path are
    /// never administrators. Username and email collisions are reported as a
    /// single combined conflict.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn create_user(&self, input: CreateUserInput) -> Result<UserResponse, ServiceError> {
        input.validate()?;
        if input.password.len() < password::MIN_PASSWORD_LEN {
            return Err(ServiceError::ValidationError(format!(
                "Password must be at least {} characters",
                password::MIN_PASSWORD_LEN
            )));
        }

        let office = OfficeEntity::find_by_id(input.office_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Office not found".into()))?;

        let username = input.username.trim().to_string();
        let email = input.email.trim().to_string();

        let existing = UserEntity::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(username.clone()))
                    .add(user::Column::Email.eq(email.clone())),
            )
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Duplicate("Username or email".into()));
        }

        let password_hash = password::hash_password(&input.password)?;

        let model = UserActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username),
            email: Set(email),
            password_hash: Set(password_hash),
            full_name: Set(input.full_name.trim().to_string()),
            office_id: Set(Some(office.id)),
            role_id: Set(Role::OfficeHead),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        info!(user_id = %model.id, "user account created");

        Ok(UserResponse {
            id: model.id,
            username: model.username,
            email: model.email,
            full_name: model.full_name,
            office_id: model.office_id,
            office_name: Some(office.name),
            role: model.role_id,
            request_count: 0,
        })
    }

    /// All accounts with office names and per-user request counts, admins
    /// first, then by full name.
    pub async fn list_users(&self) -> Result<Vec<UserResponse>, ServiceError> {
        let mut users = UserEntity::find().all(&*self.db).await?;
        users.sort_by(|a, b| {
            (a.role_id != Role::Admin, &a.full_name).cmp(&(b.role_id != Role::Admin, &b.full_name))
        });

        let office_names: HashMap<Uuid, String> = OfficeEntity::find()
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|o| (o.id, o.name))
            .collect();

        let counts: HashMap<Uuid, i64> = RequestEntity::find()
            .select_only()
            .column(request::Column::UserId)
            .column_as(request::Column::Id.count(), "request_count")
            .group_by(request::Column::UserId)
            .into_tuple::<(Uuid, i64)>()
            .all(&*self.db)
            .await?
            .into_iter()
            .collect();

        Ok(users
            .into_iter()
            .map(|u| UserResponse {
                office_name: u.office_id.and_then(|id| office_names.get(&id).cloned()),
                request_count: counts.get(&u.id).copied().unwrap_or(0) as u64,
                id: u.id,
                username: u.username,
                email: u.email,
                full_name: u.full_name,
                office_id: u.office_id,
                role: u.role_id,
            })
            .collect())
    }

    /// Deletes an account. Self-deletion, administrator targets, and users
    /// with existing requests are each independently blocked. Gated on the
    /// acting user's password.
    #[instrument(skip(self, confirmation_password), fields(target_id = %target_id, actor_id = %actor.user_id))]
    pub async fn delete_user(
        &self,
        actor: &ActorContext,
        target_id: Uuid,
        confirmation_password: &str,
    ) -> Result<(), ServiceError> {
        if target_id == actor.user_id {
            return Err(ServiceError::ValidationError(
                "Cannot delete your own account".into(),
            ));
        }

        self.gate.verify(actor.user_id, confirmation_password).await?;

        let target = UserEntity::find_by_id(target_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".into()))?;

        if target.role_id.is_admin() {
            warn!(target_id = %target_id, "attempted deletion of an admin account");
            return Err(ServiceError::Forbidden(
                "Admin accounts cannot be deleted".into(),
            ));
        }

        let request_count = RequestEntity::find()
            .filter(request::Column::UserId.eq(target_id))
            .count(&*self.db)
            .await?;
        if request_count > 0 {
            return Err(ServiceError::ReferencedByOthers {
                entity: "user".into(),
                referrer: "request(s)".into(),
                count: request_count,
            });
        }

        UserEntity::delete_by_id(target_id).exec(&*self.db).await?;

        info!(target_id = %target_id, "user account deleted");

        Ok(())
    }

    /// Replaces a user's password. Gated on the acting user's own password,
    /// not the target's.
    #[instrument(skip(self, new_password, confirm, confirmation_password), fields(target_id = %target_id))]
    pub async fn change_password(
        &self,
        actor: &ActorContext,
        target_id: Uuid,
        new_password: &str,
        confirm: &str,
        confirmation_password: &str,
    ) -> Result<(), ServiceError> {
        self.gate.verify(actor.user_id, confirmation_password).await?;
        password::validate_new_password(new_password, confirm)?;

        let target = UserEntity::find_by_id(target_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".into()))?;

        let mut active: UserActiveModel = target.into();
        active.password_hash = Set(password::hash_password(new_password)?);
        active.update(&*self.db).await?;

        info!(target_id = %target_id, "password changed");

        Ok(())
    }
}
