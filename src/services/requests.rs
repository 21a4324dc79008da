use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::{ActorContext, PasswordGate},
    db::DbPool,
    entities::{
        item, office,
        request::{self, ActiveModel as RequestActiveModel, Entity as RequestEntity},
        request_item::{self, ActiveModel as RequestItemActiveModel, Entity as RequestItemEntity},
        user, RequestStatus,
    },
    errors::ServiceError,
};

/// One line of a draft bulk request as assembled client-side. Either
/// `item_id` (catalog-backed, price already resolved from the catalog) or
/// `custom_name` (ad hoc) is given.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LineItemDraft {
    pub item_id: Option<Uuid>,
    pub custom_name: Option<String>,
    pub unit_type: String,
    pub quantity: i32,
    #[serde(default)]
    pub price_per_unit: Decimal,
}

/// Drops draft lines that do not carry a unit type and a positive quantity.
///
/// Invalid lines are dropped silently rather than rejected — longstanding
/// submission-form behavior. Kept as a standalone pure function so it can be
/// tested directly and tightened into a hard validation without touching the
/// persistence path.
pub fn retain_valid_lines(drafts: Vec<LineItemDraft>) -> Vec<LineItemDraft> {
    drafts
        .into_iter()
        .filter(|line| !line.unit_type.trim().is_empty() && line.quantity >= 1)
        .collect()
}

/// Filter shared by the request list and its summary counts.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RequestFilter {
    pub office_id: Option<Uuid>,
    pub status: Option<RequestStatus>,
    /// Inclusive calendar date lower bound on date_requested.
    pub date_from: Option<NaiveDate>,
    /// Inclusive calendar date upper bound on date_requested.
    pub date_to: Option<NaiveDate>,
}

impl RequestFilter {
    fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(office_id) = self.office_id {
            cond = cond.add(request::Column::OfficeId.eq(office_id));
        }
        if let Some(status) = self.status {
            cond = cond.add(request::Column::Status.eq(status));
        }
        if let Some(from) = self.date_from {
            cond = cond.add(request::Column::DateRequested.gte(start_of_day(from)));
        }
        if let Some(to) = self.date_to {
            cond = cond.add(request::Column::DateRequested.lt(day_after(to)));
        }
        cond
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn day_after(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + chrono::Duration::days(1)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequestDetails {
    pub id: Uuid,
    pub status: RequestStatus,
    pub date_requested: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub office_id: Uuid,
    pub office_name: String,
    pub requester_username: String,
    pub requester_full_name: String,
    pub requester_email: String,
    pub item_count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequestLineItem {
    pub id: Uuid,
    pub item_id: Option<Uuid>,
    /// Catalog name when catalog-backed, otherwise the custom item name.
    pub display_name: String,
    pub unit_type: String,
    pub quantity: i32,
    pub price_per_unit: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequestListRow {
    pub id: Uuid,
    pub office_name: String,
    pub requester_name: String,
    pub status: RequestStatus,
    pub item_count: u64,
    pub date_requested: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequestSummaryCounts {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequestListResponse {
    pub requests: Vec<RequestListRow>,
    pub summary: RequestSummaryCounts,
}

/// The bulk-request aggregate: composition, retrieval, status transitions
/// and deletion, each as one atomic unit of work.
#[derive(Clone)]
pub struct RequestService {
    db: Arc<DbPool>,
    gate: PasswordGate,
}

impl RequestService {
    pub fn new(db: Arc<DbPool>, gate: PasswordGate) -> Self {
        Self { db, gate }
    }

    /// Persists a new bulk request with its line items in one transaction.
    ///
    /// Lines failing the validity filter are dropped; if nothing survives the
    /// whole operation fails with `EmptyRequest` and no rows are written.
    #[instrument(skip(self, drafts), fields(user_id = %actor.user_id, drafted = drafts.len()))]
    pub async fn create_request(
        &self,
        actor: &ActorContext,
        drafts: Vec<LineItemDraft>,
    ) -> Result<Uuid, ServiceError> {
        let office_id = actor.office_id.ok_or_else(|| {
            ServiceError::ValidationError("Requests must be submitted on behalf of an office".into())
        })?;

        if drafts.is_empty() {
            return Err(ServiceError::EmptyRequest);
        }

        let lines = retain_valid_lines(drafts);
        if lines.is_empty() {
            return Err(ServiceError::EmptyRequest);
        }

        let now = Utc::now();
        let request_id = Uuid::new_v4();

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "failed to start transaction for request creation");
            ServiceError::DatabaseError(e)
        })?;

        RequestActiveModel {
            id: Set(request_id),
            user_id: Set(actor.user_id),
            office_id: Set(office_id),
            status: Set(RequestStatus::Pending),
            date_requested: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for line in &lines {
            // Ad hoc lines carry their own name; catalog-backed lines resolve
            // theirs from the catalog at read time.
            let custom_item_name = if line.item_id.is_none() {
                Some(line.custom_name.clone().unwrap_or_default())
            } else {
                None
            };

            RequestItemActiveModel {
                id: Set(Uuid::new_v4()),
                request_id: Set(request_id),
                item_id: Set(line.item_id),
                custom_item_name: Set(custom_item_name),
                unit_type: Set(line.unit_type.trim().to_string()),
                quantity: Set(line.quantity),
                price_per_unit: Set(line.price_per_unit),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, request_id = %request_id, "failed to commit request creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(request_id = %request_id, lines = lines.len(), "bulk request created");

        Ok(request_id)
    }

    /// Fetches one request with requester and office context. Requests outside
    /// the actor's scope are reported as not found.
    #[instrument(skip(self), fields(request_id = %request_id))]
    pub async fn get_request(
        &self,
        actor: &ActorContext,
        request_id: Uuid,
    ) -> Result<RequestDetails, ServiceError> {
        let req = self.find_scoped(actor, request_id).await?;

        let requester = user::Entity::find_by_id(req.user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Requester not found".into()))?;
        let office = office::Entity::find_by_id(req.office_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Office not found".into()))?;

        let item_count = RequestItemEntity::find()
            .filter(request_item::Column::RequestId.eq(request_id))
            .count(&*self.db)
            .await?;

        Ok(RequestDetails {
            id: req.id,
            status: req.status,
            date_requested: req.date_requested,
            updated_at: req.updated_at,
            office_id: req.office_id,
            office_name: office.name,
            requester_username: requester.username,
            requester_full_name: requester.full_name,
            requester_email: requester.email,
            item_count,
        })
    }

    /// Lists a request's line items with display names resolved, ordered by
    /// display name.
    #[instrument(skip(self), fields(request_id = %request_id))]
    pub async fn list_request_items(
        &self,
        actor: &ActorContext,
        request_id: Uuid,
    ) -> Result<Vec<RequestLineItem>, ServiceError> {
        self.find_scoped(actor, request_id).await?;

        let rows = RequestItemEntity::find()
            .filter(request_item::Column::RequestId.eq(request_id))
            .find_also_related(item::Entity)
            .all(&*self.db)
            .await?;

        let mut items: Vec<RequestLineItem> = rows
            .into_iter()
            .map(|(line, catalog)| {
                let display_name = catalog
                    .map(|i| i.name)
                    .or_else(|| line.custom_item_name.clone())
                    .unwrap_or_default();
                RequestLineItem {
                    id: line.id,
                    item_id: line.item_id,
                    display_name,
                    unit_type: line.unit_type,
                    quantity: line.quantity,
                    price_per_unit: line.price_per_unit,
                    line_total: line.price_per_unit * Decimal::from(line.quantity),
                }
            })
            .collect();

        items.sort_by(|a, b| a.display_name.cmp(&b.display_name));

        Ok(items)
    }

    /// Moves a request to a new status. Every transition is permitted,
    /// including backwards ones; restricting the graph is a pending product
    /// decision. Gated on the acting admin's password.
    #[instrument(skip(self, password), fields(request_id = %request_id, new_status = ?new_status))]
    pub async fn update_status(
        &self,
        actor: &ActorContext,
        request_id: Uuid,
        new_status: RequestStatus,
        password: &str,
    ) -> Result<(), ServiceError> {
        actor.require_admin()?;
        self.gate.verify(actor.user_id, password).await?;

        let req = RequestEntity::find_by_id(request_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                warn!(request_id = %request_id, "request not found for status update");
                ServiceError::NotFound("Request not found".into())
            })?;

        let old_status = req.status;
        let mut active: RequestActiveModel = req.into();
        active.status = Set(new_status);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        info!(
            request_id = %request_id,
            old_status = ?old_status,
            new_status = ?new_status,
            "request status updated"
        );

        Ok(())
    }

    /// Deletes a request and its line items atomically. Scope failures are
    /// indistinguishable from a missing request. Gated on the acting user's
    /// password.
    #[instrument(skip(self, password), fields(request_id = %request_id, user_id = %actor.user_id))]
    pub async fn delete_request(
        &self,
        actor: &ActorContext,
        request_id: Uuid,
        password: &str,
    ) -> Result<(), ServiceError> {
        self.gate.verify(actor.user_id, password).await?;

        let req = RequestEntity::find_by_id(request_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Request not found".into()))?;

        if !actor.can_delete_request(&req) {
            return Err(ServiceError::NotFound("Request not found".into()));
        }

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "failed to start transaction for request deletion");
            ServiceError::DatabaseError(e)
        })?;

        RequestItemEntity::delete_many()
            .filter(request_item::Column::RequestId.eq(request_id))
            .exec(&txn)
            .await?;
        RequestEntity::delete_by_id(request_id).exec(&txn).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, request_id = %request_id, "failed to commit request deletion");
            ServiceError::DatabaseError(e)
        })?;

        info!(request_id = %request_id, "request deleted");

        Ok(())
    }

    /// Lists requests under a filter along with summary counts computed from
    /// the identical condition, so list and summary can never disagree.
    /// Office heads are always pinned to their own office.
    #[instrument(skip(self))]
    pub async fn list_requests(
        &self,
        actor: &ActorContext,
        mut filter: RequestFilter,
    ) -> Result<RequestListResponse, ServiceError> {
        if !actor.is_admin() {
            filter.office_id = actor.office_id;
        }
        let cond = filter.condition();

        let requests = RequestEntity::find()
            .filter(cond.clone())
            .order_by_desc(request::Column::DateRequested)
            .all(&*self.db)
            .await?;

        let request_ids: Vec<Uuid> = requests.iter().map(|r| r.id).collect();
        let user_ids: Vec<Uuid> = requests.iter().map(|r| r.user_id).collect();
        let office_ids: Vec<Uuid> = requests.iter().map(|r| r.office_id).collect();

        let item_counts: HashMap<Uuid, i64> = if request_ids.is_empty() {
            HashMap::new()
        } else {
            RequestItemEntity::find()
                .select_only()
                .column(request_item::Column::RequestId)
                .column_as(request_item::Column::Id.count(), "item_count")
                .filter(request_item::Column::RequestId.is_in(request_ids))
                .group_by(request_item::Column::RequestId)
                .into_tuple::<(Uuid, i64)>()
                .all(&*self.db)
                .await?
                .into_iter()
                .collect()
        };

        let users: HashMap<Uuid, String> = user::Entity::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.full_name))
            .collect();

        let offices: HashMap<Uuid, String> = office::Entity::find()
            .filter(office::Column::Id.is_in(office_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|o| (o.id, o.name))
            .collect();

        // Summary under the same condition as the list.
        let status_counts: Vec<(RequestStatus, i64)> = RequestEntity::find()
            .select_only()
            .column(request::Column::Status)
            .column_as(request::Column::Id.count(), "status_count")
            .filter(cond)
            .group_by(request::Column::Status)
            .into_tuple()
            .all(&*self.db)
            .await?;

        let mut summary = RequestSummaryCounts {
            total: 0,
            pending: 0,
            approved: 0,
            rejected: 0,
        };
        for (status, count) in status_counts {
            let count = count as u64;
            summary.total += count;
            match status {
                RequestStatus::Pending => summary.pending += count,
                RequestStatus::Approved => summary.approved += count,
                RequestStatus::Rejected => summary.rejected += count,
            }
        }

        let rows = requests
            .into_iter()
            .map(|r| RequestListRow {
                id: r.id,
                office_name: offices.get(&r.office_id).cloned().unwrap_or_default(),
                requester_name: users.get(&r.user_id).cloned().unwrap_or_default(),
                status: r.status,
                item_count: item_counts.get(&r.id).copied().unwrap_or(0) as u64,
                date_requested: r.date_requested,
                updated_at: r.updated_at,
            })
            .collect();

        Ok(RequestListResponse {
            requests: rows,
            summary,
        })
    }

    async fn find_scoped(
        &self,
        actor: &ActorContext,
        request_id: Uuid,
    ) -> Result<request::Model, ServiceError> {
        let req = RequestEntity::find_by_id(request_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Request not found".into()))?;

        // Out-of-scope requests look exactly like missing ones so one office
        // cannot probe for another office's request ids.
        if !actor.can_view_request(&req) {
            return Err(ServiceError::NotFound("Request not found".into()));
        }

        Ok(req)
    }
}
