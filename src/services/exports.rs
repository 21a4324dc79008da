use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::ActorContext,
    db::DbPool,
    entities::{
        item::{self, Entity as ItemEntity},
        office::Entity as OfficeEntity,
        request::{self, Entity as RequestEntity},
        request_item::{self, Entity as RequestItemEntity},
        user, RequestStatus,
    },
    errors::ServiceError,
    services::settings::{SettingsService, SignatureBlock},
};

/// UTF-8 byte-order mark prepended to CSV exports so spreadsheet tools pick
/// the right encoding.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Column headers of the aggregated approved-items export.
pub const EXPORT_HEADERS: [&str; 8] = [
    "Item Name",
    "Unit Type",
    "Total Quantity",
    "Offices Count",
    "Offices Involved",
    "Number of Requests",
    "First Request Date",
    "Last Request Date",
];

/// Filter for the aggregated export. All bounds are optional; the approved
/// status restriction is always applied.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ExportFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub year: Option<i32>,
}

/// One output row of the aggregated report: a (catalog item, unit type) pair
/// across every approved request that ordered it.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApprovedItemRow {
    pub item_name: String,
    pub unit_type: String,
    pub total_quantity: i64,
    pub offices_count: u64,
    /// Distinct office names, sorted, comma-joined.
    pub offices_list: String,
    pub request_count: u64,
    pub first_request_date: NaiveDate,
    pub last_request_date: NaiveDate,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SummaryLine {
    pub display_name: String,
    pub unit_type: String,
    pub quantity: i32,
    pub price_per_unit: Decimal,
    pub line_total: Decimal,
}

/// Printable breakdown of a single request with its signature footer.
#[derive(Debug, Serialize, ToSchema)]
pub struct RequestSummaryReport {
    pub request_id: Uuid,
    pub office_name: String,
    pub requested_by: String,
    pub status: RequestStatus,
    pub date_requested: DateTime<Utc>,
    pub lines: Vec<SummaryLine>,
    pub grand_total: Decimal,
    pub signatures: Vec<SignatureBlock>,
}

/// Read-only projections of approved request data for reporting.
#[derive(Clone)]
pub struct ExportService {
    db: Arc<DbPool>,
    settings: SettingsService,
}

impl ExportService {
    pub fn new(db: Arc<DbPool>, settings: SettingsService) -> Self {
        Self { db, settings }
    }

    /// Aggregates approved, catalog-backed line items by (item name, unit
    /// type). Custom ad hoc lines have no catalog identity and are excluded.
    #[instrument(skip(self))]
    pub async fn approved_items_report(
        &self,
        filter: &ExportFilter,
    ) -> Result<Vec<ApprovedItemRow>, ServiceError> {
        let mut cond = Condition::all().add(request::Column::Status.eq(RequestStatus::Approved));
        if let Some(from) = filter.date_from {
            cond = cond.add(request::Column::DateRequested.gte(start_of_day(from)));
        }
        if let Some(to) = filter.date_to {
            cond = cond.add(request::Column::DateRequested.lt(day_after(to)));
        }
        if let Some(year) = filter.year {
            let start = NaiveDate::from_ymd_opt(year, 1, 1)
                .ok_or_else(|| ServiceError::ValidationError(format!("Invalid year {year}")))?;
            let end = NaiveDate::from_ymd_opt(year + 1, 1, 1)
                .ok_or_else(|| ServiceError::ValidationError(format!("Invalid year {year}")))?;
            cond = cond
                .add(request::Column::DateRequested.gte(start_of_day(start)))
                .add(request::Column::DateRequested.lt(start_of_day(end)));
        }

        let requests: HashMap<Uuid, request::Model> = RequestEntity::find()
            .filter(cond)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let request_ids: Vec<Uuid> = requests.keys().copied().collect();
        let lines = RequestItemEntity::find()
            .filter(request_item::Column::RequestId.is_in(request_ids))
            .filter(request_item::Column::ItemId.is_not_null())
            .all(&*self.db)
            .await?;

        let item_ids: Vec<Uuid> = lines.iter().filter_map(|l| l.item_id).collect();
        let item_names: HashMap<Uuid, String> = ItemEntity::find()
            .filter(item::Column::Id.is_in(item_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|i| (i.id, i.name))
            .collect();

        let office_names: HashMap<Uuid, String> = OfficeEntity::find()
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|o| (o.id, o.name))
            .collect();

        // BTreeMap keeps the output ordered by item name, then unit type.
        let mut groups: BTreeMap<(String, String), RowAccumulator> = BTreeMap::new();
        for line in lines {
            let Some(item_id) = line.item_id else {
                continue;
            };
            let Some(item_name) = item_names.get(&item_id) else {
                continue;
            };
            let Some(parent) = requests.get(&line.request_id) else {
                continue;
            };

            let acc = groups
                .entry((item_name.clone(), line.unit_type.clone()))
                .or_insert_with(|| RowAccumulator::new(parent.date_requested));
            acc.total_quantity += i64::from(line.quantity);
            acc.office_ids.insert(parent.office_id);
            acc.request_ids.insert(parent.id);
            acc.first = acc.first.min(parent.date_requested);
            acc.last = acc.last.max(parent.date_requested);
        }

        let rows = groups
            .into_iter()
            .map(|((item_name, unit_type), acc)| {
                let mut offices: Vec<&str> = acc
                    .office_ids
                    .iter()
                    .filter_map(|id| office_names.get(id).map(String::as_str))
                    .collect();
                offices.sort_unstable();

                ApprovedItemRow {
                    item_name,
                    unit_type,
                    total_quantity: acc.total_quantity,
                    offices_count: acc.office_ids.len() as u64,
                    offices_list: offices.join(", "),
                    request_count: acc.request_ids.len() as u64,
                    first_request_date: acc.first.date_naive(),
                    last_request_date: acc.last.date_naive(),
                }
            })
            .collect();

        Ok(rows)
    }

    /// Serializes report rows as BOM-prefixed CSV for spreadsheet import.
    pub fn to_csv(rows: &[ApprovedItemRow]) -> Result<Vec<u8>, ServiceError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(EXPORT_HEADERS)
            .map_err(|e| ServiceError::InternalError(format!("CSV serialization failed: {e}")))?;

        for row in rows {
            writer
                .write_record([
                    row.item_name.as_str(),
                    row.unit_type.as_str(),
                    &row.total_quantity.to_string(),
                    &row.offices_count.to_string(),
                    row.offices_list.as_str(),
                    &row.request_count.to_string(),
                    &row.first_request_date.format("%Y-%m-%d").to_string(),
                    &row.last_request_date.format("%Y-%m-%d").to_string(),
                ])
                .map_err(|e| ServiceError::InternalError(format!("CSV serialization failed: {e}")))?;
        }

        let body = writer
            .into_inner()
            .map_err(|e| ServiceError::InternalError(format!("CSV serialization failed: {e}")))?;

        let mut out = Vec::with_capacity(UTF8_BOM.len() + body.len());
        out.extend_from_slice(UTF8_BOM);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Builds the printable single-request breakdown with the configured
    /// signature footer. Office heads may only export their own office's
    /// pending requests; admins any request.
    #[instrument(skip(self), fields(request_id = %request_id))]
    pub async fn request_summary(
        &self,
        actor: &ActorContext,
        request_id: Uuid,
    ) -> Result<RequestSummaryReport, ServiceError> {
        let req = RequestEntity::find_by_id(request_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Request not found".into()))?;

        if !actor.can_view_request(&req) {
            return Err(ServiceError::NotFound("Request not found".into()));
        }
        if !actor.can_export_request(&req) {
            return Err(ServiceError::Forbidden(
                "Only pending requests can be exported".into(),
            ));
        }

        let requester = user::Entity::find_by_id(req.user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Requester not found".into()))?;
        let office_name = OfficeEntity::find_by_id(req.office_id)
            .one(&*self.db)
            .await?
            .map(|o| o.name)
            .unwrap_or_default();

        let rows = RequestItemEntity::find()
            .filter(request_item::Column::RequestId.eq(request_id))
            .find_also_related(ItemEntity)
            .all(&*self.db)
            .await?;

        let mut lines: Vec<SummaryLine> = rows
            .into_iter()
            .map(|(line, catalog)| {
                let display_name = catalog
                    .map(|i| i.name)
                    .or(line.custom_item_name)
                    .unwrap_or_default();
                SummaryLine {
                    display_name,
                    unit_type: line.unit_type,
                    quantity: line.quantity,
                    price_per_unit: line.price_per_unit,
                    line_total: line.price_per_unit * Decimal::from(line.quantity),
                }
            })
            .collect();
        lines.sort_by(|a, b| a.display_name.cmp(&b.display_name));

        let grand_total = lines.iter().map(|l| l.line_total).sum();
        let signatures = self.settings.signature_blocks().await?;

        info!(request_id = %request_id, lines = lines.len(), "request summary projected");

        Ok(RequestSummaryReport {
            request_id: req.id,
            office_name,
            requested_by: requester.full_name,
            status: req.status,
            date_requested: req.date_requested,
            lines,
            grand_total,
            signatures,
        })
    }
}

struct RowAccumulator {
    total_quantity: i64,
    office_ids: HashSet<Uuid>,
    request_ids: HashSet<Uuid>,
    first: DateTime<Utc>,
    last: DateTime<Utc>,
}

impl RowAccumulator {
    fn new(seen: DateTime<Utc>) -> Self {
        Self {
            total_quantity: 0,
            office_ids: HashSet::new(),
            request_ids: HashSet::new(),
            first: seen,
            last: seen,
        }
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn day_after(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + chrono::Duration::days(1)
}
