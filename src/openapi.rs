use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Requisition API",
        version = "1.0.0",
        description = r#"
# Office Purchase Requisition API

Backend for an internal purchase/item-request workflow: office heads submit
bulk requests, an administrator reviews and approves or rejects them, manages
the item catalog (categories, prices, unit types) and accounts, and exports
approved data for spreadsheets.

## Actor headers

The authentication boundary is external. Every request must carry the
already-validated actor context:

- `x-actor-id`: acting user's UUID
- `x-actor-role`: `admin` or `office_head`
- `x-actor-office`: acting user's office UUID (required for office heads)

## Password confirmation

Sensitive mutations (status updates, deletions, password changes) require the
acting user's own password in the request body, verified server-side before
any state change.
"#
    ),
    paths(
        crate::handlers::requests::create_request,
        crate::handlers::requests::list_requests,
        crate::handlers::requests::get_request,
        crate::handlers::requests::get_request_items,
        crate::handlers::requests::update_request_status,
        crate::handlers::requests::delete_request,
        crate::handlers::requests::get_request_summary,
        crate::handlers::items::list_items,
        crate::handlers::items::create_item,
        crate::handlers::items::update_item,
        crate::handlers::items::delete_item,
        crate::handlers::items::list_active_items,
        crate::handlers::items::get_unit_types,
        crate::handlers::items::default_unit_types,
        crate::handlers::items::list_categories,
        crate::handlers::imports::preview_import,
        crate::handlers::imports::run_import,
        crate::handlers::accounts::list_offices,
        crate::handlers::accounts::create_office,
        crate::handlers::accounts::list_users,
        crate::handlers::accounts::create_user,
        crate::handlers::accounts::delete_user,
        crate::handlers::accounts::change_password,
        crate::handlers::exports::export_approved_items,
        crate::handlers::settings::get_signatures,
        crate::handlers::settings::save_signatures,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::handlers::requests::CreateRequestBody,
        crate::handlers::requests::CreatedRequest,
        crate::handlers::requests::UpdateStatusBody,
        crate::handlers::requests::PasswordConfirmBody,
        crate::handlers::imports::RunImportBody,
        crate::handlers::accounts::CreateOfficeBody,
        crate::handlers::accounts::DeleteUserBody,
        crate::handlers::accounts::ChangePasswordBody,
        crate::handlers::settings::SaveSignaturesBody,
        crate::entities::RequestStatus,
        crate::entities::Role,
        crate::services::requests::LineItemDraft,
        crate::services::requests::RequestDetails,
        crate::services::requests::RequestLineItem,
        crate::services::requests::RequestListResponse,
        crate::services::requests::RequestListRow,
        crate::services::requests::RequestSummaryCounts,
        crate::services::catalog::ItemInput,
        crate::services::catalog::ItemResponse,
        crate::services::catalog::ItemWithUsage,
        crate::services::catalog::ItemListResponse,
        crate::services::catalog::CategoryResponse,
        crate::services::directory::CreateUserInput,
        crate::services::directory::OfficeResponse,
        crate::services::directory::UserResponse,
        crate::services::imports::CsvItem,
        crate::services::imports::ParseOutcome,
        crate::services::imports::ImportOutcome,
        crate::services::exports::ApprovedItemRow,
        crate::services::exports::RequestSummaryReport,
        crate::services::exports::SummaryLine,
        crate::services::settings::SignatureBlock,
    )),
    tags(
        (name = "requests", description = "Bulk request lifecycle"),
        (name = "items", description = "Item catalog"),
        (name = "import", description = "CSV catalog import"),
        (name = "accounts", description = "Offices and user accounts"),
        (name = "exports", description = "Approved-data reports"),
        (name = "settings", description = "System settings"),
    )
)]
pub struct ApiDoc;

/// Swagger UI router serving the generated document.
pub fn swagger_router() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
