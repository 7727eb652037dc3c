// src/handlers/sales.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{envelope::Envelope, error::{ApiError, AppError}},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, rbac::RequireManager},
    models::sales::{CreateProductPayload, CreateSalePayload, Product, Sale, SaleDetail},
};

// GET /api/products
#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Sales",
    responses((status = 200, description = "Active products", body = [Product])),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let products = app_state
        .sales_service
        .list_products()
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(products)))
}

// POST /api/products
#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Sales",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 403, description = "Caller is not a manager")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    locale: Locale,
    _manager: RequireManager,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let product = app_state
        .sales_service
        .create_product(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(product).with_message(app_state.i18n_store.t(&locale, "success.product_created"))),
    ))
}

// GET /api/sales
#[utoipa::path(
    get,
    path = "/api/sales",
    tag = "Sales",
    responses((status = 200, description = "All sales for managers, own sales otherwise", body = [Sale])),
    security(("api_jwt" = []))
)]
pub async fn list_sales(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let sold_by = (!app_state.policy.is_manager(&user.role)).then_some(user.id);
    let sales = app_state
        .sales_service
        .list_sales(sold_by)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(sales)))
}

// POST /api/sales
#[utoipa::path(
    post,
    path = "/api/sales",
    tag = "Sales",
    request_body = CreateSalePayload,
    responses(
        (status = 201, description = "Sale recorded with its priced lines", body = SaleDetail),
        (status = 400, description = "Empty sale, bad quantity or discount"),
        (status = 404, description = "Customer, deal or product not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_sale(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateSalePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let sale = app_state
        .sales_service
        .create_sale(user.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(sale).with_message(app_state.i18n_store.t(&locale, "success.sale_created"))),
    ))
}

// GET /api/sales/{id}
#[utoipa::path(
    get,
    path = "/api/sales/{id}",
    tag = "Sales",
    params(("id" = Uuid, Path, description = "Sale id")),
    responses(
        (status = 200, description = "Sale with its lines", body = SaleDetail),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_sale(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let is_manager = app_state.policy.is_manager(&user.role);
    let sale = app_state
        .sales_service
        .get_sale(id, user.id, is_manager)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(sale)))
}
