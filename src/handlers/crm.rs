// src/handlers/crm.rs

use axum::{
    extract::{Path, Query, State},
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
    models::crm::{
        Company, CompanyFilter, CompanyWithContacts, Contact, ContactFilter, CreateCompanyPayload,
        CreateContactPayload, CreateCustomerPayload, CreateDealPayload, Customer, CustomerFilter,
        Deal, DealFilter, UpdateCompanyPayload, UpdateContactPayload, UpdateCustomerPayload,
        UpdateDealPayload,
    },
};

// =============================================================================
//  CUSTOMERS
// =============================================================================

// GET /api/customers
#[utoipa::path(
    get,
    path = "/api/customers",
    tag = "Customers",
    params(
        ("q" = Option<String>, Query, description = "Search in name, email and phone"),
        ("status" = Option<String>, Query, description = "active | inactive | prospect")
    ),
    responses((status = 200, description = "Customers", body = [Customer])),
    security(("api_jwt" = []))
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Query(filter): Query<CustomerFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let customers = app_state
        .crm_service
        .list_customers(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(customers)))
}

// POST /api/customers
#[utoipa::path(
    post,
    path = "/api/customers",
    tag = "Customers",
    request_body = CreateCustomerPayload,
    responses(
        (status = 201, description = "Customer created", body = Customer),
        (status = 400, description = "Invalid data")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateCustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let customer = app_state
        .crm_service
        .create_customer(user.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(customer).with_message(app_state.i18n_store.t(&locale, "success.customer_created"))),
    ))
}

// GET /api/customers/{id}
#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer", body = Customer),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = app_state
        .crm_service
        .get_customer(id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(customer)))
}

// PUT /api/customers/{id}
#[utoipa::path(
    put,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    request_body = UpdateCustomerPayload,
    responses(
        (status = 200, description = "Customer updated", body = Customer),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let customer = app_state
        .crm_service
        .update_customer(id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(
        Envelope::ok(customer).with_message(app_state.i18n_store.t(&locale, "success.customer_updated")),
    ))
}

// DELETE /api/customers/{id}
#[utoipa::path(
    delete,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer deleted"),
        (status = 403, description = "Caller is not a manager"),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    _manager: RequireManager,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .crm_service
        .delete_customer(id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::message(
        app_state.i18n_store.t(&locale, "success.customer_deleted"),
    )))
}

// =============================================================================
//  COMPANIES
// =============================================================================

// GET /api/companies
#[utoipa::path(
    get,
    path = "/api/companies",
    tag = "Companies",
    params(("q" = Option<String>, Query, description = "Search in name and industry")),
    responses((status = 200, description = "Companies with their contact count", body = [CompanyWithContacts])),
    security(("api_jwt" = []))
)]
pub async fn list_companies(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Query(filter): Query<CompanyFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let companies = app_state
        .crm_service
        .list_companies(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(companies)))
}

// POST /api/companies
#[utoipa::path(
    post,
    path = "/api/companies",
    tag = "Companies",
    request_body = CreateCompanyPayload,
    responses(
        (status = 201, description = "Company created", body = Company),
        (status = 400, description = "Invalid data")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_company(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateCompanyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let company = app_state
        .crm_service
        .create_company(user.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(company).with_message(app_state.i18n_store.t(&locale, "success.company_created"))),
    ))
}

// GET /api/companies/{id}
#[utoipa::path(
    get,
    path = "/api/companies/{id}",
    tag = "Companies",
    params(("id" = Uuid, Path, description = "Company id")),
    responses(
        (status = 200, description = "Company", body = CompanyWithContacts),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_company(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let company = app_state
        .crm_service
        .get_company(id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(company)))
}

// PUT /api/companies/{id}
#[utoipa::path(
    put,
    path = "/api/companies/{id}",
    tag = "Companies",
    params(("id" = Uuid, Path, description = "Company id")),
    request_body = UpdateCompanyPayload,
    responses(
        (status = 200, description = "Company updated", body = Company),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_company(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCompanyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let company = app_state
        .crm_service
        .update_company(id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(
        Envelope::ok(company).with_message(app_state.i18n_store.t(&locale, "success.company_updated")),
    ))
}

// DELETE /api/companies/{id}
#[utoipa::path(
    delete,
    path = "/api/companies/{id}",
    tag = "Companies",
    params(("id" = Uuid, Path, description = "Company id")),
    responses(
        (status = 200, description = "Company deleted"),
        (status = 400, description = "Company still has contacts"),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_company(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .crm_service
        .delete_company(id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::message(
        app_state.i18n_store.t(&locale, "success.company_deleted"),
    )))
}

// =============================================================================
//  CONTACTS
// =============================================================================

// GET /api/contacts
#[utoipa::path(
    get,
    path = "/api/contacts",
    tag = "Contacts",
    params(
        ("companyId" = Option<Uuid>, Query, description = "Only contacts of this company"),
        ("q" = Option<String>, Query, description = "Search in name and email")
    ),
    responses((status = 200, description = "Contacts", body = [Contact])),
    security(("api_jwt" = []))
)]
pub async fn list_contacts(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Query(filter): Query<ContactFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let contacts = app_state
        .crm_service
        .list_contacts(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(contacts)))
}

// POST /api/contacts
#[utoipa::path(
    post,
    path = "/api/contacts",
    tag = "Contacts",
    request_body = CreateContactPayload,
    responses(
        (status = 201, description = "Contact created", body = Contact),
        (status = 400, description = "Invalid data or email already used"),
        (status = 404, description = "Company not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_contact(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateContactPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let contact = app_state
        .crm_service
        .create_contact(user.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(contact).with_message(app_state.i18n_store.t(&locale, "success.contact_created"))),
    ))
}

// GET /api/contacts/{id}
#[utoipa::path(
    get,
    path = "/api/contacts/{id}",
    tag = "Contacts",
    params(("id" = Uuid, Path, description = "Contact id")),
    responses(
        (status = 200, description = "Contact", body = Contact),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_contact(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = app_state
        .crm_service
        .get_contact(id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(contact)))
}

// PUT /api/contacts/{id}
#[utoipa::path(
    put,
    path = "/api/contacts/{id}",
    tag = "Contacts",
    params(("id" = Uuid, Path, description = "Contact id")),
    request_body = UpdateContactPayload,
    responses(
        (status = 200, description = "Contact updated", body = Contact),
        (status = 400, description = "Email used by another contact"),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_contact(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateContactPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let contact = app_state
        .crm_service
        .update_contact(id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(
        Envelope::ok(contact).with_message(app_state.i18n_store.t(&locale, "success.contact_updated")),
    ))
}

// DELETE /api/contacts/{id}
#[utoipa::path(
    delete,
    path = "/api/contacts/{id}",
    tag = "Contacts",
    params(("id" = Uuid, Path, description = "Contact id")),
    responses(
        (status = 200, description = "Contact deleted"),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_contact(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .crm_service
        .delete_contact(id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::message(
        app_state.i18n_store.t(&locale, "success.contact_deleted"),
    )))
}

// =============================================================================
//  DEALS
// =============================================================================

// GET /api/deals
#[utoipa::path(
    get,
    path = "/api/deals",
    tag = "Deals",
    params(
        ("stage" = Option<String>, Query, description = "discovery | proposal | negotiation | won | lost"),
        ("customerId" = Option<Uuid>, Query, description = "Only deals of this customer")
    ),
    responses((status = 200, description = "Deals", body = [Deal])),
    security(("api_jwt" = []))
)]
pub async fn list_deals(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Query(filter): Query<DealFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let deals = app_state
        .crm_service
        .list_deals(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(deals)))
}

// POST /api/deals
#[utoipa::path(
    post,
    path = "/api/deals",
    tag = "Deals",
    request_body = CreateDealPayload,
    responses(
        (status = 201, description = "Deal created", body = Deal),
        (status = 404, description = "Customer not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_deal(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateDealPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let deal = app_state
        .crm_service
        .create_deal(user.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(deal).with_message(app_state.i18n_store.t(&locale, "success.deal_created"))),
    ))
}

// GET /api/deals/{id}
#[utoipa::path(
    get,
    path = "/api/deals/{id}",
    tag = "Deals",
    params(("id" = Uuid, Path, description = "Deal id")),
    responses(
        (status = 200, description = "Deal", body = Deal),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_deal(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let deal = app_state
        .crm_service
        .get_deal(id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(deal)))
}

// PUT /api/deals/{id}
#[utoipa::path(
    put,
    path = "/api/deals/{id}",
    tag = "Deals",
    params(("id" = Uuid, Path, description = "Deal id")),
    request_body = UpdateDealPayload,
    responses(
        (status = 200, description = "Deal updated", body = Deal),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_deal(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDealPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let deal = app_state
        .crm_service
        .update_deal(id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(
        Envelope::ok(deal).with_message(app_state.i18n_store.t(&locale, "success.deal_updated")),
    ))
}

// DELETE /api/deals/{id}
#[utoipa::path(
    delete,
    path = "/api/deals/{id}",
    tag = "Deals",
    params(("id" = Uuid, Path, description = "Deal id")),
    responses(
        (status = 200, description = "Deal deleted"),
        (status = 403, description = "Neither a manager nor the assignee"),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_deal(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let is_manager = app_state.policy.is_manager(&user.role);
    app_state
        .crm_service
        .delete_deal(id, user.id, is_manager)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::message(
        app_state.i18n_store.t(&locale, "success.deal_deleted"),
    )))
}
