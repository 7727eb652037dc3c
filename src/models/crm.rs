// src/models/crm.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "customer_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    Active,
    Inactive,
    Prospect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "deal_stage", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DealStage {
    Discovery,
    Proposal,
    Negotiation,
    Won,
    Lost,
}

impl DealStage {
    pub fn is_open(self) -> bool {
        !matches!(self, DealStage::Won | DealStage::Lost)
    }
}

// =============================================================================
//  CUSTOMERS
// =============================================================================

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,

    #[schema(example = "فروشگاه نگین")]
    pub name: String,

    pub email: Option<String>,
    pub phone: Option<String>,

    #[schema(example = "enterprise")]
    pub segment: Option<String>,

    pub status: CustomerStatus,
    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerPayload {
    #[validate(length(min = 2, message = "min_length_2"))]
    #[schema(example = "فروشگاه نگین")]
    pub name: String,

    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,

    #[validate(length(min = 7, max = 20, message = "invalid_phone"))]
    pub phone: Option<String>,

    pub segment: Option<String>,
    pub status: Option<CustomerStatus>,
    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerPayload {
    #[validate(length(min = 2, message = "min_length_2"))]
    pub name: Option<String>,

    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,

    #[validate(length(min = 7, max = 20, message = "invalid_phone"))]
    pub phone: Option<String>,

    pub segment: Option<String>,
    pub status: Option<CustomerStatus>,
    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerFilter {
    pub q: Option<String>,
    pub status: Option<CustomerStatus>,
}

// =============================================================================
//  COMPANIES & CONTACTS
// =============================================================================

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,

    #[schema(example = "پارس صنعت")]
    pub name: String,

    pub industry: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyWithContacts {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub company: Company,
    pub contact_count: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompanyPayload {
    #[validate(length(min = 2, message = "min_length_2"))]
    pub name: String,

    pub industry: Option<String>,

    #[validate(url(message = "invalid_url"))]
    pub website: Option<String>,

    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompanyPayload {
    #[validate(length(min = 2, message = "min_length_2"))]
    pub name: Option<String>,

    pub industry: Option<String>,

    #[validate(url(message = "invalid_url"))]
    pub website: Option<String>,

    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompanyFilter {
    pub q: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Uuid,
    pub company_id: Option<Uuid>,

    #[schema(example = "مریم")]
    pub first_name: String,

    #[schema(example = "کریمی")]
    pub last_name: String,

    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactPayload {
    pub company_id: Option<Uuid>,

    #[validate(length(min = 1, message = "required"))]
    pub first_name: String,

    #[validate(length(min = 1, message = "required"))]
    pub last_name: String,

    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,

    pub phone: Option<String>,
    pub job_title: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactPayload {
    pub company_id: Option<Uuid>,

    #[validate(length(min = 1, message = "required"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, message = "required"))]
    pub last_name: Option<String>,

    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,

    pub phone: Option<String>,
    pub job_title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactFilter {
    pub company_id: Option<Uuid>,
    pub q: Option<String>,
}

// =============================================================================
//  DEALS
// =============================================================================

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: Uuid,
    pub customer_id: Uuid,

    #[schema(example = "قرارداد پشتیبانی سالانه")]
    pub title: String,

    pub stage: DealStage,

    #[schema(example = 250000000.0)]
    pub value: Decimal,

    #[schema(example = 60)]
    pub probability: i32,

    pub expected_close_date: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDealPayload {
    pub customer_id: Uuid,

    #[validate(length(min = 2, message = "min_length_2"))]
    pub title: String,

    pub stage: Option<DealStage>,

    #[serde(default)]
    pub value: Decimal,

    #[serde(default)]
    #[validate(range(min = 0, max = 100, message = "invalid_probability"))]
    pub probability: i32,

    #[schema(value_type = Option<String>, format = Date, example = "2026-12-30")]
    pub expected_close_date: Option<NaiveDate>,

    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDealPayload {
    #[validate(length(min = 2, message = "min_length_2"))]
    pub title: Option<String>,

    pub stage: Option<DealStage>,
    pub value: Option<Decimal>,

    #[validate(range(min = 0, max = 100, message = "invalid_probability"))]
    pub probability: Option<i32>,

    #[schema(value_type = Option<String>, format = Date)]
    pub expected_close_date: Option<NaiveDate>,

    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealFilter {
    pub stage: Option<DealStage>,
    pub customer_id: Option<Uuid>,
}
