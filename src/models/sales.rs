// src/models/sales.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,

    #[schema(example = "اشتراک سالانه")]
    pub name: String,

    pub sku: Option<String>,

    #[schema(example = 12000000.0)]
    pub price: Decimal,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(length(min = 2, message = "min_length_2"))]
    pub name: String,

    pub sku: Option<String>,

    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub deal_id: Option<Uuid>,
    pub sold_by: Uuid,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub sale_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,

    /// Percent, 0 to 100.
    pub discount: Decimal,

    pub line_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemPayload {
    pub product_id: Uuid,

    #[schema(example = 2)]
    pub quantity: i32,

    /// Defaults to the product's list price.
    pub unit_price: Option<Decimal>,

    #[serde(default)]
    #[schema(example = 10.0)]
    pub discount: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSalePayload {
    pub customer_id: Uuid,
    pub deal_id: Option<Uuid>,
    pub notes: Option<String>,

    #[schema(value_type = Option<String>, format = Date)]
    pub sale_date: Option<NaiveDate>,

    pub items: Vec<SaleItemPayload>,
}

/// Line ready to be stored, price resolved and total computed.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount: Decimal,
    pub line_total: Decimal,
}
