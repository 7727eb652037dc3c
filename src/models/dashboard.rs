// src/models/dashboard.rs

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

// Cards at the top of the dashboard
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_customers: i64,
    pub open_deals: i64,
    pub open_deals_value: Decimal,
    pub my_open_tasks: i64,
    pub sales_this_month: Decimal, // everyone's for managers, own otherwise
    pub report_submitted_today: bool,
}
