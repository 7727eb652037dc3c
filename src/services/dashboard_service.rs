// src/services/dashboard_service.rs

use chrono::Utc;
use uuid::Uuid;

use crate::{common::error::AppError, db::DashboardRepository, models::dashboard::DashboardSummary};

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
}

impl DashboardService {
    pub fn new(repo: DashboardRepository) -> Self {
        Self { repo }
    }

    /// Managers see everyone's sales of the month, others their own.
    pub async fn get_summary(&self, user_id: Uuid, is_manager: bool) -> Result<DashboardSummary, AppError> {
        let sales_of = if is_manager { None } else { Some(user_id) };
        let today = Utc::now().date_naive();

        self.repo
            .get_summary(self.repo.pool(), user_id, sales_of, today)
            .await
    }
}
