pub mod ai_client;
pub mod auth;
pub mod chat_service;
pub mod crm_service;
pub mod dashboard_service;
pub mod navigation;
pub mod permission_service;
pub mod report_service;
pub mod sales_service;
pub mod task_service;
pub mod user_service;
