pub mod user_repo;
pub use user_repo::UserRepository;
pub mod module_repo;
pub use module_repo::ModuleRepository;
pub mod crm_repo;
pub use crm_repo::CrmRepository;
pub mod task_repo;
pub use task_repo::TaskRepository;
pub mod sales_repo;
pub use sales_repo::SalesRepository;
pub mod report_repo;
pub use report_repo::ReportRepository;
pub mod chat_repo;
pub use chat_repo::ChatRepository;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;
