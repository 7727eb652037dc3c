// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(title = "CEM Dashboard API", description = "Persian CRM and customer experience dashboard"),
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::get_me,
        handlers::auth::update_me,

        // --- Users ---
        handlers::users::list_users,
        handlers::users::directory,
        handlers::users::create_user,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::update_status,

        // --- Customers ---
        handlers::crm::list_customers,
        handlers::crm::create_customer,
        handlers::crm::get_customer,
        handlers::crm::update_customer,
        handlers::crm::delete_customer,

        // --- Companies ---
        handlers::crm::list_companies,
        handlers::crm::create_company,
        handlers::crm::get_company,
        handlers::crm::update_company,
        handlers::crm::delete_company,

        // --- Contacts ---
        handlers::crm::list_contacts,
        handlers::crm::create_contact,
        handlers::crm::get_contact,
        handlers::crm::update_contact,
        handlers::crm::delete_contact,

        // --- Deals ---
        handlers::crm::list_deals,
        handlers::crm::create_deal,
        handlers::crm::get_deal,
        handlers::crm::update_deal,
        handlers::crm::delete_deal,

        // --- Tasks ---
        handlers::tasks::list_tasks,
        handlers::tasks::create_task,
        handlers::tasks::get_task,
        handlers::tasks::update_task,
        handlers::tasks::delete_task,
        handlers::tasks::list_attachments,
        handlers::tasks::upload_attachment,

        // --- Sales ---
        handlers::sales::list_products,
        handlers::sales::create_product,
        handlers::sales::list_sales,
        handlers::sales::create_sale,
        handlers::sales::get_sale,

        // --- Reports ---
        handlers::reports::submit_report,
        handlers::reports::list_reports,
        handlers::reports::get_report,
        handlers::reports::analyze_reports,
        handlers::reports::ask_voice,

        // --- Chat ---
        handlers::chat::conversation,
        handlers::chat::send_message,
        handlers::chat::mark_read,
        handlers::chat::unread_count,

        // --- Permissions ---
        handlers::permissions::list_modules,
        handlers::permissions::my_modules,
        handlers::permissions::user_grants,
        handlers::permissions::set_permissions,

        // --- Dashboard ---
        handlers::dashboard::get_summary,
    ),
    components(
        schemas(
            // --- Auth & users ---
            models::auth::UserStatus,
            models::auth::User,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::auth::UpdateProfilePayload,
            models::user::CreateUserPayload,
            models::user::UpdateUserPayload,
            models::user::UpdateStatusPayload,
            models::user::DirectoryEntry,

            // --- CRM ---
            models::crm::CustomerStatus,
            models::crm::DealStage,
            models::crm::Customer,
            models::crm::CreateCustomerPayload,
            models::crm::UpdateCustomerPayload,
            models::crm::Company,
            models::crm::CompanyWithContacts,
            models::crm::CreateCompanyPayload,
            models::crm::UpdateCompanyPayload,
            models::crm::Contact,
            models::crm::CreateContactPayload,
            models::crm::UpdateContactPayload,
            models::crm::Deal,
            models::crm::CreateDealPayload,
            models::crm::UpdateDealPayload,

            // --- Tasks ---
            models::task::TaskStatus,
            models::task::TaskPriority,
            models::task::Task,
            models::task::CreateTaskPayload,
            models::task::UpdateTaskPayload,
            models::task::TaskAttachment,
            models::task::AttachmentResponse,

            // --- Sales ---
            models::sales::Product,
            models::sales::CreateProductPayload,
            models::sales::Sale,
            models::sales::SaleItem,
            models::sales::SaleDetail,
            models::sales::SaleItemPayload,
            models::sales::CreateSalePayload,

            // --- Reports ---
            models::report::DailyReport,
            models::report::ReportWithAuthor,
            models::report::SubmitReportPayload,
            models::report::AnalyzeReportsPayload,
            models::report::AnalysisSource,
            models::report::AnalysisResult,
            models::report::VoiceQuestionPayload,
            models::report::VoiceAnswer,

            // --- Chat ---
            models::chat::ChatMessage,
            models::chat::SendMessagePayload,
            models::chat::MarkReadPayload,
            models::chat::UnreadCount,

            // --- Permissions ---
            models::module::Module,
            models::module::ResolvedModules,
            models::module::NavEntry,
            models::module::NavigationResponse,
            models::module::ModuleGrant,
            models::module::UserModuleGrants,
            models::module::PermissionChange,
            models::module::PermissionWriteOutcome,

            // --- Dashboard ---
            models::dashboard::DashboardSummary,
        )
    ),
    tags(
        (name = "Auth", description = "Login, logout and own profile"),
        (name = "Users", description = "Team members and their status"),
        (name = "Customers", description = "Customer records"),
        (name = "Companies", description = "Companies and their contact count"),
        (name = "Contacts", description = "People at companies"),
        (name = "Deals", description = "Sales pipeline"),
        (name = "Tasks", description = "Work items and attachments"),
        (name = "Sales", description = "Products and recorded sales"),
        (name = "Reports", description = "Daily work reports and their analysis"),
        (name = "Voice", description = "Answers to transcribed voice questions"),
        (name = "Chat", description = "Direct messages between users"),
        (name = "Permissions", description = "Module catalog and per-user access"),
        (name = "Dashboard", description = "Headline counters")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_resource() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for expected in [
            "/api/auth/login",
            "/api/customers/{id}",
            "/api/tasks/{id}/attachments",
            "/api/reports/analyze",
            "/api/permissions",
            "/api/messages/unread",
            "/api/dashboard/summary",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }

        let schemes = doc.components.expect("components").security_schemes;
        assert!(schemes.contains_key("api_jwt"));
    }
}
