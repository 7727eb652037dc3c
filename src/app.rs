// src/app.rs

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::AppState,
    docs::ApiDoc,
    handlers,
    middleware::auth::auth_guard,
    services::task_service::UPLOAD_URL_PREFIX,
};

pub fn router(app_state: AppState) -> Router {
    // Public
    let auth_routes = Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout));

    // Everything below goes through auth_guard
    let user_routes = Router::new()
        .route(
            "/",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route("/directory", get(handlers::users::directory))
        .route(
            "/{id}",
            get(handlers::users::get_user).put(handlers::users::update_user),
        )
        .route("/{id}/status", patch(handlers::users::update_status));

    let crm_routes = Router::new()
        // Customers
        .route(
            "/customers",
            get(handlers::crm::list_customers).post(handlers::crm::create_customer),
        )
        .route(
            "/customers/{id}",
            get(handlers::crm::get_customer)
                .put(handlers::crm::update_customer)
                .delete(handlers::crm::delete_customer),
        )
        // Companies
        .route(
            "/companies",
            get(handlers::crm::list_companies).post(handlers::crm::create_company),
        )
        .route(
            "/companies/{id}",
            get(handlers::crm::get_company)
                .put(handlers::crm::update_company)
                .delete(handlers::crm::delete_company),
        )
        // Contacts
        .route(
            "/contacts",
            get(handlers::crm::list_contacts).post(handlers::crm::create_contact),
        )
        .route(
            "/contacts/{id}",
            get(handlers::crm::get_contact)
                .put(handlers::crm::update_contact)
                .delete(handlers::crm::delete_contact),
        )
        // Deals
        .route(
            "/deals",
            get(handlers::crm::list_deals).post(handlers::crm::create_deal),
        )
        .route(
            "/deals/{id}",
            get(handlers::crm::get_deal)
                .put(handlers::crm::update_deal)
                .delete(handlers::crm::delete_deal),
        );

    let task_routes = Router::new()
        .route(
            "/",
            get(handlers::tasks::list_tasks).post(handlers::tasks::create_task),
        )
        .route(
            "/{id}",
            get(handlers::tasks::get_task)
                .put(handlers::tasks::update_task)
                .delete(handlers::tasks::delete_task),
        )
        .route(
            "/{id}/attachments",
            get(handlers::tasks::list_attachments).post(handlers::tasks::upload_attachment),
        )
        .layer(DefaultBodyLimit::max(app_state.settings.max_upload_bytes));

    let sales_routes = Router::new()
        .route(
            "/products",
            get(handlers::sales::list_products).post(handlers::sales::create_product),
        )
        .route(
            "/sales",
            get(handlers::sales::list_sales).post(handlers::sales::create_sale),
        )
        .route("/sales/{id}", get(handlers::sales::get_sale));

    let report_routes = Router::new()
        .route(
            "/",
            get(handlers::reports::list_reports).post(handlers::reports::submit_report),
        )
        .route("/analyze", post(handlers::reports::analyze_reports))
        .route("/{id}", get(handlers::reports::get_report));

    let chat_routes = Router::new()
        .route(
            "/",
            get(handlers::chat::conversation).post(handlers::chat::send_message),
        )
        .route("/read", post(handlers::chat::mark_read))
        .route("/unread", get(handlers::chat::unread_count));

    let permission_routes = Router::new()
        .route("/", post(handlers::permissions::set_permissions))
        .route("/me", get(handlers::permissions::my_modules))
        .route("/users/{id}", get(handlers::permissions::user_grants));

    let protected = Router::new()
        .route(
            "/api/auth/me",
            get(handlers::auth::get_me).put(handlers::auth::update_me),
        )
        .nest("/api/users", user_routes)
        .nest("/api", crm_routes.merge(sales_routes))
        .nest("/api/tasks", task_routes)
        .nest("/api/reports", report_routes)
        .route("/api/voice/ask", post(handlers::reports::ask_voice))
        .nest("/api/messages", chat_routes)
        .nest("/api/permissions", permission_routes)
        .route("/api/modules", get(handlers::permissions::list_modules))
        .route("/api/dashboard/summary", get(handlers::dashboard::get_summary))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .merge(protected)
        .nest_service(
            UPLOAD_URL_PREFIX,
            ServeDir::new(&app_state.settings.upload_dir),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
