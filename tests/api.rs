// tests/api.rs

use std::collections::HashMap;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower::ServiceExt;

use cem_dashboard::{
    app,
    config::{AppState, Settings},
    models::auth::User,
};

const JWT_SECRET: &str = "integration-test-secret";

fn settings(database_url: &str) -> Settings {
    let upload_dir = std::env::temp_dir().join("cem-dashboard-tests");
    let vars: HashMap<&str, String> = HashMap::from([
        ("DATABASE_URL", database_url.to_string()),
        ("JWT_SECRET", JWT_SECRET.to_string()),
        ("UPLOAD_DIR", upload_dir.display().to_string()),
    ]);
    Settings::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

// Requests that never reach the database run against a pool that never connects
fn offline_state() -> AppState {
    let url = "postgres://nobody@127.0.0.1:1/none";
    let pool = PgPoolOptions::new().connect_lazy(url).unwrap();
    AppState::from_pool(pool, settings(url)).unwrap()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

// =============================================================================
//  NO DATABASE NEEDED
// =============================================================================

#[tokio::test]
async fn health_is_public() {
    let router = app::router(offline_state());
    let response = router.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_token_is_rejected_in_persian() {
    let router = app::router(offline_state());
    let (status, body) = send(router, get("/api/customers")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
    assert_eq!(
        body["message"],
        json!("توکن احراز هویت نامعتبر است یا ارسال نشده است.")
    );
}

#[tokio::test]
async fn english_is_served_when_asked_for() {
    let router = app::router(offline_state());
    let request = Request::builder()
        .uri("/api/dashboard/summary")
        .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], json!("Authentication token is missing or invalid."));
}

#[tokio::test]
async fn garbage_bearer_and_cookie_tokens_are_rejected() {
    let state = offline_state();

    let request = Request::builder()
        .uri("/api/tasks")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app::router(state.clone()), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/tasks")
        .header(header::COOKIE, "auth-token=still-not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app::router(state), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_validates_before_touching_storage() {
    let router = app::router(offline_state());
    let request = json_request(
        Method::POST,
        "/api/auth/login",
        None,
        json!({ "email": "not-an-email", "password": "x" }),
    );

    let (status, body) = send(router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["details"]["email"].is_array());
}

#[tokio::test]
async fn logout_clears_the_cookie() {
    let router = app::router(offline_state());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/logout")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(cookie.starts_with("auth-token="));
}

#[tokio::test]
async fn openapi_document_is_served() {
    let router = app::router(offline_state());
    let (status, body) = send(router, get("/api-docs/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/permissions"].is_object());
}

// =============================================================================
//  DATABASE SCENARIOS
// =============================================================================

async fn seed_user(state: &AppState, email: &str, role: &str) -> (User, String) {
    let hash = cem_dashboard::services::auth::hash_password("secret123").await.unwrap();
    let user = cem_dashboard::db::UserRepository::new(state.db_pool.clone())
        .create_user(&state.db_pool, "کاربر آزمایشی", email, &hash, role, None, None)
        .await
        .unwrap();
    let token = state.auth_service.create_token(&user).unwrap();
    (user, token)
}

fn online_state(pool: PgPool) -> AppState {
    AppState::from_pool(pool, settings("postgres://unused")).unwrap()
}

#[sqlx::test]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn login_sets_cookie_and_returns_the_user(pool: PgPool) {
    let state = online_state(pool);
    seed_user(&state, "agent@example.com", "sales_agent").await;

    let request = json_request(
        Method::POST,
        "/api/auth/login",
        None,
        json!({ "email": "Agent@Example.com", "password": "secret123" }),
    );
    let response = app::router(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_some());
}

#[sqlx::test]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn duplicate_contact_email_is_refused(pool: PgPool) {
    let state = online_state(pool.clone());
    let (_, token) = seed_user(&state, "agent@example.com", "sales_agent").await;

    let contact = json!({ "firstName": "علی", "lastName": "رضایی", "email": "ali@example.com" });
    let (status, _) = send(
        app::router(state.clone()),
        json_request(Method::POST, "/api/contacts", Some(&token), contact.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app::router(state),
        json_request(Method::POST, "/api/contacts", Some(&token), contact),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[sqlx::test]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn company_with_contacts_cannot_be_deleted(pool: PgPool) {
    let state = online_state(pool);
    let (_, token) = seed_user(&state, "agent@example.com", "sales_agent").await;

    let (_, body) = send(
        app::router(state.clone()),
        json_request(Method::POST, "/api/companies", Some(&token), json!({ "name": "پارس تجارت" })),
    )
    .await;
    let company_id = body["data"]["id"].as_str().unwrap().to_string();

    send(
        app::router(state.clone()),
        json_request(
            Method::POST,
            "/api/contacts",
            Some(&token),
            json!({ "companyId": company_id, "firstName": "مریم", "lastName": "کاظمی" }),
        ),
    )
    .await;

    let request = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/companies/{}", company_id))
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app::router(state), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["contacts"], json!(1));
}

#[sqlx::test]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn user_list_is_for_managers_only(pool: PgPool) {
    let state = online_state(pool);
    let (_, agent_token) = seed_user(&state, "agent@example.com", "sales_agent").await;
    let (_, ceo_token) = seed_user(&state, "ceo@example.com", "CEO").await;

    let request = |token: &str| {
        Request::builder()
            .uri("/api/users")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = send(app::router(state.clone()), request(&agent_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(app::router(state), request(&ceo_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
}

#[sqlx::test]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn granting_twice_keeps_a_single_row(pool: PgPool) {
    let state = online_state(pool.clone());
    state.permission_service.sync_catalog().await.unwrap();
    let (agent, _) = seed_user(&state, "agent@example.com", "sales_agent").await;
    let (_, ceo_token) = seed_user(&state, "ceo@example.com", "ceo").await;

    for granted in [true, false] {
        let (status, body) = send(
            app::router(state.clone()),
            json_request(
                Method::POST,
                "/api/permissions",
                Some(&ceo_token),
                json!({ "userId": agent.id, "moduleId": "customers", "granted": granted }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["persisted"], json!(true));
    }

    let rows: Vec<(bool,)> =
        sqlx::query_as("SELECT granted FROM user_module_permissions WHERE user_id = $1")
            .bind(agent.id)
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(rows, vec![(false,)]);
}

#[sqlx::test]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn managers_see_the_whole_catalog(pool: PgPool) {
    let state = online_state(pool);
    state.permission_service.sync_catalog().await.unwrap();
    let (ceo, _) = seed_user(&state, "ceo@example.com", "مدیر").await;
    let (agent, _) = seed_user(&state, "agent@example.com", "sales_agent").await;

    let for_ceo = state.permission_service.resolve_modules(ceo.id, &ceo.role).await;
    let for_agent = state.permission_service.resolve_modules(agent.id, &agent.role).await;

    assert!(!for_ceo.fallback);
    assert_eq!(for_ceo.modules.len(), state.policy.default_catalog().len());

    let names: Vec<&str> = for_agent.modules.iter().map(|m| m.name.as_str()).collect();
    assert!(names.contains(&"dashboard"));
    assert!(!names.contains(&"customers"));
}

#[sqlx::test]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn batch_with_unknown_module_stores_nothing(pool: PgPool) {
    let state = online_state(pool.clone());
    state.permission_service.sync_catalog().await.unwrap();
    let (agent, _) = seed_user(&state, "agent@example.com", "sales_agent").await;
    let (_, ceo_token) = seed_user(&state, "ceo@example.com", "ceo").await;

    let batch = json!({
        "changes": [
            { "userId": agent.id, "moduleId": "customers", "granted": true },
            { "userId": agent.id, "moduleId": "no_such_module", "granted": true }
        ]
    });
    let (status, body) = send(
        app::router(state),
        json_request(Method::POST, "/api/permissions", Some(&ceo_token), batch),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_module_permissions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 0);
}

#[sqlx::test]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn missing_permissions_table_is_reported_not_persisted(pool: PgPool) {
    let state = online_state(pool.clone());
    state.permission_service.sync_catalog().await.unwrap();
    let (agent, _) = seed_user(&state, "agent@example.com", "sales_agent").await;
    let (_, ceo_token) = seed_user(&state, "ceo@example.com", "ceo").await;

    sqlx::query("DROP TABLE user_module_permissions")
        .execute(&pool)
        .await
        .unwrap();

    let (status, body) = send(
        app::router(state),
        json_request(
            Method::POST,
            "/api/permissions",
            Some(&ceo_token),
            json!({ "userId": agent.id, "moduleId": "customers", "granted": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["persisted"], json!(false));
    assert_eq!(body["data"]["applied"], json!(0));
}

#[sqlx::test]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn contact_email_index_ignores_case(pool: PgPool) {
    let state = online_state(pool.clone());
    let (agent, _) = seed_user(&state, "agent@example.com", "sales_agent").await;
    let repo = cem_dashboard::db::CrmRepository::new(pool);

    let contact = |email: &str| -> cem_dashboard::models::crm::CreateContactPayload {
        serde_json::from_value(json!({ "firstName": "سارا", "lastName": "احمدی", "email": email }))
            .unwrap()
    };

    repo.create_contact(&contact("Sara@Example.com"), agent.id).await.unwrap();
    let second = repo.create_contact(&contact("sara@example.com"), agent.id).await;
    assert!(matches!(
        second,
        Err(cem_dashboard::common::error::AppError::EmailAlreadyExists)
    ));

    // Contacts without an email are not constrained
    let no_email: cem_dashboard::models::crm::CreateContactPayload =
        serde_json::from_value(json!({ "firstName": "رضا", "lastName": "نوری" })).unwrap();
    repo.create_contact(&no_email, agent.id).await.unwrap();
    repo.create_contact(&no_email, agent.id).await.unwrap();
}
