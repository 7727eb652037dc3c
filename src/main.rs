//src/main.rs

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use cem_dashboard::{
    app,
    config::{AppState, Settings},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    // A configuration error stops the process before anything binds
    let settings = Settings::from_env()?;
    let app_state = AppState::new(settings).await?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("failed to run database migrations")?;

    tracing::info!("database migrations applied");

    // Catalog seeding is best effort; navigation falls back to the built-in list
    match app_state.permission_service.sync_catalog().await {
        Ok(0) => {}
        Ok(count) => tracing::info!(count, "module catalog initialised"),
        Err(e) => tracing::warn!(error = %e, "module catalog could not be seeded"),
    }

    if let Some((email, password)) = &app_state.settings.bootstrap_admin {
        let created = app_state
            .auth_service
            .bootstrap_admin(&app_state.db_pool, email, password)
            .await
            .context("failed to create the bootstrap administrator")?;

        if let Some(admin) = created {
            tracing::info!(user_id = %admin.id, email = %admin.email, "bootstrap administrator created");
        }
    }

    let addr = app_state.settings.bind_addr.clone();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app::router(app_state))
        .await
        .context("server error")?;

    Ok(())
}
