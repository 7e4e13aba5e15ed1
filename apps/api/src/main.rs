//! Obratrack API composition root.

#![forbid(unsafe_code)]

mod auth;
mod dto;
mod error;
mod handlers;
mod middleware;
mod seed;
mod state;

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use chrono::{Duration, Utc};
use obratrack_application::{
    AuditLogService, AuditRecorder, AuthorizationService, IdentityService, PasswordHasher,
    PermissionTable, ProgressService, SiteService, TaskService, UserAdminService, UserRepository,
};
use obratrack_core::AppError;
use obratrack_infrastructure::{
    Argon2PasswordHasher, PostgresAuditLogRepository, PostgresAuditRepository,
    PostgresDeniedAttemptRepository, PostgresPermissionRepository, PostgresSiteRepository,
    PostgresTaskRepository, PostgresTokenRepository, PostgresUserRepository,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let subcommand = env::args().nth(1);
    let migrate_only = subcommand.as_deref() == Some("migrate");
    let seed_requested = subcommand.as_deref() == Some("seed");

    let database_url = required_env("DATABASE_URL")?;
    let frontend_url =
        env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
    let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let api_port = env::var("API_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3001);
    let token_ttl_minutes = env::var("TOKEN_TTL_MINUTES")
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .unwrap_or(8 * 60);

    if token_ttl_minutes <= 0 {
        return Err(AppError::Validation(
            "TOKEN_TTL_MINUTES must be greater than zero".to_owned(),
        ));
    }

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let permission_repository = PostgresPermissionRepository::new(pool.clone());
    let user_repository: Arc<dyn UserRepository> =
        Arc::new(PostgresUserRepository::new(pool.clone()));
    let password_hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2PasswordHasher::new());

    if seed_requested {
        let admin_email = required_env("BOOTSTRAP_ADMIN_EMAIL")?;
        let admin_password = required_env("BOOTSTRAP_ADMIN_PASSWORD")?;

        seed::seed_permissions(&permission_repository).await?;
        seed::seed_bootstrap_admin(
            &user_repository,
            &password_hasher,
            &admin_email,
            &admin_password,
        )
        .await?;

        info!("seed completed");
        return Ok(());
    }

    // The grant table is read once here and shared immutably; administrative
    // grant changes require a restart.
    let permission_table = Arc::new(
        PermissionTable::load(&permission_repository)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to load permission table: {error}"))
            })?,
    );
    info!(grants = permission_table.len(), "permission table loaded");

    let token_repository = PostgresTokenRepository::new(pool.clone());
    let purged = token_repository.purge_expired(Utc::now()).await?;
    if purged > 0 {
        info!(purged, "expired bearer tokens removed");
    }

    let denied_attempt_repository = Arc::new(PostgresDeniedAttemptRepository::new(pool.clone()));
    let authorization_service =
        AuthorizationService::new(permission_table, denied_attempt_repository.clone());

    let audit_repository = Arc::new(PostgresAuditRepository::new(pool.clone()));
    let (audit_recorder, audit_drain) = AuditRecorder::spawn(audit_repository);
    let audit_log_repository = Arc::new(PostgresAuditLogRepository::new(pool.clone()));
    let audit_log_service = AuditLogService::new(
        authorization_service.clone(),
        audit_log_repository,
        denied_attempt_repository,
    );

    let identity_service = IdentityService::new(
        user_repository.clone(),
        Arc::new(token_repository),
        password_hasher.clone(),
        Duration::minutes(token_ttl_minutes),
    );

    let site_repository = Arc::new(PostgresSiteRepository::new(pool.clone()));
    let site_service = SiteService::new(
        site_repository.clone(),
        authorization_service.clone(),
        audit_recorder.clone(),
    );

    let task_repository = Arc::new(PostgresTaskRepository::new(pool.clone()));
    let task_service = TaskService::new(
        task_repository.clone(),
        site_repository,
        authorization_service.clone(),
        audit_recorder.clone(),
    );
    let progress_service = ProgressService::new(
        task_repository,
        authorization_service.clone(),
        audit_recorder.clone(),
    );

    let user_admin_service = UserAdminService::new(
        user_repository,
        password_hasher,
        authorization_service.clone(),
        audit_recorder.clone(),
    );

    let app_state = AppState {
        identity_service,
        site_service,
        task_service,
        progress_service,
        user_admin_service,
        audit_log_service,
    };

    let protected_routes = Router::new()
        .route(
            "/api/projects",
            get(handlers::projects::list_projects_handler)
                .post(handlers::projects::create_project_handler),
        )
        .route(
            "/api/projects/{project_id}",
            put(handlers::projects::update_project_handler),
        )
        .route(
            "/api/projects/{project_id}/areas",
            get(handlers::projects::list_areas_handler)
                .post(handlers::projects::create_area_handler),
        )
        .route(
            "/api/areas/{area_id}/equipment",
            get(handlers::equipment::list_equipment_handler)
                .post(handlers::equipment::create_equipment_handler),
        )
        .route(
            "/api/equipment/{equipment_id}",
            get(handlers::equipment::get_equipment_handler),
        )
        .route(
            "/api/equipment/{equipment_id}/tasks",
            get(handlers::tasks::list_tasks_handler).post(handlers::tasks::create_task_handler),
        )
        .route(
            "/api/tasks/{task_id}",
            get(handlers::tasks::get_task_handler).delete(handlers::tasks::delete_task_handler),
        )
        .route(
            "/api/tasks/{task_id}/progress",
            post(handlers::tasks::append_progress_handler),
        )
        .route(
            "/api/tasks/{task_id}/history",
            get(handlers::tasks::list_history_handler),
        )
        .route(
            "/api/history/{entry_id}",
            delete(handlers::tasks::delete_history_entry_handler),
        )
        .route(
            "/api/users",
            get(handlers::users::list_users_handler).post(handlers::users::create_user_handler),
        )
        .route(
            "/api/users/{user_id}/active",
            put(handlers::users::set_user_active_handler),
        )
        .route(
            "/api/users/{user_id}/assignment",
            put(handlers::users::update_user_assignment_handler),
        )
        .route(
            "/api/security/audit-log",
            get(handlers::audit::list_audit_log_handler),
        )
        .route(
            "/api/security/denied-attempts",
            get(handlers::audit::list_denied_attempts_handler),
        )
        .route("/auth/me", get(auth::me_handler))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_auth,
        ));

    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(&frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    let app = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state);

    let host = IpAddr::from_str(&api_host)
        .map_err(|error| AppError::Internal(format!("invalid API_HOST '{api_host}': {error}")))?;
    let address = SocketAddr::from((host, api_port));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "obratrack-api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))?;

    // In-flight audit writes are flushed before the process exits; accepted
    // entries are never dropped by a clean shutdown.
    audit_drain.drain().await;
    info!("audit writer drained; shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        info!("failed to listen for shutdown signal; exiting on server error only");
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}
