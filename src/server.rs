//! Router assembly and server startup.

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config;
use crate::database::DatabaseManager;
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;

/// Build the full application router.
pub fn app() -> Router {
    let config = config::config();

    let protected_api = Router::new()
        .merge(auth_routes())
        .merge(caregiver_routes())
        .merge(elder_routes())
        .merge(appointment_routes())
        .merge(note_routes())
        .merge(invite_routes())
        .merge(dashboard_routes())
        .route_layer(axum::middleware::from_fn(jwt_auth_middleware));

    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_auth_routes())
        .merge(protected_api)
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(cors_layer());

    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router
}

/// Bind and serve until shutdown.
pub async fn run() -> anyhow::Result<()> {
    let config = config::config();
    tracing::info!("Starting Carely API in {:?} mode", config.environment);

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("CARELY_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    println!("🚀 Carely API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

fn public_auth_routes() -> Router {
    use public::auth;

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
}

fn auth_routes() -> Router {
    use protected::auth;

    Router::new().route("/api/auth/whoami", get(auth::whoami))
}

fn caregiver_routes() -> Router {
    use protected::caregivers;

    Router::new().route(
        "/api/caregivers/me",
        get(caregivers::me_get)
            .put(caregivers::me_update)
            .delete(caregivers::me_delete),
    )
}

fn elder_routes() -> Router {
    use protected::elders;

    Router::new()
        .route("/api/elders", post(elders::create).get(elders::list))
        .route(
            "/api/elders/:elder_id",
            get(elders::get).put(elders::update).delete(elders::delete),
        )
        .route("/api/elders/:elder_id/caregivers", get(elders::members))
}

fn appointment_routes() -> Router {
    use protected::appointments;

    Router::new()
        .route(
            "/api/elders/:elder_id/appointments",
            post(appointments::create).get(appointments::list_for_elder),
        )
        .route(
            "/api/elders/:elder_id/appointments/import",
            post(appointments::import),
        )
        .route(
            "/api/appointments/:id",
            get(appointments::get)
                .put(appointments::update)
                .delete(appointments::delete),
        )
        .route("/api/appointments/:id/accept", post(appointments::accept))
        .route("/api/appointments/:id/decline", post(appointments::decline))
}

fn note_routes() -> Router {
    use protected::notes;

    Router::new()
        .route(
            "/api/elders/:elder_id/notes",
            post(notes::create).get(notes::list_for_elder),
        )
        .route(
            "/api/notes/:id",
            get(notes::get).put(notes::update).delete(notes::delete),
        )
}

fn invite_routes() -> Router {
    use protected::invites;

    Router::new()
        .route(
            "/api/elders/:elder_id/invites",
            post(invites::create).get(invites::list_for_elder),
        )
        .route("/api/invites/accept", post(invites::accept))
}

fn dashboard_routes() -> Router {
    use protected::dashboard;

    Router::new().route("/api/dashboard", get(dashboard::overview))
}

fn cors_layer() -> CorsLayer {
    let security = &config::config().security;

    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins = security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok());
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Carely API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Caregiver coordination backend: elders, appointments, notes, and care-team invites",
            "endpoints": {
                "auth": "/auth/register, /auth/login, /auth/refresh (public)",
                "profile": "/api/auth/whoami, /api/caregivers/me (protected)",
                "elders": "/api/elders[/:id], /api/elders/:id/caregivers (protected)",
                "appointments": "/api/elders/:id/appointments[/import], /api/appointments/:id[/accept|/decline] (protected)",
                "notes": "/api/elders/:id/notes, /api/notes/:id (protected)",
                "invites": "/api/elders/:id/invites, /api/invites/accept (protected)",
                "dashboard": "/api/dashboard (protected)"
            }
        }
    }))
}

async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            // Keep the reason in the logs, not the response
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": "unavailable"
                    }
                })),
            )
        }
    }
}
