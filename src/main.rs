use axum::{routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use agency_ledger_api::{config, database, handlers, middleware as mw};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    let config = config::config();

    tracing_subscriber::fmt::init();
    tracing::info!("Starting Agency Ledger API in {:?} mode", config.environment);

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("LEDGER_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Agency Ledger API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        // Protected API (bearer token + tenant context)
        .merge(api_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn public_routes() -> Router {
    use axum::routing::post;
    use handlers::public::{ai, auth};

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        // Optional user-supplied key gates this one, not a bearer token
        .route("/ai/generate", post(ai::generate))
}

fn api_routes() -> Router {
    use axum::routing::{delete, post};
    use handlers::protected::{agents, assignments, auth, backup, billing, settings, transactions};

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        // Backup / restore
        .route("/api/backup/export", get(backup::export))
        .route("/api/backup/restore", post(backup::restore))
        // Team roster
        .route("/api/agents", get(agents::list).post(agents::create))
        .route(
            "/api/agents/:id",
            get(agents::get).put(agents::update).delete(agents::delete),
        )
        // Ledger
        .route("/api/transactions", get(transactions::list).post(transactions::create))
        .route("/api/transactions/:id", delete(transactions::delete))
        // Case assignments
        .route("/api/assignments", get(assignments::list).post(assignments::create))
        // Agency settings
        .route("/api/settings", get(settings::get).put(settings::update))
        // Billing state
        .route(
            "/api/billing/subscription",
            get(billing::get_subscription).post(billing::update_subscription),
        )
        // Outermost layer runs first: JWT, then tenant resolution
        .layer(axum::middleware::from_fn(mw::resolve_tenant_middleware))
        .layer(axum::middleware::from_fn(mw::jwt_auth_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "name": "Agency Ledger API",
        "version": version,
        "description": "Financial management backend for real-estate agencies",
        "endpoints": {
            "home": "/ (public)",
            "auth": "/auth/register, /auth/login (public - token acquisition)",
            "ai": "/ai/generate (public - optional caller key)",
            "backup": "/api/backup/export, /api/backup/restore (protected)",
            "agents": "/api/agents[/:id] (protected)",
            "transactions": "/api/transactions[/:id] (protected)",
            "assignments": "/api/assignments (protected)",
            "settings": "/api/settings (protected)",
            "billing": "/api/billing/subscription (protected)",
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match database::manager::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "status": "degraded",
                "timestamp": now,
                "error": "database unavailable",
                "database_error": e.to_string()
            })),
        ),
    }
}
