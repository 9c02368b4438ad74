use anyhow::Context;
use axum::http::HeaderValue;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

use crm_gateway::accounts::GoTrueAccountAdmin;
use crm_gateway::auth::JwtSessionResolver;
use crm_gateway::config::{self, AppConfig};
use crm_gateway::database::{DatabaseManager, PgRecordStore, PgRoleStore};
use crm_gateway::gateway::MutationGateway;
use crm_gateway::handlers;
use crm_gateway::refresh::BroadcastRefresh;

#[derive(Parser)]
#[command(name = "crm-gateway")]
#[command(about = "Authorized mutation gateway for the CRM")]
#[command(version)]
struct Args {
    #[arg(long, env = "API_HOST", default_value = "0.0.0.0", help = "Address to bind")]
    host: String,

    #[arg(long, help = "Port to listen on (overrides API_PORT)")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL and AUTH_* are picked up
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = config::config();
    tracing::info!("Starting CRM gateway in {:?} mode", config.environment);

    let gateway = build_gateway(config).await?;

    let mut app = handlers::router(Arc::new(gateway))
        .layer(RequestBodyLimitLayer::new(config.api.max_request_size_bytes))
        .layer(cors_layer(&config.security.cors_origins));
    if config.api.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    let port = args.port.unwrap_or(config.api.port);
    let bind_addr: SocketAddr = format!("{}:{}", args.host, port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", args.host, port))?;
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("CRM gateway listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn build_gateway(config: &AppConfig) -> anyhow::Result<MutationGateway> {
    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;

    if config.provider.jwt_secret.is_empty() {
        tracing::warn!("AUTH_JWT_SECRET is not set; every request will be unauthenticated");
    }
    let sessions = JwtSessionResolver::new(&config.provider.jwt_secret, &config.security.jwt_audience);

    let gateway = MutationGateway::new(
        Arc::new(sessions),
        Arc::new(PgRoleStore::new(pool.clone())),
        Arc::new(PgRecordStore::new(pool)),
        Arc::new(BroadcastRefresh::default()),
    );

    match (&config.provider.url, &config.provider.service_role_key) {
        (Some(url), Some(key)) => {
            let admin = GoTrueAccountAdmin::new(url, key.clone(), Duration::from_secs(config.provider.request_timeout_secs))
                .context("failed to build the account admin client")?;
            tracing::info!("Account management enabled via {}", url);
            Ok(gateway.with_accounts(Arc::new(admin)))
        }
        _ => {
            tracing::warn!("AUTH_PROVIDER_URL or AUTH_SERVICE_ROLE_KEY missing; employee management is disabled");
            Ok(gateway)
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
