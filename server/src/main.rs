use std::env;
use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    Extension, Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weather_service_cli::weather::OpenMeteoClient;

use server::routes::{jobs::job_routes, suggestions::suggestion_routes};
use server::state::AppState;
use server::store::postgres::PgJobStore;
use server::{db, worker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "server=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let client_url = env::var("CLIENT_URL").expect("CLIENT_URL must be set");

    let pool = db::init_db().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let weather = OpenMeteoClient::new()?;
    let state = AppState::new(Arc::new(PgJobStore::new(pool)), weather);

    // old COMPLETED/FAILED rows are swept in the background
    tokio::spawn(worker::cleanup_loop(state.store.clone()));

    let cors = CorsLayer::new()
        .allow_origin(client_url.parse::<HeaderValue>()?)
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    let app = Router::new()
        .nest("/api", job_routes())
        .nest("/api", suggestion_routes())
        .layer(Extension(state))
        .layer(cors);

    let addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    tracing::info!("listening on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
