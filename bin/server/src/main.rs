use garage_console_server::{
    app::{self, AppState},
    config::ServerConfig,
    proxy::AdminApi,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!(base_path = config.base_path(), "Loaded configuration");

    let gateway = app::build_gateway(&config).await;
    let mut state = AppState::new(gateway, config.base_path());

    match config.admin_api() {
        Some(settings) => {
            let api = AdminApi::new(settings).expect("failed to create admin API client");
            state = state.with_admin_api(api);
        }
        None => tracing::warn!("API_BASE_URL not set; admin API requests will fail"),
    }

    let router = app::router(state, config.session());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
