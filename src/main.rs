mod config;
mod guard;
mod identity;
mod provider;
mod routes;
mod state;

use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::GateConfig::from_env().expect("invalid configuration");
    let route_table = guard::RouteTable::portal();
    route_table.validate().expect("route table partitions overlap");

    let provider = provider::hosted::HostedAuthClient::new(&config.provider, config.cookie_secure)
        .expect("auth provider client init failed");
    let port = config.port;
    let state = state::AppState::new(config, Arc::new(provider), route_table);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "clinic gate listening");
    axum::serve(listener, app).await.expect("server failed");
}
