//! Hexagora game server.

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod driver;
mod protocol;
mod provider;
mod registry;
mod server;

use server::AppState;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse address from env or use default
    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()?;

    info!("Starting Hexagora server on {}", addr);

    let state = web::Data::new(AppState::new());

    HttpServer::new(move || {
        // The browser UI polls from another origin
        App::new()
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .configure(server::configure)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
