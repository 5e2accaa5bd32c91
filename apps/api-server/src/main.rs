//! # Feedline API Server
//!
//! The main entry point for the Actix-web HTTP server.

use actix_web::{App, HttpServer, web};
use anyhow::Context;
use tracing_actix_web::TracingLogger;

mod background;
mod config;
mod handlers;
mod middleware;
mod state;
mod telemetry;

use config::AppConfig;
use state::AppState;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();
    telemetry::init_telemetry(&config.telemetry);

    tracing::info!(
        "Starting Feedline API Server on {}:{}",
        config.host,
        config.port
    );

    let state = AppState::new(&config).await?;

    state
        .feed
        .subscribe(&*state.bus)
        .await
        .context("feed consumers could not subscribe")?;

    #[cfg(feature = "scheduler")]
    let mut scheduler = {
        let scheduler = background::Scheduler::new(config.scheduler.clone()).await?;
        background::register_jobs(&scheduler, &state).await?;
        scheduler.start().await?;
        scheduler
    };

    let app_state = state.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(app_state.clone()))
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    #[cfg(feature = "scheduler")]
    scheduler.shutdown().await?;

    tracing::info!("Server stopped");
    Ok(())
}
