//! Health check endpoint.

use actix_web::{HttpResponse, web};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct PoolHealth {
    pub name: String,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub rejected: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub pools: Vec<PoolHealth>,
}

/// Health check endpoint - returns server status and worker pool counters.
///
/// GET /api/health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let pools = state
        .pools
        .iter()
        .map(|pool| {
            let stats = pool.stats();
            PoolHealth {
                name: pool.name().to_string(),
                pending: stats.pending,
                processing: stats.processing,
                completed: stats.completed,
                rejected: stats.rejected,
            }
        })
        .collect();

    let response = HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        pools,
    };

    HttpResponse::Ok().json(response)
}
