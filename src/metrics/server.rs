use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Serialize;
use std::sync::Arc;

use crate::storage::PgAccountStore;

/// Shared state for the infra endpoints.
#[derive(Clone)]
pub struct InfraState {
    pub registry: Arc<Registry>,
    pub store: Arc<PgAccountStore>,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    service: &'static str,
}

/// Start the infra HTTP server (metrics, liveness, readiness).
/// Runs on its own actix system, outside the tonic runtime.
pub async fn start_infra_server(state: InfraState, port: u16) -> std::io::Result<()> {
    tracing::info!("📊 Starting infra server on http://0.0.0.0:{}", port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .route("/metrics", web::get().to(metrics_handler))
            .route("/liveness", web::get().to(liveness_handler))
            .route("/readiness", web::get().to(readiness_handler))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

async fn metrics_handler(state: web::Data<InfraState>) -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

async fn liveness_handler() -> impl Responder {
    HttpResponse::Ok().json(StatusResponse {
        status: "alive",
        service: "account-service",
    })
}

async fn readiness_handler(state: web::Data<InfraState>) -> impl Responder {
    match state.store.ping().await {
        Ok(()) => HttpResponse::Ok().json(StatusResponse {
            status: "ready",
            service: "account-service",
        }),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            HttpResponse::ServiceUnavailable().json(StatusResponse {
                status: "db not ready",
                service: "account-service",
            })
        }
    }
}
