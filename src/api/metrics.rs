use actix_web::{web, HttpResponse, Responder};

use crate::metrics::METRICS;
use crate::state::AppState;

/// 抓取时重新计算每个进程的状态再输出
pub async fn get_metrics(data: web::Data<AppState>) -> impl Responder {
    match data.orchestrator.definitions() {
        Ok(definitions) => {
            for definition in &definitions {
                match data.orchestrator.status_of(definition).await {
                    Ok(status) => METRICS.observe_status(definition, &status),
                    Err(e) => log::warn!("Failed to compute status for {}: {}", definition.name, e),
                }
            }
        }
        Err(e) => log::warn!("Failed to load process definitions for metrics: {}", e),
    }

    match METRICS.render() {
        Ok(metrics_text) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(metrics_text),
        Err(e) => {
            log::error!("Failed to render metrics: {}", e);
            HttpResponse::InternalServerError().body("Failed to render metrics")
        }
    }
}
