pub mod metrics;
pub mod server;

pub use metrics::get_metrics;
pub use server::{
    create_process, delete_process, get_process, get_process_status, list_processes,
    reorder_processes, start_all_processes, start_process, stop_all_processes, stop_process,
    update_process,
};

use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Responder, ResponseError};

use crate::error::{AgentError, ErrorKind};

/// 注册所有路由
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/api/server/processes", web::get().to(list_processes))
        .route("/api/server/processes", web::post().to(create_process))
        .route("/api/server/processes/reorder", web::post().to(reorder_processes))
        .route("/api/server/processes/{id}", web::get().to(get_process))
        .route("/api/server/processes/{id}", web::put().to(update_process))
        .route("/api/server/processes/{id}", web::delete().to(delete_process))
        .route("/api/server/start", web::post().to(start_all_processes))
        .route("/api/server/stop", web::post().to(stop_all_processes))
        .route("/api/server/processes/{id}/start", web::post().to(start_process))
        .route("/api/server/processes/{id}/stop", web::post().to(stop_process))
        .route("/api/server/processes/{id}/status", web::get().to(get_process_status))
        .route("/metrics", web::get().to(get_metrics))
        .route("/health", web::get().to(health));
}

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy"
    }))
}

fn error_body(code: &str, message: String) -> serde_json::Value {
    serde_json::json!({
        "errorCode": code,
        "context": "server",
        "errors": [message]
    })
}

/// 请求体无法解析时返回统一的错误格式
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        log::debug!("Rejecting request body: {}", err);
        let response = HttpResponse::BadRequest()
            .json(error_body("BAD_REQUEST", "Invalid request body".to_string()));
        InternalError::from_response(err, response).into()
    })
}

impl ResponseError for AgentError {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidPath
            | ErrorKind::InvalidDefinition
            | ErrorKind::NoProcessesConfigured => StatusCode::BAD_REQUEST,
            ErrorKind::DefinitionNotFound | ErrorKind::NotFound | ErrorKind::FileNotFound => {
                StatusCode::NOT_FOUND
            }
            ErrorKind::AlreadyRunning | ErrorKind::DuplicatePath | ErrorKind::ProcessRunning => {
                StatusCode::CONFLICT
            }
            ErrorKind::ReadinessTimeout => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(error_body(self.kind().code(), self.to_string()))
    }
}

/// 路径参数不是合法的进程 ID
pub fn invalid_id(raw: &str) -> HttpResponse {
    log::debug!("Rejecting invalid process id '{}'", raw);
    HttpResponse::BadRequest().json(error_body("BAD_REQUEST", "Invalid process ID".to_string()))
}
