use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::api::invalid_id;
use crate::error::AgentError;
use crate::models::{ProcessSpec, SequenceUpdate};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub updates: Vec<SequenceUpdate>,
}

pub async fn list_processes(data: web::Data<AppState>) -> Result<HttpResponse, AgentError> {
    let processes = data.orchestrator.definitions()?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "processes": processes })))
}

pub async fn start_all_processes(data: web::Data<AppState>) -> Result<HttpResponse, AgentError> {
    data.orchestrator.start_all().await?;
    Ok(message("Server started successfully"))
}

pub async fn stop_all_processes(data: web::Data<AppState>) -> Result<HttpResponse, AgentError> {
    data.orchestrator.stop_all().await?;
    Ok(message("Server stopped successfully"))
}

pub async fn create_process(
    data: web::Data<AppState>,
    spec: web::Json<ProcessSpec>,
) -> Result<HttpResponse, AgentError> {
    let created = data.orchestrator.create_definition(&spec)?;
    Ok(HttpResponse::Ok().json(created))
}

pub async fn get_process(
    data: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AgentError> {
    let Ok(id) = id.parse::<i64>() else {
        return Ok(invalid_id(&id));
    };

    let definition = data.orchestrator.definition(id)?;
    Ok(HttpResponse::Ok().json(definition))
}

pub async fn update_process(
    data: web::Data<AppState>,
    id: web::Path<String>,
    spec: web::Json<ProcessSpec>,
) -> Result<HttpResponse, AgentError> {
    let Ok(id) = id.parse::<i64>() else {
        return Ok(invalid_id(&id));
    };

    let updated = data.orchestrator.update_definition(id, &spec)?;
    Ok(HttpResponse::Ok().json(updated))
}

pub async fn delete_process(
    data: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AgentError> {
    let Ok(id) = id.parse::<i64>() else {
        return Ok(invalid_id(&id));
    };

    data.orchestrator.delete_definition(id).await?;
    Ok(message("Process deleted successfully"))
}

pub async fn reorder_processes(
    data: web::Data<AppState>,
    request: web::Json<ReorderRequest>,
) -> Result<HttpResponse, AgentError> {
    data.orchestrator.reorder_definitions(&request.updates)?;
    Ok(message("Processes reordered successfully"))
}

pub async fn start_process(
    data: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AgentError> {
    let Ok(id) = id.parse::<i64>() else {
        return Ok(invalid_id(&id));
    };

    data.orchestrator.start_one(id).await?;
    Ok(message("Process started successfully"))
}

pub async fn stop_process(
    data: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AgentError> {
    let Ok(id) = id.parse::<i64>() else {
        return Ok(invalid_id(&id));
    };

    data.orchestrator.stop_one(id).await?;
    Ok(message("Process stopped successfully"))
}

pub async fn get_process_status(
    data: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AgentError> {
    let Ok(id) = id.parse::<i64>() else {
        return Ok(invalid_id(&id));
    };

    let status = data.orchestrator.status(id).await?;
    Ok(HttpResponse::Ok().json(status))
}

fn message(text: &str) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "message": text }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::Value;

    use crate::api::configure;
    use crate::models::ProcessDefinition;
    use crate::services::matcher::tests::{process, FakeInventory};
    use crate::services::matcher::SCRIPT_EXTENSIONS;
    use crate::services::terminator::Terminator;
    use crate::services::{EscalationPolicy, Orchestrator, OrchestratorSettings};
    use crate::state::AppStateInner;
    use crate::store::memory::MemoryStore;

    use super::*;

    struct ExitingTerminator(Arc<FakeInventory>);

    impl Terminator for ExitingTerminator {
        fn request_stop(&self, pid: u32) -> std::io::Result<()> {
            self.0.remove(pid);
            Ok(())
        }

        fn force_kill(&self, pid: u32) -> std::io::Result<()> {
            self.0.remove(pid);
            Ok(())
        }
    }

    const GATEWAY: &str = "/srv/a3/GatewayServer";

    fn definition(id: i64, order: i32, path: &str) -> ProcessDefinition {
        ProcessDefinition {
            id,
            name: format!("server-{id}"),
            path: path.to_string(),
            port: None,
            sequence_order: order,
            start_time: None,
            end_time: None,
        }
    }

    fn state(definitions: Vec<ProcessDefinition>, inventory: Arc<FakeInventory>) -> AppState {
        let settings = OrchestratorSettings {
            readiness_timeout: Duration::from_millis(300),
            readiness_interval: Duration::from_millis(50),
            escalation: EscalationPolicy {
                grace_period: Duration::from_millis(100),
                kill_wait: Duration::from_millis(100),
            },
        };
        let orchestrator = Orchestrator::new(
            Arc::new(MemoryStore::new(definitions)),
            inventory.clone(),
            Box::new(ExitingTerminator(inventory)),
            settings,
        );
        Arc::new(AppStateInner { orchestrator })
    }

    #[actix_web::test]
    async fn test_list_is_ordered() {
        let state = state(
            vec![definition(2, 2, "/srv/a3/ZoneServer"), definition(1, 1, "/srv/a3/GatewayServer")],
            FakeInventory::with(vec![]),
        );
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/server/processes").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        let ids: Vec<i64> = body["processes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[actix_web::test]
    async fn test_start_all_without_definitions() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(vec![], FakeInventory::with(vec![]))))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post().uri("/api/server/start").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errorCode"], "NO_PROCESSES_CONFIGURED");
        assert_eq!(body["context"], "server");
        assert_eq!(body["errors"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_status_and_stop_single_process() {
        let inventory = FakeInventory::with(vec![process(70, "GatewayServer", GATEWAY, "")]);
        let state = state(vec![definition(1, 1, GATEWAY)], inventory);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/server/processes/1/status").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["running"], true);
        assert!(body.get("port_open").is_none());

        let req = test::TestRequest::post().uri("/api/server/processes/1/stop").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Process stopped successfully");

        let req = test::TestRequest::get().uri("/api/server/processes/1/status").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["running"], false);
        assert!(body["last_uptime_seconds"].is_null());
        assert!(body["end_time"].is_string());

        // 再次停止：进程已不存在
        let req = test::TestRequest::post().uri("/api/server/processes/1/stop").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errorCode"], "NOT_FOUND");
    }

    #[actix_web::test]
    async fn test_start_running_process_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("GatewayServer");
        std::fs::write(&binary, b"").unwrap();
        let path = binary.to_string_lossy().into_owned();
        let canonical = std::fs::canonicalize(&binary).unwrap().to_string_lossy().into_owned();

        let inventory = FakeInventory::with(vec![process(71, "GatewayServer", &canonical, "")]);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(vec![definition(1, 1, &path)], inventory)))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post().uri("/api/server/processes/1/start").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errorCode"], "ALREADY_RUNNING");
    }

    #[actix_web::test]
    async fn test_bad_and_unknown_ids() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(vec![], FakeInventory::with(vec![]))))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post().uri("/api/server/processes/abc/start").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/api/server/processes/9/status").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errorCode"], "DEFINITION_NOT_FOUND");
    }

    #[actix_web::test]
    async fn test_manage_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join(format!("gateway.{}", SCRIPT_EXTENSIONS[0]));
        std::fs::write(&script, "exit 0\n").unwrap();
        let path = script.to_string_lossy().into_owned();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(vec![], FakeInventory::with(vec![]))))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/server/processes")
            .set_json(serde_json::json!({ "name": "GatewayServer", "path": path, "port": 9000 }))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["id"].as_i64().unwrap();
        assert_eq!(created["sequence_order"], 1);
        assert_eq!(created["port"], 9000);

        let req = test::TestRequest::get()
            .uri(&format!("/api/server/processes/{id}"))
            .to_request();
        let fetched: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched["name"], "GatewayServer");

        let req = test::TestRequest::post()
            .uri("/api/server/processes")
            .set_json(serde_json::json!({ "name": "Copy", "path": path }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errorCode"], "DUPLICATE_PATH");

        let req = test::TestRequest::put()
            .uri(&format!("/api/server/processes/{id}"))
            .set_json(serde_json::json!({ "name": "Gateway", "path": path }))
            .to_request();
        let updated: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated["name"], "Gateway");
        assert!(updated["port"].is_null());

        let req = test::TestRequest::delete()
            .uri(&format!("/api/server/processes/{id}"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Process deleted successfully");

        let req = test::TestRequest::get()
            .uri(&format!("/api/server/processes/{id}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_create_rejects_invalid_body_and_path() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(vec![], FakeInventory::with(vec![]))))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/server/processes")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"name\": ")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errorCode"], "BAD_REQUEST");
        assert_eq!(body["errors"][0], "Invalid request body");

        let req = test::TestRequest::post()
            .uri("/api/server/processes")
            .set_json(serde_json::json!({ "name": "Ghost", "path": "/nonexistent/a3/Ghost" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errorCode"], "INVALID_PATH");
    }

    #[actix_web::test]
    async fn test_delete_running_process_conflicts() {
        let inventory = FakeInventory::with(vec![process(72, "GatewayServer", GATEWAY, "")]);
        let state = state(vec![definition(1, 1, GATEWAY)], inventory);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::delete().uri("/api/server/processes/1").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errorCode"], "PROCESS_RUNNING");
    }

    #[actix_web::test]
    async fn test_reorder() {
        let state = state(
            vec![definition(1, 1, GATEWAY), definition(2, 2, "/srv/a3/ZoneServer")],
            FakeInventory::with(vec![]),
        );
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/server/processes/reorder")
            .set_json(serde_json::json!({ "updates": [
                { "id": 1, "sequence_order": 2 },
                { "id": 2, "sequence_order": 1 }
            ] }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Processes reordered successfully");

        let req = test::TestRequest::get().uri("/api/server/processes").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let ids: Vec<i64> = body["processes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![2, 1]);

        let req = test::TestRequest::post()
            .uri("/api/server/processes/reorder")
            .set_json(serde_json::json!({ "updates": [{ "id": 5, "sequence_order": 1 }] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_health() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(vec![], FakeInventory::with(vec![]))))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
    }
}
