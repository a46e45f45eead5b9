use crate::config::DbConfig;
use crate::db::Database;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::service::AttendanceService;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Opens the configured database and installs the service. On failure the
/// state keeps no service and remembers why.
pub fn open_database(state: &mut AppState, path: &Path, cfg: &DbConfig) -> Result<(), String> {
    match Database::open(cfg) {
        Ok(db) => {
            state.config_path = Some(path.to_path_buf());
            state.service = Some(AttendanceService::new(&db));
            state.startup_error = None;
            Ok(())
        }
        Err(e) => {
            let message = format!("failed to open database: {e}");
            tracing::error!(config = %path.to_string_lossy(), error = %e, "database open failed");
            state.service = None;
            state.startup_error = Some(message.clone());
            Err(message)
        }
    }
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let service = state.service.as_ref();
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "configPath": state.config_path.as_ref().map(|p| p.to_string_lossy().to_string()),
            "databaseUrl": service.map(|s| s.database().url().to_string()),
            "databaseReachable": service.map(|s| s.database().is_reachable()).unwrap_or(false),
            "startupError": state.startup_error,
        }),
    )
}

fn handle_config_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(path) = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
    else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let cfg = match DbConfig::load(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            state.service = None;
            state.startup_error = Some(e.to_string());
            return err(&req.id, "config_invalid", e.to_string(), None);
        }
    };
    match open_database(state, &path, &cfg) {
        Ok(()) => ok(&req.id, json!({ "databaseUrl": cfg.url })),
        Err(message) => err(&req.id, "db_open_failed", message, None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "config.load" => Some(handle_config_load(state, req)),
        _ => None,
    }
}
