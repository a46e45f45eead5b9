use crate::service::AttendanceService;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config_path: Option<PathBuf>,
    pub service: Option<AttendanceService>,
    /// Why `service` is unset, reported on every data request.
    pub startup_error: Option<String>,
}

impl AppState {
    pub fn empty() -> Self {
        Self {
            config_path: None,
            service: None,
            startup_error: None,
        }
    }
}
