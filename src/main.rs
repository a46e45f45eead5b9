use attendanced::config::{self, DbConfig};
use attendanced::ipc;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn init_tracing(config_filter: Option<&str>) {
    // stdout carries responses; logs must stay on stderr.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_filter.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn main() {
    let config_path = config::resolve_config_path(std::env::args().nth(1));
    let cfg = DbConfig::load(&config_path);
    init_tracing(cfg.as_ref().ok().and_then(|c| c.log_filter.as_deref()));
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "attendanced starting");

    let mut state = ipc::AppState::empty();
    match cfg {
        Ok(cfg) => {
            let _ = ipc::open_database(&mut state, &config_path, &cfg);
        }
        Err(e) => {
            // Not fatal for the process: data requests answer `no_database`
            // until a valid config is loaded.
            tracing::error!(config = %config_path.to_string_lossy(), error = %e, "config unusable");
            state.startup_error = Some(e.to_string());
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!(error = %e, "unparseable request");
                let _ = writeln!(stdout, "{}", ipc::err("", "bad_json", e.to_string(), None));
                let _ = stdout.flush();
                continue;
            }
        };

        tracing::debug!(id = %req.id, method = %req.method, "request");
        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    tracing::info!("stdin closed, shutting down");
}
