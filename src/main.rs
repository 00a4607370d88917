use std::path::Path;
use std::sync::Arc;

mod config;
mod handler;
mod http;
mod logger;
mod router;
mod server;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_file = dotenvy::dotenv();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    match env_file {
        Ok(path) => logger::log_info(&format!("Loaded environment from {}", path.display())),
        Err(e) if e.not_found() => {}
        Err(e) => logger::log_warning(&format!("Ignoring .env file: {e}")),
    }

    // Requests are resolved on a single thread; connections interleave at await points
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    if !Path::new(&cfg.routes.root).is_dir() {
        logger::log_warning(&format!(
            "Routes root '{}' is not a directory; every request will get a 404",
            cfg.routes.root
        ));
    }

    let listener = server::create_reusable_listener(addr)?;
    let state = Arc::new(config::AppState::new(&cfg));
    logger::log_server_start(&addr, &cfg);

    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::start_server_loop(listener, state))
        .await
}
