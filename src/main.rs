use resilience::{config::ResilienceConfig, init_tracing, serve};
use std::env;
use std::process;

#[tokio::main]
async fn main() {
    // Initialize tracing
    init_tracing();

    // Load configuration from the given path, or fall back to defaults
    let config = match env::args().nth(1) {
        Some(path) => match ResilienceConfig::from_file(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Failed to load configuration from {}: {}", path, e);
                eprintln!("Usage: resilience [config_file]");
                process::exit(1);
            }
        },
        None => ResilienceConfig::default(),
    };

    if let Err(e) = serve(config).await {
        eprintln!("Resilience server error: {}", e);
        process::exit(1);
    }
}
