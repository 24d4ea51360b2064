//! REST API server example
//!
//! This example runs podbrief with the REST API enabled, allowing control
//! via HTTP endpoints.
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:7373/swagger-ui
//! - Add podcasts via POST http://localhost:7373/podcasts
//! - Trigger a feed check via POST http://localhost:7373/ops/check-feeds
//! - Stream events via GET http://localhost:7373/events

use podbrief::api::start_api_server;
use podbrief::config::{ApiConfig, Config, FeedsConfig, PodcastFeedConfig};
use podbrief::{run_with_shutdown, PodBrief};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    // Configure feeds to monitor
    let feeds = FeedsConfig {
        podcasts: vec![PodcastFeedConfig {
            url: "https://example.com/podcast/feed.xml".to_string(),
            check_interval: Duration::from_secs(3600),
            filters: vec![],
            enabled: true,
        }],
        ..Default::default()
    };

    // Configure API
    let api = ApiConfig {
        bind_address: "127.0.0.1:7373".parse()?,
        api_key: None, // No authentication for local use
        cors_enabled: true,
        cors_origins: vec!["*".to_string()],
        swagger_ui: true,
    };

    // Build configuration
    let config = Config {
        feeds,
        server: podbrief::config::ServerIntegrationConfig { api },
        ..Default::default()
    };

    // Create the service (cheap to clone, all state is shared)
    let service = PodBrief::new(config.clone()).await?;
    let config_arc = Arc::new(config);

    println!("Starting podbrief REST API server");
    println!("Swagger UI: http://localhost:7373/swagger-ui");
    println!("Events stream: http://localhost:7373/events");
    println!();
    println!("Example commands:");
    println!("  # Add a podcast feed");
    println!("  curl -X POST http://localhost:7373/podcasts \\");
    println!("    -H 'Content-Type: application/json' \\");
    println!("    -d '{{\"url\": \"https://example.com/other/feed.xml\"}}'");
    println!();
    println!("  # Trigger an immediate feed check");
    println!("  curl -X POST http://localhost:7373/ops/check-feeds");
    println!();
    println!("  # Stream events (Server-Sent Events)");
    println!("  curl -N http://localhost:7373/events");

    // Start the feed poller and scheduler
    let _tasks = service.start_background_tasks();

    // Start the API server in the background
    let api_service = Arc::new(service.clone());
    tokio::spawn(async move {
        if let Err(e) = start_api_server(api_service, config_arc).await {
            eprintln!("API server error: {}", e);
        }
    });

    // Wait for SIGTERM/SIGINT and shut down cleanly
    run_with_shutdown(service).await?;

    Ok(())
}
