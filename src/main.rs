use std::net::TcpListener;
use std::sync::Arc;

use fitbattle_backend::run;
use fitbattle_backend::config::settings::get_config;
use fitbattle_backend::store::{InMemoryStore, KeyValueStore, RedisStore};
use fitbattle_backend::telemetry::{get_subscriber, init_subscriber};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Panic if we can't read the config
    let config = get_config().expect("Failed to read the config.");

    let subscriber = get_subscriber(
        "fitbattle-backend".into(),
        config.application.log_level.clone(),
        std::io::stdout
    );
    init_subscriber(subscriber);

    let store: Arc<dyn KeyValueStore> = if config.redis.in_memory {
        tracing::warn!("Using the in-memory store; data is lost on restart and not shared between instances");
        Arc::new(InMemoryStore::new())
    } else {
        match RedisStore::connect(&config.redis).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::error!("❌ Failed to connect to Redis: {}", e);
                eprintln!("Failed to connect to Redis: {}", e);
                std::process::exit(1);
            }
        }
    };

    let address = format!("{}:{}", config.application.host, config.application.port);
    let listener = TcpListener::bind(&address)?;
    tracing::info!("🚀 Listening on {}", address);

    run(listener, store, config.realtime)
        .await?
        .await
}
