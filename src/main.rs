use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;

use torneo_backend::run;
use torneo_backend::cache::CacheService;
use torneo_backend::config::settings::{get_config, get_redis_url};
use torneo_backend::db::view_queries::PgViewSource;
use torneo_backend::league::views::ViewFetcher;
use torneo_backend::services::change_feed::ChangeFeed;
use torneo_backend::services::change_relay::spawn_change_relay;
use torneo_backend::services::network_status::NetworkStatus;
use torneo_backend::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = match get_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to read the config: {}", e);
            std::process::exit(1);
        }
    };

    let subscriber = get_subscriber(
        "torneo-backend".into(),
        config.application.log_level.clone(),
        std::io::stdout
    );
    init_subscriber(subscriber);

    // Only try to establish connection when actually used
    let connection_pool = match PgPoolOptions::new()
        .max_connections(16)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect_lazy(config.database.connection_string().expose_secret())
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("❌ Failed to create Postgres connection pool: {}", e);
            std::process::exit(1);
        }
    };

    let network = NetworkStatus::default();
    network.spawn_health_check(
        connection_pool.clone(),
        Duration::from_secs(config.live.network_check_interval_seconds),
    );

    // Redis
    let redis_client = match redis::Client::open(get_redis_url(&config).expose_secret()) {
        Ok(client) => {
            tracing::info!("Redis client created successfully");
            Arc::new(client)
        }
        Err(e) => {
            tracing::error!("❌ Failed to create Redis client: {}. Live views need change notifications.", e);
            std::process::exit(1);
        }
    };
    let change_feed = ChangeFeed::new(config.live.change_feed_capacity);
    spawn_change_relay(redis_client, change_feed.clone());

    let mut fetcher = ViewFetcher::new(PgViewSource::new(connection_pool), network);
    match CacheService::open(&config.cache.directory) {
        Ok(cache) => {
            tracing::info!("Offline cache at {}", config.cache.directory.display());
            if config.cache.clear_on_start {
                tracing::info!("Clearing offline cache on start");
                cache.clear_all();
            }
            fetcher = fetcher.with_cache(cache, config.cache.standings_ttl_seconds);
        }
        Err(e) => {
            tracing::warn!("⚠️  Offline cache unavailable, standings will not survive outages: {}", e);
        }
    }

    let address = format!("{}:{}", config.application.host, config.application.port);
    let listener = TcpListener::bind(&address)?;
    tracing::info!("🚀 Serving live views on {}", address);

    run(
        listener,
        fetcher,
        change_feed,
        config.application.allowed_origins.clone(),
    )?.await
}
