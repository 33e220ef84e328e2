use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shelfwise_api::{
    config::Config,
    db::{create_pool, run_migrations, PgStore, Stores},
    routes::{create_router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shelfwise_api=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url, config.database_max_connections).await?;
    if config.run_migrations {
        run_migrations(&pool).await?;
    }

    let stores = Stores::from_backend(PgStore::new(pool));
    let state = AppState::new(&stores, config.recommendation_settings());
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
