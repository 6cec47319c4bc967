use std::sync::Arc;

use anyhow::Context;

use money_trail_be::auth::AuthManager;
use money_trail_be::config::{log_json_from_env, Config};
use money_trail_be::database::{create_database_connection, run_migrations};
use money_trail_be::state::AppState;
use money_trail_be::store::{MemoryStore, PgStore};
use money_trail_be::{app, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(log_json_from_env());

    let config = Config::from_env().context("invalid configuration")?;
    let auth = AuthManager::new(config.jwt_secret.as_bytes(), config.jwt_ttl);

    let state = match &config.database_url {
        Some(url) => {
            let pool = create_database_connection(url, config.database_max_connections)
                .await
                .context("failed to connect to PostgreSQL")?;
            run_migrations(&pool)
                .await
                .context("failed to run migrations")?;
            AppState::new(Arc::new(PgStore::new(pool)), auth)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, data is kept in memory and lost on exit");
            AppState::new(Arc::new(MemoryStore::new()), auth)
        }
    };

    let router = app(state, &config);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, router).await?;
    Ok(())
}
