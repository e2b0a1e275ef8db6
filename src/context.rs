use anyhow::{anyhow, Context as _, Result};
use diesel::sqlite::SqliteConnection;
use diesel::{Connection as _, ConnectionError};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::{deadpool::Pool, ManagerConfig};
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, SimpleAsyncConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use futures::FutureExt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{config::Config, Connection};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct Context {
    pub database: Pool<Connection>,
    pub config: Arc<Config>,
}

impl Context {
    pub fn new(database: Pool<Connection>, config: Config) -> Self {
        Self {
            database,
            config: Arc::new(config),
        }
    }
}

pub async fn create_context(config: Config) -> Result<Context> {
    let database_url = match config.database_url {
        Some(ref url) => url.clone(),
        None => xdg::BaseDirectories::with_prefix("postboard")?
            .place_data_file("database.sqlite3")?
            .to_str()
            .context("database path should be valid utf-8")?
            .to_string(),
    };

    let database = connect(&database_url, config.database_pool_size).await?;
    info!("using database {database_url}");

    Ok(Context::new(database, config))
}

/// Migrates the database at `database_url` and builds a connection pool for it.
pub async fn connect(database_url: &str, pool_size: usize) -> Result<Pool<Connection>> {
    migrate(database_url).await?;

    let mut manager_config = ManagerConfig::default();
    manager_config.custom_setup = Box::new(|url| {
        async {
            let mut conn = SyncConnectionWrapper::<SqliteConnection>::establish(url).await?;

            let query = "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 30000;
            ";
            conn.batch_execute(query)
                .await
                .map_err(ConnectionError::CouldntSetupConfiguration)?;

            Ok(conn)
        }
        .boxed()
    });

    let manager = AsyncDieselConnectionManager::<Connection>::new_with_config(
        database_url,
        manager_config,
    );

    Ok(Pool::builder(manager).max_size(pool_size).build()?)
}

pub async fn migrate(database_url: &str) -> Result<()> {
    let database_url = database_url.to_string();

    let applied = tokio::task::spawn_blocking(move || -> Result<usize> {
        let mut conn = SqliteConnection::establish(&database_url)?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow!("failed to run migrations: {e}"))?;

        Ok(applied.len())
    })
    .await??;

    debug!("applied {applied} pending migrations");

    Ok(())
}

/// A pool over a fresh database file in the temp dir.
#[cfg(test)]
pub(crate) async fn test_pool() -> Pool<Connection> {
    let path = std::env::temp_dir().join(format!("postboard-test-{}.sqlite3", uuid::Uuid::new_v4()));
    connect(path.to_str().unwrap(), 4).await.unwrap()
}
