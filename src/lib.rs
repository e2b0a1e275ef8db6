use anyhow::{bail, Result};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use axum_login::{
    login_required,
    tower_sessions::{ExpiredDeletion, Expiry, SessionManagerLayer},
    AuthManagerLayerBuilder,
};
use axum_messages::MessagesManagerLayer;
use base64::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use std::time::Duration;
use tokio::{signal, task::AbortHandle};
use tower_http::services::ServeDir;
use tower_sessions::cookie::{self, Key};
use tracing::{info, warn};

mod auth;
pub mod cli;
pub mod config;
pub mod context;
mod controller;
mod error;
mod extract;
pub mod feed;
pub mod model;
mod schema;
pub mod seed;
pub mod session_store;
pub mod view;

pub use {
    auth::{AuthSession, PostboardAuth},
    context::Context,
    error::PostboardError,
};

use config::Config;
use session_store::DieselSqliteSessionStore;

pub type Connection = SyncConnectionWrapper<SqliteConnection>;

#[derive(Clone)]
pub struct Postboard {
    context: Context,
}

impl Postboard {
    pub async fn boot(config: Config) -> Result<Self> {
        let context = context::create_context(config).await?;

        Ok(Self { context })
    }

    pub fn new(context: Context) -> Self {
        Self { context }
    }

    /// A session store over the app database, with its table in place.
    pub async fn session_store(&self) -> Result<DieselSqliteSessionStore> {
        let session_store = DieselSqliteSessionStore::new(self.context.database.clone());
        session_store.migrate().await?;

        Ok(session_store)
    }

    pub fn router(&self, session_store: DieselSqliteSessionStore) -> Result<Router> {
        let config = &self.context.config;

        let session_key = match config.session_key {
            Some(ref session_key) => {
                let session_key = BASE64_STANDARD.decode(session_key)?;
                if session_key.len() < 64 {
                    bail!("session key must be at least 64 bytes, got {}", session_key.len());
                }
                Key::from(session_key.as_slice())
            }
            None => {
                warn!("No session_key configured. Falling back to generated key. This will invalidate any sessions when the server is stopped.");
                Key::generate()
            }
        };

        let session_layer = SessionManagerLayer::new(session_store)
            .with_secure(config.secure_cookies)
            .with_expiry(Expiry::OnInactivity(cookie::time::Duration::days(
                config.session_inactivity_days,
            )))
            .with_signed(session_key);

        let auth = PostboardAuth::new(self.context.database.clone());
        let auth_layer = AuthManagerLayerBuilder::new(auth, session_layer.clone()).build();

        // Public pages resolve the visitor themselves, outside the auth layer.
        let pages = Router::new()
            .route("/", get(controller::home))
            .layer(middleware::map_response(view::render_view))
            .layer(MessagesManagerLayer)
            .layer(session_layer);

        let app = Router::new()
            .route("/post", post(controller::post::create))
            .route("/post/:id/delete", post(controller::post::delete))
            // Previous routes require authentication.
            .route_layer(login_required!(PostboardAuth, login_url = "/login"))
            .merge(controller::auth::routes())
            .layer(middleware::map_response(view::render_view))
            .layer(MessagesManagerLayer)
            .layer(auth_layer);

        let router = Router::new()
            .merge(pages)
            .merge(app)
            .nest_service("/static", ServeDir::new("static"))
            .with_state(self.context.clone());

        Ok(router)
    }

    pub async fn serve(self) -> Result<()> {
        let session_store = self.session_store().await?;

        let deletion_task = tokio::task::spawn(
            session_store
                .clone()
                .continuously_delete_expired(Duration::from_secs(60)),
        );

        let router = self.router(session_store)?;

        // Enable livereload for debug builds.
        #[cfg(debug_assertions)]
        let (router, _watcher) = livereload(router)?;

        let listener = tokio::net::TcpListener::bind(&self.context.config.bind_address).await?;
        info!("listening on {}", listener.local_addr()?);

        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(shutdown_signal(Some(deletion_task.abort_handle())))
            .await?;

        match deletion_task.await {
            Ok(result) => result?,
            Err(e) if e.is_cancelled() => {}
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }
}

pub async fn shutdown_signal(abort_handle: Option<AbortHandle>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutting down");

    if let Some(abort_handle) = abort_handle {
        abort_handle.abort()
    }
}

#[cfg(debug_assertions)]
fn livereload(router: Router) -> Result<(Router, notify::RecommendedWatcher)> {
    use notify::Watcher;

    let livereload = tower_livereload::LiveReloadLayer::new();
    let reloader = livereload.reloader();

    let router = router.layer(livereload);

    let mut watcher =
        notify::recommended_watcher(move |_: notify::Result<notify::Event>| reloader.reload())?;
    watcher.watch(
        std::path::Path::new("static"),
        notify::RecursiveMode::Recursive,
    )?;

    Ok((router, watcher))
}
