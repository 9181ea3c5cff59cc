#![warn(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::single_match_else)]

use crate::{
    auth::{
        AuthStore,
        file_store::{FileSessionStore, MemorySessionStore, SessionStorage},
    },
    config::RuntimeConfiguration,
    routes::router,
    state::BouncerState,
};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[macro_use]
extern crate tracing;

mod api;
mod auth;
mod config;
mod data;
mod error;
mod maud_conveniences;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    warn!("signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() {
    let dotenv_result = dotenvy::dotenv();

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .finish(),
    )
    .expect("unable to set tracing subscriber");

    info!("`tracing` online");
    if let Err(e) = dotenv_result {
        warn!(?e, "no .env loaded, using the environment and defaults");
    }

    let config = RuntimeConfiguration::new().expect("unable to create config");
    let storage: Arc<dyn SessionStorage> = if config.session_file().as_os_str().is_empty() {
        warn!("BOUNCER_SESSION_FILE is blank, the session won't survive a restart");
        Arc::new(MemorySessionStore::default())
    } else {
        Arc::new(FileSessionStore::new(config.session_file().clone()))
    };
    let state = BouncerState::new(config, AuthStore::new(storage))
        .expect("unable to create state");

    // guarded views show a loading page until this lands
    tokio::spawn({
        let state = state.clone();
        async move { state.restore_session().await }
    });

    let app = router(state.clone());

    let server_ip = state.config().server_ip();
    let listener = TcpListener::bind(server_ip)
        .await
        .expect("unable to listen on server ip");

    info!(?server_ip, api = ?state.config().api_config(), "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("unable to serve app");
}
