mod cli;
mod config;
mod v1;

use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use clap::Parser;
use dew_store::{FileStorage, TodoStore};
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Command, Config, ServeArgs};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let config = Config::parse();
    let storage = Arc::new(FileStorage::new(&config.data_dir));
    let mut store = TodoStore::load(storage, config.store()).await;

    match config.command {
        Command::Serve(args) => serve(store, args).await,
        command => {
            let result = cli::run(&mut store, command, &mut io::stdout().lock());
            store.flush().await;
            result
        }
    }
}

#[derive(Debug)]
pub struct AppState {
    pub store: Mutex<TodoStore>,
}

impl AppState {
    pub fn new(store: TodoStore) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }
}

async fn serve(store: TodoStore, args: ServeArgs) -> eyre::Result<()> {
    let state = Arc::new(AppState::new(store));

    let app = Router::new()
        .nest("/api/v1", v1::router())
        .with_state(state.clone());

    let handle = Handle::new();

    tokio::spawn({
        let handle = handle.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutting down");
                handle.graceful_shutdown(Some(Duration::from_secs(5)));
            }
        }
    });

    let addr = SocketAddr::from(([0; 4], args.port));
    info!(%addr, tls = args.tls().is_some(), "listening");

    match args.tls() {
        Some((cert, key)) => {
            let config = RustlsConfig::from_pem_file(cert, key).await?;

            axum_server::bind_rustls(addr, config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    state.store.lock().await.flush().await;

    Ok(())
}
