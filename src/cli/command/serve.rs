//! Run the HTTP service.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    config::Settings,
    server::{build_router, AppState},
};

use super::build_driver;

pub async fn serve(settings: &Settings, bind: SocketAddr, concurrency: usize) -> Result<()> {
    let (listener, app) = bind_app(settings, bind, concurrency).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

async fn bind_app(
    settings: &Settings,
    bind: SocketAddr,
    concurrency: usize,
) -> Result<(TcpListener, Router)> {
    let driver = Arc::new(build_driver(settings, concurrency)?);
    let concurrency = driver.concurrency();
    let app = build_router(AppState::new(driver)).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    info!(
        concurrency,
        "Writing files under `{}`",
        settings.output_root()?.display()
    );

    Ok((listener, app))
}

// -- Tests -------------------------------------------------------------------
