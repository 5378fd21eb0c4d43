/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use actix_web::{web, App, HttpResponse, HttpServer};
use anyhow::Result;
use notification_coordinator::{
    common::types::FeedSnapshot,
    environment::{AppConfig, AppState},
    outbound::backend::NotificationApi,
    poller::run_feed_poller,
    tools::{logger::setup_tracing, prometheus::prometheus_metrics},
};
use std::{
    env::var,
    net::Ipv4Addr,
    sync::Arc,
};
use tokio::{
    signal::unix::{signal, SignalKind},
    sync::{mpsc, oneshot, RwLock},
};
use tracing::*;

#[tokio::main(flavor = "multi_thread", worker_threads = 1)]
async fn main() -> Result<()> {
    let dhall_config_path = var("DHALL_CONFIG")
        .unwrap_or_else(|_| "./dhall-configs/dev/notification_coordinator.dhall".to_string());
    let app_config = serde_dhall::from_file(dhall_config_path).parse::<AppConfig>()?;

    let _guard = setup_tracing(app_config.logger_cfg.clone());

    std::panic::set_hook(Box::new(|panic_info| {
        error!("Panic Occured : {:?}", panic_info);
    }));

    let app_state = AppState::new(app_config);

    let feed = Arc::new(RwLock::new(FeedSnapshot::default()));
    let (toast_tx, mut toast_rx) = mpsc::channel(1000);
    let (_refresh_tx, refresh_rx) = mpsc::channel(100);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    // Listen for SIGTERM / SIGINT and stop the poller gracefully.
    tokio::spawn(async move {
        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to listen for SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to listen for SIGINT");
        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
        }
        let _ = shutdown_tx.send(());
    });

    let backend: Arc<dyn NotificationApi> = app_state.backend.clone();
    let poller_task = tokio::spawn(run_feed_poller(
        backend,
        feed.clone(),
        toast_tx,
        refresh_rx,
        shutdown_rx,
        app_state.poll_interval,
    ));

    // Toast sink for the daemon: announcements become structured log lines.
    tokio::spawn(async move {
        while let Some(announcement) = toast_rx.recv().await {
            info!(
                tag = "[ANNOUNCE]",
                id = announcement.id.inner(),
                title = %announcement.title,
                body = %announcement.body
            );
        }
    });

    let prometheus = prometheus_metrics();
    let http_server = HttpServer::new(move || {
        App::new().wrap(prometheus.clone()).route(
            "/health",
            web::get().to(|| {
                Box::pin(async { HttpResponse::Ok().body("Notification Coordinator Is Up!") })
            }),
        )
    })
    .bind((Ipv4Addr::UNSPECIFIED, app_state.http_server_port))?
    .run();

    let (http_result, poller_result) = tokio::join!(http_server, poller_task);
    http_result?;
    poller_result?;

    Ok(())
}
