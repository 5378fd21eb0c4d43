/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use crate::{
    common::types::{Announcement, FeedSnapshot, NotificationId},
    outbound::backend::NotificationApi,
    tools::{
        error::AppError,
        prometheus::{ANNOUNCED_NOTIFICATIONS, POLL_FAILURES},
    },
    tracker::DedupTracker,
};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{
        mpsc::{Receiver, Sender},
        oneshot, RwLock,
    },
    time::sleep,
};
use tracing::*;

pub type SharedFeed = Arc<RwLock<FeedSnapshot>>;

/// Page-side handle for the one write this subsystem performs. Marking read
/// wakes the poller for an immediate refresh instead of waiting out the
/// current tick.
#[derive(Clone)]
pub struct FeedPollerHandle {
    backend: Arc<dyn NotificationApi>,
    refresh_tx: Sender<()>,
}

impl FeedPollerHandle {
    pub fn new(backend: Arc<dyn NotificationApi>, refresh_tx: Sender<()>) -> Self {
        FeedPollerHandle {
            backend,
            refresh_tx,
        }
    }

    pub async fn mark_read(&self, id: NotificationId) -> Result<(), AppError> {
        self.backend.mark_read(id).await?;
        let _ = self.refresh_tx.send(()).await;
        Ok(())
    }
}

/// One poll tick: two independent advisory reads. Either read failing keeps
/// the last-known value in place; a single missed poll is never surfaced
/// past the metrics.
async fn poll_once(
    backend: &Arc<dyn NotificationApi>,
    feed: &SharedFeed,
    tracker: &mut DedupTracker,
    toast_tx: &Sender<Announcement>,
) {
    match backend.fetch_notifications().await {
        Ok(notifications) => {
            for announcement in tracker.observe(&notifications) {
                ANNOUNCED_NOTIFICATIONS.inc();
                info!(
                    tag = "[TOAST]",
                    id = announcement.id.inner(),
                    title = %announcement.title
                );
                let _ = toast_tx.send(announcement).await;
            }
            feed.write().await.notifications = notifications;
        }
        Err(err) => {
            POLL_FAILURES.with_label_values(&["list"]).inc();
            debug!("Feed list read failed, keeping last known value : {}", err);
        }
    }

    match backend.fetch_unread_count().await {
        Ok(count) => {
            feed.write().await.unread_count = count;
        }
        Err(err) => {
            POLL_FAILURES.with_label_values(&["unread_count"]).inc();
            debug!(
                "Unread count read failed, keeping last known value : {}",
                err
            );
        }
    }
}

/// Runs until the shutdown signal fires. The loop awaits each tick before
/// scheduling the next one, so a slow fetch delays the following tick rather
/// than overlapping it.
pub async fn run_feed_poller(
    backend: Arc<dyn NotificationApi>,
    feed: SharedFeed,
    toast_tx: Sender<Announcement>,
    mut refresh_rx: Receiver<()>,
    mut shutdown_rx: oneshot::Receiver<()>,
    poll_interval: Duration,
) {
    let mut tracker = DedupTracker::new();

    loop {
        poll_once(&backend, &feed, &mut tracker, &toast_tx).await;

        tokio::select! {
            _ = sleep(poll_interval) => {}
            wake = refresh_rx.recv() => {
                if wake.is_none() {
                    info!("Refresh channel closed, stopping feed poller");
                    break;
                }
            }
            _ = &mut shutdown_rx => {
                info!("Feed poller received shutdown");
                break;
            }
        }
    }
}
