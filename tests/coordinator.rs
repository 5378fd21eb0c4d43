/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use notification_coordinator::{
    common::types::{FeedSnapshot, NotificationId, Token},
    outbound::backend::{BackendClient, NotificationApi},
    poller::{run_feed_poller, FeedPollerHandle},
};
use reqwest::Url;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::{mpsc, oneshot, RwLock};

fn notification_json(id: i64, title: &str, message: &str, is_read: bool) -> String {
    format!(
        r#"{{"id":{id},"userId":1,"title":"{title}","message":"{message}","type":"payment","referenceId":null,"isRead":{is_read},"createdAt":"2026-08-01T10:00:00Z"}}"#
    )
}

/// The §8 end-to-end story: a feed with id 10 primes silently, id 11 arriving
/// later produces exactly one toast, and marking 11 read is reflected in the
/// unread count within one poll cycle (here: immediately via forced refresh).
#[tokio::test]
async fn feed_primes_announces_once_and_acknowledges() {
    let mut server = mockito::Server::new_async().await;

    let grown = Arc::new(AtomicBool::new(false));
    let acknowledged = Arc::new(AtomicBool::new(false));

    let grown_for_list = grown.clone();
    let _list_mock = server
        .mock("GET", "/api/notifications")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body_from_request(move |_request| {
            let first = notification_json(10, "Old", "Backlog", false);
            if grown_for_list.load(Ordering::SeqCst) {
                let second = notification_json(11, "T", "M", false);
                format!("[{first},{second}]").into_bytes()
            } else {
                format!("[{first}]").into_bytes()
            }
        })
        .expect_at_least(2)
        .create_async()
        .await;

    let grown_for_count = grown.clone();
    let acknowledged_for_count = acknowledged.clone();
    let _count_mock = server
        .mock("GET", "/api/notifications/unread-count")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body_from_request(move |_request| {
            let count = match (
                grown_for_count.load(Ordering::SeqCst),
                acknowledged_for_count.load(Ordering::SeqCst),
            ) {
                (false, _) => 1,
                (true, false) => 2,
                (true, true) => 1,
            };
            format!(r#"{{"count":{count}}}"#).into_bytes()
        })
        .create_async()
        .await;

    let acknowledged_for_read = acknowledged.clone();
    let read_mock = server
        .mock("POST", "/api/notifications/11/read")
        .with_status(200)
        .with_body_from_request(move |_request| {
            acknowledged_for_read.store(true, Ordering::SeqCst);
            b"{}".to_vec()
        })
        .expect(1)
        .create_async()
        .await;

    let backend: Arc<dyn NotificationApi> = Arc::new(BackendClient::new(
        Url::parse(&server.url()).unwrap(),
        Token("test-token".to_string()),
    ));

    let feed = Arc::new(RwLock::new(FeedSnapshot::default()));
    let (toast_tx, mut toast_rx) = mpsc::channel(32);
    let (refresh_tx, refresh_rx) = mpsc::channel(8);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = FeedPollerHandle::new(backend.clone(), refresh_tx);

    let poller = tokio::spawn(run_feed_poller(
        backend,
        feed.clone(),
        toast_tx,
        refresh_rx,
        shutdown_rx,
        Duration::from_millis(50),
    ));

    // first observation primes the cursor: no toast for the backlog id 10
    wait_until("first poll to land", || {
        let feed = feed.clone();
        async move { feed.read().await.notifications.len() == 1 }
    })
    .await;
    assert!(toast_rx.try_recv().is_err());
    // the two reads are independent: the count lands a moment after the list
    wait_until("first count to land", || {
        let feed = feed.clone();
        async move { feed.read().await.unread_count == 1 }
    })
    .await;

    // id 11 appears: exactly one toast, with its title and body
    grown.store(true, Ordering::SeqCst);
    let toast = tokio::time::timeout(Duration::from_secs(5), toast_rx.recv())
        .await
        .expect("expected a toast for id 11")
        .expect("toast channel closed");
    assert_eq!(toast.id, NotificationId(11));
    assert_eq!(toast.title, "T");
    assert_eq!(toast.body, "M");

    wait_until("grown feed to land", || {
        let feed = feed.clone();
        async move { feed.read().await.notifications.len() == 2 }
    })
    .await;

    // acknowledge id 11: the unread count drops without waiting a full tick
    handle.mark_read(NotificationId(11)).await.unwrap();
    wait_until("acknowledgement to be reflected", || {
        let feed = feed.clone();
        async move { feed.read().await.unread_count == 1 }
    })
    .await;

    // identical feed re-observations in between produced no further toasts
    assert!(toast_rx.try_recv().is_err());

    let _ = shutdown_tx.send(());
    poller.await.unwrap();
    read_mock.assert_async().await;
}

async fn wait_until<F, Fut>(what: &str, mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..400 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}
