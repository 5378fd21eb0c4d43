/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use crate::common::types::{Announcement, Notification, NotificationId};

/// Decides which feed entries are new since the last observation and turns
/// each into exactly one announcement. Announcement is about novelty of
/// observation, not read status: an entry can be announced here and already
/// read by another client.
///
/// Scoped to the lifetime of one open application instance; the cursor is
/// never persisted.
#[derive(Debug, Default)]
pub struct DedupTracker {
    last_seen_id: Option<NotificationId>,
}

impl DedupTracker {
    pub fn new() -> Self {
        DedupTracker { last_seen_id: None }
    }

    pub fn last_seen_id(&self) -> Option<NotificationId> {
        self.last_seen_id
    }

    /// Consumes one feed snapshot and returns the announcements to emit, in
    /// ascending id order. The first non-empty observation primes the cursor
    /// to the maximum id present and announces nothing, so a pre-existing
    /// backlog never storms the user on load.
    pub fn observe(&mut self, feed: &[Notification]) -> Vec<Announcement> {
        let max_id = feed.iter().map(|notification| notification.id).max();

        let cursor = match (self.last_seen_id, max_id) {
            (Some(cursor), _) => cursor,
            (None, Some(max_id)) => {
                self.last_seen_id = Some(max_id);
                return Vec::new();
            }
            (None, None) => return Vec::new(),
        };

        let mut fresh: Vec<&Notification> = feed
            .iter()
            .filter(|notification| notification.id > cursor)
            .collect();
        fresh.sort_by_key(|notification| notification.id);

        // Strict `>` against a monotone cursor makes re-announcement of an
        // already-seen id impossible.
        if let Some(newest) = fresh.last() {
            self.last_seen_id = Some(newest.id);
        }

        fresh
            .into_iter()
            .map(|notification| Announcement {
                id: notification.id,
                title: notification.title.to_owned(),
                body: notification.message.to_owned(),
            })
            .collect()
    }
}
