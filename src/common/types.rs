/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

#[derive(Deserialize, Serialize, Clone, Debug, Eq, PartialEq)]
pub struct Token(pub String);

impl Token {
    pub fn inner(&self) -> String {
        self.0.to_owned()
    }
}

#[derive(
    Deserialize, Serialize, Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Default,
)]
pub struct NotificationId(pub i64);

impl NotificationId {
    pub fn inner(&self) -> i64 {
        self.0
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct UserId(pub i64);

#[derive(Deserialize, Serialize, Clone, Debug, Eq, Hash, PartialEq)]
pub struct DeviceId(pub String);

impl DeviceId {
    /// Mints a fresh identity for this installation. Generated once when the
    /// embedder first sets up enrollment and persisted on its side; the
    /// backend keys subscriptions by it.
    pub fn generate() -> Self {
        DeviceId(uuid::Uuid::new_v4().to_string())
    }

    pub fn inner(&self) -> String {
        self.0.to_owned()
    }
}

#[derive(
    Debug, Clone, Copy, EnumString, EnumIter, Display, Serialize, Deserialize, Eq, Hash, PartialEq,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationType {
    VisitRequest,
    OnboardingRequest,
    Payment,
    Complaint,
    #[serde(other)]
    Unknown,
}

/// A single server-owned notification row. The client only ever flips
/// `is_read`, and only from false to true.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub reference_id: Option<i64>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct UnreadCountResponse {
    pub count: u64,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VapidKeyResponse {
    pub public_key: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ApiSuccess {
    pub result: String,
}

/// Wire shape persisted server-side for one device enrollment: the push
/// endpoint plus both key materials, standard-base64 encoded.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct PushSubscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

/// A subscription as handed out by the platform's subscribe primitive,
/// before any base64 encoding.
#[derive(Clone, Debug, PartialEq)]
pub struct RawSubscription {
    pub endpoint: String,
    pub p256dh: Vec<u8>,
    pub auth: Vec<u8>,
}

#[derive(Debug, Clone, Copy, EnumString, EnumIter, Display, Eq, Hash, PartialEq)]
pub enum PlatformFamily {
    Ios,
    Generic,
}

/// Runtime traits probed once per app load. Never cached across sessions
/// since permission and install state can change outside the app.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformTraits {
    pub has_background_runtime: bool,
    pub is_standalone: bool,
    pub platform_family: PlatformFamily,
}

#[derive(Debug, Clone, Copy, Display, Eq, PartialEq)]
pub enum UnsupportedReason {
    NoBackgroundRuntime,
    NeedsInstall,
    NoSubscriptionManager,
    RegistrationFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityState {
    pub supported: bool,
    pub subscribed: bool,
    pub reason: Option<UnsupportedReason>,
}

impl CapabilityState {
    pub fn unsupported(reason: UnsupportedReason) -> Self {
        CapabilityState {
            supported: false,
            subscribed: false,
            reason: Some(reason),
        }
    }

    pub fn supported(subscribed: bool) -> Self {
        CapabilityState {
            supported: true,
            subscribed,
            reason: None,
        }
    }
}

impl Default for CapabilityState {
    fn default() -> Self {
        CapabilityState::unsupported(UnsupportedReason::NoBackgroundRuntime)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Outcome of a user-triggered enroll attempt. `NotConfigured` is a server
/// configuration gap and is surfaced differently from client-side failures.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum EnrollOutcome {
    Enrolled,
    Denied,
    Unsupported(UnsupportedReason),
    NotConfigured,
    Failed(String),
}

/// An in-session toast announcing one newly observed notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub id: NotificationId,
    pub title: String,
    pub body: String,
}

/// Last-known feed contents while the app is foregrounded. The two fields
/// come from independent reads and may transiently disagree, bounded by one
/// poll interval.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    pub notifications: Vec<Notification>,
    pub unread_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_device_ids_are_unique() {
        let first = DeviceId::generate();
        let second = DeviceId::generate();
        assert!(!first.inner().is_empty());
        assert_ne!(first, second);
    }
}
