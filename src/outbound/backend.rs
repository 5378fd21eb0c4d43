/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use crate::{
    common::types::*,
    tools::{
        callapi::{call_api, call_api_unit, CallApiError},
        error::AppError,
    },
};
use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;

/// The REST boundary of the coordinator. `BackendClient` is the production
/// implementation; tests substitute in-memory fakes.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn fetch_notifications(&self) -> Result<Vec<Notification>, AppError>;
    async fn fetch_unread_count(&self) -> Result<u64, AppError>;
    async fn mark_read(&self, id: NotificationId) -> Result<(), AppError>;
    async fn fetch_vapid_public_key(&self) -> Result<String, AppError>;
    async fn save_subscription(
        &self,
        device_id: &DeviceId,
        subscription: &PushSubscription,
    ) -> Result<(), AppError>;
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct SubscribeRequest {
    device_id: String,
    endpoint: String,
    keys: SubscriptionKeys,
}

#[derive(Clone)]
pub struct BackendClient {
    base_url: Url,
    token: Token,
}

impl BackendClient {
    pub fn new(base_url: Url, token: Token) -> Self {
        BackendClient { base_url, token }
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .expect("Invalid base URL")
            .extend(segments);
        url
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("content-type", "application/json"),
            ("token", self.token.0.as_str()),
        ]
    }
}

fn to_app_error(err: CallApiError) -> AppError {
    match err {
        CallApiError::ExternalAPICallError(status) if status == StatusCode::UNAUTHORIZED => {
            AppError::Unauthorized
        }
        err => AppError::ExternalAPICallError(err.to_string()),
    }
}

#[async_trait]
impl NotificationApi for BackendClient {
    async fn fetch_notifications(&self) -> Result<Vec<Notification>, AppError> {
        call_api::<Vec<Notification>, ()>(
            Method::GET,
            &self.url(&["api", "notifications"]),
            self.headers(),
            None,
        )
        .await
        .map_err(to_app_error)
    }

    async fn fetch_unread_count(&self) -> Result<u64, AppError> {
        call_api::<UnreadCountResponse, ()>(
            Method::GET,
            &self.url(&["api", "notifications", "unread-count"]),
            self.headers(),
            None,
        )
        .await
        .map(|resp| resp.count)
        .map_err(to_app_error)
    }

    async fn mark_read(&self, id: NotificationId) -> Result<(), AppError> {
        call_api_unit::<()>(
            Method::POST,
            &self.url(&["api", "notifications", &id.inner().to_string(), "read"]),
            self.headers(),
            None,
        )
        .await
        .map_err(to_app_error)
    }

    async fn fetch_vapid_public_key(&self) -> Result<String, AppError> {
        // A non-2xx here means push is not configured server-side, which the
        // UI must distinguish from a client-side failure.
        match call_api::<VapidKeyResponse, ()>(
            Method::GET,
            &self.url(&["api", "notifications", "vapid-public-key"]),
            self.headers(),
            None,
        )
        .await
        {
            Ok(resp) => Ok(resp.public_key),
            Err(CallApiError::ExternalAPICallError(_)) => Err(AppError::PushNotConfigured),
            Err(err) => Err(to_app_error(err)),
        }
    }

    async fn save_subscription(
        &self,
        device_id: &DeviceId,
        subscription: &PushSubscription,
    ) -> Result<(), AppError> {
        let request_body = SubscribeRequest {
            device_id: device_id.inner(),
            endpoint: subscription.endpoint.to_owned(),
            keys: subscription.keys.to_owned(),
        };
        call_api_unit(
            Method::POST,
            &self.url(&["api", "notifications", "subscribe"]),
            self.headers(),
            Some(request_body),
        )
        .await
        .map_err(to_app_error)
    }
}
