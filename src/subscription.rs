/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use crate::{
    capability::{push_support, PushRuntime, SupportDecision},
    common::{
        types::*,
        utils::{encode_subscription, vapid_key_to_bytes},
    },
    outbound::backend::NotificationApi,
    tools::{error::AppError, prometheus::ENROLL_OUTCOMES},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::*;

/// Orchestrates the one-time handshake enrolling this device for push
/// delivery. `enroll` is user-triggered and sequential; the caller is
/// responsible for not starting a second enroll while one is in flight.
pub struct SubscriptionManager {
    backend: Arc<dyn NotificationApi>,
    runtime: Arc<dyn PushRuntime>,
    device_id: DeviceId,
    capability: Arc<RwLock<CapabilityState>>,
}

impl SubscriptionManager {
    pub fn new(
        backend: Arc<dyn NotificationApi>,
        runtime: Arc<dyn PushRuntime>,
        device_id: DeviceId,
        capability: Arc<RwLock<CapabilityState>>,
    ) -> Self {
        SubscriptionManager {
            backend,
            runtime,
            device_id,
            capability,
        }
    }

    pub async fn enroll(&self) -> EnrollOutcome {
        let outcome = self.enroll_inner().await;
        ENROLL_OUTCOMES
            .with_label_values(&[outcome_label(&outcome)])
            .inc();
        if outcome == EnrollOutcome::Enrolled {
            self.capability.write().await.subscribed = true;
        }
        outcome
    }

    async fn enroll_inner(&self) -> EnrollOutcome {
        // Re-verify the platform gating; the permission prompt further down
        // must be unreachable from an unsupported state.
        let decision = push_support(&self.runtime.traits());
        match decision {
            SupportDecision::Unsupported(reason) => {
                return EnrollOutcome::Unsupported(reason);
            }
            SupportDecision::NeedsInstall => {
                return EnrollOutcome::Unsupported(UnsupportedReason::NeedsInstall);
            }
            SupportDecision::Probe | SupportDecision::IosStandaloneOverride => {}
        }

        let registration = match self.runtime.register().await {
            Ok(registration) => registration,
            Err(err) => {
                error!("Runtime registration failed during enroll : {}", err);
                return EnrollOutcome::Failed(err.to_string());
            }
        };

        if !registration.has_subscription_manager()
            && decision != SupportDecision::IosStandaloneOverride
        {
            return EnrollOutcome::Unsupported(UnsupportedReason::NoSubscriptionManager);
        }

        // Server key material comes first: a missing key is a configuration
        // gap and must not burn the user's one permission prompt.
        let public_key = match self.backend.fetch_vapid_public_key().await {
            Ok(public_key) => public_key,
            Err(AppError::PushNotConfigured) => {
                warn!("Push is not configured server-side, enroll aborted");
                return EnrollOutcome::NotConfigured;
            }
            Err(err) => {
                error!("VAPID key fetch failed : {}", err);
                return EnrollOutcome::Failed(err.to_string());
            }
        };

        match self.runtime.request_permission().await {
            Ok(PermissionStatus::Granted) => {}
            Ok(PermissionStatus::Denied) => {
                // Terminal for this session, the platform blocks re-prompting.
                info!("Notification permission denied by the user");
                return EnrollOutcome::Denied;
            }
            Err(err) => {
                error!("Permission prompt failed : {}", err);
                return EnrollOutcome::Failed(err.to_string());
            }
        }

        let application_server_key = match vapid_key_to_bytes(&public_key) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!("VAPID key decode failed : {}", err);
                return EnrollOutcome::Failed(err.to_string());
            }
        };

        let raw_subscription = match registration.subscribe(&application_server_key).await {
            Ok(raw_subscription) => raw_subscription,
            Err(err) => {
                error!("Platform subscribe failed : {}", err);
                return EnrollOutcome::Failed(err.to_string());
            }
        };

        let subscription = encode_subscription(&raw_subscription);
        // A platform subscription with no server record is tolerable, it is
        // overwritten by the next successful enroll. Reporting success for it
        // is not.
        if let Err(err) = self
            .backend
            .save_subscription(&self.device_id, &subscription)
            .await
        {
            error!("Subscription persistence failed : {}", err);
            return EnrollOutcome::Failed(err.to_string());
        }

        info!(tag = "[ENROLLED]", endpoint = %subscription.endpoint);
        EnrollOutcome::Enrolled
    }
}

fn outcome_label(outcome: &EnrollOutcome) -> &'static str {
    match outcome {
        EnrollOutcome::Enrolled => "enrolled",
        EnrollOutcome::Denied => "denied",
        EnrollOutcome::Unsupported(_) => "unsupported",
        EnrollOutcome::NotConfigured => "not_configured",
        EnrollOutcome::Failed(_) => "failed",
    }
}
