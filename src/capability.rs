/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use crate::{common::types::*, tools::error::AppError};
use async_trait::async_trait;
use tracing::{info, warn};

/// Platform surface for push delivery. The page-context side of the
/// coordinator only ever talks to the platform through this seam.
#[async_trait]
pub trait PushRuntime: Send + Sync {
    fn traits(&self) -> PlatformTraits;

    /// Registers the background runtime and waits for it to become active.
    /// Idempotent at the platform level.
    async fn register(&self) -> Result<Box<dyn RuntimeHandle>, AppError>;

    /// Prompts the user for notification permission. Must only be called
    /// from a user-triggered enroll flow; platforms rate-limit or auto-deny
    /// unsolicited prompts.
    async fn request_permission(&self) -> Result<PermissionStatus, AppError>;
}

#[async_trait]
pub trait RuntimeHandle: Send + Sync {
    fn has_subscription_manager(&self) -> bool;
    async fn existing_subscription(&self) -> Result<Option<RawSubscription>, AppError>;
    async fn subscribe(&self, application_server_key: &[u8]) -> Result<RawSubscription, AppError>;
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SupportDecision {
    /// Register the runtime and trust its subscription-manager probe.
    Probe,
    /// iOS running standalone reports push-capable even when the probe is
    /// negative. Platform-specific override, not a general rule.
    IosStandaloneOverride,
    /// Push exists on this platform but only after install to home screen.
    NeedsInstall,
    Unsupported(UnsupportedReason),
}

/// Capability table keyed by the probed traits. New platform quirks get a
/// new arm here rather than nested conditionals at call sites.
pub fn push_support(traits: &PlatformTraits) -> SupportDecision {
    match (
        traits.has_background_runtime,
        traits.platform_family,
        traits.is_standalone,
    ) {
        (false, _, _) => SupportDecision::Unsupported(UnsupportedReason::NoBackgroundRuntime),
        (true, PlatformFamily::Ios, false) => SupportDecision::NeedsInstall,
        (true, PlatformFamily::Ios, true) => SupportDecision::IosStandaloneOverride,
        (true, PlatformFamily::Generic, _) => SupportDecision::Probe,
    }
}

/// Recomputed on every app load. Never returns an error; any failure along
/// the way resolves to an unsupported state.
pub async fn detect(runtime: &dyn PushRuntime) -> CapabilityState {
    let traits = runtime.traits();
    let decision = push_support(&traits);

    match decision {
        SupportDecision::Unsupported(reason) => CapabilityState::unsupported(reason),
        SupportDecision::NeedsInstall => {
            CapabilityState::unsupported(UnsupportedReason::NeedsInstall)
        }
        SupportDecision::Probe | SupportDecision::IosStandaloneOverride => {
            let registration = match runtime.register().await {
                Ok(registration) => registration,
                Err(err) => {
                    warn!(
                        "Background runtime registration failed during detection : {}",
                        err
                    );
                    return CapabilityState::unsupported(UnsupportedReason::RegistrationFailed);
                }
            };

            // Some platforms register the runtime in a normal tab but expose
            // the subscription manager only in standalone mode. Same as
            // unsupported, not an error.
            if !registration.has_subscription_manager()
                && decision != SupportDecision::IosStandaloneOverride
            {
                return CapabilityState::unsupported(UnsupportedReason::NoSubscriptionManager);
            }

            let subscribed = match registration.existing_subscription().await {
                Ok(subscription) => subscription.is_some(),
                Err(err) => {
                    warn!("Existing subscription lookup failed : {}", err);
                    false
                }
            };

            info!(
                tag = "[CAPABILITY]",
                supported = true,
                subscribed,
                family = %traits.platform_family,
                standalone = traits.is_standalone
            );
            CapabilityState::supported(subscribed)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::sync::atomic::Ordering;

    fn generic(standalone: bool) -> PlatformTraits {
        PlatformTraits {
            has_background_runtime: true,
            is_standalone: standalone,
            platform_family: PlatformFamily::Generic,
        }
    }

    fn ios(standalone: bool) -> PlatformTraits {
        PlatformTraits {
            has_background_runtime: true,
            is_standalone: standalone,
            platform_family: PlatformFamily::Ios,
        }
    }

    #[tokio::test]
    async fn no_background_runtime_is_unsupported_without_registering() {
        let traits = PlatformTraits {
            has_background_runtime: false,
            is_standalone: false,
            platform_family: PlatformFamily::Generic,
        };
        let runtime = FakeRuntime::new(traits, FakeHandle::default());
        let state = detect(&runtime).await;
        assert!(!state.supported);
        assert_eq!(state.reason, Some(UnsupportedReason::NoBackgroundRuntime));
        assert_eq!(runtime.register_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ios_in_browser_tab_needs_install() {
        let runtime = FakeRuntime::new(ios(false), FakeHandle::default());
        let state = detect(&runtime).await;
        assert!(!state.supported);
        assert_eq!(state.reason, Some(UnsupportedReason::NeedsInstall));
    }

    #[tokio::test]
    async fn runtime_without_subscription_manager_is_unsupported_not_an_error() {
        let handle = FakeHandle {
            subscription_manager: false,
            ..FakeHandle::default()
        };
        let runtime = FakeRuntime::new(generic(false), handle);
        let state = detect(&runtime).await;
        assert!(!state.supported);
        assert_eq!(
            state.reason,
            Some(UnsupportedReason::NoSubscriptionManager)
        );
    }

    #[tokio::test]
    async fn ios_standalone_overrides_a_negative_probe() {
        let handle = FakeHandle {
            subscription_manager: false,
            ..FakeHandle::default()
        };
        let runtime = FakeRuntime::new(ios(true), handle);
        let state = detect(&runtime).await;
        assert!(state.supported);
        assert!(!state.subscribed);
    }

    #[tokio::test]
    async fn existing_subscription_reports_subscribed() {
        let handle = FakeHandle {
            existing: Some(RawSubscription {
                endpoint: "https://push.example.com/send/abc".to_string(),
                p256dh: vec![1, 2, 3],
                auth: vec![4, 5],
            }),
            ..FakeHandle::default()
        };
        let runtime = FakeRuntime::new(generic(true), handle);
        let state = detect(&runtime).await;
        assert!(state.supported);
        assert!(state.subscribed);
    }

    #[tokio::test]
    async fn registration_failure_resolves_to_unsupported() {
        let mut runtime = FakeRuntime::new(generic(false), FakeHandle::default());
        runtime.handle = None;
        let state = detect(&runtime).await;
        assert!(!state.supported);
        assert_eq!(state.reason, Some(UnsupportedReason::RegistrationFailed));
    }
}
