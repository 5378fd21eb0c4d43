/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

//! Runs in the background-runtime context, decoupled from any open page.
//! Its only outputs are one-way surface commands: render a notification,
//! close one, focus or open a window. It never calls back into page state.

use crate::{common::types::NotificationType, tools::prometheus::RENDERED_PUSHES};
use serde::Deserialize;
use tokio::sync::mpsc::{Receiver, Sender};
use tracing::*;

pub const DEFAULT_TITLE: &str = "New notification";
pub const DEFAULT_LANDING_PATH: &str = "/notifications";

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct RawPushPayload {
    title: Option<String>,
    message: Option<String>,
    body: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    reference_id: Option<i64>,
    url: Option<String>,
}

/// Metadata retained on the rendered notification for click handling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushData {
    pub url: Option<String>,
    pub kind: Option<NotificationType>,
    pub reference_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PushRender {
    pub title: String,
    pub body: String,
    /// Stable per-event tag so repeated pushes for the same underlying event
    /// replace the shown notification instead of stacking.
    pub tag: String,
    pub data: PushData,
}

/// Parses an opaque push payload into a renderable notification. Absent or
/// malformed fields fall back to defaults; a bad payload must never take the
/// background runtime down.
pub fn render_push(payload: &[u8]) -> PushRender {
    let raw: RawPushPayload = serde_json::from_slice(payload).unwrap_or_else(|err| {
        warn!("Malformed push payload, rendering defaults : {}", err);
        RawPushPayload::default()
    });

    let kind = raw
        .kind
        .as_deref()
        .and_then(|kind| kind.parse::<NotificationType>().ok());
    let tag = format!(
        "{}:{}",
        raw.kind.as_deref().unwrap_or("notification"),
        raw.reference_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string())
    );

    PushRender {
        title: raw.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        body: raw.message.or(raw.body).unwrap_or_default(),
        tag,
        data: PushData {
            url: raw.url,
            kind,
            reference_id: raw.reference_id,
        },
    }
}

/// Resolves the in-app path a click should open: an explicit `url` wins,
/// otherwise the type routes through a static table with a default landing
/// path for unknown types.
pub fn click_target(data: &PushData) -> String {
    if let Some(url) = &data.url {
        return url.to_owned();
    }
    match data.kind {
        Some(NotificationType::VisitRequest) => "/visits",
        Some(NotificationType::OnboardingRequest) => "/onboarding",
        Some(NotificationType::Payment) => "/payments",
        Some(NotificationType::Complaint) => "/complaints",
        Some(NotificationType::Unknown) | None => DEFAULT_LANDING_PATH,
    }
    .to_string()
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct WindowId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct OpenWindow {
    pub id: WindowId,
    pub origin: String,
}

/// Events the platform delivers into the background runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Push(Vec<u8>),
    Clicked {
        tag: String,
        data: PushData,
        open_windows: Vec<OpenWindow>,
    },
}

/// One-way commands back to the platform surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCommand {
    Render(PushRender),
    Close { tag: String },
    FocusAndNavigate { window: WindowId, path: String },
    OpenWindow { path: String },
}

fn click_commands(
    tag: String,
    data: &PushData,
    open_windows: &[OpenWindow],
    app_origin: &str,
) -> Vec<SurfaceCommand> {
    let path = click_target(data);
    let mut commands = vec![SurfaceCommand::Close { tag }];
    match open_windows
        .iter()
        .find(|window| window.origin == app_origin)
    {
        Some(window) => commands.push(SurfaceCommand::FocusAndNavigate {
            window: window.id,
            path,
        }),
        None => commands.push(SurfaceCommand::OpenWindow { path }),
    }
    commands
}

/// Event loop for the background runtime context. Terminates when the event
/// channel closes.
pub async fn run_delivery_handler(
    mut events: Receiver<PushEvent>,
    commands: Sender<SurfaceCommand>,
    app_origin: String,
) {
    while let Some(event) = events.recv().await {
        match event {
            PushEvent::Push(payload) => {
                let render = render_push(&payload);
                RENDERED_PUSHES.inc();
                info!(tag = "[PUSH]", notification_tag = %render.tag, title = %render.title);
                if commands.send(SurfaceCommand::Render(render)).await.is_err() {
                    break;
                }
            }
            PushEvent::Clicked {
                tag,
                data,
                open_windows,
            } => {
                for command in click_commands(tag, &data, &open_windows, &app_origin) {
                    if commands.send(command).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn full_payload_renders_all_fields() {
        let payload = br#"{"title":"Visit requested","message":"Somebody wants to visit","type":"visit_request","referenceId":42,"url":"/visits/42"}"#;
        let render = render_push(payload);
        assert_eq!(render.title, "Visit requested");
        assert_eq!(render.body, "Somebody wants to visit");
        assert_eq!(render.tag, "visit_request:42");
        assert_eq!(render.data.kind, Some(NotificationType::VisitRequest));
        assert_eq!(render.data.url.as_deref(), Some("/visits/42"));
    }

    #[test]
    fn body_falls_back_to_the_body_field() {
        let render = render_push(br#"{"title":"T","body":"from body"}"#);
        assert_eq!(render.body, "from body");
    }

    #[test]
    fn malformed_payload_renders_defaults_without_panicking() {
        let render = render_push(b"not json at all");
        assert_eq!(render.title, DEFAULT_TITLE);
        assert_eq!(render.body, "");
        assert_eq!(render.tag, "notification:none");
        assert_eq!(render.data, PushData::default());
    }

    #[test]
    fn repeated_pushes_for_one_event_share_a_tag() {
        let first = render_push(br#"{"type":"payment","referenceId":7,"message":"created"}"#);
        let second = render_push(br#"{"type":"payment","referenceId":7,"message":"confirmed"}"#);
        assert_eq!(first.tag, second.tag);

        let other = render_push(br#"{"type":"payment","referenceId":8}"#);
        assert_ne!(first.tag, other.tag);
    }

    #[test]
    fn click_target_prefers_the_explicit_url() {
        let data = PushData {
            url: Some("/payments/7".to_string()),
            kind: Some(NotificationType::Complaint),
            reference_id: Some(7),
        };
        assert_eq!(click_target(&data), "/payments/7");
    }

    #[test]
    fn click_target_routes_by_type_with_a_default() {
        let by_kind = |kind| {
            click_target(&PushData {
                url: None,
                kind,
                reference_id: None,
            })
        };
        assert_eq!(by_kind(Some(NotificationType::VisitRequest)), "/visits");
        assert_eq!(
            by_kind(Some(NotificationType::OnboardingRequest)),
            "/onboarding"
        );
        assert_eq!(by_kind(Some(NotificationType::Payment)), "/payments");
        assert_eq!(by_kind(Some(NotificationType::Complaint)), "/complaints");
        assert_eq!(by_kind(Some(NotificationType::Unknown)), DEFAULT_LANDING_PATH);
        assert_eq!(by_kind(None), DEFAULT_LANDING_PATH);
    }

    #[tokio::test]
    async fn push_event_renders_through_the_command_channel() {
        let (event_tx, event_rx) = mpsc::channel(8);
        let (command_tx, mut command_rx) = mpsc::channel(8);
        let task = tokio::spawn(run_delivery_handler(
            event_rx,
            command_tx,
            "https://app.example.com".to_string(),
        ));

        event_tx
            .send(PushEvent::Push(
                br#"{"title":"T","message":"M","type":"complaint","referenceId":3}"#.to_vec(),
            ))
            .await
            .unwrap();

        match command_rx.recv().await.unwrap() {
            SurfaceCommand::Render(render) => {
                assert_eq!(render.title, "T");
                assert_eq!(render.tag, "complaint:3");
            }
            other => panic!("expected a render command, got {other:?}"),
        }

        drop(event_tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn click_focuses_an_existing_same_origin_window() {
        let (event_tx, event_rx) = mpsc::channel(8);
        let (command_tx, mut command_rx) = mpsc::channel(8);
        let task = tokio::spawn(run_delivery_handler(
            event_rx,
            command_tx,
            "https://app.example.com".to_string(),
        ));

        event_tx
            .send(PushEvent::Clicked {
                tag: "payment:7".to_string(),
                data: PushData {
                    url: None,
                    kind: Some(NotificationType::Payment),
                    reference_id: Some(7),
                },
                open_windows: vec![
                    OpenWindow {
                        id: WindowId(1),
                        origin: "https://other.example.com".to_string(),
                    },
                    OpenWindow {
                        id: WindowId(2),
                        origin: "https://app.example.com".to_string(),
                    },
                ],
            })
            .await
            .unwrap();

        assert_eq!(
            command_rx.recv().await.unwrap(),
            SurfaceCommand::Close {
                tag: "payment:7".to_string()
            }
        );
        assert_eq!(
            command_rx.recv().await.unwrap(),
            SurfaceCommand::FocusAndNavigate {
                window: WindowId(2),
                path: "/payments".to_string()
            }
        );

        drop(event_tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn click_opens_a_new_window_when_none_matches() {
        let (event_tx, event_rx) = mpsc::channel(8);
        let (command_tx, mut command_rx) = mpsc::channel(8);
        let task = tokio::spawn(run_delivery_handler(
            event_rx,
            command_tx,
            "https://app.example.com".to_string(),
        ));

        event_tx
            .send(PushEvent::Clicked {
                tag: "notification:none".to_string(),
                data: PushData::default(),
                open_windows: Vec::new(),
            })
            .await
            .unwrap();

        assert_eq!(
            command_rx.recv().await.unwrap(),
            SurfaceCommand::Close {
                tag: "notification:none".to_string()
            }
        );
        assert_eq!(
            command_rx.recv().await.unwrap(),
            SurfaceCommand::OpenWindow {
                path: DEFAULT_LANDING_PATH.to_string()
            }
        );

        drop(event_tx);
        task.await.unwrap();
    }
}
