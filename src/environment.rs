/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
#![allow(clippy::expect_used)]

use crate::{common::types::Token, outbound::backend::BackendClient, tools::logger::LoggerConfig};
use reqwest::Url;
use serde::Deserialize;
use std::{sync::Arc, time::Duration};

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub auth_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub http_server_port: u16,
    pub backend_cfg: BackendConfig,
    pub logger_cfg: LoggerConfig,
    pub poll_interval_seconds: u64,
}

/// Daemon-side state. The enroll and push-delivery surfaces are driven by
/// the embedding platform glue and keep their own state; only the foreground
/// feed channel runs in the binary.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<BackendClient>,
    pub poll_interval: Duration,
    pub http_server_port: u16,
}

impl AppState {
    pub fn new(app_config: AppConfig) -> AppState {
        let base_url = Url::parse(app_config.backend_cfg.base_url.as_str())
            .expect("Failed to parse backend base_url.");

        AppState {
            backend: Arc::new(BackendClient::new(
                base_url,
                Token(app_config.backend_cfg.auth_token),
            )),
            poll_interval: Duration::from_secs(app_config.poll_interval_seconds),
            http_server_port: app_config.http_server_port,
        }
    }
}
