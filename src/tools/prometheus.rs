/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
#![allow(clippy::expect_used)]

use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use prometheus::{
    opts, register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};

pub static ANNOUNCED_NOTIFICATIONS: once_cell::sync::Lazy<IntCounter> =
    once_cell::sync::Lazy::new(|| {
        register_int_counter!("announced_notifications", "Announced Notifications")
            .expect("Failed to register announced notifications metrics")
    });

pub static POLL_FAILURES: once_cell::sync::Lazy<IntCounterVec> = once_cell::sync::Lazy::new(|| {
    register_int_counter_vec!(
        opts!("poll_failures", "Feed Poll Failures"),
        &["read"]
    )
    .expect("Failed to register poll failures metrics")
});

pub static ENROLL_OUTCOMES: once_cell::sync::Lazy<IntCounterVec> =
    once_cell::sync::Lazy::new(|| {
        register_int_counter_vec!(
            opts!("enroll_outcomes", "Push Enroll Outcomes"),
            &["outcome"]
        )
        .expect("Failed to register enroll outcomes metrics")
    });

pub static RENDERED_PUSHES: once_cell::sync::Lazy<IntCounter> = once_cell::sync::Lazy::new(|| {
    register_int_counter!("rendered_pushes", "Rendered Push Notifications")
        .expect("Failed to register rendered pushes metrics")
});

pub static CALL_EXTERNAL_API: once_cell::sync::Lazy<HistogramVec> =
    once_cell::sync::Lazy::new(|| {
        register_histogram_vec!(
            opts!("external_request_duration", "Call external API requests").into(),
            &["method", "host", "service", "status"]
        )
        .expect("Failed to register call external API metrics")
    });

pub fn prometheus_metrics() -> PrometheusMetrics {
    PrometheusMetricsBuilder::new("api")
        .registry(prometheus::default_registry().clone())
        .endpoint("/metrics")
        .build()
        .expect("Failed to create prometheus metrics middleware")
}

#[macro_export]
macro_rules! call_external_api {
    ($method:expr, $host:expr, $path:expr, $status:expr, $start:expr) => {
        let duration = $start.elapsed().as_secs_f64();
        CALL_EXTERNAL_API
            .with_label_values(&[$method, $host, $path, $status])
            .observe(duration);
    };
}
