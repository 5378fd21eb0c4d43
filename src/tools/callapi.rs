/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use crate::call_external_api;
use crate::tools::prometheus::CALL_EXTERNAL_API;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, Method, Response, StatusCode, Url,
};
use serde::{de::DeserializeOwned, Serialize};
use std::{fmt::Debug, str::FromStr};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum CallApiError {
    #[error("HeaderSerializationFailed : {0}")]
    HeaderSerializationFailed(String),
    #[error("ResponseDeserializationFailed : {0}")]
    ResponseDeserializationFailed(String),
    #[error("ConnectionError : {0}")]
    ConnectionError(String),
    #[error("BodySerializationFailed : {0}")]
    BodySerializationFailed(String),
    #[error("ExternalAPICallError : {0}")]
    ExternalAPICallError(StatusCode),
}

async fn call(
    method: Method,
    url: &Url,
    headers: Vec<(&str, &str)>,
    body: Option<String>,
) -> Result<Response, CallApiError> {
    let start_time = std::time::Instant::now();

    let client = Client::new();

    let mut header_map = HeaderMap::new();
    for (header_key, header_value) in headers {
        let header_name = HeaderName::from_str(header_key)
            .map_err(|err| CallApiError::HeaderSerializationFailed(err.to_string()))?;
        let header_value = HeaderValue::from_str(header_value)
            .map_err(|err| CallApiError::HeaderSerializationFailed(err.to_string()))?;
        header_map.insert(header_name, header_value);
    }

    let mut request = client
        .request(method.to_owned(), url.to_owned())
        .headers(header_map);

    if let Some(body) = &body {
        request = request.body(body.to_owned());
    }

    let resp = request.send().await;

    let host = url.host_str().unwrap_or("").to_string();
    let status = match resp.as_ref() {
        Ok(resp) => resp.status().as_str().to_string(),
        Err(err) => err
            .status()
            .map(|status| status.to_string())
            .unwrap_or("UNKNOWN".to_string()),
    };

    call_external_api!(
        method.as_str(),
        host.as_str(),
        url.path(),
        status.as_str(),
        start_time
    );

    match resp {
        Ok(resp) => {
            if resp.status().is_success() {
                info!(tag = "[OUTGOING API]", request_method = %method, request_url = %url, status = %resp.status(), latency = format!("{:?}ms", start_time.elapsed().as_millis()));
                Ok(resp)
            } else {
                error!(tag = "[OUTGOING API - ERROR]", request_method = %method, request_url = %url, request_body = format!("{:?}", body), status = %resp.status(), latency = format!("{:?}ms", start_time.elapsed().as_millis()));
                Err(CallApiError::ExternalAPICallError(resp.status()))
            }
        }
        Err(err) => {
            error!(tag = "[OUTGOING API - ERROR]", request_method = %method, request_url = %url, request_body = format!("{:?}", body), error = format!("{:?}", err), latency = format!("{:?}ms", start_time.elapsed().as_millis()));
            Err(CallApiError::ConnectionError(err.to_string()))
        }
    }
}

fn serialize_body<U>(body: Option<U>) -> Result<Option<String>, CallApiError>
where
    U: Serialize + Debug,
{
    body.map(|body| {
        serde_json::to_string(&body).map_err(|err| CallApiError::BodySerializationFailed(err.to_string()))
    })
    .transpose()
}

pub async fn call_api<T, U>(
    method: Method,
    url: &Url,
    headers: Vec<(&str, &str)>,
    body: Option<U>,
) -> Result<T, CallApiError>
where
    T: DeserializeOwned,
    U: Serialize + Debug,
{
    let body = serialize_body(body)?;
    let resp = call(method, url, headers, body).await?;
    resp.json::<T>()
        .await
        .map_err(|err| CallApiError::ResponseDeserializationFailed(err.to_string()))
}

/// For endpoints that only signal success or failure; any 2xx body is
/// discarded without deserialization.
pub async fn call_api_unit<U>(
    method: Method,
    url: &Url,
    headers: Vec<(&str, &str)>,
    body: Option<U>,
) -> Result<(), CallApiError>
where
    U: Serialize + Debug,
{
    let body = serialize_body(body)?;
    let _resp = call(method, url, headers, body).await?;
    Ok(())
}
