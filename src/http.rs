use std::time::Duration;

use reqwest::{Response, header};
use serde::de::DeserializeOwned;

use crate::error::{HookError, HookResult, Service, UpstreamStatus};

/// Outbound client shared by every external call. Each request gets the same bounded timeout.
pub fn client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

    Ok(reqwest::ClientBuilder::new()
        .timeout(timeout)
        .default_headers(headers)
        .build()?)
}

pub(crate) fn transport_error(service: Service, err: reqwest::Error) -> HookError {
    let status = if err.is_timeout() {
        UpstreamStatus::Timeout
    } else if err.is_decode() {
        UpstreamStatus::Malformed(err.to_string())
    } else if let Some(code) = err.status() {
        UpstreamStatus::Code(code.as_u16())
    } else {
        UpstreamStatus::Transport(err.to_string())
    };
    HookError::upstream(service, status)
}

/// Sends a prepared request, mapping transport failures and non-2xx answers to `Upstream`.
pub(crate) async fn send(service: Service, request: reqwest::RequestBuilder) -> HookResult<Response> {
    let response = request
        .send()
        .await
        .map_err(|err| transport_error(service, err))?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(%service, status = status.as_u16(), "upstream call failed");
        return Err(HookError::upstream(service, UpstreamStatus::Code(status.as_u16())));
    }
    Ok(response)
}

pub(crate) async fn json<T: DeserializeOwned>(service: Service, response: Response) -> HookResult<T> {
    response
        .json()
        .await
        .map_err(|err| transport_error(service, err))
}
