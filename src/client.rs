//! Slack Web API access.
//!
//! [`RemoteHistoryClient`] is the seam between the exporter and the
//! network: it runs one named method and hands back the decoded JSON body.
//! [`call`] sits on top of any client, checks the `ok` envelope and decodes
//! the payload into a typed record.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::{AppError, Result};

/// Query parameters of a single API call, sorted for stable diagnostics
pub type Params = BTreeMap<String, String>;

pub trait RemoteHistoryClient {
    /// Run `method` with `params` and return the response body
    fn execute(
        &self,
        method: &str,
        params: &Params,
    ) -> impl Future<Output = Result<serde_json::Value>>;
}

pub fn remote_error(method: &str, params: &Params, reason: impl Into<String>) -> AppError {
    AppError::RemoteCallFailed {
        method: method.to_string(),
        params: format!("{:?}", params),
        reason: reason.into(),
    }
}

/// Execute `method` and decode its payload as `T`.
///
/// A body whose `ok` field is not `true` fails with the `error` field as
/// reason, whatever the transport status was.
pub async fn call<C, T>(client: &C, method: &str, params: &Params) -> Result<T>
where
    C: RemoteHistoryClient,
    T: DeserializeOwned,
{
    let body = client.execute(method, params).await?;

    if body.get("ok").and_then(|ok| ok.as_bool()) != Some(true) {
        let reason = body
            .get("error")
            .and_then(|e| e.as_str())
            .unwrap_or("unknown error");
        return Err(remote_error(method, params, reason));
    }

    serde_json::from_value(body)
        .map_err(|e| remote_error(method, params, format!("malformed response: {}", e)))
}

/// Client for the Slack Web API over HTTPS.
pub struct SlackHttpClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl SlackHttpClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| {
            remote_error("", &Params::new(), format!("invalid API url {}: {}", base_url, e))
        })?;
        // without the trailing slash `join` would replace the last segment
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token: token.to_string(),
        })
    }

    pub fn method_url(&self, method: &str, params: &Params) -> Result<Url> {
        let mut url = self
            .base_url
            .join(method)
            .map_err(|e| remote_error(method, params, format!("invalid method url: {}", e)))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter());
        }
        Ok(url)
    }
}

impl RemoteHistoryClient for SlackHttpClient {
    async fn execute(&self, method: &str, params: &Params) -> Result<serde_json::Value> {
        let url = self.method_url(method, params)?;

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| remote_error(method, params, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(remote_error(
                method,
                params,
                format!("Slack response status code {}", status.as_u16()),
            ));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| remote_error(method, params, format!("malformed response: {}", e)))
    }
}

/// Wraps a client so that consecutive calls start at least `interval` apart.
///
/// The clock lives behind an async mutex that is held while waiting, so
/// callers sharing one `PacedClient` are spaced out too.
pub struct PacedClient<C> {
    inner: C,
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl<C> PacedClient<C> {
    pub fn new(inner: C, interval: Duration) -> Self {
        Self {
            inner,
            interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: RemoteHistoryClient> RemoteHistoryClient for PacedClient<C> {
    async fn execute(&self, method: &str, params: &Params) -> Result<serde_json::Value> {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let ready_at = previous + self.interval;
            if ready_at > Instant::now() {
                tracing::trace!(method, "waiting for rate limit");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_call = Some(Instant::now());
        drop(last_call);

        self.inner.execute(method, params).await
    }
}
