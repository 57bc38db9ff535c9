//! Blocking HTTP executor backed by reqwest.
//!
//! The underlying client is created on the first call and reused for every
//! call after that. The executor is `!Sync`, so each thread that talks to
//! storage owns its own connection pool.

use std::cell::OnceCell;
use std::time::Duration;

use bytes::Bytes;
use reqwest::blocking::{Client, RequestBuilder};
use tracing::debug;

use acsstore_common::{HttpExecutor, HttpOutcome, TransportError};

#[derive(Default)]
pub struct ReqwestExecutor {
    client: OnceCell<Client>,
}

impl ReqwestExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<&Client, TransportError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = Client::builder()
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {e}")))?;
        debug!("HTTP client initialized");
        Ok(self.client.get_or_init(|| client))
    }

    fn send(
        &self,
        req: RequestBuilder,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpOutcome, TransportError> {
        let mut req = req.timeout(timeout);
        for (name, value) in headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let resp = req.send().map_err(transport_error)?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = resp.bytes().map_err(transport_error)?;

        Ok(HttpOutcome {
            status,
            body,
            headers,
        })
    }
}

fn transport_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else if e.is_builder() {
        TransportError::InvalidRequest(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

impl HttpExecutor for ReqwestExecutor {
    fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpOutcome, TransportError> {
        let req = self.client()?.get(url);
        self.send(req, headers, timeout)
    }

    fn put(
        &self,
        url: &str,
        body: Bytes,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpOutcome, TransportError> {
        let req = self.client()?.put(url).body(body);
        self.send(req, headers, timeout)
    }

    fn post(
        &self,
        url: &str,
        body: Bytes,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpOutcome, TransportError> {
        let req = self.client()?.post(url).body(body);
        self.send(req, headers, timeout)
    }

    fn delete(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpOutcome, TransportError> {
        let req = self.client()?.delete(url);
        self.send(req, headers, timeout)
    }
}
