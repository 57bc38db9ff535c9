//! JSON client for the storage gateway service.
//!
//! Every method is a single request with no retry: build the URL, send a
//! JSON body, map the status to a [`GatewayError`].

use std::collections::BTreeMap;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use acsstore_common::{
    BackendInfo, GatewayError, HttpExecutor, HttpMethod, HttpOutcome, PartRecord,
    RequestDescriptor, StorageGateway, UploadInfo,
};

use crate::executor::ReqwestExecutor;

#[derive(Serialize)]
struct ObjectRequest<'a> {
    object: &'a str,
    backend: &'a str,
}

#[derive(Serialize)]
struct PartEntry<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    etag: Option<&'a str>,
    size: u64,
}

#[derive(Serialize)]
struct FinalizeRequest<'a> {
    object: &'a str,
    backend: &'a str,
    parts: BTreeMap<u32, PartEntry<'a>>,
}

#[derive(Serialize)]
struct DownloadRequest<'a> {
    object: &'a str,
    backend: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    save_name: Option<&'a str>,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct WireDescriptor {
    url: String,
    method: HttpMethod,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    body: Option<String>,
}

impl From<WireDescriptor> for RequestDescriptor {
    fn from(w: WireDescriptor) -> Self {
        RequestDescriptor {
            url: w.url,
            method: w.method,
            headers: w.headers.into_iter().collect(),
            body: w.body.map(Bytes::from).unwrap_or_default(),
        }
    }
}

pub struct HttpGateway<E: HttpExecutor = ReqwestExecutor> {
    executor: E,
    base_url: String,
    api_token: Option<String>,
    timeout: Duration,
}

impl HttpGateway<ReqwestExecutor> {
    pub fn new(base_url: &str, api_token: Option<String>, timeout: Duration) -> Self {
        Self::with_executor(ReqwestExecutor::new(), base_url, api_token, timeout)
    }
}

impl<E: HttpExecutor> HttpGateway<E> {
    pub fn with_executor(
        executor: E,
        base_url: &str,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            executor,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self, with_body: bool) -> Vec<(String, String)> {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if with_body {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        if let Some(token) = &self.api_token {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }
        headers
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let result = self.executor.get(&url, &self.headers(false), self.timeout);
        decode(path, result)
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let payload = serde_json::to_vec(body).map_err(|e| GatewayError::Decode(e.to_string()))?;
        let result = self
            .executor
            .post(&url, Bytes::from(payload), &self.headers(true), self.timeout);
        decode(path, result)
    }
}

fn decode<T: DeserializeOwned>(
    path: &str,
    result: Result<HttpOutcome, acsstore_common::TransportError>,
) -> Result<T, GatewayError> {
    let outcome = result.map_err(|e| GatewayError::Transport(e.to_string()))?;
    match outcome.status {
        200 | 201 => serde_json::from_slice(&outcome.body)
            .map_err(|e| GatewayError::Decode(format!("{}: {}", path, e))),
        404 => Err(GatewayError::NotFound(path.to_string())),
        0 => Err(GatewayError::Transport(format!("no response for {}", path))),
        status => Err(GatewayError::Status {
            status,
            body: outcome.body_text(),
        }),
    }
}

impl<E: HttpExecutor> StorageGateway for HttpGateway<E> {
    fn list_local_backends(&self) -> Result<Vec<BackendInfo>, GatewayError> {
        self.get_json("/backends?scope=local")
    }

    fn get_upload_info(
        &self,
        object_name: &str,
        backend_id: &str,
    ) -> Result<UploadInfo, GatewayError> {
        let info: UploadInfo = self.post_json(
            "/uploads",
            &ObjectRequest {
                object: object_name,
                backend: backend_id,
            },
        )?;
        debug!(object = %object_name, upload_id = %info.upload_id, "Upload opened");
        Ok(info)
    }

    fn get_part_upload_target(
        &self,
        object_name: &str,
        backend_id: &str,
        upload_id: &str,
        part_number: u32,
    ) -> Result<RequestDescriptor, GatewayError> {
        let path = format!(
            "/uploads/{}/parts/{}",
            urlencoding::encode(upload_id),
            part_number
        );
        let wire: WireDescriptor = self.post_json(
            &path,
            &ObjectRequest {
                object: object_name,
                backend: backend_id,
            },
        )?;
        Ok(wire.into())
    }

    fn get_finalize_target(
        &self,
        object_name: &str,
        backend_id: &str,
        upload_id: &str,
        parts: &BTreeMap<u32, PartRecord>,
    ) -> Result<RequestDescriptor, GatewayError> {
        let path = format!("/uploads/{}/complete", urlencoding::encode(upload_id));
        let parts = parts
            .iter()
            .map(|(n, p)| {
                (
                    *n,
                    PartEntry {
                        etag: p.etag.as_deref(),
                        size: p.size,
                    },
                )
            })
            .collect();
        let wire: WireDescriptor = self.post_json(
            &path,
            &FinalizeRequest {
                object: object_name,
                backend: backend_id,
                parts,
            },
        )?;
        Ok(wire.into())
    }

    fn get_download_target(
        &self,
        object_name: &str,
        backend_id: &str,
        save_name: Option<&str>,
        expiry_secs: u64,
    ) -> Result<RequestDescriptor, GatewayError> {
        let wire: WireDescriptor = self.post_json(
            "/downloads",
            &DownloadRequest {
                object: object_name,
                backend: backend_id,
                save_name,
                expires_in: expiry_secs,
            },
        )?;
        Ok(wire.into())
    }
}
