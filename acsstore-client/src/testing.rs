//! Stub collaborators shared by the unit tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use bytes::Bytes;

use acsstore_common::{
    BackendInfo, GatewayError, HttpExecutor, HttpMethod, HttpOutcome, PartRecord,
    RequestDescriptor, StorageGateway, TransportError, UploadInfo,
};

#[derive(Debug, Clone)]
pub struct Call {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub timeout: Duration,
}

impl Call {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

type Scripted = Result<HttpOutcome, TransportError>;

/// Replays scripted results in order, then repeats the fallback (if any).
pub struct ScriptedExecutor {
    script: RefCell<VecDeque<Scripted>>,
    fallback: Option<Scripted>,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedExecutor {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: RefCell::new(script.into()),
            fallback: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn always(result: Scripted) -> Self {
        Self {
            script: RefCell::new(VecDeque::new()),
            fallback: Some(result),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn record(
        &self,
        method: HttpMethod,
        url: &str,
        body: Bytes,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Scripted {
        self.calls.borrow_mut().push(Call {
            method,
            url: url.to_string(),
            headers: headers.to_vec(),
            body,
            timeout,
        });
        match self.script.borrow_mut().pop_front() {
            Some(next) => next,
            None => self
                .fallback
                .clone()
                .unwrap_or_else(|| panic!("unexpected {} {}", method, url)),
        }
    }
}

impl HttpExecutor for ScriptedExecutor {
    fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpOutcome, TransportError> {
        self.record(HttpMethod::Get, url, Bytes::new(), headers, timeout)
    }

    fn put(
        &self,
        url: &str,
        body: Bytes,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpOutcome, TransportError> {
        self.record(HttpMethod::Put, url, body, headers, timeout)
    }

    fn post(
        &self,
        url: &str,
        body: Bytes,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpOutcome, TransportError> {
        self.record(HttpMethod::Post, url, body, headers, timeout)
    }

    fn delete(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpOutcome, TransportError> {
        self.record(HttpMethod::Delete, url, Bytes::new(), headers, timeout)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    ListBackends,
    UploadInfo {
        object: String,
        backend: String,
    },
    PartTarget {
        object: String,
        backend: String,
        upload_id: String,
        part_number: u32,
    },
    Finalize {
        object: String,
        backend: String,
        upload_id: String,
        parts: BTreeMap<u32, PartRecord>,
    },
    Download {
        object: String,
        backend: String,
        save_name: Option<String>,
        expiry_secs: u64,
    },
}

/// Hands out descriptors pointing at `https://oss.test/{object}` and records
/// every request.
pub struct RecordingGateway {
    pub backends: Vec<BackendInfo>,
    pub finalize_method: HttpMethod,
    pub fail: bool,
    calls: RefCell<Vec<GatewayCall>>,
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self {
            backends: vec![BackendInfo {
                id: "oss-1".into(),
                is_default: true,
            }],
            finalize_method: HttpMethod::Post,
            fail: false,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl RecordingGateway {
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: GatewayCall) -> Result<(), GatewayError> {
        self.calls.borrow_mut().push(call);
        if self.fail {
            return Err(GatewayError::Status {
                status: 500,
                body: "gateway down".into(),
            });
        }
        Ok(())
    }
}

impl StorageGateway for RecordingGateway {
    fn list_local_backends(&self) -> Result<Vec<BackendInfo>, GatewayError> {
        self.record(GatewayCall::ListBackends)?;
        Ok(self.backends.clone())
    }

    fn get_upload_info(
        &self,
        object_name: &str,
        backend_id: &str,
    ) -> Result<UploadInfo, GatewayError> {
        self.record(GatewayCall::UploadInfo {
            object: object_name.into(),
            backend: backend_id.into(),
        })?;
        Ok(UploadInfo {
            upload_id: "upload-1".into(),
            part_size: 5 * 1024 * 1024,
        })
    }

    fn get_part_upload_target(
        &self,
        object_name: &str,
        backend_id: &str,
        upload_id: &str,
        part_number: u32,
    ) -> Result<RequestDescriptor, GatewayError> {
        self.record(GatewayCall::PartTarget {
            object: object_name.into(),
            backend: backend_id.into(),
            upload_id: upload_id.into(),
            part_number,
        })?;
        Ok(RequestDescriptor::new(
            HttpMethod::Put,
            format!(
                "https://oss.test/{}?uploadId={}&partNumber={}",
                object_name, upload_id, part_number
            ),
        )
        .with_header("x-amz-date", "20250101T000000Z"))
    }

    fn get_finalize_target(
        &self,
        object_name: &str,
        backend_id: &str,
        upload_id: &str,
        parts: &BTreeMap<u32, PartRecord>,
    ) -> Result<RequestDescriptor, GatewayError> {
        self.record(GatewayCall::Finalize {
            object: object_name.into(),
            backend: backend_id.into(),
            upload_id: upload_id.into(),
            parts: parts.clone(),
        })?;
        Ok(RequestDescriptor::new(
            self.finalize_method,
            format!("https://oss.test/{}?uploadId={}", object_name, upload_id),
        )
        .with_body("<CompleteMultipartUpload/>"))
    }

    fn get_download_target(
        &self,
        object_name: &str,
        backend_id: &str,
        save_name: Option<&str>,
        expiry_secs: u64,
    ) -> Result<RequestDescriptor, GatewayError> {
        self.record(GatewayCall::Download {
            object: object_name.into(),
            backend: backend_id.into(),
            save_name: save_name.map(str::to_string),
            expiry_secs,
        })?;
        Ok(RequestDescriptor::new(
            HttpMethod::Get,
            format!("https://oss.test/{}", object_name),
        ))
    }
}
