use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::http::HttpMethod;

// ── Backends ──

/// A storage backend the gateway can target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendInfo {
    pub id: String,
    #[serde(default)]
    pub is_default: bool,
}

// ── Multipart upload ──

/// Upload id and recommended part size handed out by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadInfo {
    pub upload_id: String,
    #[serde(default)]
    pub part_size: u64,
}

/// State of one multipart upload, threaded by the caller through every
/// block upload and the final completion call. Never persisted here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadSession {
    pub account_id: String,
    pub obj_id: String,
    pub backend_id: String,
    pub upload_id: String,
    /// Backend hint; blocks of other sizes are not rejected by the client.
    pub part_size: u64,
}

/// One uploaded block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartRecord {
    /// Wire part number, starting at 1.
    pub part_number: u32,
    /// `None` when the backend answered without an ETag header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    pub size: u64,
}

// ── Requests ──

/// One pre-signed HTTP call issued by the gateway.
///
/// The method and URL are used verbatim; callers may only append headers.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}
