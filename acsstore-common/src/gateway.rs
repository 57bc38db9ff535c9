use std::collections::BTreeMap;

use crate::model::{BackendInfo, PartRecord, RequestDescriptor, UploadInfo};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway unreachable: {0}")]
    Transport(String),
    #[error("gateway returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("malformed gateway response: {0}")]
    Decode(String),
}

/// Resolves logical object names into executable, pre-signed requests.
///
/// The gateway owns partitioning and credential signing; the data path only
/// consumes what it hands back. Implementations perform at most one remote
/// call per method and do not retry.
pub trait StorageGateway {
    /// Storage backends available to this node.
    fn list_local_backends(&self) -> Result<Vec<BackendInfo>, GatewayError>;

    /// Open a multipart upload for `object_name`.
    fn get_upload_info(
        &self,
        object_name: &str,
        backend_id: &str,
    ) -> Result<UploadInfo, GatewayError>;

    /// Request for uploading part `part_number` (1-based).
    fn get_part_upload_target(
        &self,
        object_name: &str,
        backend_id: &str,
        upload_id: &str,
        part_number: u32,
    ) -> Result<RequestDescriptor, GatewayError>;

    /// Request that stitches the uploaded parts together. `parts` is keyed by
    /// wire part number. The gateway picks the HTTP method.
    fn get_finalize_target(
        &self,
        object_name: &str,
        backend_id: &str,
        upload_id: &str,
        parts: &BTreeMap<u32, PartRecord>,
    ) -> Result<RequestDescriptor, GatewayError>;

    /// Request for reading the object, valid for `expiry_secs`.
    fn get_download_target(
        &self,
        object_name: &str,
        backend_id: &str,
        save_name: Option<&str>,
        expiry_secs: u64,
    ) -> Result<RequestDescriptor, GatewayError>;
}
