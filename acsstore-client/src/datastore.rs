//! Data store façade: multipart upload and ranged reads against object
//! storage, driven by gateway-issued request descriptors.
//!
//! A `DataStore` owns its HTTP executor. The default executor is not `Sync`,
//! so a worker thread builds its own `DataStore` and keeps it for its
//! lifetime; nothing is shared between threads.

use std::collections::BTreeMap;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};

use acsstore_common::naming::{self, compose_object_name, split_file_id};
use acsstore_common::{
    classify, dispatch, DataStoreError, HttpExecutor, HttpMethod, HttpOutcome, PartRecord,
    RequestContext, RequestDescriptor, StorageError, StorageGateway, TransportError,
    UploadSession,
};

use crate::config::DataStoreOptions;
use crate::executor::ReqwestExecutor;

/// Translate a caller's 0-based block sequence number into the 1-based part
/// number used on the wire.
pub fn part_number_for(sequence: u32) -> Result<u32, DataStoreError> {
    sequence.checked_add(1).ok_or_else(|| {
        DataStoreError::InvalidArgument(format!("block sequence {} out of range", sequence))
    })
}

/// Inclusive byte range to fetch, or `None` when nothing needs reading.
///
/// Negative offsets read from 0. A length of -1 (or anything below it)
/// reads to the end of the object, and the end is clamped to the last byte.
pub fn byte_range(offset: i64, length: i64, total_size: i64) -> Option<(i64, i64)> {
    let offset = offset.max(0);
    let length = length.max(-1);
    if offset >= total_size || length == 0 {
        return None;
    }
    let last = total_size - 1;
    let end = match length {
        -1 => last,
        n => match offset.checked_add(n - 1) {
            Some(end) if end <= last => end,
            _ => last,
        },
    };
    Some((offset, end))
}

pub fn range_header(offset: i64, end: i64) -> String {
    format!("bytes={}-{}", offset, end)
}

pub struct DataStore<G: StorageGateway, E: HttpExecutor = ReqwestExecutor> {
    gateway: G,
    executor: E,
    options: DataStoreOptions,
}

impl<G: StorageGateway> DataStore<G, ReqwestExecutor> {
    pub fn new(gateway: G, options: DataStoreOptions) -> Self {
        Self::with_executor(gateway, ReqwestExecutor::new(), options)
    }
}

impl<G: StorageGateway, E: HttpExecutor> DataStore<G, E> {
    pub fn with_executor(gateway: G, executor: E, options: DataStoreOptions) -> Self {
        Self {
            gateway,
            executor,
            options,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn new_object_id(&self) -> String {
        naming::new_object_id()
    }

    pub fn new_account_id(&self) -> String {
        naming::new_account_id()
    }

    /// Id of the default local backend, the first listed backend when none
    /// is flagged default, or an empty string when no backend is configured.
    pub fn default_backend_id(&self) -> Result<String, DataStoreError> {
        let backends = self.gateway.list_local_backends().map_err(|e| {
            StorageError::gateway(RequestContext::new("DefaultBackendId", ""), e)
        })?;
        let id = backends
            .iter()
            .find(|b| b.is_default)
            .or_else(|| backends.first())
            .map(|b| b.id.clone())
            .unwrap_or_default();
        if id.is_empty() {
            warn!("No local storage backend configured");
        }
        Ok(id)
    }

    pub fn init_upload(
        &self,
        prefix: &str,
        account_id: &str,
        obj_id: &str,
        backend_id: &str,
    ) -> Result<UploadSession, DataStoreError> {
        require_backend("InitUpload", backend_id)?;
        let object = compose_object_name(prefix, account_id, obj_id);
        let info = self
            .gateway
            .get_upload_info(&object, backend_id)
            .map_err(|e| StorageError::gateway(RequestContext::new("InitUpload", &object), e))?;

        debug!(
            object = %object,
            backend = %backend_id,
            upload_id = %info.upload_id,
            part_size = info.part_size,
            "Multipart upload initialized"
        );
        Ok(UploadSession {
            account_id: account_id.to_string(),
            obj_id: obj_id.to_string(),
            backend_id: backend_id.to_string(),
            upload_id: info.upload_id,
            part_size: info.part_size,
        })
    }

    /// Upload one block. `sequence` is the caller's 0-based block index;
    /// `offset` is the block's position in the object and is only logged.
    #[allow(clippy::too_many_arguments)]
    pub fn upload_block(
        &self,
        prefix: &str,
        account_id: &str,
        obj_id: &str,
        backend_id: &str,
        upload_id: &str,
        content: Bytes,
        offset: u64,
        sequence: u32,
    ) -> Result<PartRecord, DataStoreError> {
        require_backend("UploadBlock", backend_id)?;
        require_upload_id("UploadBlock", upload_id)?;
        let part_number = part_number_for(sequence)?;
        let object = compose_object_name(prefix, account_id, obj_id);
        let ctx = RequestContext::new("UploadBlock", &object).with_sequence(sequence as i64);

        let desc = self
            .gateway
            .get_part_upload_target(&object, backend_id, upload_id, part_number)
            .map_err(|e| StorageError::gateway(ctx.clone(), e))?;

        let size = content.len() as u64;
        let outcome = self
            .execute("UploadBlock", &desc, Vec::new(), content, self.options.part_upload_timeout)
            .map_err(|e| StorageError::transport(ctx.clone(), &e))?;
        if !matches!(outcome.status, 200 | 201) {
            return Err(classify(ctx, &outcome).into());
        }

        let etag = outcome.header("ETag").map(str::to_string);
        if etag.is_none() {
            warn!(object = %object, part_number, "Part uploaded without ETag");
        }
        debug!(object = %object, part_number, offset, size, "Part uploaded");
        Ok(PartRecord {
            part_number,
            etag,
            size,
        })
    }

    /// Finalize an upload. `parts` may be keyed by the caller's block
    /// sequence; each record's own part number is what goes on the wire.
    pub fn complete_upload(
        &self,
        prefix: &str,
        account_id: &str,
        obj_id: &str,
        backend_id: &str,
        upload_id: &str,
        parts: &BTreeMap<u32, PartRecord>,
    ) -> Result<(), DataStoreError> {
        require_backend("CompleteUpload", backend_id)?;
        require_upload_id("CompleteUpload", upload_id)?;
        if parts.is_empty() {
            return Err(DataStoreError::InvalidArgument(format!(
                "no parts to complete for upload {}",
                upload_id
            )));
        }
        let object = compose_object_name(prefix, account_id, obj_id);
        let ctx = RequestContext::new("CompleteUpload", &object);

        let mut by_part_number: BTreeMap<u32, PartRecord> = BTreeMap::new();
        for part in parts.values() {
            if by_part_number.insert(part.part_number, part.clone()).is_some() {
                return Err(DataStoreError::InvalidArgument(format!(
                    "duplicate part number {} for upload {}",
                    part.part_number, upload_id
                )));
            }
        }
        let desc = self
            .gateway
            .get_finalize_target(&object, backend_id, upload_id, &by_part_number)
            .map_err(|e| StorageError::gateway(ctx.clone(), e))?;

        // Stitching parts on the backend takes longer behind a POST.
        let timeout = match desc.method {
            HttpMethod::Post => self.options.finalize_post_timeout,
            _ => self.options.finalize_put_timeout,
        };
        let body = desc.body.clone();
        let outcome = self
            .execute("CompleteUpload", &desc, Vec::new(), body, timeout)
            .map_err(|e| StorageError::transport(ctx.clone(), &e))?;
        if !matches!(outcome.status, 200 | 201) {
            return Err(classify(ctx, &outcome).into());
        }

        debug!(
            object = %object,
            upload_id = %upload_id,
            parts = by_part_number.len(),
            method = %desc.method,
            "Multipart upload completed"
        );
        Ok(())
    }

    /// Read `length` bytes at `offset` of an object `total_size` bytes long.
    /// Pass `length = -1` to read to the end.
    pub fn read_by_offset(
        &self,
        prefix: &str,
        file_id: &str,
        backend_id: &str,
        offset: i64,
        length: i64,
        total_size: i64,
    ) -> Result<Bytes, DataStoreError> {
        let (account_id, obj_id) = split_file_id(file_id)?;
        let Some((start, end)) = byte_range(offset, length, total_size) else {
            debug!(file_id = %file_id, offset, length, total_size, "Empty read, skipping request");
            return Ok(Bytes::new());
        };
        require_backend("ReadByOffset", backend_id)?;
        let object = compose_object_name(prefix, account_id, obj_id);

        let ctx = RequestContext::new("ReadByOffset", file_id);
        let desc = self
            .gateway
            .get_download_target(&object, backend_id, None, self.options.download_expiry_secs)
            .map_err(|e| StorageError::gateway(ctx.clone(), e))?;

        let range = vec![("Range".to_string(), range_header(start, end))];
        let outcome = self
            .execute("ReadByOffset", &desc, range, Bytes::new(), self.options.download_timeout)
            .map_err(|e| StorageError::transport(ctx.clone(), &e))?;

        match outcome.status {
            206 => Ok(outcome.body),
            200 => {
                full_body_range(ctx, outcome, start, end, total_size).map_err(DataStoreError::from)
            }
            404 => Err(StorageError::NotFound { context: ctx }.into()),
            416 => Err(StorageError::RangeNotSatisfiable {
                context: ctx,
                offset: start,
                end,
            }
            .into()),
            _ => Err(classify(ctx, &outcome).into()),
        }
    }

    pub fn read_all(
        &self,
        prefix: &str,
        file_id: &str,
        backend_id: &str,
        total_size: i64,
    ) -> Result<Bytes, DataStoreError> {
        self.read_by_offset(prefix, file_id, backend_id, 0, -1, total_size)
    }

    fn execute(
        &self,
        step: &str,
        desc: &RequestDescriptor,
        extra_headers: Vec<(String, String)>,
        body: Bytes,
        timeout: Duration,
    ) -> Result<HttpOutcome, TransportError> {
        let mut headers = desc.headers.clone();
        headers.extend(extra_headers);
        self.options.retry.run(step, |_| {
            dispatch(
                &self.executor,
                desc.method,
                &desc.url,
                body.clone(),
                &headers,
                timeout,
            )
        })
    }
}

/// A 200 answers with the whole object. When only part of it was asked for
/// and the whole object came back, cut out the requested bytes. Any other
/// body length cannot be mapped onto the requested range.
fn full_body_range(
    ctx: RequestContext,
    outcome: HttpOutcome,
    start: i64,
    end: i64,
    total_size: i64,
) -> Result<Bytes, StorageError> {
    if start == 0 && end == total_size - 1 {
        return Ok(outcome.body);
    }
    if outcome.body.len() as i64 == total_size {
        debug!(start, end, "Backend ignored Range header, slicing full body");
        return Ok(outcome.body.slice(start as usize..=end as usize));
    }
    Err(StorageError::RequestFailed {
        context: ctx,
        status: outcome.status,
        body: format!(
            "200 response of {} bytes to range request {} on an object of {} bytes",
            outcome.body.len(),
            range_header(start, end),
            total_size
        ),
    })
}

fn require_backend(method: &str, backend_id: &str) -> Result<(), DataStoreError> {
    if backend_id.is_empty() {
        return Err(DataStoreError::InvalidOperation(format!(
            "{}: no storage backend selected",
            method
        )));
    }
    Ok(())
}

fn require_upload_id(method: &str, upload_id: &str) -> Result<(), DataStoreError> {
    if upload_id.is_empty() {
        return Err(DataStoreError::InvalidOperation(format!(
            "{}: upload has not been initialized",
            method
        )));
    }
    Ok(())
}
