//! Error types for the data path and the shared storage-error classifier.

use std::fmt;

use crate::gateway::GatewayError;
use crate::http::{HttpOutcome, TransportError};

/// Identifies the call that failed: the data store operation, the object
/// name or file id it targeted, and the block sequence number (-1 when the
/// operation is not block-scoped).
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub method: &'static str,
    pub object: String,
    pub sequence: i64,
}

impl RequestContext {
    pub fn new(method: &'static str, object: impl Into<String>) -> Self {
        Self {
            method,
            object: object.into(),
            sequence: -1,
        }
    }

    pub fn with_sequence(mut self, sequence: i64) -> Self {
        self.sequence = sequence;
        self
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} object={} seq={}", self.method, self.object, self.sequence)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("cannot connect to storage backend ({context}): {detail}")]
    CannotConnect { context: RequestContext, detail: String },
    #[error("bad request ({context}): HTTP {status} - {body}")]
    BadRequest {
        context: RequestContext,
        status: u16,
        body: String,
    },
    #[error("storage authentication/authorization failed ({context}): {body}")]
    Forbidden { context: RequestContext, body: String },
    #[error("object not found ({context})")]
    NotFound { context: RequestContext },
    #[error("object not found or invalid range bytes={offset}-{end} ({context})")]
    RangeNotSatisfiable {
        context: RequestContext,
        offset: i64,
        end: i64,
    },
    #[error("storage request failed ({context}): HTTP {status} - {body}")]
    RequestFailed {
        context: RequestContext,
        status: u16,
        body: String,
    },
    #[error("storage gateway failed ({context}): {source}")]
    Gateway {
        context: RequestContext,
        #[source]
        source: GatewayError,
    },
}

impl StorageError {
    pub fn context(&self) -> &RequestContext {
        match self {
            StorageError::CannotConnect { context, .. }
            | StorageError::BadRequest { context, .. }
            | StorageError::Forbidden { context, .. }
            | StorageError::NotFound { context }
            | StorageError::RangeNotSatisfiable { context, .. }
            | StorageError::RequestFailed { context, .. }
            | StorageError::Gateway { context, .. } => context,
        }
    }

    /// True for a missing object and for an unsatisfiable range.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::NotFound { .. } | StorageError::RangeNotSatisfiable { .. }
        )
    }

    pub fn gateway(context: RequestContext, source: GatewayError) -> Self {
        StorageError::Gateway { context, source }
    }

    pub fn transport(context: RequestContext, err: &TransportError) -> Self {
        match err {
            TransportError::InvalidRequest(_) => StorageError::BadRequest {
                context,
                status: 0,
                body: err.to_string(),
            },
            _ => StorageError::CannotConnect {
                context,
                detail: err.to_string(),
            },
        }
    }
}

/// Map a non-success outcome to a typed storage error.
pub fn classify(context: RequestContext, outcome: &HttpOutcome) -> StorageError {
    match outcome.status {
        0 => StorageError::CannotConnect {
            context,
            detail: "no response from storage backend".to_string(),
        },
        400 => StorageError::BadRequest {
            context,
            status: outcome.status,
            body: outcome.body_text(),
        },
        403 => StorageError::Forbidden {
            context,
            body: outcome.body_text(),
        },
        status => StorageError::RequestFailed {
            context,
            status,
            body: outcome.body_text(),
        },
    }
}

/// The single error type returned by every data store operation.
#[derive(Debug, thiserror::Error)]
pub enum DataStoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("internal error: {0}")]
    Internal(#[from] StorageError),
}

impl DataStoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DataStoreError::Internal(e) if e.is_not_found())
    }
}
