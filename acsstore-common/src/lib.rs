//! Shared types for the acsstore data path: object naming, the data model,
//! collaborator contracts and error classification.

pub mod error;
pub mod gateway;
pub mod http;
pub mod model;
pub mod naming;

pub use error::{classify, DataStoreError, RequestContext, StorageError};
pub use gateway::{GatewayError, StorageGateway};
pub use http::{dispatch, HttpExecutor, HttpMethod, HttpOutcome, TransportError};
pub use model::{BackendInfo, PartRecord, RequestDescriptor, UploadInfo, UploadSession};
