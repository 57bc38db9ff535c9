//! Object-storage data-path client.
//!
//! [`DataStore`] uploads objects in parts and reads byte ranges back through
//! pre-signed requests obtained from a [`StorageGateway`]. Every storage call
//! goes through [`RetryPolicy`], which absorbs transient failures.
//!
//! [`StorageGateway`]: acsstore_common::StorageGateway

pub mod config;
pub mod datastore;
pub mod executor;
pub mod gateway;
pub mod retry;

#[cfg(test)]
mod testing;

pub use config::{ClientConfig, DataStoreOptions};
pub use datastore::DataStore;
pub use executor::ReqwestExecutor;
pub use gateway::HttpGateway;
pub use retry::RetryPolicy;
