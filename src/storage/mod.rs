// Storage module - uploaded binaries and their cleanup

pub mod blob_store;
pub mod janitor;

pub use blob_store::{BlobStore, LocalBlobStore, BLOB_REF_PREFIX};
pub use janitor::BlobJanitor;
