//! Core trait abstractions.

pub mod backend;
pub mod source;
pub mod store;

pub use backend::InferenceBackend;
pub use source::{DocumentSource, FileSource};
pub use store::{RecordStore, StoredRecord};
