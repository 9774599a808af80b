pub mod atomic_writer;
pub mod document_store;
pub mod json_file_store;

pub use atomic_writer::AtomicWriter;
pub use document_store::{DocumentStore, StoreCall, StoreOp};
pub use json_file_store::{JsonEnvelope, JsonFileStore, FORMAT_VERSION};
