//! Data module - loading, validation, filtering, export and caching

mod cache;
mod export;
mod loader;
mod processor;
mod schema;

pub use cache::MemoCache;
pub use export::{export_csv, to_csv_bytes, write_csv_file};
pub use loader::{DataLoader, FileFormat, LoaderError};
pub(crate) use loader::is_numeric;
pub use processor::{DataProcessor, ProcessorError};
pub use schema::{LandingRecord, LandingSchema};
