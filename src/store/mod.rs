//! Persistence seams: records and process graphs.

mod records;
mod repository;

pub use records::{MemoryRecordStore, RecordService, fetch_one};
pub use repository::{MemoryProcessRepository, ProcessRepository, callers_of};
