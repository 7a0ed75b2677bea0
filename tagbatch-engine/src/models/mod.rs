//! Data model for a tagging run

pub mod record;
pub mod run_result;
pub mod work_item;

pub use record::{RawRecords, Record, RecordStore};
pub use run_result::{FileOutcome, Outcome, RunResult};
pub use work_item::{DiscoveredFile, DispatchJob, WorkItem, ACCEPTED_EXTENSIONS};
