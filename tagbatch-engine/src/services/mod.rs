//! Services for a tagging run
//!
//! Discovery and reconciliation run before dispatch; the dispatch engine
//! drives the writer and hands every outcome to the result reporter.

pub mod command_builder;
pub mod dispatch_engine;
pub mod exif_writer;
pub mod file_scanner;
pub mod name_matcher;
pub mod reconciler;
pub mod result_reporter;
pub mod spreadsheet_reader;

pub use command_builder::{CommandBuilder, Directive, NO_BACKUP_FLAG};
pub use dispatch_engine::{DispatchEngine, DispatchState};
pub use exif_writer::{ExifToolWriter, MetadataWriter, WriteError};
pub use file_scanner::{FileScanner, ScanError};
pub use name_matcher::{match_name, NameMatcher};
pub use reconciler::{reconcile, Reconciliation};
pub use result_reporter::ResultReporter;
pub use spreadsheet_reader::{column_index, load_record_store, ColumnMap, SpreadsheetReader, XlsxReader};
