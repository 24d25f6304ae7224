pub mod csv;
pub mod decode;
pub mod ingest;
pub mod resolver;

pub use crate::csv::{parse_amount, parse_date, parse_ledger_csv, ParsedBatch};
pub use decode::decode_upload;
pub use ingest::{ingest, IngestError, IngestSummary, DEFAULT_INDEX_CAP};
pub use resolver::{DuplicateResolver, Resolution};
