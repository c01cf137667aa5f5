//! NeoGPT Core - domain types, errors and the collaborator traits shared by
//! the ingestion, retrieval and agent crates.

mod error;
mod report;
pub mod similarity;
mod traits;
mod types;

pub use error::{Error, ErrorKind, Result};
pub use report::{FailedSource, IngestionReport, ReportBuilder};
pub use traits::*;
pub use types::*;
