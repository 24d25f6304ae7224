pub mod enrich;
pub mod promote;

pub use enrich::{enrich, EnrichmentSummary};
pub use promote::{promote, PromotionSummary};

use kontera_llm::CompletionError;
use kontera_storage::StorageError;
use thiserror::Error;

/// A refinement pass either runs to completion or fails as a whole; writes
/// already issued before a failure are not rolled back.
#[derive(Debug, Error)]
pub enum RefineError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error("could not parse supplier mapping from completion response: {0}")]
    MappingParse(String),
}
