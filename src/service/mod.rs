// ============================================================================
// Services exposed to the API boundary
// ============================================================================

mod producer;
mod reader;

pub use producer::{OrderProducer, ProducerError};
pub use reader::{OrderReader, ReadError};
