// ============================================================================
// Order Domain
// ============================================================================
//
// - Value objects (OrderItem, ShippingAddress, OrderStatus, PaymentStatus)
// - Order record and its status state machine
// - OrderJob, the queue payload that drives the worker
// - Errors (OrderError enum)
//
// Nothing in here performs I/O.
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod aggregate;
pub mod job;

pub use value_objects::*;
pub use errors::*;
pub use aggregate::*;
pub use job::*;
