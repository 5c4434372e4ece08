//! Resource consumption resolution: pay an activation's costs or fail
//! cleanly with no partial effects.

pub mod batch;
pub mod pools;
pub mod resolver;
pub mod target;

pub use batch::{BatchSink, ItemUpdate, UpdateBatch};
pub use pools::{Pool, PoolSnapshot, Uses};
pub use resolver::{ConsumptionResolver, ConsumptionStrategy, ResolutionContext};
pub use target::{kind, ConsumptionTarget};
