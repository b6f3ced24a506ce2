pub mod context;
pub mod job;
pub mod pool;

pub use context::{ContextFactory, WorkerContext};
pub use job::{DocumentUnit, OcrUnit, UnitOutcome, UnitStatus, WorkUnit};
pub use pool::{PoolOptions, PoolReport, WorkerPool};
