use crate::worker::job::{UnitOutcome, WorkUnit};

/// Per-worker state: built once on the worker's own thread and owned by it
/// for the worker's lifetime. Never shared across workers.
pub trait WorkerContext {
    type Unit: WorkUnit;

    fn process(&mut self, unit: &Self::Unit) -> UnitOutcome;

    /// Drop engine-internal caches to bound memory over long batches.
    fn release_cache(&mut self) {}
}

/// Builds one context per worker. Construction failure is fatal for the pool.
pub trait ContextFactory: Send + Sync + 'static {
    type Context: WorkerContext;

    fn build(&self, worker_id: usize) -> Result<Self::Context, String>;
}
