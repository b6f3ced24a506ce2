use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};

use crate::error::WorkerError;
use crate::worker::context::{ContextFactory, WorkerContext};
use crate::worker::job::{UnitOutcome, WorkUnit};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    pub worker_count: usize,
    /// Broadcast a cache release every N completions. 0 disables it.
    pub release_every: usize,
}

enum Control {
    ReleaseCache,
}

enum WorkerMessage {
    Outcome(UnitOutcome),
    /// The worker panicked mid-unit and has exited.
    Lost {
        worker_id: usize,
        unit_id: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolReport {
    pub submitted: usize,
    pub completed: usize,
    pub cancelled: bool,
}

pub struct WorkerPool<U: WorkUnit> {
    job_sender: Sender<U>,
    result_receiver: Receiver<WorkerMessage>,
    control_senders: Vec<Sender<Control>>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    release_every: usize,
}

impl<U: WorkUnit> WorkerPool<U> {
    /// Spawns the workers and blocks until every one of them has built its
    /// context. A single construction failure tears the pool down again.
    pub fn start<F>(factory: Arc<F>, options: PoolOptions) -> Result<Self, WorkerError>
    where
        F: ContextFactory,
        F::Context: WorkerContext<Unit = U>,
    {
        let worker_count = options.worker_count.max(1);
        let (job_sender, job_receiver) = bounded::<U>(worker_count * 2);
        let (result_sender, result_receiver) = unbounded::<WorkerMessage>();
        let (ready_sender, ready_receiver) = bounded::<(usize, Result<(), String>)>(worker_count);
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);
        let mut control_senders = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let (control_tx, control_rx) = unbounded::<Control>();
            let job_rx = job_receiver.clone();
            let result_tx = result_sender.clone();
            let ready_tx = ready_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_factory = Arc::clone(&factory);

            let handle = thread::Builder::new()
                .name(format!("scanlayer-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(
                        worker_id,
                        worker_factory.as_ref(),
                        job_rx,
                        control_rx,
                        result_tx,
                        ready_tx,
                        shutdown_flag,
                    );
                })
                .map_err(|e| {
                    shutdown.store(true, Ordering::Relaxed);
                    WorkerError::SpawnFailed(e.to_string())
                })?;

            workers.push(handle);
            control_senders.push(control_tx);
        }

        drop(ready_sender);
        drop(result_sender);
        drop(job_receiver);

        let mut failure = None;
        for _ in 0..worker_count {
            match ready_receiver.recv() {
                Ok((worker_id, Ok(()))) => debug!("Worker {} ready", worker_id),
                Ok((worker_id, Err(reason))) => {
                    error!("Worker {} failed to initialize: {}", worker_id, reason);
                    if failure.is_none() {
                        failure = Some(WorkerError::Init { worker_id, reason });
                    }
                }
                Err(_) => {
                    failure.get_or_insert(WorkerError::SpawnFailed(
                        "worker exited during initialization".to_string(),
                    ));
                    break;
                }
            }
        }

        let pool = Self {
            job_sender,
            result_receiver,
            control_senders,
            workers,
            shutdown,
            release_every: options.release_every,
        };

        if let Some(err) = failure {
            pool.shutdown();
            pool.wait();
            return Err(err);
        }

        info!("Started {} workers", worker_count);
        Ok(pool)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Feeds `units` to the workers and hands every outcome to `on_outcome`
    /// as it arrives, in completion order. Returns once every submitted unit
    /// has come back, then shuts the pool down.
    ///
    /// Setting `cancel` stops submission; units already queued still run.
    pub fn run<I, C>(
        self,
        units: I,
        cancel: &Arc<AtomicBool>,
        mut on_outcome: C,
    ) -> Result<PoolReport, WorkerError>
    where
        I: IntoIterator<Item = U>,
        I::IntoIter: Send + 'static,
        C: FnMut(UnitOutcome),
    {
        let submitted = Arc::new(AtomicUsize::new(0));

        let feeder = {
            let job_sender = self.job_sender.clone();
            let cancel = Arc::clone(cancel);
            let submitted = Arc::clone(&submitted);
            let units = units.into_iter();
            thread::Builder::new()
                .name("scanlayer-feeder".to_string())
                .spawn(move || {
                    for unit in units {
                        if cancel.load(Ordering::Relaxed) {
                            info!("Dispatch stopped: cancellation requested");
                            break;
                        }
                        if job_sender.send(unit).is_err() {
                            break;
                        }
                        submitted.fetch_add(1, Ordering::SeqCst);
                    }
                })
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?
        };

        let mut completed = 0usize;
        let mut failure = None;

        loop {
            if feeder.is_finished() && completed >= submitted.load(Ordering::SeqCst) {
                break;
            }

            match self.result_receiver.recv_timeout(POLL_INTERVAL) {
                Ok(WorkerMessage::Outcome(outcome)) => {
                    completed += 1;
                    on_outcome(outcome);
                    if self.release_every > 0 && completed % self.release_every == 0 {
                        debug!("Broadcasting cache release after {} units", completed);
                        self.broadcast_release();
                    }
                }
                Ok(WorkerMessage::Lost {
                    worker_id,
                    unit_id,
                    reason,
                }) => {
                    error!(
                        "Worker {} died while processing {}: {}",
                        worker_id, unit_id, reason
                    );
                    failure = Some(WorkerError::WorkerLost {
                        outstanding: submitted
                            .load(Ordering::SeqCst)
                            .saturating_sub(completed),
                    });
                    break;
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    let outstanding = submitted.load(Ordering::SeqCst).saturating_sub(completed);
                    if outstanding > 0 || !feeder.is_finished() {
                        failure = Some(WorkerError::WorkerLost { outstanding });
                    }
                    break;
                }
            }
        }

        if failure.is_some() {
            self.shutdown();
        }
        self.broadcast_release();

        let submitted = submitted.load(Ordering::SeqCst);
        self.wait();
        if feeder.join().is_err() {
            warn!("Feeder thread panicked");
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(PoolReport {
                submitted,
                completed,
                cancelled: cancel.load(Ordering::Relaxed),
            }),
        }
    }

    /// Fire-and-forget: each worker applies it before its next unit.
    pub fn broadcast_release(&self) {
        for sender in &self.control_senders {
            let _ = sender.send(Control::ReleaseCache);
        }
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    pub fn wait(self) {
        // Dropping the sender lets idle workers see a disconnected queue.
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }
}

fn run_worker<F: ContextFactory>(
    worker_id: usize,
    factory: &F,
    job_receiver: Receiver<<F::Context as WorkerContext>::Unit>,
    control_receiver: Receiver<Control>,
    result_sender: Sender<WorkerMessage>,
    ready_sender: Sender<(usize, Result<(), String>)>,
    shutdown: Arc<AtomicBool>,
) {
    debug!("Worker {} started", worker_id);

    let built = panic::catch_unwind(AssertUnwindSafe(|| factory.build(worker_id)))
        .unwrap_or_else(|payload| Err(panic_message(payload.as_ref())));

    let mut context = match built {
        Ok(context) => {
            let _ = ready_sender.send((worker_id, Ok(())));
            context
        }
        Err(reason) => {
            let _ = ready_sender.send((worker_id, Err(reason)));
            return;
        }
    };
    drop(ready_sender);

    loop {
        apply_control(worker_id, &mut context, &control_receiver);

        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match job_receiver.recv_timeout(POLL_INTERVAL) {
            Ok(unit) => {
                let unit_id = unit.id();
                debug!("Worker {} processing unit: {}", worker_id, unit_id);

                let message =
                    match panic::catch_unwind(AssertUnwindSafe(|| context.process(&unit))) {
                        Ok(mut outcome) => {
                            outcome.worker_id = worker_id;
                            WorkerMessage::Outcome(outcome)
                        }
                        Err(payload) => WorkerMessage::Lost {
                            worker_id,
                            unit_id,
                            reason: panic_message(payload.as_ref()),
                        },
                    };

                let lost = matches!(message, WorkerMessage::Lost { .. });
                if let Err(e) = result_sender.send(message) {
                    error!("Worker {} failed to send result: {}", worker_id, e);
                    break;
                }
                if lost {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    apply_control(worker_id, &mut context, &control_receiver);
    debug!("Worker {} stopped", worker_id);
}

fn apply_control<C: WorkerContext>(worker_id: usize, context: &mut C, control: &Receiver<Control>) {
    let mut release = false;
    while let Ok(Control::ReleaseCache) = control.try_recv() {
        release = true;
    }
    if release {
        debug!("Worker {} releasing cache", worker_id);
        context.release_cache();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::job::UnitStatus;
    use std::sync::Mutex;
    use std::time::Instant;

    struct TestUnit(String);

    impl WorkUnit for TestUnit {
        fn id(&self) -> String {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct Counters {
        built: AtomicUsize,
        processed: AtomicUsize,
        released: AtomicUsize,
        /// `processed` at the moment of each release.
        released_at: Mutex<Vec<usize>>,
    }

    impl Counters {
        /// Blocks until `count` releases have landed, or gives up after 5 s.
        fn wait_for_releases(&self, count: usize) {
            let deadline = Instant::now() + Duration::from_secs(5);
            while self.released.load(Ordering::SeqCst) < count && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
        }
    }

    struct TestFactory {
        counters: Arc<Counters>,
        fail_worker: Option<usize>,
        panic_on: Option<&'static str>,
    }

    impl TestFactory {
        fn new(counters: Arc<Counters>) -> Self {
            Self {
                counters,
                fail_worker: None,
                panic_on: None,
            }
        }
    }

    struct TestContext {
        counters: Arc<Counters>,
        panic_on: Option<&'static str>,
    }

    impl WorkerContext for TestContext {
        type Unit = TestUnit;

        fn process(&mut self, unit: &TestUnit) -> UnitOutcome {
            if self.panic_on == Some(unit.0.as_str()) {
                panic!("engine crashed on {}", unit.0);
            }
            self.counters.processed.fetch_add(1, Ordering::SeqCst);
            UnitOutcome::completed(unit.id(), 1)
        }

        fn release_cache(&mut self) {
            let processed = self.counters.processed.load(Ordering::SeqCst);
            self.counters.released_at.lock().unwrap().push(processed);
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl ContextFactory for TestFactory {
        type Context = TestContext;

        fn build(&self, worker_id: usize) -> Result<TestContext, String> {
            if self.fail_worker == Some(worker_id) {
                return Err("model file missing".to_string());
            }
            self.counters.built.fetch_add(1, Ordering::SeqCst);
            Ok(TestContext {
                counters: Arc::clone(&self.counters),
                panic_on: self.panic_on,
            })
        }
    }

    fn units(n: usize) -> Vec<TestUnit> {
        (0..n).map(|i| TestUnit(format!("unit-{}", i))).collect()
    }

    fn options(worker_count: usize, release_every: usize) -> PoolOptions {
        PoolOptions {
            worker_count,
            release_every,
        }
    }

    #[test]
    fn test_worker_pool_creation() {
        let counters = Arc::new(Counters::default());
        let pool: WorkerPool<TestUnit> =
            WorkerPool::start(Arc::new(TestFactory::new(Arc::clone(&counters))), options(3, 0))
                .unwrap();

        assert_eq!(pool.worker_count(), 3);
        assert_eq!(counters.built.load(Ordering::SeqCst), 3);
        assert!(!pool.is_shutdown());

        pool.shutdown();
        assert!(pool.is_shutdown());
        pool.wait();
    }

    #[test]
    fn test_run_processes_every_unit_once() {
        let counters = Arc::new(Counters::default());
        let pool =
            WorkerPool::start(Arc::new(TestFactory::new(Arc::clone(&counters))), options(4, 0))
                .unwrap();
        let cancel = Arc::new(AtomicBool::new(false));

        let mut seen = Vec::new();
        let report = pool
            .run(units(50), &cancel, |outcome| {
                assert_eq!(outcome.status, UnitStatus::Completed);
                seen.push(outcome.unit_id);
            })
            .unwrap();

        assert_eq!(report.submitted, 50);
        assert_eq!(report.completed, 50);
        assert!(!report.cancelled);
        assert_eq!(counters.processed.load(Ordering::SeqCst), 50);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 50);
    }

    #[test]
    fn test_init_failure_aborts_before_dispatch() {
        let counters = Arc::new(Counters::default());
        let factory = TestFactory {
            fail_worker: Some(1),
            ..TestFactory::new(Arc::clone(&counters))
        };

        let result: Result<WorkerPool<TestUnit>, _> =
            WorkerPool::start(Arc::new(factory), options(3, 0));

        match result {
            Err(WorkerError::Init { worker_id, reason }) => {
                assert_eq!(worker_id, 1);
                assert!(reason.contains("model file missing"));
            }
            _ => panic!("Expected WorkerError::Init"),
        }
        assert_eq!(counters.processed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_release_cache_broadcast() {
        let counters = Arc::new(Counters::default());
        let pool =
            WorkerPool::start(Arc::new(TestFactory::new(Arc::clone(&counters))), options(1, 2))
                .unwrap();
        let cancel = Arc::new(AtomicBool::new(false));

        // Units 3 and 5 are only handed out once the release that follows
        // units 2 and 4 has been applied, so every release point is exact.
        let gate = Arc::clone(&counters);
        let gated = (0..6).map(move |i| {
            if i == 2 || i == 4 {
                gate.wait_for_releases(i / 2);
            }
            TestUnit(format!("unit-{}", i))
        });

        pool.run(gated, &cancel, |_| {}).unwrap();

        let released_at = counters.released_at.lock().unwrap().clone();
        assert_eq!(&released_at[..2], &[2, 4]);
        // The release after unit 6 and the end-of-batch one may coalesce.
        assert_eq!(released_at.last(), Some(&6));
        assert!(released_at.len() == 3 || released_at.len() == 4);
    }

    #[test]
    fn test_release_disabled_still_releases_at_end() {
        let counters = Arc::new(Counters::default());
        let pool =
            WorkerPool::start(Arc::new(TestFactory::new(Arc::clone(&counters))), options(1, 0))
                .unwrap();
        let cancel = Arc::new(AtomicBool::new(false));

        pool.run(units(5), &cancel, |_| {}).unwrap();

        assert_eq!(*counters.released_at.lock().unwrap(), vec![5]);
    }

    #[test]
    fn test_panicking_worker_fails_run() {
        let counters = Arc::new(Counters::default());
        let factory = TestFactory {
            panic_on: Some("unit-3"),
            ..TestFactory::new(Arc::clone(&counters))
        };
        let pool = WorkerPool::start(Arc::new(factory), options(2, 0)).unwrap();
        let cancel = Arc::new(AtomicBool::new(false));

        let result = pool.run(units(10), &cancel, |_| {});

        assert!(matches!(result, Err(WorkerError::WorkerLost { .. })));
    }

    #[test]
    fn test_cancel_before_dispatch() {
        let counters = Arc::new(Counters::default());
        let pool =
            WorkerPool::start(Arc::new(TestFactory::new(Arc::clone(&counters))), options(2, 0))
                .unwrap();
        let cancel = Arc::new(AtomicBool::new(true));

        let report = pool.run(units(10), &cancel, |_| {}).unwrap();

        assert_eq!(report.submitted, 0);
        assert_eq!(report.completed, 0);
        assert!(report.cancelled);
        assert_eq!(counters.processed.load(Ordering::SeqCst), 0);
    }
}
