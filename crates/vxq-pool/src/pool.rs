//! Worker pool dispatcher.
//!
//! A fixed set of worker threads sits behind one dispatcher thread. The
//! dispatcher owns every piece of mutable pool state - worker busy
//! flags, the pending FIFO, the in-flight table, and the fetch result
//! cache - and mutates it only while draining a single control channel
//! that carries both caller submissions and worker responses. Workers
//! share nothing; payloads move in, results move out.
//!
//! There is no cancellation and no retry. A submitted task runs to
//! completion or failure; callers that lose interest drop the future
//! and ignore the result. Workers are never restarted: a worker that
//! dies or hangs permanently occupies its slot and stalls only the
//! tasks routed to it.

use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

use tokio::sync::oneshot;
use vxq_decode::GeometryPayload;

use crate::error::{Error, Result};
use crate::raster::{Bitmap, EncodedBitmap, ExrImage};
use crate::task::{self, DataSource, FetchKey, TaskOutput, TaskPayload};
use crate::transport::{HttpTransport, Transport};

/// Worker count used when the host will not report its parallelism.
const FALLBACK_WORKERS: usize = 4;

type TaskResult = Result<TaskOutput>;
type ReplySender = oneshot::Sender<TaskResult>;

/// Messages funneled into the dispatcher thread.
enum ControlMsg {
    Submit {
        payload: TaskPayload,
        reply: ReplySender,
    },
    Completed {
        worker: usize,
        id: u64,
        result: TaskResult,
    },
    Shutdown,
}

/// One task as handed to a worker.
struct WorkItem {
    id: u64,
    payload: TaskPayload,
}

/// Dispatcher-side view of one worker thread.
struct WorkerHandle {
    tx: async_channel::Sender<WorkItem>,
    busy: bool,
}

/// A task waiting for a free worker.
struct QueuedTask {
    id: u64,
    payload: TaskPayload,
}

/// Bookkeeping for a task between submission and response.
struct InFlight {
    /// Every caller waiting on this task. More than one only for
    /// de-duplicated fetches.
    waiters: Vec<ReplySender>,
    cache_key: Option<FetchKey>,
}

/// Session-lifetime memo for the fetch kinds. Entries are never evicted.
enum CacheSlot {
    /// The task with this id is queued or running.
    Pending(u64),
    /// The task finished; late callers get a clone of its result.
    Done(TaskResult),
}

/// All mutable pool state. Owned by the dispatcher thread; the handler
/// methods below are the only code that touches it.
struct Dispatcher {
    workers: Vec<WorkerHandle>,
    pending: VecDeque<QueuedTask>,
    in_flight: HashMap<u64, InFlight>,
    cache: HashMap<FetchKey, CacheSlot>,
    next_id: u64,
}

impl Dispatcher {
    fn new(workers: Vec<WorkerHandle>) -> Self {
        Self {
            workers,
            pending: VecDeque::new(),
            in_flight: HashMap::new(),
            cache: HashMap::new(),
            next_id: 0,
        }
    }

    fn run(mut self, control_rx: &async_channel::Receiver<ControlMsg>) {
        while let Ok(msg) = control_rx.recv_blocking() {
            match msg {
                ControlMsg::Submit { payload, reply } => self.handle_submit(payload, reply),
                ControlMsg::Completed { worker, id, result } => {
                    self.handle_completed(worker, id, result);
                }
                ControlMsg::Shutdown => break,
            }
        }
        // Dropping the worker handles closes their channels; workers
        // exit after finishing whatever they are running.
    }

    fn handle_submit(&mut self, payload: TaskPayload, reply: ReplySender) {
        // Fetch kinds de-duplicate on their request key. The pending
        // entry routes concurrent callers onto the task already in
        // flight, so a key never has more than one underlying request.
        if let Some(key) = payload.fetch_key() {
            match self.cache.get(&key) {
                Some(CacheSlot::Done(result)) => {
                    tracing::debug!(kind = payload.kind(), "fetch cache hit");
                    let _ = reply.send(result.clone());
                    return;
                }
                Some(CacheSlot::Pending(id)) => {
                    let id = *id;
                    tracing::debug!(kind = payload.kind(), id, "joining in-flight fetch");
                    if let Some(task) = self.in_flight.get_mut(&id) {
                        task.waiters.push(reply);
                    }
                    return;
                }
                None => {}
            }
        }

        let id = self.next_id;
        self.next_id += 1;

        let cache_key = payload.fetch_key();
        if let Some(key) = cache_key.clone() {
            self.cache.insert(key, CacheSlot::Pending(id));
        }
        self.in_flight.insert(
            id,
            InFlight {
                waiters: vec![reply],
                cache_key,
            },
        );

        match self.free_worker() {
            Some(worker) => self.dispatch(worker, WorkItem { id, payload }),
            None => self.pending.push_back(QueuedTask { id, payload }),
        }
    }

    fn handle_completed(&mut self, worker: usize, id: u64, result: TaskResult) {
        let Some(task) = self.in_flight.remove(&id) else {
            // Stale or duplicate response; nothing waits on it and no
            // bookkeeping changes.
            tracing::debug!(id, "dropping stale response");
            return;
        };

        tracing::debug!(id, ok = result.is_ok(), "task complete");

        if let Some(key) = task.cache_key {
            self.cache.insert(key, CacheSlot::Done(result.clone()));
        }
        for waiter in task.waiters {
            // A caller that dropped its future simply never looks.
            let _ = waiter.send(result.clone());
        }

        self.workers[worker].busy = false;
        if !self.pending.is_empty()
            && let Some(free) = self.free_worker()
            && let Some(queued) = self.pending.pop_front()
        {
            self.dispatch(
                free,
                WorkItem {
                    id: queued.id,
                    payload: queued.payload,
                },
            );
        }
    }

    /// First worker not marked busy, lowest index first.
    fn free_worker(&self) -> Option<usize> {
        self.workers.iter().position(|w| !w.busy)
    }

    fn dispatch(&mut self, worker: usize, item: WorkItem) {
        tracing::debug!(id = item.id, worker, kind = item.payload.kind(), "dispatching");
        self.workers[worker].busy = true;
        if self.workers[worker].tx.send_blocking(item).is_err() {
            // The worker's channel is gone, which only happens when the
            // worker thread died. Its slot stays busy and the task's
            // waiters never resolve; there is deliberately no respawn.
            tracing::warn!(worker, "worker channel closed, task lost");
        }
    }
}

fn worker_loop(
    index: usize,
    work_rx: &async_channel::Receiver<WorkItem>,
    control_tx: &async_channel::Sender<ControlMsg>,
    transport: &Arc<dyn Transport>,
) {
    while let Ok(item) = work_rx.recv_blocking() {
        let result = task::run(item.payload, transport.as_ref());
        let completed = ControlMsg::Completed {
            worker: index,
            id: item.id,
            result,
        };
        if control_tx.send_blocking(completed).is_err() {
            break;
        }
    }
}

/// Shared pool internals; the last handle to drop shuts the pool down.
struct Shared {
    control_tx: async_channel::Sender<ControlMsg>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let _ = self.control_tx.try_send(ControlMsg::Shutdown);
    }
}

/// Handle to a fixed-size worker pool.
///
/// Construct one instance at application startup and hand clones to
/// whatever owns the scene or session; there is no global pool. Every
/// method submits its task without blocking and returns once the
/// matching worker response arrives. Ordering is only guaranteed for
/// tasks waiting in the pending queue: a task submitted later may well
/// complete earlier.
///
/// # Example
///
/// ```ignore
/// let pool = Pool::new();
/// let geometry = pool
///     .geometry(DataSource::Url("https://cdn.example/room.vxq".into()))
///     .await?;
/// ```
#[derive(Clone)]
pub struct Pool {
    shared: Arc<Shared>,
}

impl Pool {
    /// Create a pool with the default HTTP transport and one worker per
    /// reported unit of hardware parallelism.
    #[must_use]
    pub fn new() -> Self {
        Self::with_transport_and_workers(HttpTransport::new(), default_workers())
    }

    /// Create a pool with a custom transport and the default size.
    #[must_use]
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self::with_transport_and_workers(transport, default_workers())
    }

    /// Create a pool with a custom transport and worker count.
    ///
    /// The worker set is created here and never resized; a count of
    /// zero is raised to one.
    #[must_use]
    pub fn with_transport_and_workers(
        transport: impl Transport + 'static,
        workers: usize,
    ) -> Self {
        let worker_count = workers.max(1);
        let transport: Arc<dyn Transport> = Arc::new(transport);
        let (control_tx, control_rx) = async_channel::unbounded();

        let mut handles = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let (work_tx, work_rx) = async_channel::bounded(1);
            let control = control_tx.clone();
            let transport = Arc::clone(&transport);
            thread::spawn(move || worker_loop(index, &work_rx, &control, &transport));
            handles.push(WorkerHandle {
                tx: work_tx,
                busy: false,
            });
        }

        let dispatcher = Dispatcher::new(handles);
        thread::spawn(move || dispatcher.run(&control_rx));

        Self {
            shared: Arc::new(Shared { control_tx }),
        }
    }

    /// Fetch raw bytes, optionally inflating a zlib stream.
    ///
    /// De-duplicated per (URL, inflate) for the lifetime of the pool:
    /// concurrent callers share one transfer, later callers get the
    /// memoized result.
    pub async fn fetch(&self, url: &str, inflate: bool) -> Result<Vec<u8>> {
        let payload = TaskPayload::Fetch {
            url: url.to_string(),
            inflate,
        };
        match self.call(payload).await? {
            TaskOutput::Bytes(bytes) => Ok(bytes),
            _ => Err(Error::UnexpectedOutput { expected: "bytes" }),
        }
    }

    /// Fetch and parse a JSON document. De-duplicated per URL like
    /// [`Pool::fetch`].
    pub async fn fetch_json(&self, url: &str) -> Result<serde_json::Value> {
        let payload = TaskPayload::FetchJson {
            url: url.to_string(),
        };
        match self.call(payload).await? {
            TaskOutput::Json(value) => Ok(value),
            _ => Err(Error::UnexpectedOutput { expected: "json" }),
        }
    }

    /// Compress bytes into a zlib stream. The buffer moves to the
    /// worker; clone first to keep a copy.
    pub async fn compress(&self, bytes: Vec<u8>) -> Result<Vec<u8>> {
        match self.call(TaskPayload::Compress { bytes }).await? {
            TaskOutput::Bytes(bytes) => Ok(bytes),
            _ => Err(Error::UnexpectedOutput { expected: "bytes" }),
        }
    }

    /// Decompress a zlib stream. The buffer moves to the worker.
    pub async fn decompress(&self, bytes: Vec<u8>) -> Result<Vec<u8>> {
        match self.call(TaskPayload::Decompress { bytes }).await? {
            TaskOutput::Bytes(bytes) => Ok(bytes),
            _ => Err(Error::UnexpectedOutput { expected: "bytes" }),
        }
    }

    /// Parse an EXR image from a URL or an in-memory buffer.
    pub async fn parse_exr(&self, source: DataSource) -> Result<ExrImage> {
        match self.call(TaskPayload::ParseExr { source }).await? {
            TaskOutput::Exr(image) => Ok(image),
            _ => Err(Error::UnexpectedOutput { expected: "exr image" }),
        }
    }

    /// Encode an in-memory RGBA bitmap to PNG.
    pub async fn bitmap_to_bytes(&self, bitmap: Bitmap) -> Result<EncodedBitmap> {
        match self.call(TaskPayload::BitmapToBytes { bitmap }).await? {
            TaskOutput::EncodedBitmap(encoded) => Ok(encoded),
            _ => Err(Error::UnexpectedOutput {
                expected: "encoded bitmap",
            }),
        }
    }

    /// Decode VXQ geometry from a URL or an in-memory buffer.
    pub async fn geometry(&self, source: DataSource) -> Result<GeometryPayload> {
        match self.call(TaskPayload::Geometry { source }).await? {
            TaskOutput::Geometry(payload) => Ok(payload),
            _ => Err(Error::UnexpectedOutput { expected: "geometry" }),
        }
    }

    /// Submit one task and await its response.
    async fn call(&self, payload: TaskPayload) -> TaskResult {
        let (reply, rx) = oneshot::channel();
        // Sending on the unbounded control channel only fails once the
        // dispatcher has exited; the reply sender then drops with the
        // rejected message and the await below reports Shutdown.
        let _ = self
            .shared
            .control_tx
            .try_send(ControlMsg::Submit { payload, reply });
        rx.await.map_err(|_| Error::Shutdown)?
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(FALLBACK_WORKERS)
}
