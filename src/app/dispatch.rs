// Flog - app/dispatch.rs
//
// Message delivery: render, resolve the target file, append, sweep.
//
// Architecture:
//   - `FileSink` is the write path shared by both modes. It owns the
//     registry, the formatter, the naming policy and the optional sweeper,
//     plus the written/dropped counters.
//   - `Dispatcher::Sync` calls the sink on the emitting thread.
//   - `Dispatcher::Async` hands messages to one background consumer thread
//     through a bounded crossbeam channel. A second, single-slot channel
//     carries flush and close requests; each request carries its own
//     acknowledgement sender, and the requester blocks until the consumer
//     answers.
//
// Ordering: one consumer drains one FIFO queue, so messages from a single
// producer reach their file in emit order.
//
// Backpressure: a full queue blocks the producer until the consumer makes
// room. Nothing is discarded for lack of queue space.
//
// Failure policy: a message whose file cannot be opened, rotated or written
// is logged as a warning and counted as dropped; delivery continues with the
// next message.

use crossbeam_channel::{bounded, select, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::app::archive::{ArchiveSweeper, SweepReport};
use crate::app::registry::FileRegistry;
use crate::core::format::Formatter;
use crate::core::model::{DeliveryStats, LogMessage};
use crate::core::naming::FileNaming;
use crate::platform::config::{DispatchMode, LoggerConfig};
use crate::util::constants;
use crate::util::error::{FlogError, Result};

// =============================================================================
// FileSink
// =============================================================================

/// The synchronous write path.
#[derive(Debug)]
pub struct FileSink {
    registry: FileRegistry,
    formatter: Formatter,
    naming: FileNaming,
    sweeper: Option<ArchiveSweeper>,
    written: AtomicU64,
    dropped: AtomicU64,
}

impl FileSink {
    pub fn new(config: &LoggerConfig) -> Self {
        Self {
            registry: FileRegistry::new(&config.root, config.rotate_size_bytes),
            formatter: config.formatter(),
            naming: config.naming(),
            sweeper: config
                .archive
                .as_ref()
                .map(|archive| ArchiveSweeper::new(&config.root, archive)),
            written: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &FileRegistry {
        &self.registry
    }

    /// Write one message. Returns `true` if the line reached its file.
    pub fn deliver(&self, message: &mut LogMessage) -> bool {
        let delivered = match self.write(message) {
            Ok(()) => {
                self.written.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                tracing::warn!(
                    level = %message.level(),
                    category = message.category(),
                    error = %e,
                    "Log message dropped"
                );
                self.record_drop();
                false
            }
        };

        if let Some(sweeper) = &self.sweeper {
            sweeper.maybe_sweep(&self.registry);
        }
        delivered
    }

    fn write(&self, message: &mut LogMessage) -> Result<()> {
        self.formatter.render_into(message);
        let name = self
            .naming
            .name_for(message.level(), message.category(), &message.timestamp());
        let handle = self.registry.resolve(&name)?;
        handle.write_line(message.rendered().unwrap_or_default())
    }

    /// Count a message that passed the level filter but will never be written.
    pub fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> DeliveryStats {
        DeliveryStats {
            written: self.written.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            rotations: self.registry.rotations(),
        }
    }

    /// Run an unthrottled sweep. `None` when archival is not configured.
    pub fn sweep_now(&self) -> Option<SweepReport> {
        self.sweeper
            .as_ref()
            .map(|sweeper| sweeper.sweep(&self.registry))
    }

    pub fn flush(&self) {
        self.registry.sync_all();
    }

    pub fn close(&self) {
        self.registry.close_all();
    }
}

// =============================================================================
// Async consumer
// =============================================================================

/// Requests carried on the control channel. Each holds the sender the
/// consumer acknowledges on once the request is complete.
#[derive(Debug)]
enum Control {
    Flush(Sender<()>),
    Close(Sender<()>),
}

/// Queue handle for the background consumer.
#[derive(Debug)]
pub struct AsyncDispatcher {
    sink: Arc<FileSink>,
    queue_tx: Sender<LogMessage>,
    control_tx: Sender<Control>,
    /// Kept so messages left behind after the consumer exits can be counted
    /// as dropped. Released on close, which disconnects the queue.
    leftovers: Mutex<Option<Receiver<LogMessage>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncDispatcher {
    /// Start the consumer thread. Capacity 0 selects the default.
    pub fn start(sink: Arc<FileSink>, capacity: usize) -> Result<Self> {
        let capacity = if capacity == 0 {
            constants::DEFAULT_ASYNC_CAPACITY
        } else {
            capacity
        };
        let (queue_tx, queue_rx) = bounded::<LogMessage>(capacity);
        let (control_tx, control_rx) = bounded::<Control>(1);

        let worker_sink = Arc::clone(&sink);
        let worker_rx = queue_rx.clone();
        let worker = std::thread::Builder::new()
            .name(format!("{}-consumer", constants::APP_ID))
            .spawn(move || run_consumer(&worker_sink, &worker_rx, &control_rx))
            .map_err(|e| FlogError::io(sink.registry().root(), "spawn consumer", e))?;

        tracing::debug!(capacity, "Async consumer started");
        Ok(Self {
            sink,
            queue_tx,
            control_tx,
            leftovers: Mutex::new(Some(queue_rx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Enqueue a message, blocking while the queue is full.
    pub fn submit(&self, message: LogMessage) {
        if self.queue_tx.send(message).is_err() {
            tracing::debug!("Queue closed; message dropped");
            self.sink.record_drop();
        }
    }

    /// Block until every message enqueued before this call is written and
    /// synced.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = bounded(1);
        if self.control_tx.send(Control::Flush(ack_tx)).is_err() {
            return;
        }
        if ack_rx.recv().is_err() {
            tracing::warn!("Async consumer exited before acknowledging flush");
        }
    }

    /// Drain the queue, close every file and stop the consumer.
    pub fn close(&self) {
        let (ack_tx, ack_rx) = bounded(1);
        if self.control_tx.send(Control::Close(ack_tx)).is_ok() && ack_rx.recv().is_err() {
            tracing::warn!("Async consumer exited before acknowledging close");
        }

        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::error!("Async consumer thread panicked");
            }
        }

        if let Some(rx) = self.leftovers.lock().take() {
            let mut late = 0u64;
            while rx.try_recv().is_ok() {
                self.sink.record_drop();
                late += 1;
            }
            if late > 0 {
                tracing::debug!(late, "Messages enqueued during close were dropped");
            }
        }
    }
}

/// Consumer loop: deliver queued messages until a close request arrives or
/// every control sender is gone.
fn run_consumer(sink: &FileSink, queue: &Receiver<LogMessage>, control: &Receiver<Control>) {
    loop {
        select! {
            recv(queue) -> msg => match msg {
                Ok(mut message) => {
                    sink.deliver(&mut message);
                }
                Err(_) => break,
            },
            recv(control) -> request => match request {
                Ok(Control::Flush(ack)) => {
                    // Only what was queued when the request arrived; later
                    // messages are not part of this flush.
                    let snapshot = queue.len();
                    for _ in 0..snapshot {
                        match queue.try_recv() {
                            Ok(mut message) => {
                                sink.deliver(&mut message);
                            }
                            Err(_) => break,
                        }
                    }
                    sink.flush();
                    let _ = ack.send(());
                }
                Ok(Control::Close(ack)) => {
                    drain(sink, queue);
                    sink.close();
                    let _ = ack.send(());
                    tracing::debug!("Async consumer stopped");
                    return;
                }
                Err(_) => break,
            },
        }
    }

    drain(sink, queue);
    sink.close();
    tracing::debug!("Async consumer stopped (channel disconnected)");
}

/// Deliver everything currently queued.
fn drain(sink: &FileSink, queue: &Receiver<LogMessage>) {
    loop {
        match queue.try_recv() {
            Ok(mut message) => {
                sink.deliver(&mut message);
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return,
        }
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Chooses where file I/O happens. Fixed at construction.
#[derive(Debug)]
pub enum Dispatcher {
    Sync(Arc<FileSink>),
    Async(AsyncDispatcher),
}

impl Dispatcher {
    /// Build the dispatcher described by `config.dispatch`.
    pub fn new(config: &LoggerConfig) -> Result<Self> {
        let sink = Arc::new(FileSink::new(config));
        match config.dispatch {
            DispatchMode::Sync => Ok(Self::Sync(sink)),
            DispatchMode::Async { capacity } => {
                AsyncDispatcher::start(sink, capacity).map(Self::Async)
            }
        }
    }

    fn sink(&self) -> &FileSink {
        match self {
            Self::Sync(sink) => sink,
            Self::Async(dispatcher) => &dispatcher.sink,
        }
    }

    /// Sync: written before returning. Async: enqueued before returning.
    pub fn dispatch(&self, mut message: LogMessage) {
        match self {
            Self::Sync(sink) => {
                sink.deliver(&mut message);
            }
            Self::Async(dispatcher) => dispatcher.submit(message),
        }
    }

    pub fn flush(&self) {
        match self {
            Self::Sync(sink) => sink.flush(),
            Self::Async(dispatcher) => dispatcher.flush(),
        }
    }

    pub fn close(&self) {
        match self {
            Self::Sync(sink) => sink.close(),
            Self::Async(dispatcher) => dispatcher.close(),
        }
    }

    pub fn record_drop(&self) {
        self.sink().record_drop();
    }

    pub fn stats(&self) -> DeliveryStats {
        self.sink().stats()
    }

    pub fn sweep_now(&self) -> Option<SweepReport> {
        self.sink().sweep_now()
    }
}
