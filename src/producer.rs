//! Background batch production and the consumer-facing bounded queue.
//!
//! One worker thread owns its own single-threaded async runtime and loops
//! through fetch → assemble → tokenize → enqueue cycles forever. The queue
//! applies backpressure by drop: a full queue discards the finished batch
//! instead of blocking, so the producer never stalls on a slow consumer and
//! the consumer only ever blocks on `get`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use futures::StreamExt;
use tracing::{debug, warn};

use crate::assemble::{cap_words, SampleAssembler};
use crate::config::ProducerConfig;
use crate::constants::producer as consts;
use crate::data::GlobalIndex;
use crate::errors::StreamError;
use crate::store::ContentStore;
use crate::tokenize::{TokenizedBatch, Tokenizer};

/// Pause after a cycle that produced nothing, so transient store outages do
/// not turn into a hot error loop.
const SKIP_BACKOFF: Duration = Duration::from_millis(50);

/// Queue runtime counters.
#[derive(Default)]
struct QueueStats {
    depth: AtomicUsize,
    produced: AtomicUsize,
    dropped: AtomicUsize,
}

/// Bounded FIFO of finished batches shared by producer and consumer.
///
/// `put` never blocks: at capacity the batch is discarded and counted.
/// `get` blocks the calling thread until a batch arrives. Strict FIFO, no
/// priorities. Internally synchronized; no external locking needed.
pub struct DatasetQueue {
    sender: SyncSender<TokenizedBatch>,
    receiver: Mutex<Receiver<TokenizedBatch>>,
    capacity: usize,
    stats: QueueStats,
}

impl DatasetQueue {
    /// Queue holding at most `capacity` batches.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::sync_channel(capacity);
        Self {
            sender,
            receiver: Mutex::new(receiver),
            capacity,
            stats: QueueStats::default(),
        }
    }

    /// Enqueue `batch`, or drop it when the queue is full. Returns whether
    /// the batch was accepted.
    pub fn put(&self, batch: TokenizedBatch) -> bool {
        match self.sender.try_send(batch) {
            Ok(()) => {
                self.stats.depth.fetch_add(1, Ordering::Relaxed);
                self.stats.produced.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Dequeue the oldest batch, blocking until one is available.
    pub fn get(&self) -> TokenizedBatch {
        let receiver = self.receiver.lock().expect("queue receiver poisoned");
        let batch = receiver.recv().expect("queue sender lives in the queue");
        self.note_dequeue();
        batch
    }

    /// Dequeue with a deadline; `None` when `timeout` elapses first.
    pub fn get_timeout(&self, timeout: Duration) -> Option<TokenizedBatch> {
        let receiver = self.receiver.lock().expect("queue receiver poisoned");
        let batch = receiver.recv_timeout(timeout).ok()?;
        self.note_dequeue();
        Some(batch)
    }

    fn note_dequeue(&self) {
        self.stats
            .depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |depth| {
                Some(depth.saturating_sub(1))
            })
            .ok();
    }

    /// Number of batches currently queued.
    pub fn len(&self) -> usize {
        self.stats.depth.load(Ordering::Relaxed)
    }

    /// `true` when no batch is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of queued batches.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Batches accepted onto the queue since construction.
    pub fn produced_count(&self) -> usize {
        self.stats.produced.load(Ordering::Relaxed)
    }

    /// Batches discarded because the queue was full.
    pub fn dropped_count(&self) -> usize {
        self.stats.dropped.load(Ordering::Relaxed)
    }
}

/// Outcome of one production cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A batch was tokenized and accepted by the queue.
    Enqueued,
    /// A batch was tokenized but the queue was full; it was discarded.
    Dropped,
    /// No batch was produced (every sample in the window failed).
    Skipped,
}

/// One-cycle-at-a-time batch production engine.
///
/// Owns the async execution context (a single-threaded runtime) used for
/// store fetches, so nothing here leaks onto a caller's scheduler. The
/// worker thread drives it in a loop; tests drive it one `cycle` at a time.
pub struct ProducerEngine<S, T> {
    store: S,
    tokenizer: T,
    index: GlobalIndex,
    assembler: SampleAssembler,
    queue: Arc<DatasetQueue>,
    config: ProducerConfig,
    cursor: usize,
    runtime: tokio::runtime::Runtime,
}

impl<S: ContentStore, T: Tokenizer> ProducerEngine<S, T> {
    /// Build an engine over an already-built `index`.
    ///
    /// Fails loudly when the index is empty: a producer with nothing to
    /// fetch must not start.
    pub fn new(
        store: S,
        tokenizer: T,
        index: GlobalIndex,
        config: ProducerConfig,
        queue: Arc<DatasetQueue>,
    ) -> Result<Self, StreamError> {
        config.validate()?;
        if index.is_empty() {
            return Err(StreamError::IndexBuild {
                dataset: "*".into(),
                reason: "global index holds no leaf refs".into(),
            });
        }
        let assembler = SampleAssembler::new(config.text_field.clone(), config.sequence_length);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            store,
            tokenizer,
            index,
            assembler,
            queue,
            config,
            cursor: 0,
            runtime,
        })
    }

    /// Run one fetch → assemble → tokenize → enqueue cycle.
    ///
    /// Selects the next `batch_size` leaf positions round-robin over the
    /// flattened index (wrapping at the end, so the sequence is infinite
    /// and restartable), assembles them concurrently under the in-flight
    /// bound with an order-preserving gather, caps each sample's words,
    /// tokenizes with padding, and slices to `sequence_length` columns.
    /// Per-sample failures are logged and skipped; they never end the
    /// worker.
    pub fn cycle(&mut self) -> CycleOutcome {
        let total = self.index.len();
        let starts: Vec<usize> = (0..self.config.batch_size)
            .map(|offset| (self.cursor + offset) % total)
            .collect();
        self.cursor = (self.cursor + self.config.batch_size) % total;

        let results = {
            let store = &self.store;
            let assembler = &self.assembler;
            let leaf_refs = self.index.all_leaf_refs();
            let in_flight = self.config.max_in_flight_fetches.max(1);
            self.runtime.block_on(async {
                futures::stream::iter(
                    starts
                        .iter()
                        .map(|&start| assembler.assemble(store, leaf_refs, start)),
                )
                .buffered(in_flight)
                .collect::<Vec<_>>()
                .await
            })
        };

        let mut texts = Vec::with_capacity(results.len());
        for (start, result) in starts.iter().zip(results) {
            match result {
                Ok(sample) => texts.push(cap_words(&sample.text, consts::SAMPLE_WORD_CAP)),
                Err(err) => warn!(start, error = %err, "skipping sample"),
            }
        }
        if texts.is_empty() {
            return CycleOutcome::Skipped;
        }

        let mut batch = match self.tokenizer.encode_batch(&texts, true) {
            Ok(batch) => batch,
            Err(err) => {
                warn!(error = %err, "tokenization failed, skipping batch");
                return CycleOutcome::Skipped;
            }
        };
        batch.truncate_columns(self.config.sequence_length);

        if self.queue.put(batch) {
            debug!(queued = self.queue.len(), "batch enqueued");
            CycleOutcome::Enqueued
        } else {
            debug!("queue full, batch dropped");
            CycleOutcome::Dropped
        }
    }

    /// The queue this engine pushes into.
    pub fn queue(&self) -> &Arc<DatasetQueue> {
        &self.queue
    }
}

/// Background worker streaming tokenized batches into a bounded queue.
///
/// The worker runs on its own thread with its own runtime, so consumer
/// calls never wait on fetch or tokenize latency. Stopping is cooperative:
/// the worker finishes its current cycle and exits.
pub struct BatchProducer {
    queue: Arc<DatasetQueue>,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl BatchProducer {
    /// Validate, build the queue and engine, and start the worker thread.
    pub fn spawn<S, T>(
        store: S,
        tokenizer: T,
        index: GlobalIndex,
        config: ProducerConfig,
    ) -> Result<Self, StreamError>
    where
        S: ContentStore + Send + 'static,
        T: Tokenizer + Send + 'static,
    {
        let queue = Arc::new(DatasetQueue::new(config.buffer_size));
        let mut engine = ProducerEngine::new(store, tokenizer, index, config, Arc::clone(&queue))?;
        let stop = Arc::new(AtomicBool::new(false));
        let stop_worker = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !stop_worker.load(Ordering::Relaxed) {
                if engine.cycle() == CycleOutcome::Skipped {
                    thread::sleep(SKIP_BACKOFF);
                }
            }
            debug!("producer worker stopped");
        });
        Ok(Self {
            queue,
            stop,
            handle: Some(handle),
        })
    }

    /// Block until the next finished batch is available.
    pub fn next_batch(&self) -> TokenizedBatch {
        self.queue.get()
    }

    /// The shared batch queue.
    pub fn queue(&self) -> &Arc<DatasetQueue> {
        &self.queue
    }

    /// Cooperatively stop the worker and wait for it to exit.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for BatchProducer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_of(marker: u32) -> TokenizedBatch {
        TokenizedBatch {
            input_ids: vec![vec![marker]],
            attention_mask: vec![vec![1]],
        }
    }

    #[test]
    fn queue_is_fifo() {
        let queue = DatasetQueue::new(4);
        assert!(queue.put(batch_of(1)));
        assert!(queue.put(batch_of(2)));
        assert_eq!(queue.get().input_ids[0][0], 1);
        assert_eq!(queue.get().input_ids[0][0], 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let queue = DatasetQueue::new(2);
        assert!(queue.put(batch_of(1)));
        assert!(queue.put(batch_of(2)));
        assert_eq!(queue.len(), 2);

        assert!(!queue.put(batch_of(3)));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dropped_count(), 1);
        assert_eq!(queue.produced_count(), 2);

        // The dropped batch is gone; FIFO order of survivors is intact.
        assert_eq!(queue.get().input_ids[0][0], 1);
        assert_eq!(queue.get().input_ids[0][0], 2);
    }

    #[test]
    fn blocking_get_wakes_on_put() {
        let queue = Arc::new(DatasetQueue::new(1));
        let consumer_queue = Arc::clone(&queue);
        let consumer = thread::spawn(move || consumer_queue.get().input_ids[0][0]);
        thread::sleep(Duration::from_millis(20));
        assert!(queue.put(batch_of(7)));
        assert_eq!(consumer.join().unwrap(), 7);
    }

    #[test]
    fn get_timeout_expires_on_an_empty_queue() {
        let queue = DatasetQueue::new(1);
        assert!(queue.get_timeout(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let queue = DatasetQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        assert!(queue.put(batch_of(1)));
        assert!(!queue.put(batch_of(2)));
    }
}
