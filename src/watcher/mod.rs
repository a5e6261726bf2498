//! Recursive Path Watcher
//!
//! Watches a directory tree and emits debounced batches of the files that
//! currently exist in it.
//!
//! A single task owns the [`WatchState`] and handles, one at a time, events
//! from four origins: OS filesystem events, OS watcher errors, debounce timer
//! expiry and the stop signal. Only the debounce timer handle is shared with
//! the outside (so [`StopHandle::stop`] can cancel it) and it has its own lock.

pub mod error;
pub mod event;
pub mod state;

pub use error::WatchError;
pub use event::WatchEvent;
pub use state::{is_excluded, is_sub_path, normalize, scan, WatchState};

use notify::{Config as NotifyConfig, Event, RecommendedWatcher, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Quiet period after the last event before a batch is emitted
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Runtime errors buffered for a slow consumer before new ones are dropped
const ERROR_BUFFER: usize = 16;

/// A running recursive watcher.
///
/// `batches` yields the sorted list of known, non-excluded files after each
/// quiet period. Only one batch is buffered: a batch produced while the
/// previous one is still unread is dropped. Both streams end once the
/// watcher is stopped.
pub struct PathWatcher {
    pub batches: mpsc::Receiver<Vec<PathBuf>>,
    pub errors: mpsc::Receiver<WatchError>,
    initial_files: Vec<PathBuf>,
    stop: StopHandle,
    task: Option<JoinHandle<()>>,
}

impl PathWatcher {
    /// Start watching `root` with the default debounce delay.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(root: &Path, exclusions: Vec<PathBuf>) -> Result<Self, WatchError> {
        Self::start_with_delay(root, exclusions, DEFAULT_DEBOUNCE)
    }

    /// Start watching `root`, emitting after `delay` of quiet.
    ///
    /// The initial walk and all initial subscriptions happen before this
    /// returns; any failure there aborts startup.
    pub fn start_with_delay(
        root: &Path,
        exclusions: Vec<PathBuf>,
        delay: Duration,
    ) -> Result<Self, WatchError> {
        let root = normalize(root);
        let exclusions: Vec<PathBuf> = exclusions.iter().map(|p| normalize(p)).collect();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let fs_tx = event_tx.clone();
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for event in WatchEvent::from_notify(event) {
                        let _ = fs_tx.send(event);
                    }
                }
                Err(e) => {
                    let _ = fs_tx.send(WatchEvent::Failed(e));
                }
            },
            NotifyConfig::default(),
        )
        .map_err(WatchError::Init)?;

        let mut state = WatchState::new(watcher, exclusions);
        state.add_dir_recursive(&root)?;
        let initial_files = state.snapshot();

        info!(
            "Watching {} ({} directories, {} files)",
            root.display(),
            state.directory_count(),
            initial_files.len()
        );

        let (batch_tx, batch_rx) = mpsc::channel(1);
        let (error_tx, error_rx) = mpsc::channel(ERROR_BUFFER);
        let timer = DebounceTimer::new(delay, event_tx.clone());
        let stop = StopHandle {
            events: event_tx,
            timer: timer.clone(),
            stopped: Arc::new(AtomicBool::new(false)),
        };

        let task = tokio::spawn(run_loop(state, event_rx, timer, batch_tx, error_tx));

        Ok(Self {
            batches: batch_rx,
            errors: error_rx,
            initial_files,
            stop,
            task: Some(task),
        })
    }

    /// Files found by the startup walk
    pub fn initial_files(&self) -> &[PathBuf] {
        &self.initial_files
    }

    /// A handle that can stop this watcher from anywhere
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Stop the watcher and wait for its loop to finish
    pub async fn stop(mut self) {
        self.stop.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("Watcher task failed: {}", e);
                }
            }
        }
    }
}

impl Drop for PathWatcher {
    fn drop(&mut self) {
        self.stop.stop();
    }
}

/// Stops a [`PathWatcher`]; cloneable, and stopping twice is a no-op
#[derive(Clone)]
pub struct StopHandle {
    events: mpsc::UnboundedSender<WatchEvent>,
    timer: DebounceTimer,
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    /// Cancel any pending emission and tell the loop to exit
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.timer.cancel();
        let _ = self.events.send(WatchEvent::Stop);
    }

    /// Whether stop has been requested
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// The single pending debounce deadline
#[derive(Clone)]
struct DebounceTimer {
    delay: Duration,
    events: mpsc::UnboundedSender<WatchEvent>,
    pending: Arc<Mutex<PendingTimer>>,
}

#[derive(Default)]
struct PendingTimer {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl DebounceTimer {
    fn new(delay: Duration, events: mpsc::UnboundedSender<WatchEvent>) -> Self {
        Self {
            delay,
            events,
            pending: Arc::new(Mutex::new(PendingTimer::default())),
        }
    }

    /// Replace the pending deadline with a fresh one
    fn reset(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = pending.handle.take() {
            handle.abort();
        }

        pending.generation += 1;
        let generation = pending.generation;
        let events = self.events.clone();
        let delay = self.delay;
        pending.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(WatchEvent::TimerFired(generation));
        }));
    }

    fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = pending.handle.take() {
            handle.abort();
        }
        // Invalidate a firing that is already queued
        pending.generation += 1;
    }

    /// A queued expiry is stale once the timer was reset or cancelled after it
    fn is_current(&self, generation: u64) -> bool {
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.generation == generation
    }
}

async fn run_loop(
    mut state: WatchState,
    mut events: mpsc::UnboundedReceiver<WatchEvent>,
    timer: DebounceTimer,
    batches: mpsc::Sender<Vec<PathBuf>>,
    errors: mpsc::Sender<WatchError>,
) {
    while let Some(event) = events.recv().await {
        match event {
            WatchEvent::Stop => break,
            WatchEvent::TimerFired(generation) => {
                if timer.is_current(generation) {
                    emit(&state, &batches);
                }
            }
            WatchEvent::Failed(e) => report(&errors, WatchError::Runtime(e)),
            event => {
                let Some(path) = event.path() else { continue };
                if state.is_excluded(path) {
                    continue;
                }

                debug!("File event: {:?}", event);
                if let Err(e) = state.apply(&event) {
                    report(&errors, e);
                }
                timer.reset();
            }
        }
    }

    timer.cancel();
    state.release();
    debug!("Watcher loop stopped");
}

fn emit(state: &WatchState, batches: &mpsc::Sender<Vec<PathBuf>>) {
    let files = state.snapshot();
    let count = files.len();

    match batches.try_send(files) {
        Ok(()) => debug!("Emitted batch of {} files", count),
        Err(TrySendError::Full(_)) => debug!("Previous batch still unread, dropping new batch"),
        Err(TrySendError::Closed(_)) => debug!("Batch receiver closed"),
    }
}

fn report(errors: &mpsc::Sender<WatchError>, error: WatchError) {
    match errors.try_send(error) {
        Ok(()) => {}
        Err(TrySendError::Full(error)) => warn!("Dropping watcher error, consumer is behind: {}", error),
        Err(TrySendError::Closed(error)) => warn!("Watcher error: {}", error),
    }
}
