//! Shared Context
//!
//! The one piece of state touched by more than one actor. The control
//! receiver, the notification pipeline and the dispatcher all hold an
//! `Arc<SharedContext>`; everything else stays owned by a single actor.
//!
//! ```text
//!   ControlReceiver ──push_command──▶ ┌──────────────────┐ ──drain_commands──▶ Dispatcher
//!                                     │  SharedContext   │
//!   Dispatcher ──────────submit─────▶ │  (one Mutex +    │ ──next_batches───▶ Pipeline
//!                                     │   one Notify)    │
//!   ControlReceiver ──set_endpoint──▶ └──────────────────┘ ──endpoint────────▶ Pipeline
//! ```
//!
//! Consumers take the whole queue in one step and work on it after the lock
//! is released. No guard is ever held across an `.await`.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::command::Command;
use crate::pipeline::Batch;

/// Where outbound requests are delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Filesystem path of the ghost's session socket
    pub path: PathBuf,
    /// Session identifier sent in the `Ai` header
    pub session_id: String,
}

#[derive(Debug)]
struct SharedState {
    commands: VecDeque<Command>,
    batches: VecDeque<Batch>,
    working_dir: Option<PathBuf>,
    endpoint: Option<Endpoint>,
    loaded: bool,
    alive: bool,
}

/// Queues and cross-actor scalars behind a single lock
#[derive(Debug)]
pub struct SharedContext {
    state: Mutex<SharedState>,
    wake: Notify,
}

impl Default for SharedContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedContext {
    /// Create an empty, alive context
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SharedState {
                commands: VecDeque::new(),
                batches: VecDeque::new(),
                working_dir: None,
                endpoint: None,
                loaded: false,
                alive: true,
            }),
            wake: Notify::new(),
        }
    }

    /// Enqueue a command for the dispatcher
    pub fn push_command(&self, command: Command) {
        self.state.lock().commands.push_back(command);
    }

    /// Take every queued command, oldest first
    pub fn drain_commands(&self) -> Vec<Command> {
        self.state.lock().commands.drain(..).collect()
    }

    /// Enqueue an outbound batch and wake the pipeline
    pub fn submit(&self, batch: Batch) {
        self.state.lock().batches.push_back(batch);
        self.wake.notify_waiters();
    }

    /// Record the directory holding `descript.txt` and the skin images
    pub fn set_working_dir(&self, dir: impl AsRef<Path>) {
        self.state.lock().working_dir = Some(dir.as_ref().to_path_buf());
    }

    /// Directory recorded by the last `Initialize` request
    #[must_use]
    pub fn working_dir(&self) -> Option<PathBuf> {
        self.state.lock().working_dir.clone()
    }

    /// Record the session endpoint and release anyone waiting for startup
    pub fn set_endpoint(&self, endpoint: Endpoint) {
        {
            let mut state = self.state.lock();
            state.endpoint = Some(endpoint);
            state.loaded = true;
        }
        self.wake.notify_waiters();
    }

    /// Current session endpoint
    #[must_use]
    pub fn endpoint(&self) -> Option<Endpoint> {
        self.state.lock().endpoint.clone()
    }

    /// Whether startup has been released
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state.lock().loaded
    }

    /// Whether the control channel is still open
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state.lock().alive
    }

    /// Mark the control channel closed
    ///
    /// Flips `alive` off, releases startup, and pushes an empty sentinel batch
    /// so a pipeline blocked on an empty queue wakes up and notices.
    pub fn shutdown(&self) {
        {
            let mut state = self.state.lock();
            state.loaded = true;
            state.alive = false;
            state.batches.push_back(Batch::new());
        }
        self.wake.notify_waiters();
    }

    /// Block until an `Endpoint` arrives or the channel closes
    ///
    /// Returns `true` when the endpoint is known and the channel is still alive.
    pub async fn wait_until_loaded(&self) -> bool {
        self.wait_for(|state| state.loaded.then_some(state.alive))
            .await
    }

    /// Block until at least one batch is queued, then take them all
    ///
    /// Returns `None` once the context is no longer alive.
    pub async fn next_batches(&self) -> Option<Vec<Batch>> {
        self.wait_for(|state| {
            if state.batches.is_empty() {
                return None;
            }
            if !state.alive {
                return Some(None);
            }
            Some(Some(state.batches.drain(..).collect()))
        })
        .await
    }

    async fn wait_for<T>(&self, mut ready: impl FnMut(&mut SharedState) -> Option<T>) -> T {
        loop {
            let notified = self.wake.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if let Some(value) = ready(&mut state) {
                    return value;
                }
            }

            notified.await;
        }
    }
}
