//! Drives a simulation at a steady cadence on its own thread.

use crate::error::SimulationError;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

/// Outcome of a single tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickStatus {
    /// Nodes moved, more ticks are needed.
    Continue,
    /// Nodes moved and the simulation cooled down.
    Settled,
    /// Nothing to simulate right now.
    Idle,
    /// The simulation is gone. No tick will ever do anything again.
    Stopped,
}

impl TickStatus {
    /// Whether the tick warrants a redraw.
    pub fn needs_redraw(self) -> bool {
        self == TickStatus::Continue
    }
}

/// Something the scheduler can tick.
pub trait Ticker: Send + 'static {
    fn tick(&mut self) -> TickStatus;
}

impl<F> Ticker for F
where
    F: FnMut() -> TickStatus + Send + 'static,
{
    fn tick(&mut self) -> TickStatus {
        self()
    }
}

enum Command {
    Pause,
    Resume,
    Stop,
}

/// Calls a [`Ticker`] every interval on a dedicated thread.
///
/// The loop pauses itself when a tick reports [`TickStatus::Settled`] or
/// [`TickStatus::Idle`], and exits on [`TickStatus::Stopped`].
pub struct TickScheduler {
    commands: Sender<Command>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
    stopped: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl TickScheduler {
    /// Spawns the tick thread. The first tick fires after one `interval`.
    pub fn start<T: Ticker>(ticker: T, interval: Duration) -> Result<Self, SimulationError> {
        let (commands, receiver) = mpsc::channel();
        let stopped = Arc::new(AtomicBool::new(false));
        let paused = Arc::new(AtomicBool::new(false));

        let worker = {
            let stopped = stopped.clone();
            let paused = paused.clone();
            thread::Builder::new()
                .name("forcesim-tick".into())
                .spawn(move || run(ticker, interval, receiver, stopped, paused))?
        };
        debug!("Tick thread started, interval {0:?}", interval);

        Ok(Self {
            commands,
            worker_id: worker.thread().id(),
            worker: Mutex::new(Some(worker)),
            stopped,
            paused,
        })
    }

    /// Suspends ticking until [`Self::resume`].
    pub fn pause(&self) {
        let _ = self.commands.send(Command::Pause);
    }

    pub fn resume(&self) {
        let _ = self.commands.send(Command::Resume);
    }

    /// Whether the loop is currently suspended.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Ends the loop for good.
    ///
    /// A tick in flight is allowed to finish. Once this returns no further tick
    /// is delivered. Safe to call repeatedly and from several threads. Called
    /// from within a tick it cannot wait, the loop exits after that tick.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        let _ = self.commands.send(Command::Stop);
        if thread::current().id() == self.worker_id {
            return;
        }

        // Hold the lock while joining so concurrent callers wait as well.
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                warn!("Tick thread panicked");
            }
            debug!("Tick thread stopped");
        }
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<T: Ticker>(
    mut ticker: T,
    interval: Duration,
    commands: Receiver<Command>,
    stopped: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
) {
    let mut deadline = Instant::now() + interval;
    loop {
        let command = if paused.load(Ordering::Acquire) {
            commands.recv().map_err(|_| RecvTimeoutError::Disconnected)
        } else {
            commands.recv_timeout(deadline.saturating_duration_since(Instant::now()))
        };

        match command {
            Ok(Command::Pause) => paused.store(true, Ordering::Release),
            Ok(Command::Resume) => {
                if paused.swap(false, Ordering::AcqRel) {
                    deadline = Instant::now();
                }
            }
            Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                if stopped.load(Ordering::Acquire) {
                    break;
                }
                match ticker.tick() {
                    TickStatus::Continue => {}
                    TickStatus::Settled | TickStatus::Idle => paused.store(true, Ordering::Release),
                    TickStatus::Stopped => break,
                }

                // Skip ticks that were missed instead of bursting to catch up.
                let now = Instant::now();
                deadline += interval;
                if deadline < now {
                    deadline = now + interval;
                }
            }
        }
    }
    stopped.store(true, Ordering::Release);
}
