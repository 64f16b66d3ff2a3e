//! Render worker: the only execution context that pushes frames to the device.
//!
//! The command server never waits for a render. It drops the latest lines into
//! the [`Mailbox`] and replies; this thread wakes, composes the frame and pushes
//! it over the slow bus while the server keeps answering requests.
//!
//! # Loop
//!
//! ```text
//! wait (<= wake poll) --> Stop   --> release device, exit
//!                     --> Idle   --> wait again
//!                     --> Render --> compose, push, complete
//! ```
//!
//! The mailbox lock is never held while composing or pushing. The device sits
//! behind its own lock, shared with the synchronous clear path, and a composed
//! frame is only pushed if its content is still the latest once that lock is
//! taken. A frame overtaken by a clear or a newer submission is dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use embedded_graphics::prelude::Size;
use log::{debug, error, info, warn};

use crate::config::{SCREEN_HEIGHT, SCREEN_WIDTH, WAKE_POLL_INTERVAL};
use crate::device::{DeviceError, DisplayDevice};
use crate::error::{Error, Result};
use crate::mailbox::{Mailbox, Snapshot, Wake};
use crate::profiling::{RenderStats, StatsSnapshot};
use crate::render::{Layout, Renderer};
use crate::styles::FontChoice;

/// Name of the worker thread, as shown in logs and debuggers.
pub const THREAD_NAME: &str = "render-worker";

/// Render worker parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerOptions {
    /// Panel size in pixels.
    pub size: Size,
    /// Font for every line.
    pub font: FontChoice,
    /// Longest idle wait before the stop flag is re-checked.
    pub wake_poll: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            size: Size::new(SCREEN_WIDTH, SCREEN_HEIGHT),
            font: FontChoice::default(),
            wake_poll: WAKE_POLL_INTERVAL,
        }
    }
}

// =============================================================================
// Shared State
// =============================================================================

/// Everything the server and the worker share. Built once at startup.
struct Shared {
    mailbox: Mailbox,
    device: Mutex<Box<dyn DisplayDevice>>,
    stats: RenderStats,
    wake_poll: Duration,
}

impl Shared {
    fn lock_device(&self) -> MutexGuard<'_, Box<dyn DisplayDevice>> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cheap, cloneable handle used by the command server and the signal handler.
#[derive(Clone)]
pub struct RenderHandle {
    shared: Arc<Shared>,
}

impl RenderHandle {
    /// Replace the pending content and wake the worker. Returns immediately.
    pub fn submit(
        &self,
        lines: Vec<String>,
    ) {
        self.shared.stats.inc_submissions();
        self.shared.mailbox.submit(lines);
    }

    /// Blank the panel now and drop any pending content.
    ///
    /// Runs on the caller's thread. Waits for a push already in progress, then
    /// clears the device; the frame being rendered when the clear arrived is
    /// discarded.
    pub fn request_clear(&self) -> core::result::Result<(), DeviceError> {
        self.shared.mailbox.reset();
        self.shared.stats.inc_clears();
        self.shared.lock_device().clear()
    }

    /// Ask the worker to exit. A render pass in progress is finished first.
    pub fn request_stop(&self) { self.shared.mailbox.stop(); }

    /// Request a stop and wait at most `timeout` for the worker to leave its loop.
    ///
    /// Returns `false` if the worker is still busy (a device call hung).
    pub fn shutdown(
        &self,
        timeout: Duration,
    ) -> bool {
        self.request_stop();
        self.shared.mailbox.wait_exited(timeout)
    }

    /// Current render counters.
    pub fn stats(&self) -> StatsSnapshot { self.shared.stats.snapshot() }

    /// Lines waiting to be rendered (or last rendered).
    pub fn pending(&self) -> Vec<String> { self.shared.mailbox.pending() }

    pub fn is_dirty(&self) -> bool { self.shared.mailbox.is_dirty() }

    pub fn is_stopped(&self) -> bool { self.shared.mailbox.is_stopped() }

    pub fn is_running(&self) -> bool { self.shared.mailbox.is_running() }

    /// Wake-poll interval the worker was started with.
    pub fn wake_poll(&self) -> Duration { self.shared.wake_poll }
}

// =============================================================================
// Worker
// =============================================================================

/// The running render worker thread.
pub struct RenderWorker {
    handle: RenderHandle,
    thread: JoinHandle<()>,
}

impl RenderWorker {
    /// Initialize and blank the device, then start the worker thread.
    ///
    /// Device initialization failure is fatal and returned to the caller.
    pub fn spawn(
        mut device: Box<dyn DisplayDevice>,
        options: WorkerOptions,
    ) -> Result<Self> {
        device.initialize()?;
        device.clear()?;
        info!(
            "Display initialized ({}x{}, font {})",
            options.size.width, options.size.height, options.font
        );

        let shared = Arc::new(Shared {
            mailbox: Mailbox::new(),
            device: Mutex::new(device),
            stats: RenderStats::new(),
            wake_poll: options.wake_poll,
        });
        let renderer = Renderer::new(options.font, options.size);

        shared.mailbox.mark_running();
        let worker_shared = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || run(&worker_shared, renderer))
            .map_err(|e| {
                shared.mailbox.mark_exited();
                Error::WorkerSpawn(e)
            })?;

        Ok(Self {
            handle: RenderHandle { shared },
            thread,
        })
    }

    /// Handle for submitting work.
    pub fn handle(&self) -> RenderHandle { self.handle.clone() }

    /// Wait for the thread to finish. Call after a stop request.
    pub fn join(self) {
        if self.thread.join().is_err() {
            error!("Render worker panicked");
        }
    }
}

fn run(
    shared: &Shared,
    mut renderer: Renderer,
) {
    info!("Render worker started (wake poll {:?})", shared.wake_poll);

    loop {
        match shared.mailbox.wait(shared.wake_poll) {
            Wake::Stop => break,
            Wake::Idle => {}
            Wake::Render(snapshot) => render_pass(shared, &mut renderer, &snapshot),
        }
    }

    if let Err(e) = shared.lock_device().release() {
        warn!("Display release failed: {e}");
    }
    info!("Render worker stopped: {}", shared.stats.snapshot());
    shared.mailbox.mark_exited();
}

/// Compose the snapshot and push it, unless newer content overtook it.
fn render_pass(
    shared: &Shared,
    renderer: &mut Renderer,
    snapshot: &Snapshot,
) {
    let start = Instant::now();
    let layout = Layout::from_lines(&snapshot.lines);
    let frame = renderer.compose(&layout);

    let mut device = shared.lock_device();
    if !shared.mailbox.is_current(snapshot.generation) {
        shared.stats.inc_superseded();
        debug!("Dropped frame for generation {}", snapshot.generation);
        return;
    }

    match device.push_frame(frame) {
        Ok(()) => {
            shared.stats.record_render(start.elapsed());
            debug!("Rendered {} lines in {:?}", layout.len(), start.elapsed());
        }
        Err(e) => {
            shared.stats.inc_failures();
            error!("Render failed: {e}");
        }
    }
    drop(device);

    shared.mailbox.complete(snapshot.generation);
}

// =============================================================================
// Tests
// =============================================================================
