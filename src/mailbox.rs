//! Coalescing mailbox between the command server and the render worker.
//!
//! A single latest-value cell guarded by a monitor (`Mutex` + `Condvar`). The
//! server writes, the worker reads; neither ever waits on the other's slow work.
//!
//! # Semantics
//!
//! - [`Mailbox::submit`] replaces the pending lines wholesale and marks them
//!   dirty. Anything not yet rendered is overwritten (last write wins).
//! - [`Mailbox::reset`] empties the pending lines and clears the dirty flag.
//! - [`Mailbox::stop`] raises the stop flag. It is never lowered again.
//! - [`Mailbox::wait`] is the worker side: block for at most the wake-poll
//!   interval while there is nothing to do, then report what to do next.
//!
//! Every change to the pending lines bumps a generation counter. A render pass
//! remembers the generation it started from and only clears the dirty flag
//! if no newer content arrived meanwhile (see [`Mailbox::complete`]).

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Content taken by the worker for one render pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// Lines to render.
    pub lines: Vec<String>,
    /// Generation the lines belong to.
    pub generation: u64,
}

/// What the worker should do after waking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Wake {
    /// New content is pending.
    Render(Snapshot),
    /// Woke on the poll timeout (or spuriously) with nothing to do.
    Idle,
    /// The stop flag is set. Leave the loop.
    Stop,
}

#[derive(Debug, Default)]
struct State {
    lines: Vec<String>,
    dirty: bool,
    stopped: bool,
    generation: u64,
    running: bool,
}

/// Latest-value cell plus stop flag, shared by server and worker.
#[derive(Debug, Default)]
pub struct Mailbox {
    state: Mutex<State>,
    wake: Condvar,
    exited: Condvar,
}

impl Mailbox {
    /// Create an empty, clean mailbox.
    pub fn new() -> Self { Self::default() }

    // Poisoning is ignored: every mutation below is a few plain field stores.
    fn lock(&self) -> MutexGuard<'_, State> { self.state.lock().unwrap_or_else(PoisonError::into_inner) }

    /// Replace the pending lines and wake the worker. Never blocks on rendering.
    pub fn submit(
        &self,
        lines: Vec<String>,
    ) {
        let mut state = self.lock();
        state.lines = lines;
        state.dirty = true;
        state.generation = state.generation.wrapping_add(1);
        drop(state);
        self.wake.notify_one();
    }

    /// Drop pending content: lines empty, dirty flag false.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.lines.clear();
        state.dirty = false;
        state.generation = state.generation.wrapping_add(1);
    }

    /// Raise the stop flag and wake the worker so it can exit promptly.
    pub fn stop(&self) {
        self.lock().stopped = true;
        self.wake.notify_all();
    }

    /// Worker side: wait for work, at most `timeout` when idle.
    ///
    /// Only waits if nothing is pending, so a notification that arrived before
    /// the call is never missed.
    pub fn wait(
        &self,
        timeout: Duration,
    ) -> Wake {
        let mut state = self.lock();
        if !state.dirty && !state.stopped {
            state = match self.wake.wait_timeout(state, timeout) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }

        if state.stopped {
            Wake::Stop
        } else if state.dirty {
            Wake::Render(Snapshot {
                lines: state.lines.clone(),
                generation: state.generation,
            })
        } else {
            Wake::Idle
        }
    }

    /// True if `generation` is still the latest content.
    pub fn is_current(
        &self,
        generation: u64,
    ) -> bool {
        self.lock().generation == generation
    }

    /// Mark a render of `generation` as finished.
    ///
    /// Clears the dirty flag only when no newer content arrived during the
    /// render. Returns whether the flag was cleared.
    pub fn complete(
        &self,
        generation: u64,
    ) -> bool {
        let mut state = self.lock();
        if state.generation == generation {
            state.dirty = false;
            true
        } else {
            false
        }
    }

    /// Currently pending lines.
    pub fn pending(&self) -> Vec<String> { self.lock().lines.clone() }

    /// True if pending lines have not been rendered yet.
    pub fn is_dirty(&self) -> bool { self.lock().dirty }

    /// True once a stop was requested.
    pub fn is_stopped(&self) -> bool { self.lock().stopped }

    // =========================================================================
    // Worker lifecycle
    // =========================================================================

    /// Record that the worker thread is up.
    pub fn mark_running(&self) { self.lock().running = true; }

    /// Record that the worker thread left its loop.
    pub fn mark_exited(&self) {
        self.lock().running = false;
        self.exited.notify_all();
    }

    /// True while the worker thread is inside its loop.
    pub fn is_running(&self) -> bool { self.lock().running }

    /// Wait until the worker has exited, for at most `timeout`.
    ///
    /// Returns `true` if the worker is no longer running.
    pub fn wait_exited(
        &self,
        timeout: Duration,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        while state.running {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            state = match self.exited.wait_timeout(state, remaining) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    const SHORT: Duration = Duration::from_millis(20);

    fn lines(items: &[&str]) -> Vec<String> { items.iter().map(|s| (*s).to_owned()).collect() }

    #[test]
    fn test_new_mailbox_is_clean() {
        let mailbox = Mailbox::new();
        assert!(mailbox.pending().is_empty());
        assert!(!mailbox.is_dirty());
        assert!(!mailbox.is_stopped());
        assert!(!mailbox.is_running());
    }

    #[test]
    fn test_idle_wait_times_out() {
        let mailbox = Mailbox::new();
        assert_eq!(mailbox.wait(SHORT), Wake::Idle);
    }

    #[test]
    fn test_submissions_coalesce_last_write_wins() {
        let mailbox = Mailbox::new();
        mailbox.submit(lines(&["one"]));
        mailbox.submit(lines(&["two"]));
        mailbox.submit(lines(&["three", "four"]));

        match mailbox.wait(SHORT) {
            Wake::Render(snapshot) => assert_eq!(snapshot.lines, lines(&["three", "four"])),
            other => panic!("expected render, got {other:?}"),
        }
    }

    #[test]
    fn test_pending_content_does_not_wait() {
        let mailbox = Mailbox::new();
        mailbox.submit(lines(&["now"]));
        let start = Instant::now();
        assert!(matches!(mailbox.wait(Duration::from_secs(5)), Wake::Render(_)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_complete_clears_dirty_for_current_generation() {
        let mailbox = Mailbox::new();
        mailbox.submit(lines(&["a"]));
        let Wake::Render(snapshot) = mailbox.wait(SHORT) else {
            panic!("expected render");
        };
        assert!(mailbox.complete(snapshot.generation));
        assert!(!mailbox.is_dirty());
        assert_eq!(mailbox.wait(SHORT), Wake::Idle);
    }

    #[test]
    fn test_submit_during_render_keeps_dirty() {
        let mailbox = Mailbox::new();
        mailbox.submit(lines(&["old"]));
        let Wake::Render(snapshot) = mailbox.wait(SHORT) else {
            panic!("expected render");
        };

        mailbox.submit(lines(&["new"]));
        assert!(!mailbox.is_current(snapshot.generation));
        assert!(!mailbox.complete(snapshot.generation));
        assert!(mailbox.is_dirty());

        match mailbox.wait(SHORT) {
            Wake::Render(next) => assert_eq!(next.lines, lines(&["new"])),
            other => panic!("expected render, got {other:?}"),
        }
    }

    #[test]
    fn test_reset_empties_and_cleans() {
        let mailbox = Mailbox::new();
        mailbox.submit(lines(&["a", "b"]));
        mailbox.reset();
        assert!(mailbox.pending().is_empty());
        assert!(!mailbox.is_dirty());
        assert_eq!(mailbox.wait(SHORT), Wake::Idle);
    }

    #[test]
    fn test_reset_supersedes_in_flight_render() {
        let mailbox = Mailbox::new();
        mailbox.submit(lines(&["a"]));
        let Wake::Render(snapshot) = mailbox.wait(SHORT) else {
            panic!("expected render");
        };
        mailbox.reset();
        assert!(!mailbox.is_current(snapshot.generation));
    }

    #[test]
    fn test_stop_wins_over_pending_content() {
        let mailbox = Mailbox::new();
        mailbox.submit(lines(&["a"]));
        mailbox.stop();
        assert_eq!(mailbox.wait(SHORT), Wake::Stop);

        // Monotonic: later submissions never bring the worker back
        mailbox.submit(lines(&["b"]));
        assert_eq!(mailbox.wait(SHORT), Wake::Stop);
        assert!(mailbox.is_stopped());
    }

    #[test]
    fn test_stop_wakes_waiting_worker() {
        let mailbox = Arc::new(Mailbox::new());
        let waiter = {
            let mailbox = Arc::clone(&mailbox);
            thread::spawn(move || {
                let start = Instant::now();
                loop {
                    let wake = mailbox.wait(Duration::from_secs(10));
                    if wake != Wake::Idle {
                        return (wake, start.elapsed());
                    }
                }
            })
        };

        thread::sleep(Duration::from_millis(50));
        mailbox.stop();

        let (wake, waited) = waiter.join().unwrap();
        assert_eq!(wake, Wake::Stop);
        assert!(waited < Duration::from_secs(5));
    }

    #[test]
    fn test_wait_exited() {
        let mailbox = Arc::new(Mailbox::new());
        mailbox.mark_running();
        assert!(!mailbox.wait_exited(SHORT));

        let exiter = {
            let mailbox = Arc::clone(&mailbox);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                mailbox.mark_exited();
            })
        };
        assert!(mailbox.wait_exited(Duration::from_secs(5)));
        exiter.join().unwrap();
        assert!(!mailbox.is_running());
    }
}
