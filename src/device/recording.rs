//! In-memory display used by tests and dry runs.
//!
//! Clones share the same record, so a test can hand one clone to the render
//! worker and inspect what the worker pushed through another.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use embedded_graphics::prelude::Size;

use super::{DeviceError, DisplayDevice, check_frame_size};
use crate::framebuffer::Framebuffer;

#[derive(Debug, Default)]
struct Record {
    frames: Vec<Framebuffer>,
    clears: usize,
    initialized: bool,
    released: bool,
    fail_init: bool,
    fail_frames: bool,
}

/// Records every frame and clear it receives.
#[derive(Clone, Debug)]
pub struct RecordingDisplay {
    size: Size,
    record: Arc<Mutex<Record>>,
}

impl RecordingDisplay {
    /// Healthy recorder for a panel of `size`.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            record: Arc::new(Mutex::new(Record::default())),
        }
    }

    /// Recorder whose initialization always fails.
    pub fn failing_init(size: Size) -> Self {
        let display = Self::new(size);
        display.lock().fail_init = true;
        display
    }

    /// Make frame pushes fail (or succeed again).
    pub fn set_fail_frames(
        &self,
        fail: bool,
    ) {
        self.lock().fail_frames = fail;
    }

    fn lock(&self) -> MutexGuard<'_, Record> { self.record.lock().unwrap_or_else(PoisonError::into_inner) }

    /// All frames pushed so far, oldest first.
    pub fn frames(&self) -> Vec<Framebuffer> { self.lock().frames.clone() }

    pub fn frame_count(&self) -> usize { self.lock().frames.len() }

    pub fn last_frame(&self) -> Option<Framebuffer> { self.lock().frames.last().cloned() }

    pub fn clear_count(&self) -> usize { self.lock().clears }

    pub fn is_initialized(&self) -> bool { self.lock().initialized }

    pub fn is_released(&self) -> bool { self.lock().released }
}

impl DisplayDevice for RecordingDisplay {
    fn initialize(&mut self) -> Result<(), DeviceError> {
        let mut record = self.lock();
        if record.fail_init {
            return Err(DeviceError::Init("panel did not acknowledge".into()));
        }
        record.initialized = true;
        Ok(())
    }

    fn push_frame(
        &mut self,
        frame: &Framebuffer,
    ) -> Result<(), DeviceError> {
        check_frame_size(self.size, frame)?;
        let mut record = self.lock();
        if record.fail_frames {
            return Err(DeviceError::Bus("write timed out".into()));
        }
        record.frames.push(frame.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DeviceError> {
        self.lock().clears += 1;
        Ok(())
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        self.lock().released = true;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
