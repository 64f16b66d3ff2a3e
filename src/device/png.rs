//! Headless simulator display that writes frames as PNG images.
//!
//! Backed by `embedded-graphics-simulator`'s `SimulatorDisplay` with the SDL
//! window disabled. Each push renders the panel with the white-OLED theme at
//! 2x scale and writes `frame.png` in the output directory. With history
//! enabled every frame is also kept as `frame-000001.png`, `frame-000002.png`, ...

use std::fs;
use std::path::{Path, PathBuf};

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{BinaryColorTheme, OutputSettings, OutputSettingsBuilder, SimulatorDisplay};
use log::{debug, info};

use super::{DeviceError, DisplayDevice, check_frame_size};
use crate::framebuffer::Framebuffer;

/// File name of the latest frame.
pub const LATEST_FRAME: &str = "frame.png";

/// Simulated OLED panel rendered to PNG files.
pub struct PngDisplay {
    dir: PathBuf,
    keep_history: bool,
    frame_index: u64,
    display: SimulatorDisplay<BinaryColor>,
    output_settings: OutputSettings,
}

impl PngDisplay {
    /// Panel writing into `dir`. The directory is created on initialize.
    pub fn new(
        dir: &Path,
        size: Size,
        keep_history: bool,
    ) -> Self {
        Self {
            dir: dir.to_path_buf(),
            keep_history,
            frame_index: 0,
            display: SimulatorDisplay::new(size),
            output_settings: OutputSettingsBuilder::new()
                .theme(BinaryColorTheme::OledWhite)
                .scale(2)
                .build(),
        }
    }

    /// Path of the latest frame image.
    pub fn latest_frame_path(&self) -> PathBuf { self.dir.join(LATEST_FRAME) }

    fn write_png(&mut self) -> Result<(), DeviceError> {
        let image = self.display.to_rgb_output_image(&self.output_settings);
        let latest = self.latest_frame_path();
        image
            .save_png(&latest)
            .map_err(|e| DeviceError::Bus(format!("writing {}: {e}", latest.display())))?;

        if self.keep_history {
            self.frame_index += 1;
            let numbered = self.dir.join(format!("frame-{:06}.png", self.frame_index));
            image
                .save_png(&numbered)
                .map_err(|e| DeviceError::Bus(format!("writing {}: {e}", numbered.display())))?;
        }

        debug!("Wrote {}", latest.display());
        Ok(())
    }
}

impl DisplayDevice for PngDisplay {
    fn initialize(&mut self) -> Result<(), DeviceError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| DeviceError::Init(format!("cannot create {}: {e}", self.dir.display())))?;
        info!("PNG display writing to {}", self.dir.display());
        Ok(())
    }

    fn push_frame(
        &mut self,
        frame: &Framebuffer,
    ) -> Result<(), DeviceError> {
        check_frame_size(self.display.size(), frame)?;
        self.display.draw_iter(frame.pixels()).ok();
        self.write_png()
    }

    fn clear(&mut self) -> Result<(), DeviceError> {
        self.display.clear(BinaryColor::Off).ok();
        self.write_png()
    }
}

// =============================================================================
// Tests
// =============================================================================
