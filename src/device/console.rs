//! Text-art display for headless runs.
//!
//! Every frame is printed with Unicode half blocks, two pixel rows per text
//! line, inside a box border:
//!
//! ```text
//! +--------------------------------+
//! |▀█▀ █ █ ▀█▀                     |
//! +--------------------------------+
//! ```

use std::io::{self, Stdout, Write};

use embedded_graphics::prelude::Size;
use log::info;

use super::{DeviceError, DisplayDevice, check_frame_size};
use crate::framebuffer::Framebuffer;

/// Prints frames to a writer (stdout by default).
pub struct ConsoleDisplay<W = Stdout> {
    out: W,
    size: Size,
}

impl ConsoleDisplay<Stdout> {
    /// Console display on the process stdout.
    pub fn stdout(size: Size) -> Self { Self::new(io::stdout(), size) }
}

impl<W: Write> ConsoleDisplay<W> {
    /// Console display on any writer.
    pub const fn new(
        out: W,
        size: Size,
    ) -> Self {
        Self { out, size }
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W { self.out }

    fn border(&self) -> String {
        let mut line = String::with_capacity(self.size.width as usize + 3);
        line.push('+');
        line.extend(std::iter::repeat_n('-', self.size.width as usize));
        line.push_str("+\n");
        line
    }

    fn draw(
        &mut self,
        frame: Option<&Framebuffer>,
    ) -> io::Result<()> {
        let mut text = self.border();
        for y in (0..self.size.height).step_by(2) {
            text.push('|');
            for x in 0..self.size.width {
                let (top, bottom) = frame.map_or((false, false), |f| (f.pixel(x, y).is_on(), f.pixel(x, y + 1).is_on()));
                text.push(match (top, bottom) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                });
            }
            text.push_str("|\n");
        }
        text.push_str(&self.border());

        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }
}

impl<W: Write + Send> DisplayDevice for ConsoleDisplay<W> {
    fn initialize(&mut self) -> Result<(), DeviceError> {
        info!("Console display ready ({}x{})", self.size.width, self.size.height);
        Ok(())
    }

    fn push_frame(
        &mut self,
        frame: &Framebuffer,
    ) -> Result<(), DeviceError> {
        check_frame_size(self.size, frame)?;
        self.draw(Some(frame))?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DeviceError> {
        self.draw(None)?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use embedded_graphics::pixelcolor::BinaryColor;
    use embedded_graphics::prelude::*;

    use super::*;

    #[test]
    fn test_frame_is_drawn_with_half_blocks() {
        let size = Size::new(4, 4);
        let mut frame = Framebuffer::new(size);
        frame
            .draw_iter([
                Pixel(Point::new(0, 0), BinaryColor::On),
                Pixel(Point::new(1, 1), BinaryColor::On),
                Pixel(Point::new(2, 0), BinaryColor::On),
                Pixel(Point::new(2, 1), BinaryColor::On),
            ])
            .ok();

        let mut display = ConsoleDisplay::new(Vec::new(), size);
        display.initialize().unwrap();
        display.push_frame(&frame).unwrap();

        let text = String::from_utf8(display.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, ["+----+", "|▀▄█ |", "|    |", "+----+"]);
    }

    #[test]
    fn test_clear_prints_blank_frame() {
        let mut display = ConsoleDisplay::new(Vec::new(), Size::new(2, 2));
        display.clear().unwrap();
        let text = String::from_utf8(display.into_inner()).unwrap();
        assert_eq!(text, "+--+\n|  |\n+--+\n");
    }

    #[test]
    fn test_wrong_frame_size_rejected() {
        let mut display = ConsoleDisplay::new(Vec::new(), Size::new(8, 8));
        let result = display.push_frame(&Framebuffer::new(Size::new(4, 4)));
        assert!(matches!(result, Err(DeviceError::FrameSize { .. })));
    }
}
