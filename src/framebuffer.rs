//! In-memory 1-bit framebuffer in SSD1306 page layout.
//!
//! The buffer is what a render pass composes and what a device receives. Pixels
//! are packed the way the panel's GDDRAM expects them: the screen is split into
//! horizontal pages of [`PAGE_HEIGHT`] rows, each byte holds one column of a
//! page, least significant bit at the top.
//!
//! ```text
//! byte index = (y / 8) * width + x
//! bit        = y % 8
//! ```
//!
//! [`Framebuffer`] implements `DrawTarget`, so any embedded-graphics drawable
//! (mono font text in particular) can be drawn straight into it.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use crate::config::PAGE_HEIGHT;

/// Monochrome framebuffer, page-packed.
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    buffer: Vec<u8>,
}

impl Framebuffer {
    /// Create a blank framebuffer. Height is rounded up to a whole page internally.
    pub fn new(size: Size) -> Self {
        let pages = size.height.div_ceil(PAGE_HEIGHT);
        Self {
            width: size.width,
            height: size.height,
            buffer: vec![0u8; (pages * size.width) as usize],
        }
    }

    /// Blank every pixel.
    #[inline]
    pub fn clear_buffer(&mut self) { self.buffer.fill(0); }

    /// Read one pixel. Out-of-bounds reads are `Off`.
    pub fn pixel(
        &self,
        x: u32,
        y: u32,
    ) -> BinaryColor {
        if x >= self.width || y >= self.height {
            return BinaryColor::Off;
        }
        let (idx, bit) = self.locate(x, y);
        BinaryColor::from(self.buffer[idx] & bit != 0)
    }

    /// Number of lit pixels.
    pub fn lit_pixels(&self) -> usize { self.buffer.iter().map(|b| b.count_ones() as usize).sum() }

    /// True if no pixel is lit.
    #[cfg(test)]
    pub fn is_blank(&self) -> bool { self.buffer.iter().all(|b| *b == 0) }

    /// True if any pixel in the given row band is lit.
    #[cfg(test)]
    pub fn any_lit_in_rows(
        &self,
        rows: core::ops::Range<u32>,
    ) -> bool {
        rows.into_iter()
            .any(|y| (0..self.width).any(|x| self.pixel(x, y).is_on()))
    }

    /// Every pixel as an embedded-graphics `Pixel`, row by row.
    pub fn pixels(&self) -> impl Iterator<Item = Pixel<BinaryColor>> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width).map(move |x| Pixel(Point::new(x as i32, y as i32), self.pixel(x, y)))
        })
    }

    #[inline]
    fn locate(
        &self,
        x: u32,
        y: u32,
    ) -> (usize, u8) {
        let idx = ((y / PAGE_HEIGHT) * self.width + x) as usize;
        (idx, 1 << (y % PAGE_HEIGHT))
    }

    /// Set a pixel in the framebuffer, ignoring anything off-screen.
    #[inline]
    fn set_pixel(
        &mut self,
        x: i32,
        y: i32,
        color: BinaryColor,
    ) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        let (idx, bit) = self.locate(x as u32, y as u32);
        if color.is_on() {
            self.buffer[idx] |= bit;
        } else {
            self.buffer[idx] &= !bit;
        }
    }
}

impl core::fmt::Debug for Framebuffer {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        f.debug_struct("Framebuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("lit_pixels", &self.lit_pixels())
            .finish()
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size { Size::new(self.width, self.height) }
}

impl DrawTarget for Framebuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(
        &mut self,
        pixels: I,
    ) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point.x, point.y, color);
        }
        Ok(())
    }

    fn fill_solid(
        &mut self,
        area: &Rectangle,
        color: Self::Color,
    ) -> Result<(), Self::Error> {
        let drawable_area = area.intersection(&self.bounding_box());
        if drawable_area.size == Size::zero() {
            return Ok(());
        }
        for y in drawable_area.rows() {
            for x in drawable_area.columns() {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }

    fn clear(
        &mut self,
        color: Self::Color,
    ) -> Result<(), Self::Error> {
        if color.is_on() {
            // Padding rows of a partial last page must stay dark
            return self.fill_solid(&self.bounding_box(), color);
        }
        self.buffer.fill(0);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
