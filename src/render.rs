//! Text layout and frame composition for a render pass.
//!
//! A render pass turns the pending lines into a [`Framebuffer`]:
//!
//! 1. [`Layout::from_lines`] keeps the first [`MAX_LINES`] lines and truncates
//!    each to [`LINE_WIDTH`] characters (chars, not pixels), then strips
//!    whitespace from both ends of what is left (a `\r` from a `\r\n` split too).
//! 2. [`Renderer::compose`] blanks its framebuffer and draws every surviving
//!    line left-aligned at `y = line_index * glyph_height`.
//!
//! Text wider than the panel is clipped by the framebuffer. No wrapping.
//!
//! # Layout
//!
//! ```text
//! y = 0   | Waiting for a client        |
//! y = 8   | at 127.0.0.1                |
//! y = 16  |                             |
//! ...       (up to 8 lines with 5x8)
//! ```

use embedded_graphics::prelude::*;
use embedded_graphics::text::Text;
use heapless::{String, Vec};

use crate::config::{LINE_CAPACITY, LINE_WIDTH, MAX_LINES};
use crate::framebuffer::Framebuffer;
use crate::styles::{FontChoice, LINE_STYLE};

// =============================================================================
// Layout
// =============================================================================

/// One laid-out line: at most [`LINE_WIDTH`] characters.
pub type Line = String<LINE_CAPACITY>;

/// Lines that survive truncation, in display order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Layout {
    lines: Vec<Line, MAX_LINES>,
}

impl Layout {
    /// Lay out arbitrary lines, dropping whatever does not fit.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut laid_out = Vec::new();
        for line in lines.iter().take(MAX_LINES) {
            // Cannot fail: at most MAX_LINES items are taken
            laid_out.push(truncate_line(line.as_ref())).ok();
        }
        Self { lines: laid_out }
    }

    /// Iterate over the laid-out lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> { self.lines.iter().map(|line| line.as_str()) }

    /// Number of lines that will be drawn.
    #[inline]
    pub fn len(&self) -> usize { self.lines.len() }

    /// True if nothing will be drawn.
    #[inline]
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
}

/// Cut a line to [`LINE_WIDTH`] characters, then strip whitespace at both ends.
fn truncate_line(line: &str) -> Line {
    let end = line.char_indices().nth(LINE_WIDTH).map_or(line.len(), |(i, _)| i);
    let mut out = Line::new();
    for c in line[..end].trim().chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

// =============================================================================
// Renderer
// =============================================================================

/// Composes layouts into a framebuffer owned by the render worker.
pub struct Renderer {
    font: FontChoice,
    glyph_height: u32,
    framebuffer: Framebuffer,
}

impl Renderer {
    /// Create a renderer for a panel of the given size.
    ///
    /// Glyph metrics are read here, once, and reused by every render pass.
    pub fn new(
        font: FontChoice,
        size: Size,
    ) -> Self {
        Self {
            font,
            glyph_height: font.glyph_height(),
            framebuffer: Framebuffer::new(size),
        }
    }

    /// Vertical offset of a line's top edge.
    #[inline]
    pub const fn line_offset(
        &self,
        line_index: usize,
    ) -> i32 {
        (line_index as u32 * self.glyph_height) as i32
    }

    /// Blank the framebuffer and draw the layout into it.
    pub fn compose(
        &mut self,
        layout: &Layout,
    ) -> &Framebuffer {
        self.framebuffer.clear_buffer();

        let style = self.font.text_style();
        for (index, line) in layout.lines().enumerate() {
            let position = Point::new(0, self.line_offset(index));
            Text::with_text_style(line, position, style, LINE_STYLE)
                .draw(&mut self.framebuffer)
                .ok();
        }

        &self.framebuffer
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SCREEN_HEIGHT, SCREEN_WIDTH};

    fn renderer() -> Renderer { Renderer::new(FontChoice::Font5x8, Size::new(SCREEN_WIDTH, SCREEN_HEIGHT)) }

    #[test]
    fn test_layout_passes_short_lines_through() {
        let layout = Layout::from_lines(&["a", "b", "c"]);
        assert_eq!(layout.lines().collect::<std::vec::Vec<_>>(), ["a", "b", "c"]);
    }

    #[test]
    fn test_layout_truncates_each_line_to_width() {
        let long = "0123456789".repeat(5);
        let layout = Layout::from_lines(&[long.as_str(), "short"]);
        let lines: std::vec::Vec<_> = layout.lines().collect();
        assert_eq!(lines[0], &long[..LINE_WIDTH]);
        assert_eq!(lines[0].chars().count(), 32);
        assert_eq!(lines[1], "short");
    }

    #[test]
    fn test_layout_counts_characters_not_bytes() {
        let wide = "é".repeat(40);
        let layout = Layout::from_lines(&[wide]);
        let line = layout.lines().next().unwrap();
        assert_eq!(line.chars().count(), LINE_WIDTH);
        assert_eq!(line.len(), LINE_WIDTH * 2);
    }

    #[test]
    fn test_layout_drops_lines_past_max() {
        let lines: std::vec::Vec<std::string::String> = (0..12).map(|i| format!("line {i}")).collect();
        let layout = Layout::from_lines(&lines);
        assert_eq!(layout.len(), MAX_LINES);
        assert_eq!(layout.lines().last(), Some("line 7"));
    }

    #[test]
    fn test_layout_strips_whitespace_at_both_ends() {
        let layout = Layout::from_lines(&["x\r", "  indented  ", "\t   hi  ", "   "]);
        let lines: std::vec::Vec<_> = layout.lines().collect();
        assert_eq!(lines, ["x", "indented", "hi", ""]);
    }

    #[test]
    fn test_layout_cuts_before_stripping() {
        // Leading blanks count toward the width limit
        let padded = format!("{}{}", " ".repeat(30), "abcdef");
        let layout = Layout::from_lines(&[padded.as_str()]);
        assert_eq!(layout.lines().next(), Some("ab"));
    }

    #[test]
    fn test_empty_layout() {
        let layout = Layout::from_lines::<&str>(&[]);
        assert!(layout.is_empty());
        let mut renderer = renderer();
        assert!(renderer.compose(&layout).is_blank());
    }

    #[test]
    fn test_compose_places_lines_by_glyph_height() {
        let mut renderer = renderer();
        assert_eq!(renderer.line_offset(1), 8);
        assert_eq!(renderer.line_offset(3), 24);

        let frame = renderer.compose(&Layout::from_lines(&["", "", "", "XXXX"]));
        assert!(!frame.any_lit_in_rows(0..24));
        assert!(frame.any_lit_in_rows(24..32));
        assert!(!frame.any_lit_in_rows(32..64));
    }

    #[test]
    fn test_compose_clears_previous_frame() {
        let mut renderer = renderer();
        renderer.compose(&Layout::from_lines(&["first", "second"]));
        let frame = renderer.compose(&Layout::from_lines(&["", "x"]));
        assert!(!frame.any_lit_in_rows(0..8));
        assert!(frame.any_lit_in_rows(8..16));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let mut a = renderer();
        let mut b = renderer();
        let layout = Layout::from_lines(&["Hello", "World"]);
        assert_eq!(a.compose(&layout), b.compose(&layout));
    }
}
