//! Font selection and pre-computed text styles.
//!
//! Every font offered here is monospaced, so line width in pixels is simply
//! `chars * character_size.width` and line pitch is `character_size.height`.
//! The glyph metrics are read once when the renderer is built.
//!
//! | Name       | Glyph | Lines on 64px | Chars on 128px |
//! |------------|-------|---------------|----------------|
//! | `5x8`      | 5x8   | 8             | 25             |
//! | `6x10`     | 6x10  | 6             | 21             |
//! | `profont7` | 5x9   | 7             | 25             |

use std::fmt;
use std::str::FromStr;

use embedded_graphics::mono_font::ascii::{FONT_5X8, FONT_6X10};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::text::{Alignment, Baseline, TextStyle, TextStyleBuilder};
use profont::PROFONT_7_POINT;
use serde::Deserialize;

// =============================================================================
// Text Alignment Styles (const - zero runtime cost)
// =============================================================================

/// Left-aligned text positioned by its top edge, so `y = line * glyph_height`.
pub const LINE_STYLE: TextStyle = TextStyleBuilder::new()
    .alignment(Alignment::Left)
    .baseline(Baseline::Top)
    .build();

// =============================================================================
// Font Choice
// =============================================================================

/// Monospaced font used for every line of the display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum FontChoice {
    /// 5x8 ASCII font. Fits exactly eight lines on a 64px panel.
    #[default]
    #[serde(rename = "5x8")]
    Font5x8,
    /// 6x10 ASCII font.
    #[serde(rename = "6x10")]
    Font6x10,
    /// `ProFont` 7pt.
    #[serde(rename = "profont7")]
    ProFont7,
}

impl FontChoice {
    /// All selectable fonts, in documentation order.
    pub const ALL: [Self; 3] = [Self::Font5x8, Self::Font6x10, Self::ProFont7];

    /// The embedded-graphics font backing this choice.
    pub const fn font(self) -> &'static MonoFont<'static> {
        match self {
            Self::Font5x8 => &FONT_5X8,
            Self::Font6x10 => &FONT_6X10,
            Self::ProFont7 => &PROFONT_7_POINT,
        }
    }

    /// Name used in configuration files and on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Font5x8 => "5x8",
            Self::Font6x10 => "6x10",
            Self::ProFont7 => "profont7",
        }
    }

    /// Lit-pixel text style for this font.
    pub const fn text_style(self) -> MonoTextStyle<'static, BinaryColor> { MonoTextStyle::new(self.font(), BinaryColor::On) }

    /// Height of one glyph cell in pixels, used as the line pitch.
    pub const fn glyph_height(self) -> u32 { self.font().character_size.height }
}

impl fmt::Display for FontChoice {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FontChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|font| font.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown font '{s}' (expected one of: 5x8, 6x10, profont7)"))
    }
}

// =============================================================================
// Tests
// =============================================================================
