//! 8×8 bitmap glyphs for the simplified math renderer.
//!
//! Lookup order: the math symbols below (absent from font8x8), then
//! font8x8's Basic Latin, Latin-1 and Greek tables. Each glyph is eight rows
//! of eight bits; bit 0 is the leftmost pixel. Row 6 is the last row above
//! the baseline, row 7 holds descenders.

use font8x8::{UnicodeFonts, BASIC_FONTS, GREEK_FONTS, LATIN_FONTS};

/// Rows of the cell that sit above the baseline.
pub const ASCENT_ROWS: u32 = 7;
/// Rows of the cell that sit below the baseline.
pub const DESCENT_ROWS: u32 = 1;
/// Cell width and height in font units.
pub const CELL: u32 = 8;

const MATH_GLYPHS: &[(char, [u8; 8])] = &[
    ('∞', [0x00, 0x00, 0x66, 0x99, 0x99, 0x66, 0x00, 0x00]),
    ('≤', [0x30, 0x0C, 0x03, 0x0C, 0x30, 0x00, 0x3F, 0x00]),
    ('≥', [0x03, 0x0C, 0x30, 0x0C, 0x03, 0x00, 0x3F, 0x00]),
    ('≠', [0x10, 0x3F, 0x08, 0x3F, 0x04, 0x00, 0x00, 0x00]),
    ('≈', [0x00, 0x4E, 0x39, 0x00, 0x4E, 0x39, 0x00, 0x00]),
    ('≡', [0x00, 0x3F, 0x00, 0x3F, 0x00, 0x3F, 0x00, 0x00]),
    ('→', [0x00, 0x10, 0x20, 0x7F, 0x20, 0x10, 0x00, 0x00]),
    ('←', [0x00, 0x04, 0x02, 0x7F, 0x02, 0x04, 0x00, 0x00]),
    ('⇒', [0x00, 0x10, 0x3F, 0x40, 0x3F, 0x10, 0x00, 0x00]),
    ('∫', [0x30, 0x48, 0x08, 0x08, 0x08, 0x08, 0x09, 0x06]),
    ('∂', [0x1C, 0x20, 0x3C, 0x22, 0x22, 0x1C, 0x00, 0x00]),
    ('∇', [0x7F, 0x22, 0x22, 0x14, 0x14, 0x08, 0x00, 0x00]),
    ('∈', [0x3C, 0x02, 0x01, 0x3F, 0x01, 0x02, 0x3C, 0x00]),
    ('∓', [0x3F, 0x00, 0x0C, 0x0C, 0x3F, 0x0C, 0x0C, 0x00]),
];

/// Bitmap for `c`, if the renderer can draw it.
pub fn glyph(c: char) -> Option<[u8; 8]> {
    if let Some((_, bitmap)) = MATH_GLYPHS.iter().find(|(g, _)| *g == c) {
        return Some(*bitmap);
    }
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| GREEK_FONTS.get(c))
}

/// Whether `c` has a glyph.
pub fn is_drawable(c: char) -> bool {
    glyph(c).is_some()
}
