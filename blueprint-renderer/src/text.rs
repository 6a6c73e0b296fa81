//! Text measurement and drawing for the info panel and legend.
//!
//! Layout only depends on the [`TextRenderer`] metrics, so a TrueType font loaded
//! through `ab_glyph` and the built-in bitmap font are interchangeable.

use crate::error::AssetError;
use ab_glyph::{Font, FontArc, Glyph, PxScale, ScaleFont, point};
use image::RgbImage;
use std::fs;
use std::path::Path;

pub trait TextRenderer: Send + Sync {
    /// Horizontal advance of `text` in pixels
    fn text_width(&self, text: &str, scale: f32) -> f32;

    /// Ascent and descent in pixels, both positive
    fn metrics(&self, scale: f32) -> (f32, f32);

    /// Draw `text` with its top-left corner at (x, y). `emphasized` renders a heavier weight.
    fn draw(
        &self,
        image: &mut RgbImage,
        x: f32,
        y: f32,
        text: &str,
        scale: f32,
        colour: [u8; 3],
        emphasized: bool,
    );

    fn line_height(&self, scale: f32) -> f32 {
        let (ascent, descent) = self.metrics(scale);
        ascent + descent
    }
}

fn blend_pixel(image: &mut RgbImage, x: i64, y: i64, colour: [u8; 3], coverage: f32) {
    if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 || coverage <= 0.0 {
        return;
    }
    let pixel = image.get_pixel_mut(x as u32, y as u32);
    let a = coverage.min(1.0);
    for (dst, src) in pixel.0.iter_mut().zip(colour) {
        *dst = (*dst as f32 * (1.0 - a) + src as f32 * a).round() as u8;
    }
}

/// Any TrueType/OpenType font.
pub struct GlyphFont {
    font: FontArc,
}

impl GlyphFont {
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let bytes = fs::read(path).map_err(|source| AssetError::FontIo {
            path: path.to_path_buf(),
            source,
        })?;
        let font = FontArc::try_from_vec(bytes).map_err(|_| AssetError::InvalidFont(path.to_path_buf()))?;
        Ok(Self { font })
    }

    fn draw_pass(&self, image: &mut RgbImage, x: f32, y: f32, text: &str, scale: f32, colour: [u8; 3]) {
        let px = PxScale::from(scale);
        let scaled = self.font.as_scaled(px);
        let baseline = y + scaled.ascent();
        let mut pen_x = x;
        let mut prev = None;
        for ch in text.chars() {
            let id = self.font.glyph_id(ch);
            if let Some(p) = prev {
                pen_x += scaled.kern(p, id);
            }
            let glyph = Glyph {
                id,
                scale: px,
                position: point(pen_x, baseline),
            };
            if let Some(outline) = self.font.outline_glyph(glyph) {
                let bounds = outline.px_bounds();
                outline.draw(|gx, gy, v| {
                    blend_pixel(
                        image,
                        bounds.min.x as i64 + gx as i64,
                        bounds.min.y as i64 + gy as i64,
                        colour,
                        v,
                    );
                });
            }
            pen_x += scaled.h_advance(id);
            prev = Some(id);
        }
    }
}

impl TextRenderer for GlyphFont {
    fn text_width(&self, text: &str, scale: f32) -> f32 {
        let scaled = self.font.as_scaled(PxScale::from(scale));
        let mut width = 0.0;
        let mut prev = None;
        for ch in text.chars() {
            let id = self.font.glyph_id(ch);
            if let Some(p) = prev {
                width += scaled.kern(p, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        width
    }

    fn metrics(&self, scale: f32) -> (f32, f32) {
        let scaled = self.font.as_scaled(PxScale::from(scale));
        (scaled.ascent(), -scaled.descent())
    }

    fn draw(
        &self,
        image: &mut RgbImage,
        x: f32,
        y: f32,
        text: &str,
        scale: f32,
        colour: [u8; 3],
        emphasized: bool,
    ) {
        self.draw_pass(image, x, y, text, scale, colour);
        if emphasized {
            // Overstrike for a bold weight.
            self.draw_pass(image, x + (scale / 30.0).max(1.0), y, text, scale, colour);
        }
    }
}

const GLYPH_COLS: usize = 5;
const GLYPH_ROWS: usize = 7;
/// Blank units after each glyph
const GLYPH_SPACING: usize = 1;
const DESCENT_UNITS: usize = 2;

/// 5x7 capitals, digits and the punctuation used by info lines
const BITMAP_GLYPHS: &[(char, [u8; GLYPH_ROWS])] = &[
    ('A', [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001]),
    ('B', [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110]),
    ('C', [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110]),
    ('D', [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100]),
    ('E', [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111]),
    ('F', [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000]),
    ('G', [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111]),
    ('H', [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001]),
    ('I', [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110]),
    ('J', [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100]),
    ('K', [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001]),
    ('L', [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111]),
    ('M', [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001]),
    ('N', [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001]),
    ('O', [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110]),
    ('P', [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000]),
    ('Q', [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101]),
    ('R', [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001]),
    ('S', [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110]),
    ('T', [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100]),
    ('U', [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110]),
    ('V', [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100]),
    ('W', [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010]),
    ('X', [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001]),
    ('Y', [0b10001, 0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100]),
    ('Z', [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111]),
    ('0', [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110]),
    ('1', [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110]),
    ('2', [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111]),
    ('3', [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110]),
    ('4', [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010]),
    ('5', [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110]),
    ('6', [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110]),
    ('7', [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000]),
    ('8', [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110]),
    ('9', [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100]),
    (':', [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000]),
    (',', [0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b00100, 0b01000]),
    ('.', [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100]),
    ('-', [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000]),
    ('+', [0b00000, 0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0b00000]),
    ('?', [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b00000, 0b00100]),
    ('!', [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000, 0b00100]),
    ('\'', [0b01100, 0b00100, 0b01000, 0b00000, 0b00000, 0b00000, 0b00000]),
    ('(', [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010]),
    (')', [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000]),
    ('_', [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b11111]),
    ('/', [0b00000, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b00000]),
    (' ', [0; GLYPH_ROWS]),
];

const BLANK_GLYPH: [u8; GLYPH_ROWS] = [0; GLYPH_ROWS];

/// Built-in fallback font, lowercase drawn as capitals and unknown characters as `?`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitmapFont;

impl BitmapFont {
    fn glyph(ch: char) -> &'static [u8; GLYPH_ROWS] {
        let find = |c: char| BITMAP_GLYPHS.iter().find(|(k, _)| *k == c).map(|(_, rows)| rows);
        find(ch.to_ascii_uppercase())
            .or_else(|| find('?'))
            .unwrap_or(&BLANK_GLYPH)
    }

    /// Pixel size of one glyph unit
    fn unit(scale: f32) -> f32 {
        scale / (GLYPH_ROWS + DESCENT_UNITS) as f32
    }
}

impl TextRenderer for BitmapFont {
    fn text_width(&self, text: &str, scale: f32) -> f32 {
        text.chars().count() as f32 * (GLYPH_COLS + GLYPH_SPACING) as f32 * Self::unit(scale)
    }

    fn metrics(&self, scale: f32) -> (f32, f32) {
        let unit = Self::unit(scale);
        (GLYPH_ROWS as f32 * unit, DESCENT_UNITS as f32 * unit)
    }

    fn draw(
        &self,
        image: &mut RgbImage,
        x: f32,
        y: f32,
        text: &str,
        scale: f32,
        colour: [u8; 3],
        emphasized: bool,
    ) {
        let unit = Self::unit(scale);
        let extra = if emphasized { unit.max(1.0) * 0.5 } else { 0.0 };
        for (i, ch) in text.chars().enumerate() {
            let left = x + (i * (GLYPH_COLS + GLYPH_SPACING)) as f32 * unit;
            for (row, bits) in Self::glyph(ch).iter().enumerate() {
                for col in 0..GLYPH_COLS {
                    if bits & (1 << (GLYPH_COLS - 1 - col)) == 0 {
                        continue;
                    }
                    let x0 = (left + col as f32 * unit).round() as i64;
                    let x1 = (left + (col + 1) as f32 * unit + extra).round() as i64;
                    let y0 = (y + row as f32 * unit).round() as i64;
                    let y1 = (y + (row + 1) as f32 * unit).round() as i64;
                    for py in y0..y1.max(y0 + 1) {
                        for px in x0..x1.max(x0 + 1) {
                            blend_pixel(image, px, py, colour, 1.0);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_bitmap_metrics_scale_linearly() {
        let font = BitmapFont;
        assert_eq!(font.line_height(18.0), 18.0);
        assert_eq!(font.text_width("AB", 9.0), 12.0);
        assert_eq!(font.text_width("AB", 18.0), 2.0 * font.text_width("AB", 9.0));
    }

    #[test]
    fn test_bitmap_lowercase_and_unknown() {
        assert_eq!(BitmapFont::glyph('a'), BitmapFont::glyph('A'));
        assert_eq!(BitmapFont::glyph('~'), BitmapFont::glyph('?'));
        assert_ne!(BitmapFont::glyph('B'), BitmapFont::glyph('?'));
    }

    #[test]
    fn test_bitmap_draw_marks_pixels() {
        let mut image = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        BitmapFont.draw(&mut image, 0.0, 0.0, "I", 9.0, [255, 255, 255], false);
        // top bar of the I spans columns 1..4 of the first row
        assert_eq!(image.get_pixel(1, 0).0, [255, 255, 255]);
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0]);
        // stem
        assert_eq!(image.get_pixel(2, 3).0, [255, 255, 255]);
        assert_eq!(image.get_pixel(4, 3).0, [0, 0, 0]);
    }

    #[test]
    fn test_emphasized_is_heavier() {
        let count = |emphasized| {
            let mut image = RgbImage::from_pixel(60, 30, Rgb([0, 0, 0]));
            BitmapFont.draw(&mut image, 0.0, 0.0, "HI", 18.0, [255, 255, 255], emphasized);
            image.pixels().filter(|p| p.0 == [255, 255, 255]).count()
        };
        assert!(count(true) > count(false));
    }

    #[test]
    fn test_missing_font_file_is_reported() {
        let err = GlyphFont::load(Path::new("/nonexistent/font.ttf")).err();
        assert!(matches!(err, Some(AssetError::FontIo { .. })));
    }
}
