/// Material legend: one colour swatch and name per catalog material
use crate::catalog::Material;
use crate::text::TextRenderer;
use constants::render_settings::{BACKGROUND_COLOUR, BASE_TEXT_SCALE, FOREGROUND_COLOUR};
use image::{Rgb, RgbImage};

const LEFT_MARGIN: u32 = 15;
const RIGHT_MARGIN: u32 = 10;
const TOP_MARGIN: u32 = 15;
const BOTTOM_MARGIN: u32 = 15;
/// Gap between rows and between swatch and name
const GAP: u32 = 5;

/// Draw the legend for `materials` in the given order
pub fn render_legend(materials: &[Material], font: &dyn TextRenderer) -> RgbImage {
    let line = font.line_height(BASE_TEXT_SCALE).ceil() as u32;
    let max_width = materials
        .iter()
        .map(|m| font.text_width(&m.name, BASE_TEXT_SCALE))
        .fold(0.0f32, f32::max)
        .ceil() as u32;
    let count = materials.len() as u32;

    let width = LEFT_MARGIN + line + GAP + max_width + RIGHT_MARGIN;
    let height = TOP_MARGIN + count.saturating_sub(1) * GAP + count * line + BOTTOM_MARGIN;
    let mut image = RgbImage::from_pixel(width, height, Rgb(BACKGROUND_COLOUR));

    let text_x = (LEFT_MARGIN + line + GAP) as f32;
    let mut y = TOP_MARGIN;
    for material in materials {
        for py in y..y + line {
            for px in LEFT_MARGIN..LEFT_MARGIN + line {
                image.put_pixel(px, py, Rgb(material.colour));
            }
        }
        font.draw(
            &mut image,
            text_x,
            y as f32,
            &material.name,
            BASE_TEXT_SCALE,
            FOREGROUND_COLOUR,
            false,
        );
        y += line + GAP;
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::test_catalog;
    use crate::text::BitmapFont;

    #[test]
    fn test_legend_has_a_swatch_per_material() {
        let catalog = test_catalog();
        let materials = catalog.materials();
        let image = render_legend(materials, &BitmapFont);
        let line = BitmapFont.line_height(BASE_TEXT_SCALE).ceil() as u32;

        let expected_height = TOP_MARGIN + (materials.len() as u32 - 1) * GAP + materials.len() as u32 * line + BOTTOM_MARGIN;
        assert_eq!(image.height(), expected_height);

        for (i, material) in materials.iter().enumerate() {
            let y = TOP_MARGIN + i as u32 * (line + GAP) + line / 2;
            assert_eq!(image.get_pixel(LEFT_MARGIN + 1, y).0, material.colour);
        }
        assert_eq!(image.get_pixel(0, 0).0, BACKGROUND_COLOUR);
        assert!(image.pixels().any(|p| p.0 == FOREGROUND_COLOUR));
    }

    #[test]
    fn test_empty_legend_is_margins_only() {
        let image = render_legend(&[], &BitmapFont);
        assert_eq!(image.height(), TOP_MARGIN + BOTTOM_MARGIN);
    }
}
