/// Info panel layout: scale the `key: value` lines to the panel width
use crate::info::InfoRecord;
use crate::text::TextRenderer;
use constants::render_settings::{
    BACKGROUND_COLOUR, BASE_TEXT_SCALE, FOREGROUND_COLOUR, MAX_LINE_SPACE, MIN_LINE_SPACE, MIN_TEXT_SCALE,
};
use image::{Rgb, RgbImage};

/// Resolved panel geometry, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelLayout {
    pub width: u32,
    pub height: u32,
    pub scale: f32,
    pub padding: f32,
    pub line_space: f32,
    pub text_height: f32,
}

/// Fit the longest line into `target_width`, widening the panel when the text would
/// drop below the minimum scale
pub fn layout_panel(record: &InfoRecord, target_width: u32, font: &dyn TextRenderer) -> PanelLayout {
    let lines = record.lines();
    let n = lines.len().max(1) as f32;

    let max_length = lines
        .iter()
        .map(|l| font.text_width(l, BASE_TEXT_SCALE))
        .fold(0.0f32, f32::max);
    let length_padded = (max_length + font.line_height(BASE_TEXT_SCALE)).max(1.0);

    let mut width = target_width;
    let mut height = target_width as f32;

    let mut scale = (width as f32 / length_padded * BASE_TEXT_SCALE).floor();
    if scale < MIN_TEXT_SCALE {
        scale = MIN_TEXT_SCALE;
        width = (scale / BASE_TEXT_SCALE * length_padded) as u32;
    }

    let text_height = font.line_height(scale);
    let padding = (text_height * 0.5).floor();
    let line_space = ((height - n * text_height) / (n + 1.0))
        .clamp(text_height * MIN_LINE_SPACE, text_height * MAX_LINE_SPACE);
    height = height.max((n * (text_height + line_space) + line_space).floor());

    PanelLayout {
        width: width.max(1),
        height: (height as u32).max(1),
        scale,
        padding,
        line_space,
        text_height,
    }
}

/// Draw the info panel, or the "Error" placeholder when no record is available
pub fn render_info_panel(record: Option<&InfoRecord>, target_width: u32, font: &dyn TextRenderer) -> RgbImage {
    let Some(record) = record else {
        return render_error_panel(target_width, font);
    };

    let layout = layout_panel(record, target_width, font);
    let mut image = RgbImage::from_pixel(layout.width, layout.height, Rgb(BACKGROUND_COLOUR));

    let mut y = layout.line_space;
    for (key, value) in &record.entries {
        let key_text = format!("{key}: ");
        font.draw(&mut image, layout.padding, y, &key_text, layout.scale, FOREGROUND_COLOUR, true);
        let value_x = layout.padding + font.text_width(&key_text, layout.scale);
        font.draw(&mut image, value_x, y, value, layout.scale, FOREGROUND_COLOUR, false);
        y += layout.line_space + layout.text_height;
    }
    image
}

const ERROR_TEXT: &str = "Error";

/// Square panel with a single "Error" line, padded when there is room
pub fn render_error_panel(target_width: u32, font: &dyn TextRenderer) -> RgbImage {
    let length = font.text_width(ERROR_TEXT, BASE_TEXT_SCALE).max(1.0);
    let mut padding_factor = 2.0;
    let mut scale = (target_width as f32 / (padding_factor * length) * BASE_TEXT_SCALE).floor();
    if scale < MIN_TEXT_SCALE {
        padding_factor = 1.0;
        scale = MIN_TEXT_SCALE.max((target_width as f32 / length * BASE_TEXT_SCALE).floor());
    }
    let width = target_width.max((scale / BASE_TEXT_SCALE * length) as u32).max(1);

    let mut image = RgbImage::from_pixel(width, width, Rgb(BACKGROUND_COLOUR));
    let x = (width as f32 * (padding_factor - 1.0) / 4.0).floor();
    let y = (width / 2) as f32 - font.line_height(scale) / 2.0;
    font.draw(&mut image, x, y, ERROR_TEXT, scale, FOREGROUND_COLOUR, false);
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::BitmapFont;

    fn record() -> InfoRecord {
        InfoRecord {
            entries: vec![
                ("Name".to_string(), "Test Craft".to_string()),
                ("Blocks".to_string(), "1,200".to_string()),
                ("Cost".to_string(), "?".to_string()),
                ("Size".to_string(), "W:3 H:4 L:10".to_string()),
                ("Author".to_string(), "Unknown".to_string()),
            ],
            game_version: None,
        }
    }

    fn white_pixels(image: &RgbImage) -> usize {
        image.pixels().filter(|p| p.0 == FOREGROUND_COLOUR).count()
    }

    #[test]
    fn test_wide_target_keeps_width_and_scales_up() {
        let layout = layout_panel(&record(), 600, &BitmapFont);
        assert_eq!(layout.width, 600);
        assert!(layout.scale > BASE_TEXT_SCALE);
        assert!(layout.height >= 600);
        assert!(layout.line_space >= layout.text_height * MIN_LINE_SPACE);
        assert!(layout.line_space <= layout.text_height * MAX_LINE_SPACE);
    }

    #[test]
    fn test_narrow_target_clamps_scale_and_widens() {
        let layout = layout_panel(&record(), 40, &BitmapFont);
        assert_eq!(layout.scale, MIN_TEXT_SCALE);
        assert!(layout.width > 40);
        // the longest line plus padding fits
        let longest = BitmapFont.text_width("Size: W:3 H:4 L:10", MIN_TEXT_SCALE);
        assert!(layout.width as f32 >= longest);
        // the panel grows to hold all lines
        let needed = 5.0 * (layout.text_height + layout.line_space) + layout.line_space;
        assert!(layout.height as f32 >= needed.floor());
    }

    #[test]
    fn test_panel_has_text() {
        let image = render_info_panel(Some(&record()), 300, &BitmapFont);
        assert_eq!(image.width(), 300);
        assert!(white_pixels(&image) > 0);
        assert_eq!(image.get_pixel(image.width() - 1, image.height() - 1).0, BACKGROUND_COLOUR);
    }

    #[test]
    fn test_missing_record_gives_error_panel() {
        let image = render_info_panel(None, 120, &BitmapFont);
        assert_eq!(image.dimensions(), (120, 120));
        assert!(white_pixels(&image) > 0);
    }

    #[test]
    fn test_tiny_error_panel_widens() {
        let image = render_error_panel(10, &BitmapFont);
        assert!(image.width() > 10);
        assert_eq!(image.width(), image.height());
    }
}
