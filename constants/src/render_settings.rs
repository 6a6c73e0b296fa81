/// Canvas, shading and layout constants used when turning view buffers into images

/// "Blueprint" blue used as canvas fill (RGB)
pub const BACKGROUND_COLOUR: [u8; 3] = [33, 118, 255];

/// Darker blue drawn along every seam between composited panels (RGB)
pub const SEPARATOR_COLOUR: [u8; 3] = [0, 100, 255];

/// Contour glyphs and info panel text
pub const FOREGROUND_COLOUR: [u8; 3] = [255, 255, 255];

/// Separator thickness in output pixels, drawn on both sides of a seam
pub const SEPARATOR_WIDTH: u32 = 2;

/// Block-replication factor from view cells to output pixels
pub const UPSCALE_FACTOR: u32 = 5;

/// Largest view buffer extent along any world axis, in cells
pub const MAX_VIEW_EXTENT: usize = 4096;

/// Largest cell count of a single view buffer
pub const MAX_VIEW_CELLS: usize = 1 << 22;

/// Empty-cell margin around each view for still images
pub const STILL_BORDER: u32 = 1;

/// Empty-cell margin around each view when sprites are composited later
pub const ANIMATION_BORDER: u32 = 10;

/// Height buffer sentinel, below any coordinate a view can hold
pub const EMPTY_HEIGHT: i32 = i32::MIN / 2;

/// Step between neighbouring cells that counts as an occluding edge
pub const CONTOUR_STEP: i64 = 1;

/// Height shading: the lowest cell keeps `SHADE_FLOOR / (SHADE_FLOOR + 1)` of its colour
pub const SHADE_FLOOR: f32 = 4.0;

/// Reference scale at which info panel text is first measured
pub const BASE_TEXT_SCALE: f32 = 30.0;

/// Smallest text scale the info panel is allowed to shrink to
pub const MIN_TEXT_SCALE: f32 = 20.0;

/// Line spacing bounds relative to the text height
pub const MIN_LINE_SPACE: f32 = 0.25;
pub const MAX_LINE_SPACE: f32 = 1.0;

/// Named output aspect ratios offered to callers
pub const ASPECT_RATIO_PRESETS: &[(&str, &str)] = &[
    ("HDTV", "16:9"),
    ("SDTV", "4:3"),
    ("Square", "1:1"),
    ("Camera", "3:2"),
    ("Ultra Wide", "21:9"),
    ("Movie", "16:10"),
    ("Smartphone", "6:13"),
];

/// Blueprint file extensions the renderer accepts
pub const BLUEPRINT_EXTENSIONS: &[&str] = &["blueprint", "blueprint_ba", "blueprint_bac"];
