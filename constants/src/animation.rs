/// Sprite and playback constants for firing animations

/// Frames in one muzzle flash sequence
pub const SPRITE_FRAME_COUNT: usize = 6;

/// A schedule never spans more than this many sprite sequences
pub const MAX_SEQUENCES_PER_SCHEDULE: usize = 5;

/// Extra depth per frame for in-plane sprites, lets the flash grow over nearby hull
pub const SIDE_SPRITE_DEPTH: [i32; SPRITE_FRAME_COUNT] = [0, 1, 2, 2, 3, 3];

/// Extra depth per frame for sprites firing toward the viewer
pub const FRONT_SPRITE_DEPTH: [i32; SPRITE_FRAME_COUNT] = [1, 4, 6, 6, 7, 7];

/// Sprites firing away from the viewer are never lifted
pub const BACK_SPRITE_DEPTH: i32 = 0;

/// Muzzle pixel (row, col) inside the side sprite
pub const SIDE_SPRITE_ORIGIN: [i32; 2] = [15, 0];

/// Muzzle pixel (row, col) inside the front sprite
pub const FRONT_SPRITE_ORIGIN: [i32; 2] = [15, 15];

/// Procedural side sprite size (rows, cols)
pub const SIDE_SPRITE_SIZE: [u32; 2] = [30, 40];

/// Procedural front/back sprite size (rows, cols)
pub const FRONT_SPRITE_SIZE: [u32; 2] = [31, 31];

/// First GIF frame shows the idle ship
pub const FIRST_FRAME_DELAY_MS: u32 = 2500;

/// Delay of every animated frame, one GIF centisecond tick
pub const FRAME_DELAY_MS: u32 = 10;
