/// Beam overlay palettes, premultiplied colour plus remaining background weight

pub struct BeamStyle {
    /// `colour * alpha`, RGB
    pub premultiplied: [u8; 3],
    /// `1 - alpha`
    pub background_weight: f32,
    /// Shift of the beam's first pixel row/column away from the muzzle cell edge
    pub offset: i32,
    pub width: i32,
}

pub const LASER_BEAM: BeamStyle = BeamStyle {
    premultiplied: [153, 11, 0],
    background_weight: 0.4,
    offset: 1,
    width: 3,
};

pub const PARTICLE_BEAM: BeamStyle = BeamStyle {
    premultiplied: [229, 229, 229],
    background_weight: 0.1,
    offset: 1,
    width: 3,
};

/// Flame colour is `FLAME_BASE + noise * FLAME_NOISE_GAIN`, fully opaque.
/// Width and offset scale with the upscale factor: `2f + 1` wide, shifted `-f / 2`.
pub const FLAME_BASE: [f32; 3] = [255.0, 20.0, 0.0];
pub const FLAME_NOISE_GAIN: [f32; 3] = [0.0, 220.0, 0.0];

/// Blur applied to the flame's random field
pub const FLAME_KERNEL: [[f32; 3]; 3] = [[0.05, 0.13, 0.05], [0.13, 0.28, 0.13], [0.05, 0.13, 0.05]];
