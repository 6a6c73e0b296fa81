/// Per-rotation-id block axes in the game's block-local convention.
/// Index with the block rotation id (0..24); the bitangent is `normal × tangent`.
pub const ROT_NORMAL: [[i32; 3]; 24] = [
    [0, 0, 1],  // 0
    [1, 0, 0],  // 1
    [0, 0, -1], // 2
    [-1, 0, 0], // 3
    [0, -1, 0], // 4
    [0, -1, 0], // 5
    [0, -1, 0], // 6
    [0, -1, 0], // 7
    [0, 1, 0],  // 8
    [0, 1, 0],  // 9
    [0, 1, 0],  // 10
    [0, 1, 0],  // 11
    [0, 0, 1],  // 12
    [1, 0, 0],  // 13
    [0, 0, -1], // 14
    [-1, 0, 0], // 15
    [0, 0, 1],  // 16
    [0, 0, -1], // 17
    [0, 0, 1],  // 18
    [0, 0, -1], // 19
    [1, 0, 0],  // 20
    [-1, 0, 0], // 21
    [1, 0, 0],  // 22
    [-1, 0, 0], // 23
];

pub const ROT_TANGENT: [[i32; 3]; 24] = [
    [0, 1, 0],  // 0
    [0, 1, 0],  // 1
    [0, 1, 0],  // 2
    [0, 1, 0],  // 3
    [0, 0, 1],  // 4
    [1, 0, 0],  // 5
    [0, 0, -1], // 6
    [-1, 0, 0], // 7
    [0, 0, 1],  // 8
    [1, 0, 0],  // 9
    [0, 0, -1], // 10
    [-1, 0, 0], // 11
    [0, -1, 0], // 12
    [0, -1, 0], // 13
    [0, -1, 0], // 14
    [0, -1, 0], // 15
    [1, 0, 0],  // 16
    [1, 0, 0],  // 17
    [-1, 0, 0], // 18
    [-1, 0, 0], // 19
    [0, 0, 1],  // 20
    [0, 0, 1],  // 21
    [0, 0, -1], // 22
    [0, 0, -1], // 23
];

/// Cross product on integer unit vectors
pub const fn cross(a: [i32; 3], b: [i32; 3]) -> [i32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// World axis indices
pub const AXIS_X: usize = 0;
pub const AXIS_Y: usize = 1;
pub const AXIS_Z: usize = 2;

/// Largest absolute cell coordinate a composed block or assembly may have
pub const MAX_CELL_COORDINATE: i64 = 1 << 24;
