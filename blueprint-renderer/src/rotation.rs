/// Quantised 90° rotations for assemblies and blocks
use constants::coordinate_system::{ROT_NORMAL, ROT_TANGENT, cross};
use glam::{DMat3, DQuat};

/// One of the 24 proper sign-permutation matrices, row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rotation {
    rows: [[i32; 3]; 3],
}

impl Rotation {
    pub const IDENTITY: Rotation = Rotation {
        rows: [[1, 0, 0], [0, 1, 0], [0, 0, 1]],
    };

    /// Accept only sign-permutation matrices with determinant +1
    pub fn from_rows(rows: [[i32; 3]; 3]) -> Option<Self> {
        let mut used = [false; 3];
        for row in &rows {
            let mut hits = 0;
            for (col, v) in row.iter().enumerate() {
                match v {
                    0 => {}
                    1 | -1 => {
                        if used[col] {
                            return None;
                        }
                        used[col] = true;
                        hits += 1;
                    }
                    _ => return None,
                }
            }
            if hits != 1 {
                return None;
            }
        }
        let rotation = Rotation { rows };
        (rotation.determinant() == 1).then_some(rotation)
    }

    /// Snap a general matrix: per row keep the column of largest magnitude as ±1.
    /// Degenerate inputs that would reuse a column fall back to a greedy global pick.
    pub fn snap(m: &DMat3) -> Self {
        let entries: [[f64; 3]; 3] = [m.row(0).to_array(), m.row(1).to_array(), m.row(2).to_array()];

        let mut rows = [[0i32; 3]; 3];
        let mut used = [false; 3];
        let mut distinct = true;
        for (r, row) in entries.iter().enumerate() {
            let col = (0..3)
                .max_by(|&a, &b| row[a].abs().total_cmp(&row[b].abs()))
                .unwrap_or(r);
            distinct &= !used[col];
            used[col] = true;
            rows[r][col] = sign(row[col]);
        }
        if distinct {
            return Rotation { rows };
        }

        let mut rows = [[0i32; 3]; 3];
        let mut free_rows = [true; 3];
        let mut free_cols = [true; 3];
        for _ in 0..3 {
            let mut best = (0, 0, f64::NEG_INFINITY);
            for r in (0..3).filter(|&r| free_rows[r]) {
                for c in (0..3).filter(|&c| free_cols[c]) {
                    if entries[r][c].abs() > best.2 {
                        best = (r, c, entries[r][c].abs());
                    }
                }
            }
            let (r, c, _) = best;
            rows[r][c] = sign(entries[r][c]);
            free_rows[r] = false;
            free_cols[c] = false;
        }
        Rotation { rows }
    }

    pub fn from_quat(q: DQuat) -> Self {
        Self::snap(&DMat3::from_quat(q))
    }

    /// All 24 proper axis-aligned rotations
    pub fn all() -> Vec<Rotation> {
        const PERMUTATIONS: [[usize; 3]; 6] =
            [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        let mut out = Vec::with_capacity(24);
        for perm in PERMUTATIONS {
            for signs in 0..8 {
                let mut rows = [[0i32; 3]; 3];
                for (r, &c) in perm.iter().enumerate() {
                    rows[r][c] = if signs & (1 << r) == 0 { 1 } else { -1 };
                }
                if let Some(rotation) = Rotation::from_rows(rows) {
                    out.push(rotation);
                }
            }
        }
        out
    }

    pub fn rows(&self) -> [[i32; 3]; 3] {
        self.rows
    }

    pub fn apply(&self, v: [i32; 3]) -> [i32; 3] {
        let r = &self.rows;
        [
            r[0][0] * v[0] + r[0][1] * v[1] + r[0][2] * v[2],
            r[1][0] * v[0] + r[1][1] * v[1] + r[1][2] * v[2],
            r[2][0] * v[0] + r[2][1] * v[1] + r[2][2] * v[2],
        ]
    }

    pub fn apply_f64(&self, v: [f64; 3]) -> [f64; 3] {
        let r = &self.rows;
        let mut out = [0.0; 3];
        for i in 0..3 {
            out[i] = r[i][0] as f64 * v[0] + r[i][1] as f64 * v[1] + r[i][2] as f64 * v[2];
        }
        out
    }

    /// `self * other`
    pub fn compose(&self, other: &Rotation) -> Rotation {
        let mut rows = [[0i32; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                rows[i][j] = (0..3).map(|k| self.rows[i][k] * other.rows[k][j]).sum();
            }
        }
        Rotation { rows }
    }

    pub fn inverse(&self) -> Rotation {
        let r = &self.rows;
        Rotation {
            rows: [
                [r[0][0], r[1][0], r[2][0]],
                [r[0][1], r[1][1], r[2][1]],
                [r[0][2], r[1][2], r[2][2]],
            ],
        }
    }

    pub fn determinant(&self) -> i32 {
        let r = &self.rows;
        r[0][0] * (r[1][1] * r[2][2] - r[1][2] * r[2][1])
            - r[0][1] * (r[1][0] * r[2][2] - r[1][2] * r[2][0])
            + r[0][2] * (r[1][0] * r[2][1] - r[1][1] * r[2][0])
    }

    #[cfg(test)]
    pub fn to_mat3(&self) -> DMat3 {
        let r = &self.rows;
        DMat3::from_cols_array_2d(&[
            [r[0][0] as f64, r[1][0] as f64, r[2][0] as f64],
            [r[0][1] as f64, r[1][1] as f64, r[2][1] as f64],
            [r[0][2] as f64, r[1][2] as f64, r[2][2] as f64],
        ])
    }
}

fn sign(v: f64) -> i32 {
    if v < 0.0 { -1 } else { 1 }
}

/// A block's own forward (direction), up (tangent) and side (bitangent) axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockAxes {
    pub dir: [i32; 3],
    pub tan: [i32; 3],
    pub bitan: [i32; 3],
}

impl BlockAxes {
    /// Axes for a block rotation id in its assembly's frame
    pub fn for_rotation_id(id: u32) -> Option<BlockAxes> {
        let i = id as usize;
        let dir = *ROT_NORMAL.get(i)?;
        let tan = *ROT_TANGENT.get(i)?;
        Some(BlockAxes {
            dir,
            tan,
            bitan: cross(dir, tan),
        })
    }

    pub fn rotated(&self, rotation: &Rotation) -> BlockAxes {
        BlockAxes {
            dir: rotation.apply(self.dir),
            tan: rotation.apply(self.tan),
            bitan: rotation.apply(self.bitan),
        }
    }
}
