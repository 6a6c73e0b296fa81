/// Integer cell bounds tracking for assemblies and rasterized footprints

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockBounds {
    pub min: [i32; 3],
    pub max: [i32; 3],
}

impl Default for BlockBounds {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockBounds {
    /// Create new bounds initialised to an empty range
    pub fn new() -> Self {
        Self {
            min: [i32::MAX; 3],
            max: [i32::MIN; 3],
        }
    }

    /// Bounds spanning two arbitrary corners
    pub fn from_corners(a: [i32; 3], b: [i32; 3]) -> Self {
        let mut bounds = Self::new();
        bounds.update(a);
        bounds.update(b);
        bounds
    }

    /// Update bounds with a new cell
    pub fn update(&mut self, p: [i32; 3]) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    /// Grow to cover another bounds
    pub fn merge(&mut self, other: &BlockBounds) {
        if other.is_empty() {
            return;
        }
        self.update(other.min);
        self.update(other.max);
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    /// Inclusive cell count per axis
    pub fn dimensions(&self) -> [usize; 3] {
        if self.is_empty() {
            return [0; 3];
        }
        std::array::from_fn(|i| (self.max[i] as i64 - self.min[i] as i64 + 1) as usize)
    }

    pub fn contains(&self, p: [i32; 3]) -> bool {
        (0..3).all(|i| self.min[i] <= p[i] && p[i] <= self.max[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_and_dimensions() {
        let mut bounds = BlockBounds::new();
        assert!(bounds.is_empty());
        assert_eq!(bounds.dimensions(), [0, 0, 0]);

        bounds.update([1, -2, 3]);
        bounds.update([4, 0, 3]);
        assert_eq!(bounds.min, [1, -2, 3]);
        assert_eq!(bounds.max, [4, 0, 3]);
        assert_eq!(bounds.dimensions(), [4, 3, 1]);
        assert!(bounds.contains([2, -1, 3]));
        assert!(!bounds.contains([2, -1, 4]));
    }

    #[test]
    fn test_merge_ignores_empty() {
        let mut bounds = BlockBounds::from_corners([0, 0, 0], [2, 2, 2]);
        bounds.merge(&BlockBounds::new());
        assert_eq!(bounds, BlockBounds::from_corners([0, 0, 0], [2, 2, 2]));

        bounds.merge(&BlockBounds::from_corners([-1, 5, 1], [0, 6, 1]));
        assert_eq!(bounds.min, [-1, 0, 0]);
        assert_eq!(bounds.max, [2, 6, 2]);
    }
}
