//! Assembly tree normalization.
//!
//! Sub-assemblies are stored in a flat arena (parents precede their children) and
//! composed root to leaf into absolute integer block positions and axes.

use crate::blueprint::BlueprintDocument;
use crate::bounds::BlockBounds;
use crate::catalog::{BlockKindId, Catalog};
use crate::error::ParseError;
use crate::rotation::{BlockAxes, Rotation};
use constants::coordinate_system::MAX_CELL_COORDINATE;
use glam::{DQuat, DVec3};
use std::collections::HashMap;

/// One rigid assembly as parsed, plus the transform it resolves to.
#[derive(Debug, Clone)]
pub struct AssemblyNode {
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub local_rotation: DQuat,
    pub local_position: [f64; 3],
    pub declared_min: [f64; 3],
    pub declared_max: [f64; 3],
    pub block_ids: Vec<i64>,
    pub positions: Vec<[f64; 3]>,
    pub rotation_ids: Vec<u32>,
    pub colour_indices: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default)]
pub struct AssemblyTree {
    pub nodes: Vec<AssemblyNode>,
}

/// Absolute frame of an assembly after composition.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyFrame {
    /// Unsnapped composed quaternion, children compose against this
    pub orientation: DQuat,
    pub rotation: Rotation,
    pub position: [i32; 3],
}

/// A block in world cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub kind: BlockKindId,
    pub position: [i32; 3],
    pub axes: BlockAxes,
    pub colour_index: Option<i64>,
}

/// Flattened, absolute block set of a whole blueprint.
#[derive(Debug, Clone)]
pub struct BlockSet {
    pub blocks: Vec<Block>,
    /// Union of declared corners and every block anchor, inclusive
    pub bounds: BlockBounds,
    pub frames: Vec<AssemblyFrame>,
}

impl BlockSet {
    /// Cells along x, y, z
    pub fn size(&self) -> [usize; 3] {
        self.bounds.dimensions()
    }

    /// Anchor position → block index, used when walking barrel stacks
    pub fn anchor_index(&self) -> HashMap<[i32; 3], usize> {
        let mut index = HashMap::with_capacity(self.blocks.len());
        for (i, block) in self.blocks.iter().enumerate() {
            index.entry(block.position).or_insert(i);
        }
        index
    }
}

fn out_of_range(file_name: &str, field: &'static str, value: f64) -> ParseError {
    ParseError::CoordinateRange {
        file: file_name.to_string(),
        field,
        value,
        limit: MAX_CELL_COORDINATE,
    }
}

/// Round to whole cells, rejecting anything outside the supported range
fn to_cells(file_name: &str, field: &'static str, v: [f64; 3]) -> Result<[i32; 3], ParseError> {
    let mut cells = [0; 3];
    for (cell, value) in cells.iter_mut().zip(v) {
        let rounded = value.round();
        if !rounded.is_finite() || rounded.abs() > MAX_CELL_COORDINATE as f64 {
            return Err(out_of_range(file_name, field, value));
        }
        *cell = rounded as i32;
    }
    Ok(cells)
}

fn add_cells(file_name: &str, field: &'static str, a: [i32; 3], b: [i32; 3]) -> Result<[i32; 3], ParseError> {
    let mut cells = [0; 3];
    for i in 0..3 {
        let sum = a[i] as i64 + b[i] as i64;
        if sum.abs() > MAX_CELL_COORDINATE {
            return Err(out_of_range(file_name, field, sum as f64));
        }
        cells[i] = sum as i32;
    }
    Ok(cells)
}

impl AssemblyTree {
    /// Compose every node's frame root to leaf
    pub fn frames(&self, file_name: &str) -> Result<Vec<AssemblyFrame>, ParseError> {
        let mut frames: Vec<AssemblyFrame> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let frame = match node.parent {
                None => AssemblyFrame {
                    orientation: DQuat::IDENTITY,
                    rotation: Rotation::IDENTITY,
                    position: [0; 3],
                },
                Some(p) => {
                    let parent = frames[p];
                    let orientation = (parent.orientation * node.local_rotation).normalize();
                    let local = to_cells(file_name, "LocalPosition", node.local_position)?;
                    let local = DVec3::from_array(local.map(f64::from));
                    let offset = to_cells(file_name, "LocalPosition", (parent.orientation * local).to_array())?;
                    AssemblyFrame {
                        orientation,
                        rotation: Rotation::from_quat(orientation),
                        position: add_cells(file_name, "LocalPosition", offset, parent.position)?,
                    }
                }
            };
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Resolve catalog kinds and produce absolute blocks and bounds
    pub fn normalize(
        &self,
        file_name: &str,
        item_dictionary: &HashMap<i64, String>,
        catalog: &Catalog,
    ) -> Result<BlockSet, ParseError> {
        let frames = self.frames(file_name)?;
        let mut kind_cache: HashMap<i64, BlockKindId> = HashMap::new();
        let mut blocks = Vec::with_capacity(self.nodes.iter().map(|n| n.positions.len()).sum());
        let mut node_bounds = vec![BlockBounds::new(); self.nodes.len()];

        for (index, node) in self.nodes.iter().enumerate() {
            let frame = &frames[index];
            let bounds = &mut node_bounds[index];

            let corner = |field: &'static str, v: [f64; 3]| {
                let rotated = to_cells(file_name, field, frame.rotation.apply_f64(v))?;
                add_cells(file_name, field, rotated, frame.position)
            };
            let corner_a = corner("MinCords", node.declared_min)?;
            let corner_b = corner("MaxCords", node.declared_max)?;
            bounds.update(corner_a);
            bounds.update(corner_b);

            for (i, local) in node.positions.iter().enumerate() {
                let block_id = node.block_ids[i];
                let kind = *kind_cache.entry(block_id).or_insert_with(|| {
                    catalog.resolve(item_dictionary.get(&block_id).map(String::as_str))
                });
                let rotated = to_cells(file_name, "BLP", frame.rotation.apply_f64(*local))?;
                let position = add_cells(file_name, "BLP", rotated, frame.position)?;
                let axes = BlockAxes::for_rotation_id(node.rotation_ids[i])
                    .unwrap_or(DEFAULT_AXES)
                    .rotated(&frame.rotation);
                bounds.update(position);
                blocks.push(Block {
                    kind,
                    position,
                    axes,
                    colour_index: node.colour_indices.as_ref().map(|c| c[i]),
                });
            }
        }

        // Children follow their parents in the arena, so a reverse sweep folds
        // every subtree into its root.
        for index in (1..self.nodes.len()).rev() {
            if let Some(parent) = self.nodes[index].parent {
                let child = node_bounds[index];
                node_bounds[parent].merge(&child);
            }
        }

        Ok(BlockSet {
            blocks,
            bounds: node_bounds.first().copied().unwrap_or_default(),
            frames,
        })
    }
}

/// Axes of rotation id 0
const DEFAULT_AXES: BlockAxes = BlockAxes {
    dir: [0, 0, 1],
    tan: [0, 1, 0],
    bitan: [-1, 0, 0],
};

impl BlueprintDocument {
    pub fn normalize(&self, catalog: &Catalog) -> Result<BlockSet, ParseError> {
        self.tree.normalize(&self.file_name, &self.item_dictionary, catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::test_catalog;
    use std::f64::consts::FRAC_PI_2;

    fn node(parent: Option<usize>, rotation: DQuat, position: [f64; 3], blocks: &[[f64; 3]]) -> AssemblyNode {
        AssemblyNode {
            parent,
            children: Vec::new(),
            local_rotation: rotation,
            local_position: position,
            declared_min: [0.0; 3],
            declared_max: [0.0; 3],
            block_ids: vec![1; blocks.len()],
            positions: blocks.to_vec(),
            rotation_ids: vec![0; blocks.len()],
            colour_indices: None,
        }
    }

    fn tree(nodes: Vec<AssemblyNode>) -> AssemblyTree {
        let mut tree = AssemblyTree { nodes };
        for i in 0..tree.nodes.len() {
            if let Some(p) = tree.nodes[i].parent {
                tree.nodes[p].children.push(i);
            }
        }
        tree
    }

    fn dictionary() -> HashMap<i64, String> {
        HashMap::from([(1, "metal-cube".to_string())])
    }

    #[test]
    fn test_child_rotation_and_position_compose() {
        let quarter_y = DQuat::from_axis_angle(DVec3::Y, FRAC_PI_2);
        let t = tree(vec![
            node(None, DQuat::IDENTITY, [0.0; 3], &[[0.0, 0.0, 0.0]]),
            node(Some(0), quarter_y, [10.0, 0.0, 0.0], &[[1.0, 0.0, 0.0]]),
            node(Some(1), DQuat::IDENTITY, [0.0, 0.0, 2.0], &[[0.0, 0.0, 1.0]]),
        ]);
        let set = t.normalize("t.blueprint", &dictionary(), &test_catalog()).unwrap();

        assert_eq!(set.blocks[0].position, [0, 0, 0]);
        // +x in the child maps to -z in world
        assert_eq!(set.blocks[1].position, [10, 0, -1]);
        // grandchild offset (0,0,2) is rotated by the child's orientation into (2,0,0)
        assert_eq!(set.frames[2].position, [12, 0, 0]);
        assert_eq!(set.blocks[2].position, [13, 0, 0]);
        assert_eq!(set.blocks[1].axes.dir, [1, 0, 0]);
    }

    #[test]
    fn test_bounds_contain_every_block() {
        let quarter_x = DQuat::from_axis_angle(DVec3::X, FRAC_PI_2);
        let half_z = DQuat::from_axis_angle(DVec3::Z, 2.0 * FRAC_PI_2);
        let t = tree(vec![
            node(None, DQuat::IDENTITY, [0.0; 3], &[[0.0, 0.0, 0.0], [3.0, 1.0, -4.0]]),
            node(Some(0), quarter_x, [-5.0, 2.0, 7.0], &[[1.0, 2.0, 3.0], [-2.0, 0.4, 9.6]]),
            node(Some(1), half_z, [1.0, 1.0, 1.0], &[[4.0, -4.0, 0.0]]),
        ]);
        let set = t.normalize("t.blueprint", &dictionary(), &test_catalog()).unwrap();
        assert_eq!(set.blocks.len(), 5);
        for block in &set.blocks {
            assert!(set.bounds.contains(block.position), "{:?} outside {:?}", block.position, set.bounds);
        }
    }

    #[test]
    fn test_declared_corners_are_rotated() {
        let quarter_y = DQuat::from_axis_angle(DVec3::Y, FRAC_PI_2);
        let mut child = node(Some(0), quarter_y, [0.0; 3], &[]);
        child.declared_min = [0.0, 0.0, 0.0];
        child.declared_max = [4.0, 1.0, 0.0];
        let t = tree(vec![node(None, DQuat::IDENTITY, [0.0; 3], &[[0.0, 0.0, 0.0]]), child]);
        let set = t.normalize("t.blueprint", &dictionary(), &test_catalog()).unwrap();
        assert_eq!(set.bounds.min, [0, 0, -4]);
        assert_eq!(set.bounds.max, [0, 1, 0]);
        assert_eq!(set.size(), [1, 2, 5]);
    }

    #[test]
    fn test_unknown_ids_resolve_to_missing() {
        let mut root = node(None, DQuat::IDENTITY, [0.0; 3], &[[0.0, 0.0, 0.0]]);
        root.block_ids = vec![99];
        let catalog = test_catalog();
        let set = tree(vec![root]).normalize("t.blueprint", &dictionary(), &catalog).unwrap();
        assert_eq!(set.blocks[0].kind, catalog.missing_kind());
    }

    #[test]
    fn test_anchor_index_keeps_first_block() {
        let t = tree(vec![node(
            None,
            DQuat::IDENTITY,
            [0.0; 3],
            &[[1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [2.0, 1.0, 1.0]],
        )]);
        let set = t.normalize("t.blueprint", &dictionary(), &test_catalog()).unwrap();
        let index = set.anchor_index();
        assert_eq!(index[&[1, 1, 1]], 0);
        assert_eq!(index[&[2, 1, 1]], 2);
    }

    #[test]
    fn test_far_child_offset_is_rejected() {
        let t = tree(vec![
            node(None, DQuat::IDENTITY, [0.0; 3], &[[0.0, 0.0, 0.0]]),
            node(Some(0), DQuat::IDENTITY, [2.0e9, 0.0, 0.0], &[[2.0e9, 0.0, 0.0]]),
        ]);
        let err = t.normalize("far.blueprint", &dictionary(), &test_catalog()).unwrap_err();
        assert!(matches!(
            err,
            ParseError::CoordinateRange {
                field: "LocalPosition",
                ..
            }
        ));
        assert!(err.to_string().contains("far.blueprint"));
    }

    #[test]
    fn test_offsets_summing_past_the_limit_are_rejected() {
        let edge = MAX_CELL_COORDINATE as f64;
        let t = tree(vec![
            node(None, DQuat::IDENTITY, [0.0; 3], &[]),
            node(Some(0), DQuat::IDENTITY, [edge, 0.0, 0.0], &[[edge, 0.0, 0.0]]),
        ]);
        let err = t.normalize("edge.blueprint", &dictionary(), &test_catalog()).unwrap_err();
        assert!(matches!(err, ParseError::CoordinateRange { field: "BLP", .. }));
    }
}
