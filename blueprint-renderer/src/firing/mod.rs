/// Weapon firing animation: muzzle discovery, shot scheduling, sprites and per-frame overlays
pub mod overlay;
pub mod schedule;
pub mod sprites;

use crate::assembly::BlockSet;
use crate::catalog::Catalog;
use constants::firing::{BARREL_MARCH_LIMIT, FIRING_BALLISTIC, FIRING_FLAME, FIRING_LASER, FIRING_PARTICLE};
use tracing::debug;

pub use overlay::FrameRenderer;
pub use schedule::{FiringOrder, Schedule};
pub use sprites::SpriteSet;

/// How a weapon's shot is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FiringKind {
    /// Muzzle flash sprite
    Ballistic,
    Laser,
    Particle,
    Flame,
}

impl FiringKind {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            FIRING_BALLISTIC => Some(FiringKind::Ballistic),
            FIRING_LASER => Some(FiringKind::Laser),
            FIRING_PARTICLE => Some(FiringKind::Particle),
            FIRING_FLAME => Some(FiringKind::Flame),
            _ => None,
        }
    }

    pub fn is_beam(self) -> bool {
        !matches!(self, FiringKind::Ballistic)
    }
}

/// One weapon that fires during the animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiringEvent {
    /// Muzzle cell in craft coordinates
    pub origin: [i32; 3],
    /// Unit axis the shot travels along
    pub direction: [i32; 3],
    pub kind: FiringKind,
}

fn offset(position: [i32; 3], axis: [i32; 3], amount: i32) -> [i32; 3] {
    [
        position[0] + axis[0] * amount,
        position[1] + axis[1] * amount,
        position[2] + axis[2] * amount,
    ]
}

/// Find every firing-capable block and the cell its shot leaves from
pub fn collect_events(set: &BlockSet, catalog: &Catalog) -> Vec<FiringEvent> {
    let mut anchors = None;
    let mut events = Vec::new();

    for block in &set.blocks {
        let kind = catalog.kind(block.kind);
        let Some(mount) = kind.firing else { continue };
        let Some(firing_kind) = FiringKind::from_code(mount.kind) else {
            continue;
        };
        let size = kind.size;
        let axes = block.axes;

        let origin = if mount.barrel_chain {
            let anchors = anchors.get_or_insert_with(|| set.anchor_index());
            let mut origin = offset(offset(block.position, axes.tan, size.yp / 2), axes.dir, size.zp + 1);
            for _ in 0..BARREL_MARCH_LIMIT {
                let Some(&next) = anchors.get(&origin) else { break };
                let barrel = &set.blocks[next];
                if catalog.is_missing(barrel.kind) {
                    break;
                }
                origin = offset(origin, barrel.axes.dir, catalog.kind(barrel.kind).size.zp + 1);
            }
            origin
        } else {
            offset(offset(block.position, axes.tan, size.yp), axes.dir, size.zp + 1)
        };

        debug!("{} at {:?} fires from {:?}", mount.name, block.position, origin);
        events.push(FiringEvent {
            origin,
            direction: axes.dir,
            kind: firing_kind,
        });
    }

    debug!("Found {} firing weapons", events.len());
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::Block;
    use crate::bounds::BlockBounds;
    use crate::catalog::tests::test_catalog;
    use crate::rotation::BlockAxes;

    fn block(catalog: &Catalog, guid: &str, position: [i32; 3]) -> Block {
        Block {
            kind: catalog.resolve(Some(guid)),
            position,
            axes: BlockAxes::for_rotation_id(0).unwrap(),
            colour_index: None,
        }
    }

    fn block_set(blocks: Vec<Block>) -> BlockSet {
        let mut bounds = BlockBounds::new();
        for b in &blocks {
            bounds.update(b.position);
        }
        BlockSet {
            blocks,
            bounds,
            frames: Vec::new(),
        }
    }

    const GUN: &str = "c94e1719-bcc7-4c6a-8563-505fad2f9db9";
    const FIRING_PIECE: &str = "a97e03b0-e8da-49e2-9913-ad8c1826d869";

    #[test]
    fn test_simple_mount_fires_from_next_cell() {
        let catalog = test_catalog();
        let set = block_set(vec![block(&catalog, GUN, [2, 3, 4]), block(&catalog, "metal-cube", [0, 0, 0])]);
        let events = collect_events(&set, &catalog);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].origin, [2, 3, 5]);
        assert_eq!(events[0].direction, [0, 0, 1]);
        assert_eq!(events[0].kind, FiringKind::Ballistic);
    }

    #[test]
    fn test_barrel_chain_walks_to_muzzle() {
        let catalog = test_catalog();
        let set = block_set(vec![
            block(&catalog, FIRING_PIECE, [0, 0, 0]),
            block(&catalog, "barrel", [0, 0, 1]),
            // three cells long, so the next anchor is three further on
            block(&catalog, "wood-beam", [0, 0, 2]),
            block(&catalog, "barrel", [0, 0, 5]),
        ]);
        let events = collect_events(&set, &catalog);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].origin, [0, 0, 6]);
    }

    #[test]
    fn test_barrel_chain_stops_at_missing_block() {
        let catalog = test_catalog();
        let set = block_set(vec![
            block(&catalog, FIRING_PIECE, [0, 0, 0]),
            block(&catalog, "barrel", [0, 0, 1]),
            block(&catalog, "unknown-guid", [0, 0, 2]),
            block(&catalog, "barrel", [0, 0, 3]),
        ]);
        let events = collect_events(&set, &catalog);
        assert_eq!(events[0].origin, [0, 0, 2]);
    }

    #[test]
    fn test_barrel_chain_follows_each_barrel_direction() {
        let catalog = test_catalog();
        let mut turned = block(&catalog, "barrel", [0, 0, 1]);
        turned.axes = BlockAxes {
            dir: [1, 0, 0],
            tan: [0, 1, 0],
            bitan: [0, 0, -1],
        };
        let set = block_set(vec![
            block(&catalog, FIRING_PIECE, [0, 0, 0]),
            turned,
            block(&catalog, "barrel", [1, 0, 1]),
        ]);
        let events = collect_events(&set, &catalog);
        // the second barrel points along +z again
        assert_eq!(events[0].origin, [1, 0, 2]);
        assert_eq!(events[0].direction, [0, 0, 1]);
    }

    #[test]
    fn test_no_weapons_no_events() {
        let catalog = test_catalog();
        let set = block_set(vec![block(&catalog, "metal-cube", [0, 0, 0])]);
        assert!(collect_events(&set, &catalog).is_empty());
    }
}
