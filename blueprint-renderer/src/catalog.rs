/// Static block, material and size-class tables loaded once at startup
use crate::error::CatalogError;
use constants::firing::{FiringMount, MISSING_MATERIAL, find_firing_mount};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

pub const BLOCKS_FILE: &str = "blocks.json";
pub const MATERIALS_FILE: &str = "materials.json";
pub const SIZE_CLASSES_FILE: &str = "size_id_dictionary.json";

/// Catalog key of the block used for unknown guids
pub const MISSING_BLOCK_KEY: &str = "missing";

/// Colour of the synthesized "Missing" material when the catalog lacks one
const MISSING_COLOUR: [u8; 3] = [255, 0, 255];

/// Cells a block occupies around its anchor along its own +x,+y,+z,-x,-y,-z axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct SizeClass {
    pub xp: i32,
    pub yp: i32,
    pub zp: i32,
    pub xn: i32,
    pub yn: i32,
    pub zn: i32,
}

#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    /// RGB
    pub colour: [u8; 3],
    pub invisible: bool,
}

/// Dense index into the catalog's block table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockKindId(pub u32);

#[derive(Debug, Clone)]
pub struct BlockKind {
    pub guid: String,
    pub name: String,
    pub material: usize,
    pub size: SizeClass,
    pub firing: Option<&'static FiringMount>,
}

#[derive(Deserialize)]
struct BlockRecord {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Material")]
    material: String,
    #[serde(rename = "SizeId")]
    size_id: u32,
}

#[derive(Deserialize)]
struct MaterialRecord {
    /// BGR, as the game data stores it
    #[serde(rename = "Color")]
    colour: [u8; 3],
    #[serde(rename = "Invisible", default)]
    invisible: bool,
}

/// Immutable lookup tables shared by every render.
#[derive(Debug)]
pub struct Catalog {
    kinds: Vec<BlockKind>,
    guid_index: HashMap<String, BlockKindId>,
    missing: BlockKindId,
    materials: Vec<Material>,
}

impl Catalog {
    /// Load `blocks.json`, `materials.json` and `size_id_dictionary.json` from a directory
    pub fn load_from_dir(dir: &Path) -> Result<Self, CatalogError> {
        let blocks = read_catalog_file(&dir.join(BLOCKS_FILE))?;
        let materials = read_catalog_file(&dir.join(MATERIALS_FILE))?;
        let sizes = read_catalog_file(&dir.join(SIZE_CLASSES_FILE))?;

        let catalog = Self::from_json_strs(&blocks, &materials, &sizes)?;

        info!(
            "Loaded catalog from {}: {} blocks, {} materials",
            dir.display(),
            catalog.kinds.len(),
            catalog.materials.len()
        );
        Ok(catalog)
    }

    /// Build the catalog from the three JSON documents
    pub fn from_json_strs(
        blocks_json: &str,
        materials_json: &str,
        sizes_json: &str,
    ) -> Result<Self, CatalogError> {
        let block_records: BTreeMap<String, BlockRecord> = parse_table(blocks_json, BLOCKS_FILE)?;
        let material_records: BTreeMap<String, MaterialRecord> =
            parse_table(materials_json, MATERIALS_FILE)?;
        let size_records: BTreeMap<String, SizeClass> = parse_table(sizes_json, SIZE_CLASSES_FILE)?;

        let mut size_classes = HashMap::with_capacity(size_records.len());
        for (key, size) in size_records {
            let id: u32 = key
                .trim()
                .parse()
                .map_err(|_| CatalogError::InvalidSizeClassKey(key.clone()))?;
            size_classes.insert(id, size);
        }

        let mut materials: Vec<Material> = material_records
            .into_iter()
            .map(|(name, record)| Material {
                name,
                colour: bgr_to_rgb(record.colour),
                invisible: record.invisible,
            })
            .collect();
        let mut material_index: HashMap<String, usize> = materials
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.clone(), i))
            .collect();

        if !material_index.contains_key(MISSING_MATERIAL) {
            warn!("Material table has no {MISSING_MATERIAL:?} entry, adding a default");
            material_index.insert(MISSING_MATERIAL.to_string(), materials.len());
            materials.push(Material {
                name: MISSING_MATERIAL.to_string(),
                colour: MISSING_COLOUR,
                invisible: false,
            });
        }

        let mut kinds = Vec::with_capacity(block_records.len() + 1);
        let mut guid_index = HashMap::with_capacity(block_records.len() + 1);
        for (guid, record) in block_records {
            let material = *material_index.get(&record.material).ok_or_else(|| {
                CatalogError::UnknownMaterial {
                    guid: guid.clone(),
                    material: record.material.clone(),
                }
            })?;
            let size = *size_classes.get(&record.size_id).ok_or_else(|| {
                CatalogError::UnknownSizeClass {
                    guid: guid.clone(),
                    size_id: record.size_id,
                }
            })?;

            let id = BlockKindId(kinds.len() as u32);
            kinds.push(BlockKind {
                firing: find_firing_mount(&guid),
                guid: guid.clone(),
                name: record.name,
                material,
                size,
            });
            guid_index.insert(guid, id);
        }

        let missing = match guid_index.get(MISSING_BLOCK_KEY) {
            Some(id) => *id,
            None => {
                warn!("Block table has no {MISSING_BLOCK_KEY:?} entry, adding a default");
                let id = BlockKindId(kinds.len() as u32);
                kinds.push(BlockKind {
                    guid: MISSING_BLOCK_KEY.to_string(),
                    name: "Missing".to_string(),
                    material: material_index[MISSING_MATERIAL],
                    size: SizeClass::default(),
                    firing: None,
                });
                guid_index.insert(MISSING_BLOCK_KEY.to_string(), id);
                id
            }
        };

        Ok(Self {
            kinds,
            guid_index,
            missing,
            materials,
        })
    }

    /// Resolve a block guid, falling back to the "missing" block
    pub fn resolve(&self, guid: Option<&str>) -> BlockKindId {
        match guid.and_then(|g| self.guid_index.get(g)) {
            Some(id) => *id,
            None => {
                debug!("Unknown block guid {:?}, using missing block", guid);
                self.missing
            }
        }
    }

    pub fn kind(&self, id: BlockKindId) -> &BlockKind {
        &self.kinds[id.0 as usize]
    }

    pub fn material(&self, index: usize) -> &Material {
        &self.materials[index]
    }

    pub fn material_of(&self, id: BlockKindId) -> &Material {
        self.material(self.kind(id).material)
    }

    /// Blocks made of the "Missing" material stop barrel marching
    pub fn is_missing(&self, id: BlockKindId) -> bool {
        self.material_of(id).name == MISSING_MATERIAL
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn missing_kind(&self) -> BlockKindId {
        self.missing
    }
}

fn bgr_to_rgb([b, g, r]: [u8; 3]) -> [u8; 3] {
    [r, g, b]
}

fn read_catalog_file(path: &Path) -> Result<String, CatalogError> {
    fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_table<T: serde::de::DeserializeOwned>(text: &str, name: &str) -> Result<T, CatalogError> {
    serde_json::from_str(text).map_err(|source| CatalogError::Json {
        path: name.into(),
        source,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const BLOCKS: &str = r#"{
        "missing": {"Name": "Missing", "Material": "Missing", "SizeId": 1},
        "metal-cube": {"Name": "Metal Block", "Material": "Metal", "SizeId": 1},
        "wood-beam": {"Name": "Wood Beam 3m", "Material": "Wood", "SizeId": 2},
        "glass-pane": {"Name": "Glass", "Material": "Glass", "SizeId": 1},
        "c94e1719-bcc7-4c6a-8563-505fad2f9db9": {"Name": "16 pounder", "Material": "Metal", "SizeId": 1},
        "a97e03b0-e8da-49e2-9913-ad8c1826d869": {"Name": "Firing Piece", "Material": "Metal", "SizeId": 1},
        "barrel": {"Name": "Barrel", "Material": "Metal", "SizeId": 1}
    }"#;

    pub const MATERIALS: &str = r#"{
        "Missing": {"Color": [255, 0, 255]},
        "Metal": {"Color": [200, 200, 200]},
        "Wood": {"Color": [100, 100, 100]},
        "Glass": {"Color": [10, 20, 30], "Invisible": true}
    }"#;

    pub const SIZES: &str = r#"{
        "1": {"xp": 0, "yp": 0, "zp": 0, "xn": 0, "yn": 0, "zn": 0},
        "2": {"xp": 0, "yp": 0, "zp": 2, "xn": 0, "yn": 0, "zn": 0}
    }"#;

    pub fn test_catalog() -> Catalog {
        Catalog::from_json_strs(BLOCKS, MATERIALS, SIZES).unwrap()
    }

    #[test]
    fn test_resolve_known_and_missing() {
        let catalog = test_catalog();
        let metal = catalog.resolve(Some("metal-cube"));
        assert_eq!(catalog.material_of(metal).colour, [200, 200, 200]);
        assert_eq!(catalog.material_of(metal).name, "Metal");

        let unknown = catalog.resolve(Some("not-a-guid"));
        assert_eq!(unknown, catalog.missing_kind());
        assert!(catalog.is_missing(unknown));
        assert_eq!(catalog.resolve(None), catalog.missing_kind());
    }

    #[test]
    fn test_invisible_defaults_to_false() {
        let catalog = test_catalog();
        let wood = catalog.resolve(Some("wood-beam"));
        assert!(!catalog.material_of(wood).invisible);
        let glass = catalog.resolve(Some("glass-pane"));
        assert!(catalog.material_of(glass).invisible);
    }

    #[test]
    fn test_size_class_attached_to_kind() {
        let catalog = test_catalog();
        let wood = catalog.kind(catalog.resolve(Some("wood-beam")));
        assert_eq!(wood.size.zp, 2);
        assert_eq!(wood.size.xn, 0);
    }

    #[test]
    fn test_firing_mounts_tagged() {
        let catalog = test_catalog();
        let gun = catalog.kind(catalog.resolve(Some("c94e1719-bcc7-4c6a-8563-505fad2f9db9")));
        assert!(gun.firing.is_some_and(|m| !m.barrel_chain));
        let piece = catalog.kind(catalog.resolve(Some("a97e03b0-e8da-49e2-9913-ad8c1826d869")));
        assert!(piece.firing.is_some_and(|m| m.barrel_chain));
        assert!(catalog.kind(catalog.resolve(Some("barrel"))).firing.is_none());
        assert!(format!("{:?}", gun.firing).contains("barrel_chain: false"));
    }

    #[test]
    fn test_material_colours_stored_as_rgb() {
        let materials = r#"{"Metal": {"Color": [0, 64, 200]}}"#;
        let blocks = r#"{"a": {"Name": "A", "Material": "Metal", "SizeId": 1}}"#;
        let catalog = Catalog::from_json_strs(blocks, materials, SIZES).unwrap();
        let a = catalog.resolve(Some("a"));
        assert_eq!(catalog.material_of(a).colour, [200, 64, 0]);
    }

    #[test]
    fn test_unknown_material_rejected() {
        let blocks = r#"{"a": {"Name": "A", "Material": "Unobtainium", "SizeId": 1}}"#;
        let err = Catalog::from_json_strs(blocks, MATERIALS, SIZES).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownMaterial { .. }));
    }

    #[test]
    fn test_missing_entries_synthesized() {
        let blocks = r#"{"a": {"Name": "A", "Material": "Metal", "SizeId": 1}}"#;
        let materials = r#"{"Metal": {"Color": [1, 2, 3]}}"#;
        let catalog = Catalog::from_json_strs(blocks, materials, SIZES).unwrap();
        let missing = catalog.resolve(Some("zzz"));
        assert!(catalog.is_missing(missing));
        assert_eq!(catalog.material_of(missing).colour, MISSING_COLOUR);
    }
}
