/// Blueprint document parsing into an assembly arena
use crate::assembly::{AssemblyNode, AssemblyTree};
use crate::error::ParseError;
use constants::render_settings::BLUEPRINT_EXTENSIONS;
use glam::DQuat;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Raw on-disk assembly, fields named as the game writes them.
#[derive(Deserialize)]
struct RawAssembly {
    #[serde(rename = "LocalRotation", default)]
    local_rotation: Option<String>,
    #[serde(rename = "LocalPosition", default)]
    local_position: Option<String>,
    #[serde(rename = "MinCords")]
    min_cords: String,
    #[serde(rename = "MaxCords")]
    max_cords: String,
    #[serde(rename = "BlockCount", default)]
    block_count: Option<usize>,
    #[serde(rename = "BlockIds")]
    block_ids: Vec<i64>,
    #[serde(rename = "BLP")]
    positions: Vec<String>,
    #[serde(rename = "BLR")]
    rotations: Vec<i64>,
    #[serde(rename = "BCI", default)]
    colour_indices: Option<Vec<i64>>,
    #[serde(rename = "COL", default)]
    craft_colours: Option<Vec<String>>,
    #[serde(rename = "SCs", default)]
    children: Vec<RawAssembly>,
    #[serde(rename = "TotalBlockCount", default)]
    total_block_count: Option<Value>,
    #[serde(rename = "GameVersion", default)]
    game_version: Option<Value>,
    #[serde(rename = "AuthorDetails", default)]
    author_details: Option<Value>,
}

#[derive(Deserialize)]
struct RawBlueprintFile {
    #[serde(rename = "Name", default)]
    name: Option<Value>,
    #[serde(rename = "SavedTotalBlockCount", default)]
    saved_total_block_count: Option<Value>,
    #[serde(rename = "SavedMaterialCost", default)]
    saved_material_cost: Option<Value>,
    #[serde(rename = "ItemDictionary", default)]
    item_dictionary: HashMap<String, String>,
    #[serde(rename = "Blueprint")]
    blueprint: RawAssembly,
}

/// Metadata fields only the info panel reads. Kept loosely typed so a bad value
/// degrades that one entry instead of failing the render.
#[derive(Debug, Clone, Default)]
pub struct BlueprintMeta {
    pub name: Option<Value>,
    pub saved_total_block_count: Option<Value>,
    pub saved_material_cost: Option<Value>,
    pub total_block_count: Option<Value>,
    pub game_version: Option<Value>,
    pub author_details: Option<Value>,
}

/// Per-craft colour, components in 0..1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CraftColour {
    pub rgb: [f32; 3],
    pub alpha: f32,
}

/// A parsed blueprint ready for normalization.
#[derive(Debug)]
pub struct BlueprintDocument {
    pub file_name: String,
    pub meta: BlueprintMeta,
    pub item_dictionary: HashMap<i64, String>,
    pub tree: AssemblyTree,
    /// `None` when the root carries no colour table; craft colouring is then disabled
    pub craft_colours: Option<Vec<CraftColour>>,
}

/// Reject files the game would not have written
pub fn validate_extension(file_name: &str) -> Result<(), ParseError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension {
        Some(ext) if BLUEPRINT_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(ParseError::UnsupportedExtension(file_name.to_string())),
    }
}

impl BlueprintDocument {
    /// Parse the JSON document and every assembly's numeric strings
    pub fn parse(file_name: &str, bytes: &[u8]) -> Result<Self, ParseError> {
        let raw: RawBlueprintFile =
            serde_json::from_slice(bytes).map_err(|source| ParseError::Json {
                file: file_name.to_string(),
                source,
            })?;

        let mut item_dictionary = HashMap::with_capacity(raw.item_dictionary.len());
        for (key, guid) in raw.item_dictionary {
            let id = key
                .trim()
                .parse::<i64>()
                .map_err(|_| malformed(file_name, "ItemDictionary", &key))?;
            item_dictionary.insert(id, guid);
        }

        let craft_colours = raw
            .blueprint
            .craft_colours
            .as_ref()
            .map(|colours| {
                colours
                    .iter()
                    .map(|c| parse_craft_colour(file_name, c))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        let meta = BlueprintMeta {
            name: raw.name,
            saved_total_block_count: raw.saved_total_block_count,
            saved_material_cost: raw.saved_material_cost,
            total_block_count: raw.blueprint.total_block_count.clone(),
            game_version: raw.blueprint.game_version.clone(),
            author_details: raw.blueprint.author_details.clone(),
        };

        let tree = build_tree(file_name, raw.blueprint)?;

        Ok(Self {
            file_name: file_name.to_string(),
            meta,
            item_dictionary,
            tree,
            craft_colours,
        })
    }
}

/// Flatten the nested assemblies into an arena in pre-order, parents before children
fn build_tree(file_name: &str, root: RawAssembly) -> Result<AssemblyTree, ParseError> {
    let mut tree = AssemblyTree::default();
    let mut stack: Vec<(Option<usize>, RawAssembly)> = vec![(None, root)];

    while let Some((parent, mut raw)) = stack.pop() {
        let index = tree.nodes.len();
        let children = std::mem::take(&mut raw.children);
        let node = parse_node(file_name, parent, raw)?;
        tree.nodes.push(node);
        if let Some(p) = parent {
            tree.nodes[p].children.push(index);
        }
        // Reverse so children keep their document order when popped.
        for child in children.into_iter().rev() {
            stack.push((Some(index), child));
        }
    }

    Ok(tree)
}

fn parse_node(
    file_name: &str,
    parent: Option<usize>,
    raw: RawAssembly,
) -> Result<AssemblyNode, ParseError> {
    // The root's own transform is ignored, it defines the world frame.
    let (local_rotation, local_position) = match parent {
        None => (DQuat::IDENTITY, [0.0; 3]),
        Some(_) => {
            let rotation = raw
                .local_rotation
                .as_deref()
                .ok_or_else(|| malformed(file_name, "LocalRotation", "<missing>"))?;
            let position = raw
                .local_position
                .as_deref()
                .ok_or_else(|| malformed(file_name, "LocalPosition", "<missing>"))?;
            (
                parse_quaternion(file_name, rotation)?,
                parse_vec3(file_name, "LocalPosition", position)?,
            )
        }
    };

    let count = raw.positions.len();
    if raw.block_count.is_some_and(|declared| declared != count) {
        warn!(
            "{}: block count {:?} does not match {} block positions, using positions",
            file_name, raw.block_count, count
        );
    }
    check_length(file_name, "BlockIds", count, raw.block_ids.len())?;
    check_length(file_name, "BLR", count, raw.rotations.len())?;
    if let Some(indices) = &raw.colour_indices {
        check_length(file_name, "BCI", count, indices.len())?;
    }

    let positions = raw
        .positions
        .iter()
        .map(|p| parse_vec3(file_name, "BLP", p))
        .collect::<Result<Vec<_>, _>>()?;

    let rotation_ids = raw
        .rotations
        .iter()
        .map(|&r| {
            u32::try_from(r)
                .ok()
                .filter(|id| *id < 24)
                .ok_or_else(|| ParseError::RotationId {
                    file: file_name.to_string(),
                    id: r.clamp(0, u32::MAX as i64) as u32,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AssemblyNode {
        parent,
        children: Vec::new(),
        local_rotation,
        local_position,
        declared_min: parse_vec3(file_name, "MinCords", &raw.min_cords)?,
        declared_max: parse_vec3(file_name, "MaxCords", &raw.max_cords)?,
        block_ids: raw.block_ids,
        positions,
        rotation_ids,
        colour_indices: raw.colour_indices,
    })
}

fn check_length(
    file_name: &str,
    field: &'static str,
    expected: usize,
    found: usize,
) -> Result<(), ParseError> {
    if expected == found {
        Ok(())
    } else {
        Err(ParseError::ArrayLength {
            file: file_name.to_string(),
            field,
            expected,
            found,
        })
    }
}

fn malformed(file_name: &str, field: &'static str, value: &str) -> ParseError {
    ParseError::MalformedField {
        file: file_name.to_string(),
        field,
        value: value.to_string(),
    }
}

fn parse_floats<const N: usize>(
    file_name: &str,
    field: &'static str,
    text: &str,
) -> Result<[f64; N], ParseError> {
    let mut out = [0.0; N];
    let mut parts = text.split(',');
    for slot in out.iter_mut() {
        *slot = parts
            .next()
            .and_then(|p| p.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .ok_or_else(|| malformed(file_name, field, text))?;
    }
    if parts.next().is_some() {
        return Err(malformed(file_name, field, text));
    }
    Ok(out)
}

/// `"x,y,z"`
pub fn parse_vec3(file_name: &str, field: &'static str, text: &str) -> Result<[f64; 3], ParseError> {
    parse_floats::<3>(file_name, field, text)
}

/// `"x,y,z,w"`, normalised
pub fn parse_quaternion(file_name: &str, text: &str) -> Result<DQuat, ParseError> {
    let [x, y, z, w] = parse_floats::<4>(file_name, "LocalRotation", text)?;
    let q = DQuat::from_xyzw(x, y, z, w);
    if q.length_squared() < 1e-12 {
        return Err(malformed(file_name, "LocalRotation", text));
    }
    Ok(q.normalize())
}

/// `"r,g,b,a"` with components in 0..1
fn parse_craft_colour(file_name: &str, text: &str) -> Result<CraftColour, ParseError> {
    let [r, g, b, a] = parse_floats::<4>(file_name, "COL", text)?;
    let unit = |v: f64| v.clamp(0.0, 1.0) as f32;
    Ok(CraftColour {
        rgb: [unit(r), unit(g), unit(b)],
        alpha: unit(a),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn single_block_json(guid: &str, position: &str) -> String {
        format!(
            r#"{{
                "Name": "Test Craft",
                "SavedTotalBlockCount": 1,
                "SavedMaterialCost": 12.4,
                "ItemDictionary": {{"7": "{guid}"}},
                "Blueprint": {{
                    "LocalRotation": "0,0,0,1",
                    "LocalPosition": "0,0,0",
                    "MinCords": "{position}",
                    "MaxCords": "{position}",
                    "BlockCount": 1,
                    "BlockIds": [7],
                    "BLP": ["{position}"],
                    "BLR": [0],
                    "BCI": [0],
                    "SCs": [],
                    "GameVersion": "4.2.10",
                    "AuthorDetails": {{"CreatorReadableName": "Tester"}}
                }}
            }}"#
        )
    }

    #[test]
    fn test_parse_minimal_document() {
        let doc = BlueprintDocument::parse(
            "craft.blueprint",
            single_block_json("metal-cube", "1,2,3").as_bytes(),
        )
        .unwrap();
        assert_eq!(doc.tree.nodes.len(), 1);
        assert_eq!(doc.tree.nodes[0].positions, vec![[1.0, 2.0, 3.0]]);
        assert_eq!(doc.item_dictionary.get(&7).map(String::as_str), Some("metal-cube"));
        assert!(doc.craft_colours.is_none());
        assert_eq!(doc.meta.name, Some(Value::from("Test Craft")));
    }

    #[test]
    fn test_root_transform_is_ignored() {
        let json = single_block_json("metal-cube", "0,0,0")
            .replace(r#""LocalRotation": "0,0,0,1""#, r#""LocalRotation": "0,0.7071,0,0.7071""#)
            .replace(r#""LocalPosition": "0,0,0""#, r#""LocalPosition": "5,5,5""#);
        let doc = BlueprintDocument::parse("a.blueprint", json.as_bytes()).unwrap();
        assert_eq!(doc.tree.nodes[0].local_rotation, DQuat::IDENTITY);
        assert_eq!(doc.tree.nodes[0].local_position, [0.0; 3]);
    }

    #[test]
    fn test_children_in_document_order() {
        let json = r#"{
            "ItemDictionary": {},
            "Blueprint": {
                "MinCords": "0,0,0", "MaxCords": "0,0,0",
                "BlockIds": [], "BLP": [], "BLR": [],
                "SCs": [
                    {"LocalRotation": "0,0,0,1", "LocalPosition": "1,0,0",
                     "MinCords": "0,0,0", "MaxCords": "0,0,0",
                     "BlockIds": [], "BLP": [], "BLR": [],
                     "SCs": [
                        {"LocalRotation": "0,0,0,1", "LocalPosition": "3,0,0",
                         "MinCords": "0,0,0", "MaxCords": "0,0,0",
                         "BlockIds": [], "BLP": [], "BLR": []}
                     ]},
                    {"LocalRotation": "0,0,0,1", "LocalPosition": "2,0,0",
                     "MinCords": "0,0,0", "MaxCords": "0,0,0",
                     "BlockIds": [], "BLP": [], "BLR": []}
                ]
            }
        }"#;
        let doc = BlueprintDocument::parse("a.blueprint", json.as_bytes()).unwrap();
        let nodes = &doc.tree.nodes;
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0].children, vec![1, 3]);
        assert_eq!(nodes[1].children, vec![2]);
        assert_eq!(nodes[1].local_position, [1.0, 0.0, 0.0]);
        assert_eq!(nodes[2].parent, Some(1));
        assert_eq!(nodes[3].local_position, [2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_craft_colours_parsed() {
        let json = single_block_json("metal-cube", "0,0,0")
            .replace(r#""SCs": []"#, r#""SCs": [], "COL": ["1,0,0,0.5", "0.2,0.4,0.6,1"]"#);
        let doc = BlueprintDocument::parse("a.blueprint", json.as_bytes()).unwrap();
        let colours = doc.craft_colours.unwrap();
        assert_eq!(colours.len(), 2);
        assert_eq!(colours[0].rgb, [1.0, 0.0, 0.0]);
        assert_eq!(colours[0].alpha, 0.5);
    }

    #[test]
    fn test_block_count_mismatch_trusts_positions() {
        let json = single_block_json("metal-cube", "0,0,0")
            .replace(r#""BlockCount": 1"#, r#""BlockCount": 9"#);
        let doc = BlueprintDocument::parse("a.blueprint", json.as_bytes()).unwrap();
        assert_eq!(doc.tree.nodes[0].positions.len(), 1);
    }

    #[test]
    fn test_malformed_position_fails() {
        let json = single_block_json("metal-cube", "0,0,0").replace(r#"["0,0,0"]"#, r#"["0,zero,0"]"#);
        let err = BlueprintDocument::parse("a.blueprint", json.as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::MalformedField { field: "BLP", .. }));
    }

    #[test]
    fn test_missing_required_field_fails() {
        let json = single_block_json("metal-cube", "0,0,0").replace(r#""BLR": [0],"#, "");
        let err = BlueprintDocument::parse("a.blueprint", json.as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::Json { .. }));
    }

    #[test]
    fn test_rotation_id_out_of_range() {
        let json = single_block_json("metal-cube", "0,0,0").replace(r#""BLR": [0]"#, r#""BLR": [24]"#);
        let err = BlueprintDocument::parse("a.blueprint", json.as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::RotationId { id: 24, .. }));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_vec3("f", "BLP", " 1, -2.5 ,3").unwrap(), [1.0, -2.5, 3.0]);
        assert!(parse_vec3("f", "BLP", "1,2").is_err());
        assert!(parse_vec3("f", "BLP", "1,2,3,4").is_err());
        assert!(parse_quaternion("f", "0,0,0,0").is_err());
    }

    #[test]
    fn test_validate_extension() {
        assert!(validate_extension("ship.blueprint").is_ok());
        assert!(validate_extension("ship.Blueprint_BA").is_ok());
        assert!(validate_extension("ship.blueprint_bac").is_ok());
        assert!(validate_extension("ship.json").is_err());
        assert!(validate_extension("ship").is_err());
    }
}
