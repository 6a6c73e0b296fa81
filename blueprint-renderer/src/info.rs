/// Info panel record gathered from blueprint metadata
use crate::blueprint::BlueprintMeta;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

pub const UNKNOWN_TEXT: &str = "Unknown";
pub const UNAVAILABLE_TEXT: &str = "?";

/// Ordered `key: value` lines shown in the info panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoRecord {
    pub entries: Vec<(String, String)>,
    #[serde(skip)]
    pub game_version: Option<Vec<u32>>,
}

impl InfoRecord {
    /// Collect every field, substituting placeholders for values that cannot be read
    pub fn gather(meta: &BlueprintMeta, size: [usize; 3]) -> Self {
        let name = meta
            .name
            .as_ref()
            .and_then(value_text)
            .unwrap_or_else(|| UNKNOWN_TEXT.to_string());

        let saved = meta.saved_total_block_count.as_ref().and_then(value_number);
        let declared = meta.total_block_count.as_ref().and_then(value_number);
        let blocks = match (saved, declared) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
        .map(|n| thousands(n.round() as i64))
        .unwrap_or_else(|| UNAVAILABLE_TEXT.to_string());

        let cost = meta
            .saved_material_cost
            .as_ref()
            .and_then(value_number)
            .map(|c| thousands(c.round() as i64))
            .unwrap_or_else(|| UNAVAILABLE_TEXT.to_string());

        let dims = format!(
            "W:{} H:{} L:{}",
            thousands(size[0] as i64),
            thousands(size[1] as i64),
            thousands(size[2] as i64)
        );

        let author = meta
            .author_details
            .as_ref()
            .and_then(|details| details.get("CreatorReadableName"))
            .and_then(value_text)
            .unwrap_or_else(|| UNKNOWN_TEXT.to_string());

        let game_version = meta.game_version.as_ref().and_then(parse_game_version);
        match &game_version {
            Some(version) if version.first().is_some_and(|major| *major < 2) => {
                warn!("Blueprint was saved by an older game version {:?}", version);
            }
            None => warn!("Game version could not be read"),
            _ => {}
        }

        Self {
            entries: vec![
                ("Name".to_string(), name),
                ("Blocks".to_string(), blocks),
                ("Cost".to_string(), cost),
                ("Size".to_string(), dims),
                ("Author".to_string(), author),
            ],
            game_version,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(|(k, v)| format!("{k}: {v}")).collect()
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn value_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// `"4.2.10"` → `[4, 2, 10]`, keeping only the digits of each component
pub fn parse_game_version(value: &Value) -> Option<Vec<u32>> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    text.split('.')
        .map(|part| {
            let digits: String = part.chars().filter(char::is_ascii_digit).collect();
            digits.parse::<u32>().ok()
        })
        .collect()
}

/// Group digits in threes with commas
pub fn thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
