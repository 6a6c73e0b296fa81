/// Render options, option-string parsers and the optional TOML application config
use crate::error::ConfigError;
use crate::firing::FiringOrder;
use constants::render_settings::ASPECT_RATIO_PRESETS;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Output width to height ratio, e.g. `16:9`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct AspectRatio {
    pub width: f64,
    pub height: f64,
}

impl AspectRatio {
    pub fn ratio(&self) -> f64 {
        self.width / self.height
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = ConfigError;

    /// `W:H`, or a preset name such as `HDTV` or `Ultra Wide`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let text = ASPECT_RATIO_PRESETS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map_or(s, |(_, ratio)| *ratio);

        let invalid = || ConfigError::AspectRatio(s.to_string());
        let (w, h) = text.split_once(':').ok_or_else(invalid)?;
        let width: f64 = w.trim().parse().map_err(|_| invalid())?;
        let height: f64 = h.trim().parse().map_err(|_| invalid())?;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(invalid());
        }
        Ok(AspectRatio { width, height })
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Per-view depth clip fractions, indexed like world axes (side = x, top = y, front = z).
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(try_from = "String")]
pub struct ClipFractions(pub [Option<f64>; 3]);

impl FromStr for ClipFractions {
    type Err = ConfigError;

    /// `side,top,front` with empty entries left unset. When `;` separates the entries,
    /// `,` may be used as the decimal separator: `0,5;;0,25`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::Clip(s.to_string());
        let s = s.trim();
        if s.is_empty() {
            return Ok(ClipFractions::default());
        }
        let entries: Vec<&str> = if s.contains(';') { s.split(';').collect() } else { s.split(',').collect() };
        if entries.len() > 3 {
            return Err(invalid());
        }

        let mut fractions = [None; 3];
        for (slot, entry) in fractions.iter_mut().zip(entries) {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let value: f64 = entry.replace(',', ".").parse().map_err(|_| invalid())?;
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid());
            }
            *slot = Some(value);
        }
        Ok(ClipFractions(fractions))
    }
}

impl TryFrom<String> for ClipFractions {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Per-render switches.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Produce a firing animation (GIF) instead of a still image (PNG)
    pub animate: bool,
    pub firing_order: FiringOrder,
    pub clip: ClipFractions,
    /// Tint blocks with the blueprint's craft colours
    pub craft_colours: bool,
    /// Stills only
    pub aspect_ratio: Option<AspectRatio>,
    /// Suppress per-stage info logging
    pub silent: bool,
    /// Show a progress bar while encoding animations
    pub progress: bool,
    /// Seed for random firing orders and flame noise; entropy when unset
    pub seed: Option<u64>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            animate: false,
            firing_order: FiringOrder::default(),
            clip: ClipFractions::default(),
            craft_colours: true,
            aspect_ratio: None,
            silent: false,
            progress: false,
            seed: None,
        }
    }
}

/// Application settings loaded from a TOML file; every entry is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding blocks.json, materials.json and size_id_dictionary.json
    pub catalog_dir: Option<PathBuf>,
    /// Directory with firing sprite frames; generated sprites when unset
    pub sprite_dir: Option<PathBuf>,
    /// TrueType/OpenType font for text; built-in bitmap font when unset
    pub font_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub render: RenderOptions,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio_parsing() {
        let ratio: AspectRatio = "16:9".parse().unwrap();
        assert!((ratio.ratio() - 16.0 / 9.0).abs() < 1e-12);
        let preset: AspectRatio = "ultra wide".parse().unwrap();
        assert_eq!(preset, AspectRatio { width: 21.0, height: 9.0 });
        assert!("16x9".parse::<AspectRatio>().is_err());
        assert!("0:9".parse::<AspectRatio>().is_err());
        assert!("a:b".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_clip_parsing() {
        assert_eq!("0.5,,0.25".parse::<ClipFractions>().unwrap(), ClipFractions([Some(0.5), None, Some(0.25)]));
        assert_eq!("0,5;;0,25".parse::<ClipFractions>().unwrap(), ClipFractions([Some(0.5), None, Some(0.25)]));
        assert_eq!(",0.75".parse::<ClipFractions>().unwrap(), ClipFractions([None, Some(0.75), None]));
        assert_eq!("".parse::<ClipFractions>().unwrap(), ClipFractions::default());
        assert!("1.5".parse::<ClipFractions>().is_err());
        assert!("0.1,0.2,0.3,0.4".parse::<ClipFractions>().is_err());
        assert!("half".parse::<ClipFractions>().is_err());
    }

    #[test]
    fn test_render_option_defaults() {
        let options = RenderOptions::default();
        assert!(!options.animate);
        assert!(options.craft_colours);
        assert_eq!(options.firing_order, FiringOrder::FrontToBack);
        assert_eq!(options.clip, ClipFractions::default());
        assert!(options.aspect_ratio.is_none());
    }

    #[test]
    fn test_app_config_from_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            catalog_dir = "data"
            font_path = "fonts/bahnschrift.ttf"

            [render]
            animate = true
            firing_order = "random"
            clip = "0.5,,"
            aspect_ratio = "HDTV"
            craft_colours = false
            seed = 42
            "#,
        )
        .unwrap();
        assert_eq!(config.catalog_dir, Some(PathBuf::from("data")));
        assert!(config.sprite_dir.is_none());
        assert!(config.render.animate);
        assert_eq!(config.render.firing_order, FiringOrder::Random);
        assert_eq!(config.render.clip, ClipFractions([Some(0.5), None, None]));
        assert_eq!(config.render.aspect_ratio, Some(AspectRatio { width: 16.0, height: 9.0 }));
        assert!(!config.render.craft_colours);
        assert_eq!(config.render.seed, Some(42));
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_bad_toml_value_rejected() {
        assert!(toml::from_str::<AppConfig>("[render]\nfiring_order = \"sideways\"").is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let err = AppConfig::load(Path::new("/nonexistent/renderer.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
