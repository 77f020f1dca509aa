use crate::classify::ColorClassifier;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Where the three datasets live. Each entry is either an `http(s)://` URL
/// or a local path.
#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub percentages: String,
    pub countries: String,
    pub world: String,
    #[serde(default = "default_world_object")]
    pub world_object: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassificationConfig {
    #[serde(default = "default_min")]
    pub min: f64,
    #[serde(default = "default_max")]
    pub max: f64,
    #[serde(default = "default_palette")]
    pub palette: Vec<String>, // Hex codes, lowest bucket first
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StyleConfig {
    #[serde(default = "default_base_style")]
    pub base: StrokeConfig,
    #[serde(default = "default_highlight_style")]
    pub highlight: StrokeConfig,
    /// Raise hovered features above their siblings. Turn off for renderers
    /// that have no z-order control.
    #[serde(default = "default_true")]
    pub bring_to_front: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StrokeConfig {
    pub weight: f64,
    pub color: String,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    pub fill_opacity: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    pub static_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        ColorClassifier::from_config(&config.classification)?;
        Ok(config)
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            min: default_min(),
            max: default_max(),
            palette: default_palette(),
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            base: default_base_style(),
            highlight: default_highlight_style(),
            bring_to_front: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            static_dir: None,
        }
    }
}

fn default_world_object() -> String {
    "countries".to_string()
}

fn default_min() -> f64 {
    45.0
}

fn default_max() -> f64 {
    100.0
}

pub fn default_palette() -> Vec<String> {
    [
        "#a50026", "#d73027", "#f46d43", "#fdae61", "#fee090", "#e0f3f8", "#abd9e9", "#74add1",
        "#4575b4", "#313695",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

fn default_base_style() -> StrokeConfig {
    StrokeConfig {
        weight: 1.0,
        color: "white".to_string(),
        opacity: 1.0,
        fill_opacity: 0.7,
    }
}

fn default_highlight_style() -> StrokeConfig {
    StrokeConfig {
        weight: 3.0,
        color: "#666".to_string(),
        opacity: 1.0,
        fill_opacity: 0.7,
    }
}

fn default_opacity() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_port() -> u16 {
    3000
}
