//! Configuration module.
//!
//! Handles loading, validating, and merging `media-prep.toml`. Stock defaults
//! are overridden by whatever the user config specifies; every command works
//! with no config file at all.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [photos]
//! source = "favourites"           # Gallery source photos
//! output = "favourites_webp"      # Converted WebP output
//! manifest = "public/photos.json" # Generated gallery manifest
//! extensions = ["jpg", "jpeg", "png", "webp"] # Converter input filter
//!
//! [webp]
//! quality = 80                    # Lossy WebP quality (0-100)
//!
//! [thumbnails]
//! enabled = true                  # Write <stem>-thumb.webp next to each photo
//! max_size = 480                  # Bounding box edge in pixels
//!
//! [processing]
//! max_threads = 8                 # Worker cap (clamped to CPU cores)
//!
//! [projects]
//! root = "public/projects"
//! quality = 85
//! delete_source = true
//! url_prefix = "/projects"
//!
//! [video]
//! root = "public/projects"
//! crf = 30
//! threads = 0                     # 0 = let the encoder decide
//!
//! [icons]
//! dir = "public/icons"
//! user_agent = "Mozilla/5.0 ..."
//!
//! [icons.urls]                    # Replaces the built-in list when present
//! "rust.svg" = "https://..."
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse; override just the values you want:
//!
//! ```toml
//! [webp]
//! quality = 70
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::naming;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "media-prep.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Full tool configuration. Every field has a default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Gallery photo locations and converter input filter.
    pub photos: PhotosConfig,
    /// WebP encoding settings for gallery photos.
    pub webp: WebpConfig,
    /// Companion thumbnail settings.
    pub thumbnails: ThumbnailsConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// In-place PNG to WebP conversion of project assets.
    pub projects: ProjectsConfig,
    /// ffmpeg transcoding settings.
    pub video: VideoConfig,
    /// Icon download settings.
    pub icons: IconsConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webp.quality > 100 {
            return Err(ConfigError::Validation("webp.quality must be 0-100".into()));
        }
        if self.projects.quality > 100 {
            return Err(ConfigError::Validation(
                "projects.quality must be 0-100".into(),
            ));
        }
        if self.processing.max_threads == 0 {
            return Err(ConfigError::Validation(
                "processing.max_threads must be at least 1".into(),
            ));
        }
        if self.thumbnails.max_size == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.max_size must be non-zero".into(),
            ));
        }
        if self.photos.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "photos.extensions must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Gallery photo locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhotosConfig {
    /// Directory of source photos (flat, not recursed).
    pub source: PathBuf,
    /// Directory receiving converted `.webp` files.
    pub output: PathBuf,
    /// Path of the generated JSON manifest.
    pub manifest: PathBuf,
    /// Extensions the converter picks up (case-insensitive, no dot).
    pub extensions: Vec<String>,
}

impl Default for PhotosConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("favourites"),
            output: PathBuf::from("favourites_webp"),
            manifest: PathBuf::from("public/photos.json"),
            extensions: naming::PHOTO_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

/// WebP encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebpConfig {
    /// Lossy quality (0 = smallest, 100 = best).
    pub quality: u32,
}

impl Default for WebpConfig {
    fn default() -> Self {
        Self { quality: 80 }
    }
}

/// Companion thumbnail settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    pub enabled: bool,
    /// Edge of the square bounding box the thumbnail is fitted into.
    pub max_size: u32,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 480,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of conversion workers.
    /// Values larger than the core count are clamped down.
    pub max_threads: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self { max_threads: 8 }
    }
}

/// Resolve the effective worker count: `min(max_threads, cores)`.
///
/// The user can constrain down, not up.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    config.max_threads.clamp(1, cores.max(1))
}

/// In-place PNG to WebP conversion of project assets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectsConfig {
    pub root: PathBuf,
    pub quality: u32,
    /// Remove each PNG once its WebP has been written.
    pub delete_source: bool,
    /// URL prefix used when printing the old → new path mapping.
    pub url_prefix: String,
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("public/projects"),
            quality: 85,
            delete_source: true,
            url_prefix: "/projects".to_string(),
        }
    }
}

/// ffmpeg transcoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VideoConfig {
    pub root: PathBuf,
    /// VP9 CRF (lower = better quality, typical range 15-40).
    pub crf: u32,
    /// Encoder threads; 0 lets ffmpeg decide.
    pub threads: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("public/projects"),
            crf: 30,
            threads: 0,
        }
    }
}

/// Icon download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IconsConfig {
    pub dir: PathBuf,
    pub user_agent: String,
    /// Target file name → source URL. A user table replaces this one whole.
    pub urls: BTreeMap<String, String>,
}

impl Default for IconsConfig {
    fn default() -> Self {
        let urls = [
            (
                "typescript.svg",
                "https://upload.wikimedia.org/wikipedia/commons/4/4c/Typescript_logo_2020.svg",
            ),
            (
                "javascript.svg",
                "https://upload.wikimedia.org/wikipedia/commons/9/99/Unofficial_JavaScript_logo_2.svg",
            ),
            (
                "python.svg",
                "https://upload.wikimedia.org/wikipedia/commons/c/c3/Python-logo-notext.svg",
            ),
            (
                "java.svg",
                "https://upload.wikimedia.org/wikipedia/it/2/2e/Java_Logo.svg",
            ),
            (
                "rust.svg",
                "https://upload.wikimedia.org/wikipedia/commons/d/d5/Rust_programming_language_black_logo.svg",
            ),
            (
                "c.svg",
                "https://upload.wikimedia.org/wikipedia/commons/1/19/C_Programming_Language.svg",
            ),
            (
                "cplusplus.svg",
                "https://www.svgrepo.com/download/374094/c-plus-plus.svg",
            ),
            (
                "react.svg",
                "https://upload.wikimedia.org/wikipedia/commons/a/a7/React-icon.svg",
            ),
            (
                "sql.svg",
                "https://www.svgrepo.com/download/331760/sql-database-generic.svg",
            ),
            (
                "sqlite.svg",
                "https://upload.wikimedia.org/wikipedia/commons/3/38/SQLite370.svg",
            ),
            (
                "postgresql.svg",
                "https://upload.wikimedia.org/wikipedia/commons/2/29/Postgresql_elephant.svg",
            ),
        ]
        .into_iter()
        .map(|(name, url)| (name.to_string(), url.to_string()))
        .collect();

        Self {
            dir: PathBuf::from("public/icons"),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36"
                .to_string(),
            urls,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(Config::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Tables a user config replaces instead of merging into, so entries can be
/// removed as well as added.
const REPLACED_TABLES: &[&[&str]] = &[&["icons", "urls"]];

/// Remove from `base` every [`REPLACED_TABLES`] entry that `overlay` sets.
fn drop_replaced_tables(base: &mut toml::Value, overlay: &toml::Value) {
    for path in REPLACED_TABLES {
        let Some((last, parents)) = path.split_last() else {
            continue;
        };
        let in_overlay = parents
            .iter()
            .try_fold(overlay, |value, key| value.get(*key))
            .is_some_and(|table| table.get(*last).is_some());
        if !in_overlay {
            continue;
        }
        let parent = parents
            .iter()
            .try_fold(&mut *base, |value, key| value.get_mut(*key));
        if let Some(toml::Value::Table(table)) = parent {
            table.remove(*last);
        }
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file doesn't exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<Config, ConfigError> {
    let mut base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => {
            drop_replaced_tables(&mut base, &ov);
            merge_toml(base, ov)
        }
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file, falling back to defaults if it is absent.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let overlay = load_raw_config(path)?;
    if overlay.is_none() {
        log::debug!("no config at {}; using defaults", path.display());
    }
    resolve_config(overlay)
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# media-prep configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Gallery photos
# ---------------------------------------------------------------------------
[photos]
# Flat directory of source photos (jpg/jpeg/png/webp end up in the manifest).
source = "favourites"
# Where converted <stem>.webp files are written.
output = "favourites_webp"
# Gallery manifest, fully regenerated on every run.
manifest = "public/photos.json"
# Extensions the converter picks up (case-insensitive). Photos the manifest
# lists are always converted by `build`, whatever this says.
extensions = ["jpg", "jpeg", "png", "webp"]

# ---------------------------------------------------------------------------
# WebP encoding
# ---------------------------------------------------------------------------
[webp]
# Lossy quality (0 = smallest file, 100 = best).
quality = 80

# ---------------------------------------------------------------------------
# Thumbnails (<stem>-thumb.webp, referenced by the manifest)
# ---------------------------------------------------------------------------
[thumbnails]
enabled = true
# Thumbnails fit inside a max_size x max_size box; never upscaled.
max_size = 480

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel conversion workers (clamped to the number of CPU cores).
max_threads = 8

# ---------------------------------------------------------------------------
# Project assets: PNG -> WebP, in place
# ---------------------------------------------------------------------------
[projects]
root = "public/projects"
quality = 85
# Delete each PNG after its WebP has been written.
delete_source = true
# Prefix for the printed old -> new URL mapping.
url_prefix = "/projects"

# ---------------------------------------------------------------------------
# Video (requires ffmpeg on PATH)
# ---------------------------------------------------------------------------
[video]
root = "public/projects"
# VP9 CRF for the webm command (lower = better quality, 15-40).
crf = 30
# Encoder threads (0 = let the encoder decide).
threads = 0

# ---------------------------------------------------------------------------
# Icons
# ---------------------------------------------------------------------------
[icons]
dir = "public/icons"
user_agent = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36"

# File name -> URL. This table replaces the built-in list as a whole: delete
# a line to stop downloading that icon.
[icons.urls]
"c.svg" = "https://upload.wikimedia.org/wikipedia/commons/1/19/C_Programming_Language.svg"
"cplusplus.svg" = "https://www.svgrepo.com/download/374094/c-plus-plus.svg"
"java.svg" = "https://upload.wikimedia.org/wikipedia/it/2/2e/Java_Logo.svg"
"javascript.svg" = "https://upload.wikimedia.org/wikipedia/commons/9/99/Unofficial_JavaScript_logo_2.svg"
"postgresql.svg" = "https://upload.wikimedia.org/wikipedia/commons/2/29/Postgresql_elephant.svg"
"python.svg" = "https://upload.wikimedia.org/wikipedia/commons/c/c3/Python-logo-notext.svg"
"react.svg" = "https://upload.wikimedia.org/wikipedia/commons/a/a7/React-icon.svg"
"rust.svg" = "https://upload.wikimedia.org/wikipedia/commons/d/d5/Rust_programming_language_black_logo.svg"
"sql.svg" = "https://www.svgrepo.com/download/331760/sql-database-generic.svg"
"sqlite.svg" = "https://upload.wikimedia.org/wikipedia/commons/3/38/SQLite370.svg"
"typescript.svg" = "https://upload.wikimedia.org/wikipedia/commons/4/4c/Typescript_logo_2020.svg"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_paths() {
        let config = Config::default();
        assert_eq!(config.photos.source, PathBuf::from("favourites"));
        assert_eq!(config.photos.output, PathBuf::from("favourites_webp"));
        assert_eq!(config.photos.manifest, PathBuf::from("public/photos.json"));
        assert_eq!(config.photos.extensions, naming::PHOTO_EXTENSIONS);
    }

    #[test]
    fn default_config_encoding_settings() {
        let config = Config::default();
        assert_eq!(config.webp.quality, 80);
        assert_eq!(config.projects.quality, 85);
        assert_eq!(config.video.crf, 30);
        assert_eq!(config.video.threads, 0);
        assert_eq!(config.processing.max_threads, 8);
        assert!(config.thumbnails.enabled);
    }

    #[test]
    fn default_icons_list() {
        let config = Config::default();
        assert_eq!(config.icons.urls.len(), 11);
        assert!(config.icons.urls.contains_key("rust.svg"));
        assert!(config.icons.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[webp]
quality = 70
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.webp.quality, 70);
        // Defaults preserved
        assert_eq!(config.photos.source, PathBuf::from("favourites"));
        assert_eq!(config.processing.max_threads, 8);
    }

    #[test]
    fn unknown_keys_rejected() {
        let toml = r#"
[webp]
qualty = 70
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_quality_over_100() {
        let mut config = Config::default();
        config.webp.quality = 101;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_zero_threads() {
        let mut config = Config::default();
        config.processing.max_threads = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_extensions() {
        let mut config = Config::default();
        config.photos.extensions.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn effective_threads_never_exceeds_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let config = ProcessingConfig { max_threads: 1024 };
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_respects_lower_cap() {
        let config = ProcessingConfig { max_threads: 1 };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge / load tests
    // =========================================================================

    #[test]
    fn merge_toml_overrides_leaf_and_keeps_siblings() {
        let base: toml::Value = toml::from_str(
            r#"
[video]
crf = 30
threads = 0
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[video]
crf = 24
"#,
        )
        .unwrap();

        let merged = merge_toml(base, overlay);
        assert_eq!(merged["video"]["crf"].as_integer(), Some(24));
        assert_eq!(merged["video"]["threads"].as_integer(), Some(0));
    }

    #[test]
    fn user_icon_urls_replace_defaults() {
        let overlay: toml::Value = toml::from_str(
            r#"
[icons.urls]
"go.svg" = "https://example.com/go.svg"
"rust.svg" = "https://example.com/rust.svg"
"#,
        )
        .unwrap();
        let config = resolve_config(Some(overlay)).unwrap();
        assert_eq!(config.icons.urls.len(), 2);
        assert_eq!(config.icons.urls["go.svg"], "https://example.com/go.svg");
        assert_eq!(config.icons.urls["rust.svg"], "https://example.com/rust.svg");
        assert!(!config.icons.urls.contains_key("java.svg"));
    }

    #[test]
    fn icon_settings_without_urls_keep_default_list() {
        let overlay: toml::Value = toml::from_str(
            r#"
[icons]
dir = "static/icons"
"#,
        )
        .unwrap();
        let config = resolve_config(Some(overlay)).unwrap();
        assert_eq!(config.icons.dir, PathBuf::from("static/icons"));
        assert_eq!(config.icons.urls, IconsConfig::default().urls);
    }

    #[test]
    fn empty_icon_table_disables_downloads() {
        let overlay: toml::Value = toml::from_str("[icons.urls]\n").unwrap();
        let config = resolve_config(Some(overlay)).unwrap();
        assert!(config.icons.urls.is_empty());
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config.webp.quality, 80);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            r#"
[photos]
source = "shots"

[thumbnails]
enabled = false
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.photos.source, PathBuf::from("shots"));
        assert!(!config.thumbnails.enabled);
        // Unspecified values should be defaults
        assert_eq!(config.photos.output, PathBuf::from("favourites_webp"));
    }

    #[test]
    fn load_config_invalid_toml_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "this is not [valid toml").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_runs_validation() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "[webp]\nquality = 150\n").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let value: toml::Value = toml::from_str(stock_config_toml()).unwrap();
        let config = resolve_config(Some(value)).unwrap();
        assert_eq!(config.webp.quality, 80);
        assert_eq!(config.icons.urls, IconsConfig::default().urls);
        assert_eq!(config.photos.extensions, naming::PHOTO_EXTENSIONS);
        assert_eq!(config.projects.url_prefix, "/projects");
    }
}
