//! Dashboard configuration loaded from `~/.tally/config.yaml`.
//!
//! Every field has a default, so an absent file or a partial file is valid.
//!
//! ```yaml
//! extrapolation_factor: 30
//! filter_fields: [project, billingType, modelProvider, modelId]
//! palette: ["#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948"]
//! opacity_step: 0.25
//! default_account: All
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, TallyError};
use crate::logging::tally_home;

/// Multiplier turning the visible cost total into a monthly projection.
pub const DEFAULT_EXTRAPOLATION_FACTOR: f64 = 30.0;

/// Opacity removed from a model colour per full pass through the palette.
pub const DEFAULT_OPACITY_STEP: f64 = 0.25;

/// Account scope sentinel meaning "no account restriction".
pub const ALL_ACCOUNTS: &str = "All";

/// Dashboard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TallyConfig {
    /// Multiplier applied to the summed cost for the headline projection
    #[serde(default = "default_extrapolation_factor")]
    pub extrapolation_factor: f64,

    /// Record fields offered as filter groups, in display order
    #[serde(default = "default_filter_fields")]
    pub filter_fields: Vec<String>,

    /// Chart palette as `#rrggbb` strings
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,

    /// Opacity reduction per palette cycle
    #[serde(default = "default_opacity_step")]
    pub opacity_step: f64,

    /// Account scope applied at startup
    #[serde(default = "default_account")]
    pub default_account: String,
}

fn default_extrapolation_factor() -> f64 {
    DEFAULT_EXTRAPOLATION_FACTOR
}

fn default_filter_fields() -> Vec<String> {
    ["project", "billingType", "modelProvider", "modelId"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_palette() -> Vec<String> {
    ["#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_opacity_step() -> f64 {
    DEFAULT_OPACITY_STEP
}

fn default_account() -> String {
    ALL_ACCOUNTS.to_string()
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            extrapolation_factor: default_extrapolation_factor(),
            filter_fields: default_filter_fields(),
            palette: default_palette(),
            opacity_step: default_opacity_step(),
            default_account: default_account(),
        }
    }
}

impl TallyConfig {
    /// Load configuration from a YAML file that must exist.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TallyError::config_not_found_with_source(path, e)
            } else {
                TallyError::io("reading config", path, e)
            }
        })?;

        let config = Self::from_yaml_str(&content).map_err(|e| match e {
            TallyError::ConfigInvalid { message, .. } => TallyError::ConfigInvalid {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;

        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as an empty mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(content).map_err(|e| TallyError::ConfigInvalid {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `~/.tally/config.yaml`, falling back to defaults when absent.
    pub fn load_default() -> Result<Self> {
        let path = default_config_path()?;
        if !path.exists() {
            debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }
        Self::from_yaml(&path)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.extrapolation_factor.is_finite() && self.extrapolation_factor > 0.0) {
            return Err(TallyError::config_validation(
                "extrapolation_factor must be a positive number",
            ));
        }
        if !(self.opacity_step > 0.0 && self.opacity_step <= 1.0) {
            return Err(TallyError::config_validation(
                "opacity_step must be within (0, 1]",
            ));
        }
        if self.palette.is_empty() {
            return Err(TallyError::config_validation("palette must not be empty"));
        }
        if let Some(bad) = self.palette.iter().find(|c| parse_hex_color(c).is_none()) {
            return Err(TallyError::config_validation(format!(
                "palette entry '{bad}' is not a #rrggbb colour"
            )));
        }
        if self.filter_fields.is_empty() {
            return Err(TallyError::config_validation(
                "filter_fields must name at least one field",
            ));
        }
        if self.default_account.trim().is_empty() {
            return Err(TallyError::config_validation(
                "default_account must not be blank",
            ));
        }
        Ok(())
    }
}

/// Path of the default configuration file: `~/.tally/config.yaml`.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(tally_home()?.join("config.yaml"))
}

/// Parse a `#rrggbb` colour into its components.
pub fn parse_hex_color(s: &str) -> Option<(u8, u8, u8)> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}
