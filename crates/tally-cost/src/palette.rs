//! Deterministic chart colours for models.
//!
//! A model's colour depends only on its rank in the sorted unique-model
//! list. Ranks past the palette size reuse the palette with lower opacity.

use std::fmt;

use serde::{Deserialize, Serialize};
use tally_core::config::{parse_hex_color, DEFAULT_OPACITY_STEP};

use crate::error::{CostError, Result};

/// Built-in six-colour palette.
pub const DEFAULT_PALETTE: [(u8, u8, u8); 6] = [
    (0x4e, 0x79, 0xa7),
    (0xf2, 0x8e, 0x2b),
    (0xe1, 0x57, 0x59),
    (0x76, 0xb7, 0xb2),
    (0x59, 0xa1, 0x4f),
    (0xed, 0xc9, 0x48),
];

/// An RGB colour with opacity, rendered as CSS `rgba(...)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub opacity: f64,
}

impl fmt::Display for ModelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.opacity)
    }
}

/// Palette plus the opacity step applied per cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<(u8, u8, u8)>,
    opacity_step: f64,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_PALETTE.to_vec(),
            opacity_step: DEFAULT_OPACITY_STEP,
        }
    }
}

impl Palette {
    /// Build a palette from `#rrggbb` strings.
    pub fn from_hex(colors: &[String], opacity_step: f64) -> Result<Self> {
        if colors.is_empty() {
            return Err(CostError::Config("palette must not be empty".to_string()));
        }
        if !(opacity_step > 0.0 && opacity_step <= 1.0) {
            return Err(CostError::Config(format!(
                "opacity step {opacity_step} must be within (0, 1]"
            )));
        }
        let colors = colors
            .iter()
            .map(|c| {
                parse_hex_color(c)
                    .ok_or_else(|| CostError::Config(format!("invalid palette colour '{c}'")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            colors,
            opacity_step,
        })
    }

    /// Number of base colours.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Always false; construction rejects an empty palette.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Colour for the model at `index` in the sorted model list.
    pub fn color_at(&self, index: usize) -> ModelColor {
        let (r, g, b) = self.colors[index % self.colors.len()];
        let cycle = (index / self.colors.len()) as f64;
        let opacity = (1.0 - self.opacity_step * cycle).max(0.0);
        ModelColor {
            r,
            g,
            b,
            opacity: (opacity * 100.0).round() / 100.0,
        }
    }

    /// Colour for `model_id`, or `None` when it is not in `models`.
    pub fn color_for_model(&self, models: &[String], model_id: &str) -> Option<ModelColor> {
        models
            .iter()
            .position(|m| m == model_id)
            .map(|index| self.color_at(index))
    }
}
