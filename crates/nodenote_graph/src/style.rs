// SPDX-License-Identifier: MIT OR Apache-2.0
//! Style defaults, per-document overrides and per-entity overrides.
//!
//! Styling works in three layers:
//! - [`StyleDefaults`] is the global value passed in at workspace construction
//! - [`DocumentStyle`] holds per-document overrides, every field optional
//! - each node, port and pipe carries its own local overrides
//!
//! A property set locally on an entity is never replaced by a document-level
//! or global change. Resolution walks entity, then document, then defaults.

use serde::{Deserialize, Serialize};

/// RGBA color
pub type Rgba = [u8; 4];

/// Font family and point size
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontSpec {
    /// Font family name
    pub family: String,
    /// Point size
    pub size: u32,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "Sans Serif".to_string(),
            size: 9,
        }
    }
}

/// Overridable node properties (attribute and logic nodes)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    /// Text font
    pub font: Option<FontSpec>,
    /// Text color
    pub font_color: Option<Rgba>,
    /// Background color
    pub background: Option<Rgba>,
    /// Background color while selected
    pub selected_background: Option<Rgba>,
    /// Border color
    pub border: Option<Rgba>,
    /// Border color while selected
    pub selected_border: Option<Rgba>,
}

/// Overridable port properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortStyle {
    /// Port diameter
    pub width: Option<f32>,
    /// Fill color
    pub color: Option<Rgba>,
    /// Border color
    pub border: Option<Rgba>,
    /// Fill color on hover
    pub hovered: Option<Rgba>,
    /// Border color on hover
    pub hovered_border: Option<Rgba>,
    /// Fill color while connected
    pub activated: Option<Rgba>,
    /// Border color while connected
    pub activated_border: Option<Rgba>,
}

/// Overridable pipe properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipeStyle {
    /// Stroke width
    pub width: Option<f32>,
    /// Stroke color
    pub color: Option<Rgba>,
    /// Stroke color while selected
    pub selected_color: Option<Rgba>,
    /// Label font
    pub font: Option<FontSpec>,
    /// Label color
    pub font_color: Option<Rgba>,
}

/// Per-document style overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentStyle {
    /// Attribute node overrides
    pub attribute: NodeStyle,
    /// Logic node overrides
    pub logic: NodeStyle,
    /// Port overrides
    pub port: PortStyle,
    /// Pipe overrides
    pub pipe: PipeStyle,
}

/// Fully resolved node style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedNodeStyle {
    /// Text font
    pub font: FontSpec,
    /// Text color
    pub font_color: Rgba,
    /// Background color
    pub background: Rgba,
    /// Background color while selected
    pub selected_background: Rgba,
    /// Border color
    pub border: Rgba,
    /// Border color while selected
    pub selected_border: Rgba,
}

/// Fully resolved port style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPortStyle {
    /// Port diameter
    pub width: f32,
    /// Fill color
    pub color: Rgba,
    /// Border color
    pub border: Rgba,
    /// Fill color on hover
    pub hovered: Rgba,
    /// Border color on hover
    pub hovered_border: Rgba,
    /// Fill color while connected
    pub activated: Rgba,
    /// Border color while connected
    pub activated_border: Rgba,
}

/// Fully resolved pipe style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPipeStyle {
    /// Stroke width
    pub width: f32,
    /// Stroke color
    pub color: Rgba,
    /// Stroke color while selected
    pub selected_color: Rgba,
    /// Label font
    pub font: FontSpec,
    /// Label color
    pub font_color: Rgba,
}

/// Global style defaults, threaded through workspace construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDefaults {
    /// Attribute node defaults
    pub attribute: ResolvedNodeStyle,
    /// Logic node defaults
    pub logic: ResolvedNodeStyle,
    /// Port defaults
    pub port: ResolvedPortStyle,
    /// Pipe defaults
    pub pipe: ResolvedPipeStyle,
}

impl Default for StyleDefaults {
    fn default() -> Self {
        Self {
            attribute: ResolvedNodeStyle {
                font: FontSpec::default(),
                font_color: [0, 0, 0, 255],
                background: [254, 253, 254, 255],
                selected_background: [255, 255, 255, 30],
                border: [46, 57, 66, 255],
                selected_border: [254, 207, 42, 255],
            },
            logic: ResolvedNodeStyle {
                font: FontSpec::default(),
                font_color: [0, 0, 0, 255],
                background: [240, 251, 158, 255],
                selected_background: [255, 255, 255, 30],
                border: [46, 57, 66, 255],
                selected_border: [254, 207, 42, 255],
            },
            port: ResolvedPortStyle {
                width: 10.0,
                color: [255, 255, 255, 255],
                border: [255, 255, 255, 255],
                hovered: [118, 184, 182, 255],
                hovered_border: [99, 180, 255, 255],
                activated: [14, 45, 59, 255],
                activated_border: [107, 166, 193, 255],
            },
            pipe: ResolvedPipeStyle {
                width: 2.0,
                color: [225, 192, 241, 255],
                selected_color: [0, 153, 121, 255],
                font: FontSpec {
                    family: "Sans Serif".to_string(),
                    size: 6,
                },
                font_color: [0, 0, 0, 255],
            },
        }
    }
}

impl NodeStyle {
    /// Resolve local overrides over document overrides over defaults
    pub fn resolve(&self, document: &NodeStyle, defaults: &ResolvedNodeStyle) -> ResolvedNodeStyle {
        ResolvedNodeStyle {
            font: self
                .font
                .clone()
                .or_else(|| document.font.clone())
                .unwrap_or_else(|| defaults.font.clone()),
            font_color: self.font_color.or(document.font_color).unwrap_or(defaults.font_color),
            background: self.background.or(document.background).unwrap_or(defaults.background),
            selected_background: self
                .selected_background
                .or(document.selected_background)
                .unwrap_or(defaults.selected_background),
            border: self.border.or(document.border).unwrap_or(defaults.border),
            selected_border: self
                .selected_border
                .or(document.selected_border)
                .unwrap_or(defaults.selected_border),
        }
    }

    /// Whether any property is locally overridden
    pub fn has_overrides(&self) -> bool {
        *self != Self::default()
    }
}

impl PortStyle {
    /// Resolve local overrides over document overrides over defaults
    pub fn resolve(&self, document: &PortStyle, defaults: &ResolvedPortStyle) -> ResolvedPortStyle {
        ResolvedPortStyle {
            width: self.width.or(document.width).unwrap_or(defaults.width),
            color: self.color.or(document.color).unwrap_or(defaults.color),
            border: self.border.or(document.border).unwrap_or(defaults.border),
            hovered: self.hovered.or(document.hovered).unwrap_or(defaults.hovered),
            hovered_border: self
                .hovered_border
                .or(document.hovered_border)
                .unwrap_or(defaults.hovered_border),
            activated: self.activated.or(document.activated).unwrap_or(defaults.activated),
            activated_border: self
                .activated_border
                .or(document.activated_border)
                .unwrap_or(defaults.activated_border),
        }
    }
}

impl PipeStyle {
    /// Resolve local overrides over document overrides over defaults
    pub fn resolve(&self, document: &PipeStyle, defaults: &ResolvedPipeStyle) -> ResolvedPipeStyle {
        ResolvedPipeStyle {
            width: self.width.or(document.width).unwrap_or(defaults.width),
            color: self.color.or(document.color).unwrap_or(defaults.color),
            selected_color: self
                .selected_color
                .or(document.selected_color)
                .unwrap_or(defaults.selected_color),
            font: self
                .font
                .clone()
                .or_else(|| document.font.clone())
                .unwrap_or_else(|| defaults.font.clone()),
            font_color: self.font_color.or(document.font_color).unwrap_or(defaults.font_color),
        }
    }
}
