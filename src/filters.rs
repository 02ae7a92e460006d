//! Filter registry: named, non-destructive colour adjustment chains
//!
//! Each filter identifier maps to a fixed, ordered chain of operations with the
//! semantics of the W3C Filter Effects shorthand functions (`brightness()`,
//! `contrast()`, `saturate()`, `hue-rotate()`, `sepia()`, `grayscale()`).
//! Operations work on straight-alpha RGB in `[0, 1]`, clamp after every step and
//! leave alpha untouched. Order matters and is preserved exactly.

use crate::error::{PreviewError, Result};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single parameterized colour operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOp {
    /// Linear multiplier on every channel
    Brightness(f32),
    /// Scale around mid-grey
    Contrast(f32),
    /// Saturation matrix, 1.0 is unchanged
    Saturate(f32),
    /// Hue rotation in degrees
    HueRotate(f32),
    /// Sepia amount in `[0, 1]`
    Sepia(f32),
    /// Grayscale amount in `[0, 1]`
    Grayscale(f32),
}

impl FilterOp {
    /// Apply the operation to one straight-alpha RGB triple
    #[must_use]
    pub fn apply(self, rgb: [f32; 3]) -> [f32; 3] {
        let out = match self {
            Self::Brightness(amount) => rgb.map(|c| c * amount),
            Self::Contrast(amount) => rgb.map(|c| (c - 0.5) * amount + 0.5),
            Self::Saturate(amount) => mul(&saturate_matrix(amount), rgb),
            Self::HueRotate(degrees) => mul(&hue_rotate_matrix(degrees), rgb),
            Self::Sepia(amount) => mul(&sepia_matrix(amount), rgb),
            Self::Grayscale(amount) => mul(&grayscale_matrix(amount), rgb),
        };
        out.map(|c| c.clamp(0.0, 1.0))
    }

    /// Operation name as written in a filter shorthand
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Brightness(_) => "brightness",
            Self::Contrast(_) => "contrast",
            Self::Saturate(_) => "saturate",
            Self::HueRotate(_) => "hue-rotate",
            Self::Sepia(_) => "sepia",
            Self::Grayscale(_) => "grayscale",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::HueRotate(degrees) => write!(f, "hue-rotate({}deg)", degrees),
            Self::Brightness(v)
            | Self::Contrast(v)
            | Self::Saturate(v)
            | Self::Sepia(v)
            | Self::Grayscale(v) => write!(f, "{}({})", self.name(), v),
        }
    }
}

type Matrix = [[f32; 3]; 3];

fn mul(m: &Matrix, [r, g, b]: [f32; 3]) -> [f32; 3] {
    m.map(|row| row[0] * r + row[1] * g + row[2] * b)
}

fn saturate_matrix(s: f32) -> Matrix {
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn hue_rotate_matrix(degrees: f32) -> Matrix {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [
        [
            0.213 + cos * 0.787 - sin * 0.213,
            0.715 - cos * 0.715 - sin * 0.715,
            0.072 - cos * 0.072 + sin * 0.928,
        ],
        [
            0.213 - cos * 0.213 + sin * 0.143,
            0.715 + cos * 0.285 + sin * 0.140,
            0.072 - cos * 0.072 - sin * 0.283,
        ],
        [
            0.213 - cos * 0.213 - sin * 0.787,
            0.715 - cos * 0.715 + sin * 0.715,
            0.072 + cos * 0.928 + sin * 0.072,
        ],
    ]
}

fn sepia_matrix(amount: f32) -> Matrix {
    let inv = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.393 + 0.607 * inv, 0.769 - 0.769 * inv, 0.189 - 0.189 * inv],
        [0.349 - 0.349 * inv, 0.686 + 0.314 * inv, 0.168 - 0.168 * inv],
        [0.272 - 0.272 * inv, 0.534 - 0.534 * inv, 0.131 + 0.869 * inv],
    ]
}

fn grayscale_matrix(amount: f32) -> Matrix {
    let inv = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.2126 + 0.7874 * inv, 0.7152 - 0.7152 * inv, 0.0722 - 0.0722 * inv],
        [0.2126 - 0.2126 * inv, 0.7152 + 0.2848 * inv, 0.0722 - 0.0722 * inv],
        [0.2126 - 0.2126 * inv, 0.7152 - 0.7152 * inv, 0.0722 + 0.9278 * inv],
    ]
}

const CLARENDON: &[FilterOp] = &[FilterOp::Contrast(1.2), FilterOp::Saturate(1.35)];
const GINGHAM: &[FilterOp] = &[
    FilterOp::Contrast(1.1),
    FilterOp::Brightness(1.05),
    FilterOp::Sepia(0.04),
];
const MOON: &[FilterOp] = &[
    FilterOp::Grayscale(1.0),
    FilterOp::Contrast(1.1),
    FilterOp::Brightness(1.1),
];
const LARK: &[FilterOp] = &[
    FilterOp::Brightness(1.1),
    FilterOp::Contrast(0.9),
    FilterOp::Saturate(1.2),
];
const REYES: &[FilterOp] = &[
    FilterOp::Sepia(0.22),
    FilterOp::Brightness(1.1),
    FilterOp::Contrast(0.85),
    FilterOp::Saturate(0.75),
];
const JUNO: &[FilterOp] = &[
    FilterOp::HueRotate(-10.0),
    FilterOp::Contrast(1.1),
    FilterOp::Saturate(1.5),
];
const SEVENTY_SEVEN: &[FilterOp] = &[
    FilterOp::Sepia(0.5),
    FilterOp::HueRotate(-30.0),
    FilterOp::Contrast(1.1),
    FilterOp::Brightness(1.1),
];

/// Identifier of a registered filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterId {
    #[default]
    None,
    Clarendon,
    Gingham,
    Moon,
    Lark,
    Reyes,
    Juno,
    #[serde(rename = "1977")]
    Seventy77,
}

impl FilterId {
    /// Every registered filter, in menu order
    pub const ALL: [FilterId; 8] = [
        Self::None,
        Self::Clarendon,
        Self::Gingham,
        Self::Moon,
        Self::Lark,
        Self::Reyes,
        Self::Juno,
        Self::Seventy77,
    ];

    /// Identifier string used by the filter menu
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Clarendon => "clarendon",
            Self::Gingham => "gingham",
            Self::Moon => "moon",
            Self::Lark => "lark",
            Self::Reyes => "reyes",
            Self::Juno => "juno",
            Self::Seventy77 => "1977",
        }
    }

    /// Parse an identifier, falling back to [`FilterId::None`] for unknown names
    #[must_use]
    pub fn parse_lenient(id: &str) -> Self {
        id.parse().unwrap_or_default()
    }

    /// The operation chain registered for this filter
    #[must_use]
    pub fn chain(self) -> FilterChain {
        let ops: &'static [FilterOp] = match self {
            Self::None => &[],
            Self::Clarendon => CLARENDON,
            Self::Gingham => GINGHAM,
            Self::Moon => MOON,
            Self::Lark => LARK,
            Self::Reyes => REYES,
            Self::Juno => JUNO,
            Self::Seventy77 => SEVENTY_SEVEN,
        };
        FilterChain { ops }
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterId {
    type Err = PreviewError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| {
                PreviewError::invalid_config(format!(
                    "Unknown filter '{}'. Available: {}",
                    s,
                    Self::ALL.map(Self::as_str).join(", ")
                ))
            })
    }
}

/// Ordered chain of colour operations applied at render time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterChain {
    ops: &'static [FilterOp],
}

impl FilterChain {
    /// The chain that leaves pixels untouched
    #[must_use]
    pub fn identity() -> Self {
        Self { ops: &[] }
    }

    #[must_use]
    pub fn ops(&self) -> &'static [FilterOp] {
        self.ops
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.ops.is_empty()
    }

    /// Run the chain over one pixel's colour channels
    #[must_use]
    pub fn apply_rgb(&self, rgb: [f32; 3]) -> [f32; 3] {
        self.ops.iter().fold(rgb, |acc, op| op.apply(acc))
    }

    /// Apply the chain in place; alpha is preserved
    pub fn apply(&self, pixels: &mut RgbaImage) {
        if self.is_identity() {
            return;
        }
        for pixel in pixels.pixels_mut() {
            let [r, g, b, a] = pixel.0;
            let rgb = [r, g, b].map(|c| f32::from(c) / 255.0);
            let [r, g, b] = self.apply_rgb(rgb).map(to_channel);
            pixel.0 = [r, g, b, a];
        }
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identity() {
            return f.write_str("none");
        }
        let parts: Vec<String> = self.ops.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(" "))
    }
}

fn to_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Resolve a filter identifier to its operation chain
///
/// Unknown identifiers fail closed to the identity chain.
#[must_use]
pub fn resolve(id: &str) -> FilterChain {
    match id.parse::<FilterId>() {
        Ok(filter) => filter.chain(),
        Err(_) => {
            tracing::debug!(filter = %id, "Unknown filter, using identity chain");
            FilterChain::identity()
        },
    }
}
