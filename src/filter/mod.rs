//! Visual filters
//!
//! Filter descriptors as supplied by the filter catalog, the compositing
//! expression language (`sepia(0.5) saturate(1.5) hue-rotate(330deg)` style
//! strings), and their pixel-level color transforms.

pub mod transform;

pub use transform::ColorTransform;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One compositing operation inside a filter expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOp {
    Grayscale(f32),
    Sepia(f32),
    Saturate(f32),
    /// Degrees
    HueRotate(f32),
    Brightness(f32),
    Contrast(f32),
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grayscale(v) => write!(f, "grayscale({})", v),
            Self::Sepia(v) => write!(f, "sepia({})", v),
            Self::Saturate(v) => write!(f, "saturate({})", v),
            Self::HueRotate(v) => write!(f, "hue-rotate({}deg)", v),
            Self::Brightness(v) => write!(f, "brightness({})", v),
            Self::Contrast(v) => write!(f, "contrast({})", v),
        }
    }
}

/// Parse failures for filter expressions
#[derive(Error, Debug, PartialEq)]
pub enum FilterParseError {
    #[error("malformed filter function: {0}")]
    Malformed(String),
    #[error("unknown filter function: {0}")]
    UnknownFunction(String),
    #[error("invalid amount in {0}")]
    InvalidAmount(String),
}

/// An ordered chain of filter ops; empty means the identity filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterExpression(Vec<FilterOp>);

impl FilterExpression {
    pub fn new(ops: Vec<FilterOp>) -> Self {
        Self(ops)
    }

    /// The no-op filter
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn is_identity(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ops(&self) -> &[FilterOp] {
        &self.0
    }

    /// Compose all ops into a single color transform
    pub fn transform(&self) -> ColorTransform {
        self.0
            .iter()
            .fold(ColorTransform::identity(), |acc, op| {
                acc.then(&ColorTransform::from(op))
            })
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "none");
        }
        for (i, op) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", op)?;
        }
        Ok(())
    }
}

impl FromStr for FilterExpression {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "none" {
            return Ok(Self::none());
        }
        let mut ops = Vec::new();
        for token in s.split_whitespace() {
            let open = token
                .find('(')
                .ok_or_else(|| FilterParseError::Malformed(token.to_string()))?;
            if !token.ends_with(')') {
                return Err(FilterParseError::Malformed(token.to_string()));
            }
            let name = &token[..open];
            let arg = &token[open + 1..token.len() - 1];
            let amount = |raw: &str| {
                raw.parse::<f32>()
                    .map_err(|_| FilterParseError::InvalidAmount(token.to_string()))
            };
            let op = match name {
                "grayscale" => FilterOp::Grayscale(amount(arg)?),
                "sepia" => FilterOp::Sepia(amount(arg)?),
                "saturate" => FilterOp::Saturate(amount(arg)?),
                "brightness" => FilterOp::Brightness(amount(arg)?),
                "contrast" => FilterOp::Contrast(amount(arg)?),
                "hue-rotate" => {
                    let degrees = arg
                        .strip_suffix("deg")
                        .ok_or_else(|| FilterParseError::InvalidAmount(token.to_string()))?;
                    FilterOp::HueRotate(amount(degrees)?)
                }
                other => return Err(FilterParseError::UnknownFunction(other.to_string())),
            };
            ops.push(op);
        }
        Ok(Self(ops))
    }
}

impl Serialize for FilterExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FilterExpression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// Immutable filter catalog record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDescriptor {
    pub id: String,
    pub name: String,
    pub expression: FilterExpression,
    /// Thumbnail background, opaque to the core
    pub preview_style: String,
}

impl FilterDescriptor {
    pub fn is_identity(&self) -> bool {
        self.expression.is_identity()
    }

    /// The default identity filter
    pub fn normal() -> Self {
        Self {
            id: "normal".to_string(),
            name: "Normal".to_string(),
            expression: FilterExpression::none(),
            preview_style: "linear-gradient(45deg, #3498db, #2ecc71)".to_string(),
        }
    }
}

/// The built-in filter catalog, identity filter first
pub fn builtin_filters() -> Vec<FilterDescriptor> {
    use FilterOp::*;
    let entry = |id: &str, name: &str, ops: Vec<FilterOp>, preview: &str| FilterDescriptor {
        id: id.to_string(),
        name: name.to_string(),
        expression: FilterExpression::new(ops),
        preview_style: preview.to_string(),
    };
    vec![
        FilterDescriptor::normal(),
        entry(
            "warm",
            "Warm",
            vec![Sepia(0.5), Saturate(1.5), HueRotate(330.0)],
            "linear-gradient(45deg, #e67e22, #f1c40f)",
        ),
        entry(
            "cool",
            "Cool",
            vec![Saturate(1.2), HueRotate(180.0), Brightness(1.1)],
            "linear-gradient(45deg, #3498db, #2980b9)",
        ),
        entry(
            "vintage",
            "Vintage",
            vec![Sepia(0.8), Contrast(1.2), Saturate(0.8), Brightness(0.9)],
            "linear-gradient(45deg, #d35400, #c0392b)",
        ),
        entry(
            "dramatic",
            "Dramatic",
            vec![Contrast(1.4), Saturate(1.4), Brightness(0.9)],
            "linear-gradient(45deg, #8e44ad, #2c3e50)",
        ),
        entry(
            "bw",
            "B&W",
            vec![Grayscale(1.0), Contrast(1.2)],
            "linear-gradient(45deg, #2c3e50, #7f8c8d)",
        ),
        entry(
            "fade",
            "Fade",
            vec![Brightness(1.1), Saturate(0.8), Contrast(0.9)],
            "linear-gradient(45deg, #95a5a6, #bdc3c7)",
        ),
        entry(
            "sharp",
            "Sharp",
            vec![Contrast(1.3), Brightness(1.1), Saturate(1.3)],
            "linear-gradient(45deg, #16a085, #27ae60)",
        ),
    ]
}
