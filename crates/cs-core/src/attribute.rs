//! The fixed attribute catalog.
//!
//! Every prompt is answered along the same five sensory attributes. Each
//! attribute has an ordered value domain whose first entry is the empty
//! string, the "unset" sentinel.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SenseError, SenseResult};

/// The unset sentinel shared by every domain.
pub const UNSET: &str = "";

const COLOR: &[&str] = &[
    UNSET, "Red", "Blue", "Yellow", "Green", "Purple", "Orange", "Black", "White", "Pink", "Brown",
];
const TEXTURE: &[&str] = &[
    UNSET, "Bumpy", "Sharp", "Sticky", "Smooth", "Slippery", "Squishy", "Firm", "Fluffy",
];
const TASTE: &[&str] = &[UNSET, "Bitter", "Sour", "Salty", "Umami", "Sweet", "Spicy"];
const SMELL: &[&str] = &[UNSET, "Natural", "Neutral", "Pungent", "Chemical"];
const VOLUME: &[&str] = &[UNSET, "Loud", "Quiet"];

/// One of the five sensory attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Attribute {
    /// Color of the thing described.
    Color,
    /// How it feels to the touch.
    Texture,
    /// How it tastes.
    Taste,
    /// How it smells.
    Smell,
    /// How loud it is.
    Volume,
}

impl Attribute {
    /// All attributes in display order.
    pub const ALL: [Attribute; 5] = [
        Attribute::Color,
        Attribute::Texture,
        Attribute::Taste,
        Attribute::Smell,
        Attribute::Volume,
    ];

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Color => "Color",
            Self::Texture => "Texture",
            Self::Taste => "Taste",
            Self::Smell => "Smell",
            Self::Volume => "Volume",
        }
    }

    /// The ordered domain, starting with [`UNSET`].
    pub fn domain(self) -> &'static [&'static str] {
        match self {
            Self::Color => COLOR,
            Self::Texture => TEXTURE,
            Self::Taste => TASTE,
            Self::Smell => SMELL,
            Self::Volume => VOLUME,
        }
    }

    /// Uppercase tokens that mark this attribute as relevant to a text:
    /// the attribute name followed by every non-empty domain value.
    pub fn keywords(self) -> impl Iterator<Item = String> {
        std::iter::once(self.name())
            .chain(self.domain().iter().copied().filter(|v| !v.is_empty()))
            .map(str::to_uppercase)
    }

    /// Whether `value` is in the domain (exact spelling, unset included).
    pub fn is_valid_value(self, value: &str) -> bool {
        self.domain().contains(&value)
    }

    /// Look up a value case-insensitively and return its catalog spelling.
    pub fn canonical_value(self, value: &str) -> SenseResult<&'static str> {
        self.domain()
            .iter()
            .copied()
            .find(|v| v.eq_ignore_ascii_case(value))
            .ok_or_else(|| SenseError::InvalidValue {
                attribute: self,
                value: value.to_string(),
            })
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = SenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SenseError::UnknownAttribute(s.to_string()))
    }
}

/// An ordered subset of attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSet(BTreeSet<Attribute>);

impl AttributeSet {
    /// Every attribute.
    pub fn all() -> Self {
        Self(Attribute::ALL.into_iter().collect())
    }

    /// No attributes.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add an attribute. Returns false if it was already present.
    pub fn insert(&mut self, attribute: Attribute) -> bool {
        self.0.insert(attribute)
    }

    /// Whether the set holds `attribute`.
    pub fn contains(&self, attribute: Attribute) -> bool {
        self.0.contains(&attribute)
    }

    /// Iterate in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = Attribute> + '_ {
        self.0.iter().copied()
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Attribute> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("(none)");
        }
        let names: Vec<&str> = self.iter().map(Attribute::name).collect();
        f.write_str(&names.join(", "))
    }
}
