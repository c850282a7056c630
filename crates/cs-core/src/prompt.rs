//! Prompt generation and relevant-attribute derivation.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::attribute::{Attribute, AttributeSet};
use crate::deck::{DeckEntry, Decks};
use crate::error::{SenseError, SenseResult};

/// A drawn prompt: one entry from each deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// The category entry.
    pub category: DeckEntry,
    /// The modifier entry.
    pub modifier: DeckEntry,
    /// The object entry.
    pub object: DeckEntry,
}

impl Prompt {
    /// Draw each part independently from its deck.
    pub fn draw(decks: &Decks, rng: &mut impl Rng) -> SenseResult<Self> {
        let (Some(category), Some(modifier), Some(object)) = (
            decks.categories.draw(rng),
            decks.modifiers.draw(rng),
            decks.objects.draw(rng),
        ) else {
            return Err(SenseError::DataNotLoaded);
        };
        Ok(Self {
            category: category.clone(),
            modifier: modifier.clone(),
            object: object.clone(),
        })
    }

    /// The rendered prompt text.
    pub fn text(&self) -> String {
        format!(
            "{} {} {}",
            self.category.text, self.modifier.text, self.object.text
        )
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// How a mode decides which attributes a round compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relevance {
    /// Every attribute counts.
    All,
    /// Keyword scan of the full rendered prompt.
    PromptText,
    /// Keyword scan of the category entry only.
    CategoryText,
}

impl Relevance {
    /// Relevant attributes for a prompt under this policy.
    pub fn derive(self, prompt: &Prompt) -> AttributeSet {
        match self {
            Self::All => AttributeSet::all(),
            Self::PromptText => derive_from_text(&prompt.text()),
            Self::CategoryText => derive_from_text(&prompt.category.text),
        }
    }
}

/// An attribute is relevant iff its name or any of its values appears in
/// the uppercased text.
pub fn derive_from_text(text: &str) -> AttributeSet {
    let upper = text.to_uppercase();
    Attribute::ALL
        .into_iter()
        .filter(|attr| attr.keywords().any(|k| upper.contains(&k)))
        .collect()
}
