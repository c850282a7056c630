use std::path::Path;

use colored::Colorize;
use rand::SeedableRng;
use rand::rngs::StdRng;

use cs_core::{Prompt, Relevance};

pub fn run(count: u32, seed: u64, decks: Option<&Path>, category_only: bool) -> Result<(), String> {
    let decks = super::load_decks(decks)?;
    let relevance = if category_only {
        Relevance::CategoryText
    } else {
        Relevance::PromptText
    };

    let mut rng = StdRng::seed_from_u64(seed);
    for n in 1..=count {
        let prompt = Prompt::draw(&decks, &mut rng).map_err(|e| e.to_string())?;
        println!("  {n:>2}. {}", prompt.text().bold());
        println!("      Senses: {}", relevance.derive(&prompt));
    }

    Ok(())
}
