use rand::seq::IndexedRandom;
use rand::Rng;

use crate::types::Difficulty;

/// Topics the provider may draw from, per tier
pub fn topics(difficulty: Difficulty) -> &'static [&'static str] {
    match difficulty {
        Difficulty::Age3To6 => &[
            "pets",
            "wild animals",
            "fairy tales",
            "colors and shapes",
            "fruits and vegetables",
            "toys",
        ],
        Difficulty::Age7To12 => &[
            "dinosaurs",
            "planets",
            "the ocean",
            "cartoons",
            "school subjects",
            "inventions",
            "video games",
        ],
        Difficulty::Age13To17 => &[
            "pop culture",
            "modern technology",
            "space",
            "the internet",
            "music",
            "history of great discoveries",
        ],
        Difficulty::Age18Plus => &[
            "quantum physics",
            "the world economy",
            "rare historical facts",
            "psychology",
            "microbiology",
            "geopolitics",
        ],
    }
}

fn style_instruction(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Age3To6 => {
            "Write VERY simply. A small child must understand every fact. \
             The lie should be obvious but funny, for example 'A cat has 8 legs'."
        }
        Difficulty::Age7To12 => {
            "Write in an educational and playful way about nature, science or games. \
             The lie should sound plausible to a child but be checkable with logic."
        }
        Difficulty::Age13To17 => {
            "Pick angles teenagers care about. Facts should be of medium difficulty \
             and the lie should be tricky."
        }
        Difficulty::Age18Plus => {
            "Facts should be genuinely hard and little known, using scientific terminology. \
             The lie should be subtle and almost indistinguishable from the truth."
        }
    }
}

pub const SYSTEM_PROMPT: &str = "You are the host of a fast-paced quiz game called \
Two Truths and a Lie. You only ever answer with a single JSON object.";

/// Pick a random topic for the tier
pub fn pick_topic<R: Rng + ?Sized>(difficulty: Difficulty, rng: &mut R) -> &'static str {
    topics(difficulty).choose(rng).copied().unwrap_or("general knowledge")
}

/// Build the user prompt for one fact set
pub fn build_fact_prompt(
    difficulty: Difficulty,
    topic: &str,
    recent: &[String],
    language: &str,
) -> String {
    let avoid = if recent.is_empty() {
        "(none yet)".to_string()
    } else {
        recent.join("; ")
    };

    format!(
        "PLAYERS: age {age}.\n\
         TOPIC: {topic}.\n\
         DIFFICULTY: {style}\n\n\
         TASK: Write exactly 3 short facts about \"{topic}\" in {language}.\n\
         1. TWO facts are ABSOLUTELY TRUE.\n\
         2. ONE fact is STRICTLY FALSE (sounds true, but is made up).\n\n\
         RULES:\n\
         - Do not repeat topics too often.\n\
         - Avoid these already used facts: {avoid}\n\
         - Answer STRICTLY as JSON.\n\n\
         Format:\n\
         {{\"facts\": [{{\"text\": \"...\", \"isLie\": false}}, \
         {{\"text\": \"...\", \"isLie\": false}}, {{\"text\": \"...\", \"isLie\": true}}]}}",
        age = difficulty.label(),
        style = style_instruction(difficulty),
    )
}
