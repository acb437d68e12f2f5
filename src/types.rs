use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Opaque ID types for type safety
pub type SessionId = String;
pub type PlayerId = u32;
pub type UtteranceId = u64;

/// Number of rounds in every session
pub const TOTAL_ROUNDS: u32 = 5;

/// Points awarded for spotting the lie
pub const POINTS_PER_LIE: u32 = 10;

/// Number of statements in a fact set
pub const FACTS_PER_SET: usize = 3;

/// Allowed roster size at setup
pub const MIN_PLAYERS: usize = 1;
pub const MAX_PLAYERS: usize = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Menu,
    Setup,
    Playing,
    Scoring,
    Winner,
}

/// Age-oriented content tier, fixed for a whole session
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Difficulty {
    #[serde(rename = "3-6")]
    Age3To6,
    #[default]
    #[serde(rename = "7-12")]
    Age7To12,
    #[serde(rename = "13-17")]
    Age13To17,
    #[serde(rename = "18+")]
    Age18Plus,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Age3To6,
        Difficulty::Age7To12,
        Difficulty::Age13To17,
        Difficulty::Age18Plus,
    ];

    /// Label used on the wire and in prompts
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Age3To6 => "3-6",
            Difficulty::Age7To12 => "7-12",
            Difficulty::Age13To17 => "13-17",
            Difficulty::Age18Plus => "18+",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} years", self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Fact {
    pub text: String,
    pub is_lie: bool,
}

impl Fact {
    pub fn truth(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_lie: false,
        }
    }

    pub fn lie(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_lie: true,
        }
    }
}

/// Short tonal cues played on game events
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    Success,
    Error,
    Click,
    Transition,
}

/// Runtime tunables for the game loop
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Pause between a fact set loading and the first utterance
    pub read_aloud_delay: Duration,
    /// Pause between consecutive utterances
    pub read_aloud_pause: Duration,
    /// Upper bound on waiting for a client to acknowledge an utterance
    pub speech_timeout: Duration,
    /// Language of the generated facts, sent with every utterance
    pub language: String,
    /// Word spoken before each fact number ("Fact 1: ...")
    pub fact_label: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            read_aloud_delay: Duration::from_millis(800),
            read_aloud_pause: Duration::from_millis(600),
            speech_timeout: Duration::from_secs(30),
            language: "English".to_string(),
            fact_label: "Fact".to_string(),
        }
    }
}

impl GameConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            read_aloud_delay: env_u64("READ_ALOUD_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.read_aloud_delay),
            read_aloud_pause: env_u64("READ_ALOUD_PAUSE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.read_aloud_pause),
            speech_timeout: env_u64("SPEECH_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.speech_timeout),
            language: env_string("FACT_LANGUAGE").unwrap_or(defaults.language),
            fact_label: env_string("READ_ALOUD_LABEL").unwrap_or(defaults.fact_label),
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
