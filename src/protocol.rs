use crate::types::*;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Leave the menu for the setup screen
    Begin,
    /// Submit the roster and difficulty; blank names get a default
    Configure {
        player_names: Vec<String>,
        #[serde(default)]
        difficulty: Difficulty,
    },
    /// Pick the fact the current player believes is the lie
    Choose {
        fact_index: usize,
    },
    /// Move on after the result has been shown
    ContinueTurn,
    ContinueToWinner,
    ResetToMenu,
    /// Fetch facts again when the current turn has none
    RetryFacts,
    /// A client finished playing an utterance
    SpeechDone {
        utterance_id: UtteranceId,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        session: SessionView,
        server_now: String,
    },
    /// Full session snapshot, sent after every change
    State {
        session: SessionView,
    },
    TurnResult {
        player_id: PlayerId,
        selected_index: usize,
        lie_index: usize,
        correct: bool,
        score: u32,
    },
    /// Final standings, highest score first
    Scores {
        players: Vec<Player>,
    },
    Winner {
        player: Player,
    },
    Cue {
        cue: Cue,
    },
    Speak {
        utterance_id: UtteranceId,
        text: String,
        /// Language the text is written in
        lang: String,
    },
    StopSpeaking,
    Error {
        code: String,
        msg: String,
    },
}

/// A statement as shown to players, without its truth value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FactView {
    pub text: String,
}

/// Client-facing view of the running turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnView {
    pub current_player_index: usize,
    pub current_round: u32,
    pub loading: bool,
    pub reading: bool,
    pub facts: Vec<FactView>,
    pub selected_index: Option<usize>,
    pub result_shown: bool,
    /// Only revealed once the result is shown
    pub lie_index: Option<usize>,
}

/// Client-facing view of the whole session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionView {
    pub id: SessionId,
    pub phase: GamePhase,
    pub difficulty: Difficulty,
    pub total_rounds: u32,
    pub players: Vec<Player>,
    pub turn: Option<TurnView>,
}
