mod game;
mod narration;
mod player;
mod round;
mod score;

pub use narration::read_facts_aloud;
pub use player::build_roster;
pub use round::{ChoiceOutcome, TurnAdvance};
pub use score::{standings, winner};

use crate::audio::{AudioSink, ClientAudio};
use crate::cancel::CancelToken;
use crate::facts::{FactHistory, FactService, FactSet};
use crate::protocol::{FactView, ServerMessage, SessionView, TurnView};
use crate::types::*;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};

/// Actions that do not apply to the current state. The session is left
/// untouched; callers drop these after logging.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("{action} is not valid during {phase:?}")]
    WrongPhase {
        action: &'static str,
        phase: GamePhase,
    },

    #[error(
        "roster must have between {min} and {max} players, got {0}",
        min = MIN_PLAYERS,
        max = MAX_PLAYERS
    )]
    InvalidRoster(usize),

    #[error("a fact has already been selected this turn")]
    AlreadySelected,

    #[error("no facts are loaded for this turn")]
    NoFacts,

    #[error("fact index {0} is out of range")]
    InvalidFact(usize),

    #[error("the result of this turn has not been shown yet")]
    ResultPending,

    #[error("facts for this turn are already loaded or loading")]
    FactsPresent,
}

/// State of the turn in progress
#[derive(Debug, Clone)]
pub struct TurnState {
    pub current_player_index: usize,
    /// 1-based
    pub current_round: u32,
    pub fact_set: Option<FactSet>,
    pub selected_index: Option<usize>,
    pub result_shown: bool,
    pub loading: bool,
    /// Identifies the fetch whose result this turn is waiting for
    pub(crate) fetch_seq: u64,
}

impl TurnState {
    fn first() -> Self {
        Self {
            current_player_index: 0,
            current_round: 1,
            fact_set: None,
            selected_index: None,
            result_shown: false,
            loading: false,
            fetch_seq: 0,
        }
    }
}

/// One game, from the menu to the winner screen
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub phase: GamePhase,
    pub difficulty: Difficulty,
    pub players: Vec<Player>,
    /// Present only while playing
    pub turn: Option<TurnState>,
    pub history: FactHistory,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            phase: GamePhase::Menu,
            difficulty: Difficulty::default(),
            players: Vec::new(),
            turn: None,
            history: FactHistory::default(),
        }
    }

    /// Forget every fact shown so far
    pub fn reset_session_history(&mut self) {
        self.history.reset();
    }

    fn wrong_phase(&self, action: &'static str) -> ActionError {
        ActionError::WrongPhase {
            action,
            phase: self.phase,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RwLock<Session>>,
    pub config: GameConfig,
    pub facts: FactService,
    pub audio: Arc<dyn AudioSink>,
    /// Broadcast channel for sending messages to every client
    pub broadcast: broadcast::Sender<ServerMessage>,
    /// Token of the active read-aloud sequence, if any
    read_aloud: Arc<Mutex<Option<CancelToken>>>,
    fetch_seq: Arc<AtomicU64>,
}

impl AppState {
    /// State with the built-in fact set only and client-side audio
    pub fn new() -> Self {
        Self::with_services(FactService::fallback_only(), GameConfig::default())
    }

    pub fn with_services(facts: FactService, config: GameConfig) -> Self {
        let (tx, _rx) = broadcast::channel(100);
        let audio = Arc::new(ClientAudio::new(
            tx.clone(),
            config.speech_timeout,
            config.language.clone(),
        ));
        Self {
            session: Arc::new(RwLock::new(Session::new())),
            config,
            facts,
            audio,
            broadcast: tx,
            read_aloud: Arc::new(Mutex::new(None)),
            fetch_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Replace the audio sink
    pub fn with_audio(mut self, audio: Arc<dyn AudioSink>) -> Self {
        self.audio = audio;
        self
    }

    /// Send a message to every connected client
    pub fn broadcast_to_all(&self, msg: ServerMessage) {
        // Ignore send errors (no receivers connected is fine)
        let _ = self.broadcast.send(msg);
    }

    /// Current phase of the session
    pub async fn phase(&self) -> GamePhase {
        self.session.read().await.phase
    }

    /// Build the client-facing view of the session
    pub async fn snapshot(&self) -> SessionView {
        let reading = self.is_reading().await;
        let session = self.session.read().await;

        let turn = session.turn.as_ref().map(|turn| TurnView {
            current_player_index: turn.current_player_index,
            current_round: turn.current_round,
            loading: turn.loading,
            reading,
            facts: turn
                .fact_set
                .as_ref()
                .map(|set| {
                    set.texts()
                        .map(|text| FactView {
                            text: text.to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
            selected_index: turn.selected_index,
            result_shown: turn.result_shown,
            lie_index: turn
                .fact_set
                .as_ref()
                .filter(|_| turn.result_shown)
                .map(FactSet::lie_index),
        });

        SessionView {
            id: session.id.clone(),
            phase: session.phase,
            difficulty: session.difficulty,
            total_rounds: TOTAL_ROUNDS,
            players: session.players.clone(),
            turn,
        }
    }

    /// Broadcast the current snapshot to all clients
    pub async fn broadcast_state(&self) {
        let session = self.snapshot().await;
        self.broadcast_to_all(ServerMessage::State { session });
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::facts::{FactError, FactSource};
    use crate::llm::LlmError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum AudioEvent {
        Cue(Cue),
        Speak(String),
        Stop,
    }

    /// Records every call; each utterance takes `utterance` of (virtual) time
    pub struct RecordingAudio {
        pub events: std::sync::Mutex<Vec<AudioEvent>>,
        pub utterance: Duration,
    }

    impl RecordingAudio {
        pub fn new(utterance: Duration) -> Arc<Self> {
            Arc::new(Self {
                events: std::sync::Mutex::new(Vec::new()),
                utterance,
            })
        }

        pub fn events(&self) -> Vec<AudioEvent> {
            self.events.lock().unwrap().clone()
        }

        pub fn spoken(&self) -> Vec<String> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    AudioEvent::Speak(text) => Some(text),
                    _ => None,
                })
                .collect()
        }

        pub fn cues(&self) -> Vec<Cue> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    AudioEvent::Cue(cue) => Some(cue),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl AudioSink for RecordingAudio {
        fn play_cue(&self, cue: Cue) {
            self.events.lock().unwrap().push(AudioEvent::Cue(cue));
        }

        async fn speak(&self, text: &str) {
            self.events
                .lock()
                .unwrap()
                .push(AudioEvent::Speak(text.to_string()));
            tokio::time::sleep(self.utterance).await;
        }

        fn stop_speaking(&self) {
            self.events.lock().unwrap().push(AudioEvent::Stop);
        }
    }

    /// Hands out queued answers, then keeps failing
    pub struct ScriptedFacts {
        pub answers: std::sync::Mutex<VecDeque<Result<FactSet, ()>>>,
        pub requests: std::sync::Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedFacts {
        pub fn new(answers: Vec<Result<FactSet, ()>>) -> Arc<Self> {
            Arc::new(Self {
                answers: std::sync::Mutex::new(answers.into()),
                requests: std::sync::Mutex::new(Vec::new()),
            })
        }

        pub fn requests(&self) -> Vec<Vec<String>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FactSource for ScriptedFacts {
        async fn generate_facts(
            &self,
            _difficulty: Difficulty,
            recent: &[String],
        ) -> Result<FactSet, FactError> {
            self.requests.lock().unwrap().push(recent.to_vec());
            match self.answers.lock().unwrap().pop_front() {
                Some(Ok(set)) => Ok(set),
                _ => Err(FactError::Llm(LlmError::ApiError("offline".to_string()))),
            }
        }
    }

    pub fn numbered_set(n: usize) -> FactSet {
        FactSet::new(vec![
            Fact::truth(format!("Truth {n}A")),
            Fact::lie(format!("Lie {n}")),
            Fact::truth(format!("Truth {n}B")),
        ])
        .unwrap()
    }

    /// State wired to recording audio and the given fact source
    pub fn test_state(
        source: Arc<ScriptedFacts>,
        utterance: Duration,
    ) -> (AppState, Arc<RecordingAudio>) {
        let audio = RecordingAudio::new(utterance);
        let state = AppState::with_services(FactService::new(source), GameConfig::default())
            .with_audio(audio.clone());
        (state, audio)
    }

    /// State that only ever serves the built-in set
    pub fn fallback_state() -> (AppState, Arc<RecordingAudio>) {
        let audio = RecordingAudio::new(Duration::ZERO);
        let state = AppState::with_services(FactService::fallback_only(), GameConfig::default())
            .with_audio(audio.clone());
        (state, audio)
    }

    /// Index of the lie in the current set
    pub async fn lie_index(state: &AppState) -> usize {
        let session = state.session.read().await;
        session
            .turn
            .as_ref()
            .and_then(|t| t.fact_set.as_ref())
            .map(FactSet::lie_index)
            .expect("facts loaded")
    }

    /// Index of some true fact in the current set
    pub async fn truth_index(state: &AppState) -> usize {
        (lie_index(state).await + 1) % FactSet::LEN
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_new_session_starts_in_menu() {
        let state = AppState::new();
        let view = state.snapshot().await;

        assert_eq!(view.phase, GamePhase::Menu);
        assert!(view.players.is_empty());
        assert!(view.turn.is_none());
        assert_eq!(view.total_rounds, 5);
    }

    #[tokio::test]
    async fn test_snapshot_hides_lie_until_result() {
        let (state, _audio) = fallback_state();
        state.begin().await.unwrap();
        state
            .configure(vec!["Ann".to_string()], Difficulty::Age3To6)
            .await
            .unwrap();

        let view = state.snapshot().await;
        let turn = view.turn.unwrap();
        assert_eq!(turn.facts.len(), 3);
        assert!(!turn.loading);
        assert_eq!(turn.lie_index, None);

        let lie = lie_index(&state).await;
        state.choose(lie).await.unwrap();

        let turn = state.snapshot().await.turn.unwrap();
        assert!(turn.result_shown);
        assert_eq!(turn.lie_index, Some(lie));
        assert_eq!(turn.selected_index, Some(lie));
    }

    #[tokio::test]
    async fn test_state_changes_are_broadcast() {
        let state = AppState::new();
        let mut rx = state.broadcast.subscribe();

        state.begin().await.unwrap();

        let mut saw_state = false;
        while let Ok(msg) = rx.try_recv() {
            if let ServerMessage::State { session } = msg {
                assert_eq!(session.phase, GamePhase::Setup);
                saw_state = true;
            }
        }
        assert!(saw_state);
    }
}
