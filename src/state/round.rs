//! Turn controller: fetch a fact set, take one pick, score it, move on.

use super::{score, ActionError, AppState, Session, TurnState};
use crate::facts::{FactHistory, FactOrigin, FetchedFacts, PROMPT_HISTORY};
use crate::protocol::ServerMessage;
use crate::types::*;
use std::sync::atomic::Ordering;

/// Result of a player's pick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOutcome {
    pub player_id: PlayerId,
    pub selected_index: usize,
    pub lie_index: usize,
    pub correct: bool,
    pub score: u32,
}

/// Where `advance_turn` moved the game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnAdvance {
    NextPlayer,
    NextRound,
    Finished,
}

/// A fetch that has been announced on the turn but not yet run
pub(super) struct PendingFetch {
    seq: u64,
    difficulty: Difficulty,
    recent: Vec<String>,
}

impl AppState {
    /// Clear the turn and mark it as loading. Must be called with the session
    /// lock held; the returned fetch runs after the lock is released.
    pub(super) fn prepare_fetch(
        &self,
        turn: &mut TurnState,
        difficulty: Difficulty,
        history: &FactHistory,
    ) -> PendingFetch {
        let seq = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;

        turn.fact_set = None;
        turn.selected_index = None;
        turn.result_shown = false;
        turn.loading = true;
        turn.fetch_seq = seq;

        PendingFetch {
            seq,
            difficulty,
            recent: history.recent(PROMPT_HISTORY),
        }
    }

    /// Stop any reading, fetch the set and install it if still wanted
    pub(super) async fn run_fetch(&self, pending: PendingFetch) {
        self.cancel_read_aloud().await;
        self.broadcast_state().await;

        let fetched = self.facts.fetch(pending.difficulty, &pending.recent).await;
        self.complete_fetch(pending.seq, fetched).await;
    }

    async fn complete_fetch(&self, seq: u64, fetched: FetchedFacts) {
        {
            let mut session = self.session.write().await;
            let Session { turn, history, .. } = &mut *session;

            let Some(turn) = turn
                .as_mut()
                .filter(|turn| turn.loading && turn.fetch_seq == seq)
            else {
                tracing::debug!("Discarding superseded fact set (fetch {})", seq);
                return;
            };

            if fetched.origin == FactOrigin::Generated {
                history.record(&fetched.set);
            }

            let texts: Vec<String> = fetched.set.texts().map(str::to_string).collect();
            turn.fact_set = Some(fetched.set);
            turn.loading = false;

            tracing::info!(
                "Round {} player {}: facts ready ({:?})",
                turn.current_round,
                turn.current_player_index,
                fetched.origin
            );

            // Registered under the session lock so a choice cannot slip in first
            self.spawn_read_aloud(texts).await;
        }

        self.broadcast_state().await;
    }

    /// Load facts for the current player when the turn has none
    pub async fn start_turn(&self) -> Result<(), ActionError> {
        let pending = {
            let mut session = self.session.write().await;
            if session.phase != GamePhase::Playing {
                return Err(session.wrong_phase("start_turn"));
            }
            let Session {
                turn,
                difficulty,
                history,
                ..
            } = &mut *session;
            let Some(turn) = turn.as_mut() else {
                return Err(ActionError::NoFacts);
            };
            if turn.loading || turn.fact_set.is_some() {
                return Err(ActionError::FactsPresent);
            }
            self.prepare_fetch(turn, *difficulty, history)
        };

        self.run_fetch(pending).await;
        Ok(())
    }

    /// The current player picks the fact at `index` as the lie
    pub async fn choose(&self, index: usize) -> Result<ChoiceOutcome, ActionError> {
        let outcome = {
            let mut session = self.session.write().await;
            if session.phase != GamePhase::Playing {
                return Err(session.wrong_phase("choose"));
            }
            let Session { turn, players, .. } = &mut *session;
            let Some(turn) = turn.as_mut() else {
                return Err(ActionError::NoFacts);
            };

            if turn.selected_index.is_some() {
                return Err(ActionError::AlreadySelected);
            }
            let set = turn.fact_set.as_ref().ok_or(ActionError::NoFacts)?;
            let fact = set.get(index).ok_or(ActionError::InvalidFact(index))?;
            let correct = fact.is_lie;
            let lie_index = set.lie_index();

            let player = &mut players[turn.current_player_index];
            if correct {
                score::award_lie_found(player);
            }

            turn.selected_index = Some(index);
            turn.result_shown = true;

            ChoiceOutcome {
                player_id: player.id,
                selected_index: index,
                lie_index,
                correct,
                score: player.score,
            }
        };

        self.cancel_read_aloud().await;
        self.audio.play_cue(if outcome.correct {
            Cue::Success
        } else {
            Cue::Error
        });

        tracing::info!(
            "Player {} picked fact {} ({}), score {}",
            outcome.player_id,
            outcome.selected_index,
            if outcome.correct { "lie found" } else { "truth" },
            outcome.score
        );

        self.broadcast_to_all(ServerMessage::TurnResult {
            player_id: outcome.player_id,
            selected_index: outcome.selected_index,
            lie_index: outcome.lie_index,
            correct: outcome.correct,
            score: outcome.score,
        });
        self.broadcast_state().await;
        Ok(outcome)
    }

    /// Hand over to the next player, the next round, or the scoreboard
    pub async fn advance_turn(&self) -> Result<TurnAdvance, ActionError> {
        let (advance, pending) = {
            let mut session = self.session.write().await;
            if session.phase != GamePhase::Playing {
                return Err(session.wrong_phase("continue_turn"));
            }
            let Session {
                phase,
                turn,
                players,
                difficulty,
                history,
                ..
            } = &mut *session;
            let Some(current) = turn.as_mut() else {
                return Err(ActionError::NoFacts);
            };
            if !current.result_shown {
                return Err(ActionError::ResultPending);
            }

            if current.current_player_index + 1 < players.len() {
                current.current_player_index += 1;
                let pending = self.prepare_fetch(current, *difficulty, history);
                (TurnAdvance::NextPlayer, Some(pending))
            } else if current.current_round < TOTAL_ROUNDS {
                current.current_player_index = 0;
                current.current_round += 1;
                let pending = self.prepare_fetch(current, *difficulty, history);
                (TurnAdvance::NextRound, Some(pending))
            } else {
                *turn = None;
                *phase = GamePhase::Scoring;
                (TurnAdvance::Finished, None)
            }
        };

        self.audio.play_cue(Cue::Click);

        match pending {
            Some(pending) => self.run_fetch(pending).await,
            None => {
                self.cancel_read_aloud().await;
                let players = self.standings().await;
                tracing::info!("All {} rounds played, scoring", TOTAL_ROUNDS);
                self.broadcast_to_all(ServerMessage::Scores { players });
                self.broadcast_state().await;
            }
        }

        Ok(advance)
    }
}
