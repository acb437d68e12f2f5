use super::{build_roster, score, ActionError, AppState, Session, TurnState};
use crate::protocol::ServerMessage;
use crate::types::*;

impl AppState {
    /// MENU -> SETUP
    pub async fn begin(&self) -> Result<(), ActionError> {
        {
            let mut session = self.session.write().await;
            if session.phase != GamePhase::Menu {
                return Err(session.wrong_phase("begin"));
            }
            session.phase = GamePhase::Setup;
        }

        self.audio.play_cue(Cue::Transition);
        tracing::info!("Session entered setup");
        self.broadcast_state().await;
        Ok(())
    }

    /// SETUP -> PLAYING with the given roster, then load the first turn
    pub async fn configure(
        &self,
        player_names: Vec<String>,
        difficulty: Difficulty,
    ) -> Result<(), ActionError> {
        let pending = {
            let mut session = self.session.write().await;
            if session.phase != GamePhase::Setup {
                return Err(session.wrong_phase("configure"));
            }
            let roster = build_roster(&player_names)?;

            let mut turn = TurnState::first();
            let pending = self.prepare_fetch(&mut turn, difficulty, &session.history);

            session.players = roster;
            session.difficulty = difficulty;
            session.turn = Some(turn);
            session.phase = GamePhase::Playing;
            pending
        };

        self.audio.play_cue(Cue::Transition);
        tracing::info!(
            "Game started with {} players at difficulty {}",
            player_names.len(),
            difficulty
        );
        self.run_fetch(pending).await;
        Ok(())
    }

    /// SCORING -> WINNER; returns the winner
    pub async fn continue_to_winner(&self) -> Result<Option<Player>, ActionError> {
        let winner = {
            let mut session = self.session.write().await;
            if session.phase != GamePhase::Scoring {
                return Err(session.wrong_phase("continue_to_winner"));
            }
            session.phase = GamePhase::Winner;
            score::winner(&session.players)
        };

        if let Some(player) = &winner {
            tracing::info!("Winner: {} with {} points", player.name, player.score);
            self.broadcast_to_all(ServerMessage::Winner {
                player: player.clone(),
            });
        }
        self.broadcast_state().await;
        Ok(winner)
    }

    /// WINNER -> MENU, discarding the session and its fact history
    pub async fn reset_to_menu(&self) -> Result<(), ActionError> {
        {
            let mut session = self.session.write().await;
            if session.phase != GamePhase::Winner {
                return Err(session.wrong_phase("reset_to_menu"));
            }
            session.reset_session_history();
            *session = Session::new();
        }

        self.cancel_read_aloud().await;
        tracing::info!("Session reset to menu");
        self.broadcast_state().await;
        Ok(())
    }
}
