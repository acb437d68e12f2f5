//! WebSocket message dispatch
//!
//! Every client may drive the game. Actions that do not apply to the current
//! state are ignored: the session is left as it was and nothing is sent back.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{ActionError, AppState};
use std::future::Future;
use std::sync::Arc;

/// Log and drop a rejected action
fn ignore(action: &str, result: Result<(), ActionError>) {
    if let Err(e) = result {
        tracing::debug!("Ignoring {}: {}", action, e);
    }
}

/// Run an action that may wait on fact generation without blocking the socket
fn spawn_action<F>(action: &'static str, fut: F)
where
    F: Future<Output = Result<(), ActionError>> + Send + 'static,
{
    tokio::spawn(async move { ignore(action, fut.await) });
}

/// Handle client messages and return optional response
pub async fn handle_message(msg: ClientMessage, state: &Arc<AppState>) -> Option<ServerMessage> {
    match msg {
        ClientMessage::Begin => {
            ignore("begin", state.begin().await);
            None
        }

        ClientMessage::Configure {
            player_names,
            difficulty,
        } => {
            tracing::info!(
                "Configure request: {} players, {}",
                player_names.len(),
                difficulty
            );
            let state = state.clone();
            spawn_action("configure", async move {
                state.configure(player_names, difficulty).await
            });
            None
        }

        ClientMessage::Choose { fact_index } => {
            ignore("choose", state.choose(fact_index).await.map(|_| ()));
            None
        }

        ClientMessage::ContinueTurn => {
            let state = state.clone();
            spawn_action("continue_turn", async move {
                state.advance_turn().await.map(|_| ())
            });
            None
        }

        ClientMessage::ContinueToWinner => {
            ignore(
                "continue_to_winner",
                state.continue_to_winner().await.map(|_| ()),
            );
            None
        }

        ClientMessage::ResetToMenu => {
            ignore("reset_to_menu", state.reset_to_menu().await);
            None
        }

        ClientMessage::RetryFacts => {
            let state = state.clone();
            spawn_action("retry_facts", async move { state.start_turn().await });
            None
        }

        ClientMessage::SpeechDone { utterance_id } => {
            state.audio.speech_finished(utterance_id);
            None
        }
    }
}
