use super::{ActionError, AppState};
use crate::types::*;

/// Longest name kept; anything beyond is cut off
const MAX_NAME_CHARS: usize = 32;

/// Build the roster for a new game from the names entered on the setup
/// screen. Names are trimmed; blank ones become "Agent N" (1-based).
pub fn build_roster(names: &[String]) -> Result<Vec<Player>, ActionError> {
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&names.len()) {
        return Err(ActionError::InvalidRoster(names.len()));
    }

    Ok(names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let name = name.trim();
            let name = if name.is_empty() {
                format!("Agent {}", i + 1)
            } else {
                name.chars().take(MAX_NAME_CHARS).collect()
            };
            Player {
                id: i as PlayerId,
                name,
                score: 0,
            }
        })
        .collect())
}

impl AppState {
    /// The player whose turn it is, if a game is running
    pub async fn current_player(&self) -> Option<Player> {
        let session = self.session.read().await;
        let turn = session.turn.as_ref()?;
        session.players.get(turn.current_player_index).cloned()
    }
}
