use crate::state::AppState;
use crate::types::*;

/// Credit a player for spotting the lie; returns the new score
pub fn award_lie_found(player: &mut Player) -> u32 {
    player.score = player.score.saturating_add(POINTS_PER_LIE);
    player.score
}

/// Players ordered by score, highest first. Ties keep roster order.
pub fn standings(players: &[Player]) -> Vec<Player> {
    let mut sorted = players.to_vec();
    // sort_by is stable
    sorted.sort_by(|a, b| b.score.cmp(&a.score));
    sorted
}

/// The top of the standings; on a tie, whoever comes first in the roster
pub fn winner(players: &[Player]) -> Option<Player> {
    standings(players).into_iter().next()
}

impl AppState {
    /// Current standings of the session
    pub async fn standings(&self) -> Vec<Player> {
        standings(&self.session.read().await.players)
    }
}
