//! Reading the current facts aloud, one after another, until cancelled.

use super::AppState;
use crate::audio::AudioSink;
use crate::cancel::CancelToken;
use crate::types::GameConfig;

/// Speak each fact as `"{label} N: {text}"` with a pause in between.
///
/// Waits the configured delay before the first fact. Returns `true` when
/// every fact was spoken and `false` as soon as the token is cancelled;
/// nothing further is spoken after cancellation.
pub async fn read_facts_aloud(
    audio: &dyn AudioSink,
    texts: &[String],
    token: &CancelToken,
    config: &GameConfig,
) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(config.read_aloud_delay) => {}
        _ = token.cancelled() => return false,
    }

    for (i, text) in texts.iter().enumerate() {
        if token.is_cancelled() {
            return false;
        }

        let line = format!("{} {}: {}", config.fact_label, i + 1, text);
        tokio::select! {
            _ = audio.speak(&line) => {}
            _ = token.cancelled() => return false,
        }

        if i + 1 < texts.len() {
            tokio::select! {
                _ = tokio::time::sleep(config.read_aloud_pause) => {}
                _ = token.cancelled() => return false,
            }
        }
    }

    !token.is_cancelled()
}

impl AppState {
    /// Start reading the given texts, stopping any sequence already running
    pub(super) async fn spawn_read_aloud(&self, texts: Vec<String>) {
        let token = CancelToken::new();
        {
            let mut slot = self.read_aloud.lock().await;
            if let Some(previous) = slot.replace(token.clone()) {
                previous.cancel();
                self.audio.stop_speaking();
            }
        }

        let state = self.clone();
        tokio::spawn(async move {
            let finished = read_facts_aloud(
                state.audio.as_ref(),
                &texts,
                &token,
                &state.config,
            )
            .await;
            tracing::debug!("Read-aloud ended (completed: {})", finished);
            state.finish_read_aloud(&token).await;
        });
    }

    async fn finish_read_aloud(&self, token: &CancelToken) {
        {
            let mut slot = self.read_aloud.lock().await;
            match slot.as_ref() {
                Some(current) if current.same_as(token) => *slot = None,
                // A newer sequence owns the slot
                _ => return,
            }
        }
        self.broadcast_state().await;
    }

    /// Cancel the running read-aloud and silence speech
    pub async fn cancel_read_aloud(&self) {
        let token = self.read_aloud.lock().await.take();
        if let Some(token) = token {
            token.cancel();
            self.audio.stop_speaking();
        }
    }

    /// Whether a read-aloud sequence is in progress
    pub async fn is_reading(&self) -> bool {
        self.read_aloud.lock().await.is_some()
    }
}
